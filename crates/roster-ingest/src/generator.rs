//! Synthetic client file generator
//!
//! Produces input files shaped like real exports, with a controllable share
//! of corrupted lines. A corrupted line gets one of:
//!
//! 1. a sentinel or empty enrollment date
//! 2. empty PEP and obligated-subject flags
//! 3. fifty lorem words for each name part, so the full name is too long
//!
//! Only the third kind is rejected by the parser; the other two load with
//! null or default values.

use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::error::{IngestError, IngestResult};

const FIRST_NAMES: &[&str] = &[
    "Juan", "María", "José", "Ana", "Luis", "Carmen", "Carlos", "Lucía", "Jorge", "Sofía", "Miguel",
    "Valentina", "Pedro", "Martina", "Diego", "Camila", "Andrés", "Paula", "Tomás", "Julieta",
];

const LAST_NAMES: &[&str] = &[
    "Pérez", "González", "Rodríguez", "Fernández", "López", "Martínez", "García", "Sánchez",
    "Romero", "Díaz", "Álvarez", "Torres", "Ruiz", "Ramírez", "Flores", "Benítez", "Acosta",
    "Medina", "Herrera", "Suárez",
];

const STATUSES: &[&str] = &["Activo", "Inactivo"];

const SENTINELS: &[&str] = &["0000-00-00", "99/99/9999", ""];

const LOREM: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip",
];

const LOREM_WORDS_PER_NAME: usize = 50;

/// Enrollment dates fall within this many days before today
const DATE_WINDOW_DAYS: i64 = 3650;

/// Default number of generated lines
pub const DEFAULT_RECORDS: u64 = 100_000;

/// Default share of corrupted lines
pub const DEFAULT_ERROR_RATE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorOptions {
    pub records: u64,
    /// Probability, in `[0, 1]`, that a line is corrupted
    pub error_rate: f64,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS,
            error_rate: DEFAULT_ERROR_RATE,
            seed: None,
        }
    }
}

/// What a generator run wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummary {
    pub path: PathBuf,
    pub records: u64,
    pub corrupted: u64,
    /// Corrupted lines the parser will reject
    pub overlong_names: u64,
}

/// Write a synthetic client file to `path`, creating parent directories
pub async fn generate_file(path: &Path, options: GeneratorOptions) -> IngestResult<GenerateSummary> {
    if !(0.0..=1.0).contains(&options.error_rate) {
        return Err(IngestError::Config(format!(
            "error rate must be between 0 and 1, got {}",
            options.error_rate
        )));
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| IngestError::write(dir, e))?;
    }

    let file = File::create(path).await.map_err(|e| IngestError::write(path, e))?;
    let mut writer = BufWriter::new(file);

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let today = Local::now().date_naive();

    let mut summary = GenerateSummary {
        path: path.to_path_buf(),
        records: options.records,
        corrupted: 0,
        overlong_names: 0,
    };

    for _ in 0..options.records {
        let mut line = LineFields::random(&mut rng, today);

        if rng.gen_bool(options.error_rate) {
            summary.corrupted += 1;
            match rng.gen_range(1..=3) {
                1 => line.date = pick(&mut rng, SENTINELS).to_string(),
                2 => {
                    line.pep = String::new();
                    line.obligated = String::new();
                },
                _ => {
                    line.first = lorem_words(&mut rng, LOREM_WORDS_PER_NAME);
                    line.last = lorem_words(&mut rng, LOREM_WORDS_PER_NAME);
                    summary.overlong_names += 1;
                },
            }
        }

        writer
            .write_all(line.render().as_bytes())
            .await
            .map_err(|e| IngestError::write(path, e))?;
    }

    writer.flush().await.map_err(|e| IngestError::write(path, e))?;

    info!(
        path = %path.display(),
        records = summary.records,
        corrupted = summary.corrupted,
        "Generated client file"
    );

    Ok(summary)
}

struct LineFields {
    first: String,
    last: String,
    id: u32,
    status: &'static str,
    date: String,
    pep: String,
    obligated: String,
}

impl LineFields {
    fn random(rng: &mut StdRng, today: NaiveDate) -> Self {
        let date = today - Duration::days(rng.gen_range(0..DATE_WINDOW_DAYS));
        Self {
            first: pick(rng, FIRST_NAMES).to_string(),
            last: pick(rng, LAST_NAMES).to_string(),
            id: rng.gen_range(10_000_000..=99_999_999),
            status: pick(rng, STATUSES),
            date: date.format("%-m/%-d/%Y").to_string(),
            pep: rng.gen_bool(0.5).to_string(),
            obligated: rng.gen_bool(0.5).to_string(),
        }
    }

    fn render(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}\n",
            self.first, self.last, self.id, self.status, self.date, self.pep, self.obligated
        )
    }
}

fn pick(rng: &mut StdRng, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn lorem_words(rng: &mut StdRng, count: usize) -> String {
    (0..count).map(|_| pick(rng, LOREM)).collect::<Vec<_>>().join(" ")
}
