//! Roster Ingest - client file loader

use anyhow::Result;
use clap::{Parser, Subcommand};
use roster_common::logging::{init_logging, LogConfig, LogLevel};
use roster_ingest::db::DbConfig;
use roster_ingest::generator::{self, GeneratorOptions};
use roster_ingest::{
    connect_store, IngestConfig, IngestPipeline, IngestService, MemoryStore, RecordStore,
    RunOutcome, RunReport,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "roster-ingest")]
#[command(author, version, about = "Roster client file ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a client file into the database
    Run {
        /// Input file (defaults to INGEST_FILE_PATH)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Records per transaction (defaults to INGEST_BATCH_SIZE)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Parse and batch without touching the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a synthetic client file
    Generate {
        /// Output file
        #[arg(short, long, default_value = "./data/clients.dat")]
        output: PathBuf,

        /// Number of lines
        #[arg(short, long, default_value_t = generator::DEFAULT_RECORDS)]
        records: u64,

        /// Share of corrupted lines, between 0 and 1
        #[arg(short, long, default_value_t = generator::DEFAULT_ERROR_RATE)]
        error_rate: f64,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("roster-ingest")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    match cli.command {
        Command::Run {
            file,
            batch_size,
            dry_run,
        } => {
            let mut config = IngestConfig::from_env()?;
            if let Some(file) = file {
                config.file_path = file;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            config.validate()?;

            let report = if dry_run {
                info!("Dry run, records are kept in memory");
                run(&config, MemoryStore::new(config.table.clone())).await?
            } else {
                let db_config = DbConfig::from_env()?;
                run(&config, connect_store(&config, &db_config).await?).await?
            };

            println!("{}", serde_json::to_string_pretty(&report)?);
        },
        Command::Generate {
            output,
            records,
            error_rate,
            seed,
        } => {
            let summary = generator::generate_file(
                &output,
                GeneratorOptions {
                    records,
                    error_rate,
                    seed,
                },
            )
            .await?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        },
    }

    Ok(())
}

async fn run<S: RecordStore + 'static>(config: &IngestConfig, store: S) -> Result<RunReport> {
    let service = IngestService::new(IngestPipeline::from_config(config, store));

    match service.run_file(&config.file_path).await? {
        RunOutcome::Finished(report) => Ok(report),
        RunOutcome::AlreadyRunning => anyhow::bail!("an ingest run is already in progress"),
    }
}
