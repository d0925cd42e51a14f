//! Shared fixtures for roster-ingest integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// The sample from the operator guide: three good lines, one short line,
/// and one line without any delimiter.
pub const SAMPLE_FILE: &str = "\
Juan|Pérez|12345678|Activo|2023-01-01|true|false
Ana|Gómez|87654321|Inactivo|0000-00-00|false|
Luis|Fernández|11223344|Activo|04/15/2021|TRUE|true
Marta|López|99887766|Activo|2022-02-02|false
this line has no delimiter
";

/// A well-formed line with the given id
pub fn valid_line(id: u64) -> String {
    format!("Client|Number {}|{}|Activo|2023-01-01|false|true", id, 10_000_000 + id)
}

/// Temporary input file; the directory is removed on drop
pub struct InputFile {
    _dir: TempDir,
    pub path: PathBuf,
}

pub fn input_file(content: &[u8]) -> InputFile {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clients.dat");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content).unwrap();
    InputFile { _dir: dir, path }
}

/// File with `count` valid lines
pub fn valid_lines_file(count: u64) -> InputFile {
    let content: String = (0..count).map(|i| valid_line(i) + "\n").collect();
    input_file(content.as_bytes())
}
