use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;

use crate::domain::Identifier;
use crate::error::MinerError;

pub const ARCHIVE_DIR: &str = "tarballs";
pub const FASTA_DIR: &str = "fasta";
pub const LEDGER_FILE: &str = "missing.json";
pub const DATA_CSV: &str = "data.csv";
pub const DATA_EXTRA_CSV: &str = "data_extra.csv";
pub const MATCHED_CSV: &str = "matched.csv";

/// Marker a file name must contain to be picked up as an alignment query.
pub const FASTA_MARKER: &str = ".fa";

/// Flat-file layout of one mining run, rooted at a working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn current() -> Result<Self, MinerError> {
        let cwd = std::env::current_dir().map_err(|err| MinerError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| MinerError::Filesystem("invalid working directory path".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn archive_dir(&self) -> Utf8PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    pub fn archive_path(&self, id: &Identifier) -> Utf8PathBuf {
        self.archive_dir().join(format!("{id}.tar.bz2"))
    }

    pub fn fasta_dir(&self) -> Utf8PathBuf {
        self.root.join(FASTA_DIR)
    }

    pub fn fasta_path(&self, id: &Identifier) -> Utf8PathBuf {
        self.fasta_dir().join(format!("{id}.fa"))
    }

    pub fn blast_report_path(&self, stem: &str) -> Utf8PathBuf {
        self.fasta_dir().join(format!("{stem}_blast.xml"))
    }

    pub fn ledger_path(&self) -> Utf8PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn data_csv(&self) -> Utf8PathBuf {
        self.root.join(DATA_CSV)
    }

    pub fn data_extra_csv(&self) -> Utf8PathBuf {
        self.root.join(DATA_EXTRA_CSV)
    }

    pub fn matched_csv(&self) -> Utf8PathBuf {
        self.root.join(MATCHED_CSV)
    }

    pub fn ensure_layout(&self) -> Result<(), MinerError> {
        for dir in [self.archive_dir(), self.fasta_dir()] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| MinerError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }

    /// Alignment queries in the FASTA directory, sorted by file name, as
    /// `(stem, path)` pairs. The stem is everything before the marker.
    pub fn fasta_queries(&self) -> Result<Vec<(String, Utf8PathBuf)>, MinerError> {
        let dir = self.fasta_dir();
        if !dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let entries = dir
            .read_dir_utf8()
            .map_err(|err| MinerError::Filesystem(format!("read {dir}: {err}")))?;
        let mut queries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| MinerError::Filesystem(err.to_string()))?;
            let name = entry.file_name();
            let Some((stem, _)) = name.split_once(FASTA_MARKER) else {
                continue;
            };
            if entry.path().is_file() {
                queries.push((stem.to_string(), entry.path().to_owned()));
            }
        }
        queries.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(queries)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), MinerError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix(".itasser-miner")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| MinerError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| MinerError::Filesystem(format!("persist {path}: {err}")))?;
        Ok(())
    }
}

/// Serializes `rows` as CSV with a header row, even when `rows` is empty.
pub fn write_csv<T: Serialize>(
    path: &Utf8Path,
    header: &[&str],
    rows: &[T],
) -> Result<(), MinerError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|err| MinerError::Csv(err.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| MinerError::Csv(err.to_string()))?;
    }
    let content = writer
        .into_inner()
        .map_err(|err| MinerError::Csv(err.to_string()))?;
    Workspace::write_bytes_atomic(path, &content)
}

/// FASTA record: header, sequence, blank line.
pub fn fasta_record(id: &Identifier, sequence: &str) -> String {
    format!(">{id}\n{sequence}\n\n")
}
