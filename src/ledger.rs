use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::Identifier;
use crate::error::MinerError;
use crate::store::Workspace;

/// Identifiers known to be unusable, with the reason each one failed.
///
/// The ledger is loaded explicitly once per run and flushed wholesale: every
/// flush rewrites the file with the full in-memory map.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: Utf8PathBuf,
    entries: BTreeMap<String, String>,
}

impl Ledger {
    /// Reads the ledger at `path`, or starts an empty one when the file does
    /// not exist yet.
    pub fn load(path: &Utf8Path) -> Result<Self, MinerError> {
        let entries = if path.as_std_path().is_file() {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| MinerError::Ledger(format!("{path}: {err}")))?;
            serde_json::from_str(&content)
                .map_err(|err| MinerError::Ledger(format!("{path}: {err}")))?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path, entries = entries.len(), "ledger loaded");
        Ok(Self {
            path: path.to_owned(),
            entries,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.entries.contains_key(&id.to_string())
    }

    pub fn reason(&self, id: &Identifier) -> Option<&str> {
        self.entries.get(&id.to_string()).map(String::as_str)
    }

    pub fn record(&mut self, id: &Identifier, reason: impl Into<String>) {
        self.entries.insert(id.to_string(), reason.into());
    }

    pub fn flush(&self) -> Result<(), MinerError> {
        let content = serde_json::to_vec(&self.entries)
            .map_err(|err| MinerError::Ledger(err.to_string()))?;
        Workspace::write_bytes_atomic(&self.path, &content)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
