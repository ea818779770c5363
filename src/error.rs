use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MinerError {
    #[error("invalid job identifier: {0}")]
    InvalidIdentifier(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("I-TASSER request failed: {0}")]
    ItasserHttp(String),

    /// The display form doubles as the ledger reason for the identifier.
    #[error("HTTP Error {status}: {message}")]
    ItasserStatus { status: u16, message: String },

    #[error("not a readable tar.bz2 archive ({path}): {message}")]
    Archive { path: String, message: String },

    #[error("archive member not found: {0}")]
    MissingMember(String),

    #[error("failed to parse structure {label}: {message}")]
    Structure { label: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("invalid ledger file: {0}")]
    Ledger(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("alignment failed: {0}")]
    Alignment(String),

    #[error("invalid BLAST XML report: {0}")]
    BlastReport(String),

    #[error("failed to install interrupt handler: {0}")]
    Signal(String),

    #[error("User exited")]
    Interrupted,
}
