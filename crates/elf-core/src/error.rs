//! Error types for elf-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in elf-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Row does not have the schema width
    #[error("malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Quoted field left open or followed by stray characters
    #[error("malformed quoting in '{path}' at line {line}")]
    MalformedQuoting { path: PathBuf, line: u64 },

    /// Lookup of a code that is not in the table
    #[error("unknown ELF code '{0}'")]
    UnknownCode(String),

    /// No snapshot matched the requested criteria
    #[error("no snapshot found in '{directory}' matching {criteria}")]
    NoSnapshotFound { directory: PathBuf, criteria: String },

    /// Supplementary row whose width is neither a new form nor a completion
    #[error("unsupported row in '{path}' at line {line}: {found} columns")]
    UnsupportedSupplementaryRow {
        path: PathBuf,
        line: u64,
        found: usize,
    },

    /// Merge output would replace one of its inputs
    #[error("output '{path}' is also a merge input")]
    OutputOverwritesInput { path: PathBuf },

    /// Snapshot filename pattern failed to compile
    #[error("invalid snapshot pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check whether this is a lookup miss that callers can present as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnknownCode(_) | Error::NoSnapshotFound { .. })
    }
}
