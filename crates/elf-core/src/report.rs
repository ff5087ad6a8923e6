//! Persisted summary of a merge run
//!
//! The report lists everything the reconciliation flagged so a batch run can
//! be reviewed in one pass.

use crate::error::{Error, Result};
use crate::merger::{MergeStats, Reconciliation, ReconciliationConflict};
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Record of one merge run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    /// When the merge ran
    pub timestamp: DateTime<Utc>,
    /// Canonical input file
    pub canonical: PathBuf,
    /// Supplementary input file
    pub supplementary: PathBuf,
    /// Output file written
    pub output: PathBuf,
    /// Counters
    pub stats: MergeStats,
    /// Rows sharing a `(code, language)` key
    pub conflicts: Vec<ReconciliationConflict>,
    /// Completion rows appended as standalone entries
    pub rerouted: Vec<Record>,
    /// Completion codes absent from the canonical table
    pub unmatched_codes: Vec<String>,
}

impl MergeReport {
    /// Create a report for a finished reconciliation
    pub fn new(
        canonical: impl Into<PathBuf>,
        supplementary: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        reconciliation: &Reconciliation,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            canonical: canonical.into(),
            supplementary: supplementary.into(),
            output: output.into(),
            stats: reconciliation.stats.clone(),
            conflicts: reconciliation.conflicts.clone(),
            rerouted: reconciliation.rerouted.clone(),
            unmatched_codes: reconciliation.unmatched_codes.clone(),
        }
    }

    /// Load a report from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the report to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Number of issues a reviewer should look at
    pub fn issue_count(&self) -> usize {
        self.conflicts.len() + self.rerouted.len() + self.unmatched_codes.len()
    }
}
