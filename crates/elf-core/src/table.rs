//! Lookup table from ELF code to the records sharing it

use crate::error::{Error, Result};
use crate::parser::{parse_row, read_canonical};
use crate::record::Record;
use crate::scanner::{SnapshotDescriptor, SnapshotLocator, SnapshotQuery};
use arc_swap::ArcSwap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a lookup table is loaded from
#[derive(Debug, Clone)]
pub enum Source {
    /// A canonical CSV file with a header row
    File(PathBuf),
    /// Already tokenized data rows, header excluded
    Rows(Vec<Vec<String>>),
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::File(path.to_path_buf())
    }
}

impl From<Vec<Vec<String>>> for Source {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Source::Rows(rows)
    }
}

/// Ordered multi-valued mapping from ELF code to records
///
/// Codes keep the order of their first appearance and records keep file
/// order within a code. Every record stored under a code has that code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupTable {
    entries: IndexMap<String, Vec<Record>>,
    source: String,
}

impl LookupTable {
    /// Build a table from a source
    pub fn load(source: Source) -> Result<Self> {
        let table = match source {
            Source::File(path) => {
                let canonical = read_canonical(&path)?;
                Self::from_records(canonical.records, path.display().to_string())
            }
            Source::Rows(rows) => {
                let records = rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| parse_row(row, i as u64 + 1))
                    .collect::<Result<Vec<_>>>()?;
                Self::from_records(records, "<rows>")
            }
        };

        tracing::info!(
            source = %table.source,
            codes = table.count(),
            records = table.record_count(),
            "loaded ELF table"
        );
        Ok(table)
    }

    /// Build a table from records, grouping them by code
    pub fn from_records(
        records: impl IntoIterator<Item = Record>,
        source: impl Into<String>,
    ) -> Self {
        let mut entries: IndexMap<String, Vec<Record>> = IndexMap::new();
        for record in records {
            entries
                .entry(record.code().to_string())
                .or_default()
                .push(record);
        }
        Self {
            entries,
            source: source.into(),
        }
    }

    /// Records for a code, in file order
    pub fn get(&self, code: &str) -> Result<&[Record]> {
        self.find(code)
            .ok_or_else(|| Error::UnknownCode(code.to_string()))
    }

    /// Records for a code, or `None` if absent
    pub fn find(&self, code: &str) -> Option<&[Record]> {
        self.entries.get(code).map(Vec::as_slice)
    }

    /// Check whether a code is present
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Number of distinct codes
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Number of records across all codes
    pub fn record_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Check whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(code, records)` pairs in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.entries
            .iter()
            .map(|(code, records)| (code.as_str(), records.as_slice()))
    }

    /// All records in insertion order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.entries.values().flatten()
    }

    /// Codes shared by more than one record (several language variants)
    pub fn multi_entry_codes(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, records)| records.len() > 1)
            .map(|(code, _)| code.as_str())
            .collect()
    }

    /// Description of where the table came from
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Reloadable handle to the active lookup table
///
/// A reload builds the new table completely before publishing it with a
/// single atomic swap, so readers see either the old or the new table.
pub struct ElfRegistry {
    locator: SnapshotLocator,
    active: ArcSwap<LookupTable>,
}

impl ElfRegistry {
    /// Load the newest cleaned snapshot from a directory
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        Self::open_with(directory, &SnapshotQuery::newest_cleaned())
    }

    /// Load the snapshot selected by `query` from a directory
    pub fn open_with<P: AsRef<Path>>(directory: P, query: &SnapshotQuery) -> Result<Self> {
        let locator = SnapshotLocator::new(directory)?;
        let snapshot = locator.locate_one(query)?;
        let table = LookupTable::load(Source::File(snapshot.path))?;
        Ok(Self::new(locator, table))
    }

    /// Load an explicit source, keeping `directory` for later reloads
    pub fn from_source<P: AsRef<Path>>(directory: P, source: Source) -> Result<Self> {
        let locator = SnapshotLocator::new(directory)?;
        Ok(Self::new(locator, LookupTable::load(source)?))
    }

    /// Wrap an already built table
    pub fn new(locator: SnapshotLocator, table: LookupTable) -> Self {
        Self {
            locator,
            active: ArcSwap::from_pointee(table),
        }
    }

    /// Replace the active table with the snapshot selected by `query`
    ///
    /// On error the active table is left untouched.
    pub fn reload(&self, query: &SnapshotQuery) -> Result<SnapshotDescriptor> {
        let snapshot = self.locator.locate_one(query)?;
        self.reload_from(Source::File(snapshot.path.clone()))?;
        Ok(snapshot)
    }

    /// Replace the active table with an explicit source
    pub fn reload_from(&self, source: Source) -> Result<()> {
        let table = LookupTable::load(source)?;
        self.active.store(Arc::new(table));
        Ok(())
    }

    /// Snapshot of the active table
    pub fn table(&self) -> Arc<LookupTable> {
        self.active.load_full()
    }

    /// Locator used for reloads
    pub fn locator(&self) -> &SnapshotLocator {
        &self.locator
    }

    /// Records for a code in the active table
    pub fn get(&self, code: &str) -> Result<Vec<Record>> {
        self.active.load().get(code).map(<[Record]>::to_vec)
    }

    /// Number of distinct codes in the active table
    pub fn count(&self) -> usize {
        self.active.load().count()
    }

    /// All `(code, records)` pairs of the active table
    pub fn entries(&self) -> Vec<(String, Vec<Record>)> {
        self.active
            .load()
            .entries()
            .map(|(code, records)| (code.to_string(), records.to_vec()))
            .collect()
    }
}
