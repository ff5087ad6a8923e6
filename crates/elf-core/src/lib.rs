//! elf-core: Core library for ISO 20275 Entity Legal Form tables
//!
//! This library provides functionality to:
//! - Locate dated snapshot files ("Cleaned" or original) by file name
//! - Parse snapshots into a lookup table from ELF code to records
//! - Reload the active table atomically
//! - Merge a supplementary legal forms file into a canonical snapshot,
//!   reporting conflicts instead of failing on them
//! - Write the merged result back as CSV

pub mod config;
pub mod error;
pub mod merger;
pub mod parser;
pub mod record;
pub mod report;
pub mod scanner;
pub mod table;
pub mod writer;

pub use config::MergeConfig;
pub use error::{Error, Result};
pub use merger::{
    detect_conflicts, merge, merge_files, merge_supplementary, synthetic_code, MergeOptions,
    MergeStats, MergedTable, Reconciliation, ReconciliationConflict,
};
pub use parser::{
    parse_canonical_str, parse_row, parse_supplementary_str, read_canonical, read_supplementary,
    CanonicalSource, NewForm, Supplementary,
};
pub use record::{Record, FIELDS, FIELD_COUNT};
pub use report::MergeReport;
pub use scanner::{
    locate_snapshots, snapshot_file_name, SnapshotDescriptor, SnapshotLocator, SnapshotQuery,
};
pub use table::{ElfRegistry, LookupTable, Source};
pub use writer::{write_csv, write_csv_to, write_json};
