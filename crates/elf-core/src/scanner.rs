//! Snapshot locator for discovering dated ISO 20275 CSV files
//!
//! Snapshot files are named like `Cleaned - ISO-20275 - 2020-11-19.csv`
//! (curated) or `ISO-20275 - 2020-11-19.csv` (original). Matching is
//! case-insensitive and accepts any run of spaces, hyphens or underscores
//! between the tokens. Other files in the directory are ignored.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SNAPSHOT_PATTERN: &str =
    r"(?i)^(?:(cleaned)[ _\-]+)?iso-20275[ _\-]+(\d{4}-\d{2}-\d{2})\.csv$";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A snapshot file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDescriptor {
    /// Whether this is the curated ("Cleaned") variant
    pub is_cleaned: bool,
    /// Date stamp from the file name, `YYYY-MM-DD`
    pub date_stamp: String,
    /// Full path to the file
    pub path: PathBuf,
}

impl SnapshotDescriptor {
    /// Newest first, cleaned before original on the same date
    fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.date_stamp
            .cmp(&a.date_stamp)
            .then_with(|| b.is_cleaned.cmp(&a.is_cleaned))
            .then_with(|| a.path.cmp(&b.path))
    }

    /// Human-readable variant name
    pub fn variant(&self) -> &'static str {
        if self.is_cleaned {
            "cleaned"
        } else {
            "original"
        }
    }
}

/// Criteria for selecting snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotQuery {
    /// Keep only the newest match (per variant when `cleaned` is unset)
    pub newest: bool,
    /// `Some(true)` cleaned only, `Some(false)` original only, `None` both
    pub cleaned: Option<bool>,
    /// Exact date stamp to match
    pub timestamp: Option<String>,
}

impl SnapshotQuery {
    /// Newest cleaned snapshot, the default source of the lookup table
    pub fn newest_cleaned() -> Self {
        Self {
            newest: true,
            cleaned: Some(true),
            timestamp: None,
        }
    }

    /// Newest original snapshot
    pub fn newest_original() -> Self {
        Self {
            newest: true,
            cleaned: Some(false),
            timestamp: None,
        }
    }

    /// Cleaned snapshot with an exact date stamp
    pub fn at(timestamp: impl Into<String>) -> Self {
        Self {
            newest: true,
            cleaned: Some(true),
            timestamp: Some(timestamp.into()),
        }
    }

    fn accepts(&self, snapshot: &SnapshotDescriptor) -> bool {
        self.cleaned.map_or(true, |c| snapshot.is_cleaned == c)
            && self
                .timestamp
                .as_deref()
                .map_or(true, |t| snapshot.date_stamp == t)
    }
}

impl fmt::Display for SnapshotQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self.cleaned {
            Some(true) => "cleaned",
            Some(false) => "original",
            None => "any",
        };
        write!(
            f,
            "newest={} variant={} timestamp={}",
            self.newest,
            variant,
            self.timestamp.as_deref().unwrap_or("any")
        )
    }
}

/// Locates snapshot files in one directory
#[derive(Debug, Clone)]
pub struct SnapshotLocator {
    directory: PathBuf,
    pattern: Regex,
}

impl SnapshotLocator {
    /// Create a locator for a directory
    ///
    /// The directory is not touched until [`discover`](Self::discover) or
    /// [`locate`](Self::locate) is called.
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        Ok(Self {
            directory: directory.as_ref().to_path_buf(),
            pattern: Regex::new(SNAPSHOT_PATTERN)?,
        })
    }

    /// Directory being searched
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Extract `(is_cleaned, date_stamp)` from a file name
    pub fn parse_name(&self, file_name: &str) -> Option<(bool, String)> {
        let captures = self.pattern.captures(file_name)?;
        let date = captures.get(2)?.as_str();
        // Reject stamps like 2020-13-45 that fit the shape but are not dates
        NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Some((captures.get(1).is_some(), date.to_string()))
    }

    /// List every snapshot file in the directory, newest first
    pub fn discover(&self) -> Result<Vec<SnapshotDescriptor>> {
        let mut snapshots = Vec::new();

        for entry in WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };

            match self.parse_name(file_name) {
                Some((is_cleaned, date_stamp)) => snapshots.push(SnapshotDescriptor {
                    is_cleaned,
                    date_stamp,
                    path: entry.path().to_path_buf(),
                }),
                None => tracing::trace!(file = file_name, "ignoring non-snapshot file"),
            }
        }

        snapshots.sort_by(SnapshotDescriptor::newest_first);
        Ok(snapshots)
    }

    /// Select snapshots matching a query
    ///
    /// Returns an empty list when nothing matches. With `newest` set, an
    /// explicit variant yields at most one snapshot and an unset variant
    /// yields at most one per variant.
    pub fn locate(&self, query: &SnapshotQuery) -> Result<Vec<SnapshotDescriptor>> {
        let mut candidates: Vec<SnapshotDescriptor> = self
            .discover()?
            .into_iter()
            .filter(|s| query.accepts(s))
            .collect();

        if query.newest {
            if query.cleaned.is_some() {
                candidates.truncate(1);
            } else {
                // Indexed by is_cleaned: [original, cleaned]
                let mut seen = [false; 2];
                candidates.retain(|s| {
                    let slot = &mut seen[usize::from(s.is_cleaned)];
                    !std::mem::replace(slot, true)
                });
            }
        }

        tracing::debug!(
            directory = %self.directory.display(),
            %query,
            found = candidates.len(),
            "located snapshots"
        );
        Ok(candidates)
    }

    /// Select exactly one snapshot
    ///
    /// When the query allows both variants the cleaned one wins on equal dates.
    pub fn locate_one(&self, query: &SnapshotQuery) -> Result<SnapshotDescriptor> {
        self.locate(query)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoSnapshotFound {
                directory: self.directory.clone(),
                criteria: query.to_string(),
            })
    }
}

/// Locate snapshots in a directory
pub fn locate_snapshots<P: AsRef<Path>>(
    directory: P,
    query: &SnapshotQuery,
) -> Result<Vec<SnapshotDescriptor>> {
    SnapshotLocator::new(directory)?.locate(query)
}

/// File name the locator recognizes for a snapshot
pub fn snapshot_file_name(cleaned: bool, date_stamp: &str) -> String {
    if cleaned {
        format!("Cleaned - ISO-20275 - {}.csv", date_stamp)
    } else {
        format!("ISO-20275 - {}.csv", date_stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn locator_with(files: &[&str]) -> (tempfile::TempDir, SnapshotLocator) {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let locator = SnapshotLocator::new(dir.path()).unwrap();
        (dir, locator)
    }

    fn names(snapshots: &[SnapshotDescriptor]) -> Vec<String> {
        snapshots
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_parse_name_original() {
        let locator = SnapshotLocator::new(".").unwrap();
        assert_eq!(
            locator.parse_name("ISO-20275 - 2019-11-06.csv"),
            Some((false, "2019-11-06".to_string()))
        );
    }

    #[test]
    fn test_parse_name_cleaned_flexible_separators() {
        let locator = SnapshotLocator::new(".").unwrap();
        assert_eq!(
            locator.parse_name("Cleaned - ISO-20275 - 2020-11-19.csv"),
            Some((true, "2020-11-19".to_string()))
        );
        assert_eq!(
            locator.parse_name("cleaned__iso-20275_2020-11-19.CSV"),
            Some((true, "2020-11-19".to_string()))
        );
    }

    #[test]
    fn test_parse_name_rejects_other_files() {
        let locator = SnapshotLocator::new(".").unwrap();
        assert_eq!(locator.parse_name("README.md"), None);
        assert_eq!(locator.parse_name("ISO-20275 - 2019-11-06.txt"), None);
        assert_eq!(
            locator.parse_name("Cleaned - with additional - ISO-20275 - 2020-11-19.csv"),
            None
        );
        assert_eq!(locator.parse_name("ISO-20275 - 2019-13-45.csv"), None);
    }

    #[test]
    fn test_newest_per_variant() {
        let (_dir, locator) = locator_with(&[
            "ISO-20275 - 2019-11-06.csv",
            "Cleaned - ISO-20275 - 2020-01-01.csv",
        ]);

        let query = SnapshotQuery {
            newest: true,
            ..Default::default()
        };
        let found = locator.locate(&query).unwrap();
        assert_eq!(
            names(&found),
            vec![
                "Cleaned - ISO-20275 - 2020-01-01.csv",
                "ISO-20275 - 2019-11-06.csv"
            ]
        );

        let found = locator.locate(&SnapshotQuery::newest_cleaned()).unwrap();
        assert_eq!(names(&found), vec!["Cleaned - ISO-20275 - 2020-01-01.csv"]);
    }

    #[test]
    fn test_newest_cleaned_is_greatest_date() {
        let (_dir, locator) = locator_with(&[
            "Cleaned - ISO-20275 - 2019-11-06.csv",
            "Cleaned - ISO-20275 - 2020-11-19.csv",
            "Cleaned - ISO-20275 - 2020-01-01.csv",
            "ISO-20275 - 2021-01-01.csv",
            "notes.txt",
        ]);

        let found = locator.locate(&SnapshotQuery::newest_cleaned()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_cleaned);
        assert_eq!(found[0].date_stamp, "2020-11-19");
    }

    #[test]
    fn test_newest_original() {
        let (_dir, locator) = locator_with(&[
            "ISO-20275 - 2019-11-06.csv",
            "ISO-20275 - 2020-11-19.csv",
            "Cleaned - ISO-20275 - 2021-01-01.csv",
        ]);

        let found = locator.locate_one(&SnapshotQuery::newest_original()).unwrap();
        assert!(!found.is_cleaned);
        assert_eq!(found.date_stamp, "2020-11-19");
    }

    #[test]
    fn test_exact_timestamp() {
        let (_dir, locator) = locator_with(&[
            "ISO-20275 - 2019-11-06.csv",
            "Cleaned - ISO-20275 - 2019-11-06.csv",
            "Cleaned - ISO-20275 - 2020-11-19.csv",
        ]);

        let query = SnapshotQuery {
            timestamp: Some("2019-11-06".to_string()),
            ..Default::default()
        };
        let found = locator.locate(&query).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|s| s.date_stamp == "2019-11-06"));

        let found = locator.locate_one(&SnapshotQuery::at("2019-11-06")).unwrap();
        assert!(found.is_cleaned);
    }

    #[test]
    fn test_without_newest_returns_all_sorted() {
        let (_dir, locator) = locator_with(&[
            "ISO-20275 - 2019-11-06.csv",
            "Cleaned - ISO-20275 - 2019-11-06.csv",
            "ISO-20275 - 2020-11-19.csv",
        ]);

        let found = locator.locate(&SnapshotQuery::default()).unwrap();
        assert_eq!(
            names(&found),
            vec![
                "ISO-20275 - 2020-11-19.csv",
                "Cleaned - ISO-20275 - 2019-11-06.csv",
                "ISO-20275 - 2019-11-06.csv"
            ]
        );
    }

    #[test]
    fn test_locate_snapshots() {
        let (dir, _locator) = locator_with(&["Cleaned - ISO-20275 - 2019-11-06.csv"]);
        let found = locate_snapshots(dir.path(), &SnapshotQuery::newest_cleaned()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].variant(), "cleaned");
    }

    #[test]
    fn test_no_match_is_empty() {
        let (_dir, locator) = locator_with(&["ISO-20275 - 2019-11-06.csv"]);
        let found = locator.locate(&SnapshotQuery::newest_cleaned()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_locate_one_no_match() {
        let (_dir, locator) = locator_with(&[]);
        let err = locator.locate_one(&SnapshotQuery::newest_cleaned()).unwrap_err();
        assert!(matches!(err, Error::NoSnapshotFound { .. }));
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let locator = SnapshotLocator::new(dir.path().join("missing")).unwrap();
        assert!(matches!(
            locator.locate(&SnapshotQuery::default()),
            Err(Error::WalkDir(_))
        ));
    }

    #[test]
    fn test_snapshot_file_name_is_recognized() {
        let locator = SnapshotLocator::new(".").unwrap();
        let name = snapshot_file_name(true, "2020-11-19");
        assert_eq!(name, "Cleaned - ISO-20275 - 2020-11-19.csv");
        assert_eq!(locator.parse_name(&name), Some((true, "2020-11-19".to_string())));
        assert_eq!(
            locator.parse_name(&snapshot_file_name(false, "2020-11-19")),
            Some((false, "2020-11-19".to_string()))
        );
    }
}
