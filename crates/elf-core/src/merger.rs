//! Reconciliation engine merging supplementary legal forms into the canonical table

use crate::error::{Error, Result};
use crate::parser::{read_canonical, read_supplementary, NewForm, Supplementary};
use crate::record::{union_list, Record, NEW_FORM_WIDTH};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Default number of digits in a synthetic code
pub const DEFAULT_CODE_WIDTH: usize = 4;

/// Options controlling a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Zero-padded width of synthetic codes given to new forms
    pub code_width: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            code_width: DEFAULT_CODE_WIDTH,
        }
    }
}

/// Two or more merged rows sharing the same `(code, language)` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConflict {
    /// Shared ELF code
    pub code: String,
    /// Shared language
    pub language: String,
    /// The conflicting rows, in output order
    pub records: Vec<Record>,
}

/// Counters describing a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Rows in the canonical input
    pub canonical_rows: usize,
    /// New forms given a synthetic code
    pub new_forms: usize,
    /// Completion rows whose abbreviations were merged into a canonical row
    pub merged_completions: usize,
    /// Completion rows appended as standalone entries
    pub rerouted: usize,
    /// Rows in the output
    pub output_rows: usize,
}

/// Result of a merge
///
/// Conflicts and anomalies are advisory; `records` is always the full
/// best-effort output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Merged rows, stably sorted by country
    pub records: Vec<Record>,
    /// Groups of rows sharing a `(code, language)` key
    pub conflicts: Vec<ReconciliationConflict>,
    /// Completion rows that did not match a canonical row with their code
    /// and were appended as standalone entries, keeping that code
    pub rerouted: Vec<Record>,
    /// Completion codes with no canonical row at all; their rows are dropped
    pub unmatched_codes: Vec<String>,
    /// Counters
    pub stats: MergeStats,
}

impl Reconciliation {
    /// Check whether the merge produced no conflicts or anomalies
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.rerouted.is_empty() && self.unmatched_codes.is_empty()
    }
}

/// Format the `n`th synthetic code (1-based)
pub fn synthetic_code(n: usize, width: usize) -> String {
    format!("{:0width$}", n, width = width)
}

/// Merge a supplementary file's rows into canonical records
pub fn merge_supplementary(
    canonical: &[Record],
    supplementary: &Supplementary,
    options: &MergeOptions,
) -> Result<Reconciliation> {
    merge(
        canonical,
        &supplementary.new_forms,
        &supplementary.completions,
        options,
    )
}

/// Merge new forms and completion rows into canonical records
///
/// 1. New forms receive sequential synthetic codes in input order.
/// 2. A completion row whose `(local_name, language)` equals the canonical
///    row's contributes its abbreviations to that row. Any other completion
///    row under the same code is appended unchanged, once per canonical row
///    it failed to match.
/// 3. The output is stably sorted by country and scanned for rows sharing
///    a `(code, language)` key.
pub fn merge(
    canonical: &[Record],
    new_forms: &[NewForm],
    completions: &BTreeMap<String, Vec<Record>>,
    options: &MergeOptions,
) -> Result<Reconciliation> {
    let mut pool: Vec<Record> = new_forms
        .iter()
        .enumerate()
        .map(|(i, form)| {
            let code = synthetic_code(i + 1, options.code_width);
            Record::from_new_form(&code, &form.fields).ok_or(Error::MalformedRow {
                line: form.line,
                expected: NEW_FORM_WIDTH,
                found: form.fields.len(),
            })
        })
        .collect::<Result<_>>()?;

    let mut stats = MergeStats {
        canonical_rows: canonical.len(),
        new_forms: pool.len(),
        ..Default::default()
    };

    let mut rerouted = Vec::new();
    let mut records = Vec::with_capacity(canonical.len() + pool.len());

    for original in canonical {
        let Some(candidates) = completions.get(original.code()) else {
            records.push(original.clone());
            continue;
        };

        let mut current = original.clone();
        for candidate in candidates {
            if current.identity() == candidate.identity() {
                current = current.with_abbreviations(
                    union_list(current.local_abbreviations(), candidate.local_abbreviations()),
                    union_list(
                        current.transliterated_abbreviations(),
                        candidate.transliterated_abbreviations(),
                    ),
                );
                stats.merged_completions += 1;
            } else {
                tracing::warn!(
                    code = candidate.code(),
                    local_name = candidate.local_name(),
                    language = candidate.language(),
                    "completion row does not match canonical row, appending as a new entry"
                );
                rerouted.push(candidate.clone());
            }
        }
        records.push(current);
    }

    let canonical_codes: HashSet<&str> = canonical.iter().map(Record::code).collect();
    let unmatched_codes: Vec<String> = completions
        .keys()
        .filter(|code| !canonical_codes.contains(code.as_str()))
        .cloned()
        .collect();
    for code in &unmatched_codes {
        tracing::warn!(code = %code, "completion code has no canonical row, dropping it");
    }

    pool.extend(rerouted.iter().cloned());
    records.extend(pool);
    records.sort_by(|a, b| a.country().cmp(b.country()));

    let conflicts = detect_conflicts(&records);

    stats.rerouted = rerouted.len();
    stats.output_rows = records.len();

    tracing::info!(
        canonical = stats.canonical_rows,
        new_forms = stats.new_forms,
        merged = stats.merged_completions,
        rerouted = stats.rerouted,
        conflicts = conflicts.len(),
        output = stats.output_rows,
        "reconciliation finished"
    );

    Ok(Reconciliation {
        records,
        conflicts,
        rerouted,
        unmatched_codes,
        stats,
    })
}

/// Group rows by `(code, language)` and report every group with several rows
///
/// Groups are reported in order of first appearance.
pub fn detect_conflicts(records: &[Record]) -> Vec<ReconciliationConflict> {
    let mut groups: IndexMap<(&str, &str), Vec<&Record>> = IndexMap::new();
    for record in records {
        groups.entry(record.conflict_key()).or_default().push(record);
    }

    groups
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|((code, language), rows)| {
            tracing::warn!(code, language, rows = rows.len(), "reconciliation conflict");
            ReconciliationConflict {
                code: code.to_string(),
                language: language.to_string(),
                records: rows.into_iter().cloned().collect(),
            }
        })
        .collect()
}

/// Output of [`merge_files`]: the canonical header plus the reconciliation
#[derive(Debug, Clone)]
pub struct MergedTable {
    /// Header row of the canonical file
    pub header: Vec<String>,
    /// Merge result
    pub reconciliation: Reconciliation,
}

/// Read a canonical file and a supplementary file and merge them
pub fn merge_files<P: AsRef<Path>, Q: AsRef<Path>>(
    canonical: P,
    supplementary: Q,
    options: &MergeOptions,
) -> Result<MergedTable> {
    let canonical = read_canonical(canonical)?;
    let supplementary = read_supplementary(supplementary)?;
    let reconciliation = merge_supplementary(&canonical.records, &supplementary, options)?;

    Ok(MergedTable {
        header: canonical.header,
        reconciliation,
    })
}
