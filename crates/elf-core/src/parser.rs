//! CSV readers for the canonical ISO 20275 table and the supplementary file

use crate::error::{Error, Result};
use crate::record::{Record, FIELD_COUNT, NEW_FORM_WIDTH};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Parse one tokenized row into a record
///
/// `line` is only used for error reporting.
pub fn parse_row<S: AsRef<str>>(fields: &[S], line: u64) -> Result<Record> {
    Record::from_exact_fields(fields).ok_or(Error::MalformedRow {
        line,
        expected: FIELD_COUNT,
        found: fields.len(),
    })
}

/// A canonical table as read from disk: its header row and its records in file order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalSource {
    /// Header row, reproduced verbatim by the writer
    pub header: Vec<String>,
    /// Data rows
    pub records: Vec<Record>,
}

/// Read a canonical ISO 20275 CSV file
///
/// Quoting is strict: a quoted field must be closed and followed by a
/// delimiter or line end, otherwise the read fails with
/// [`Error::MalformedQuoting`].
pub fn read_canonical<P: AsRef<Path>>(path: P) -> Result<CanonicalSource> {
    let path = path.as_ref();
    let data = read_file(path)?;

    let source = read_canonical_from(&data, path)?;
    tracing::debug!(
        path = %path.display(),
        records = source.records.len(),
        "read canonical table"
    );
    Ok(source)
}

/// Parse a canonical table from a string (useful for testing)
pub fn parse_canonical_str(content: &str) -> Result<CanonicalSource> {
    read_canonical_from(content.as_bytes(), Path::new("<memory>"))
}

fn read_canonical_from(data: &[u8], path: &Path) -> Result<CanonicalSource> {
    check_quoting(data, path)?;

    let csv_error = |e: csv::Error| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // width is checked per row to report MalformedRow
        .from_reader(data);

    let header: Vec<String> = csv_reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let row = result.map_err(csv_error)?;
        records.push(parse_row(&fields_of(&row), line_of(&row))?);
    }

    Ok(CanonicalSource { header, records })
}

/// A new legal form row, still without a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForm {
    /// Line of the row in its source file
    pub line: u64,
    /// The row's columns, [`NEW_FORM_WIDTH`] of them when read from a file
    pub fields: Vec<String>,
}

/// Rows of the supplementary file, split by kind
#[derive(Debug, Clone, Default)]
pub struct Supplementary {
    /// New legal forms in file order
    pub new_forms: Vec<NewForm>,
    /// Completion rows grouped by ELF code, file order kept within a code
    pub completions: BTreeMap<String, Vec<Record>>,
}

impl Supplementary {
    /// Total number of completion rows
    pub fn completion_count(&self) -> usize {
        self.completions.values().map(Vec::len).sum()
    }
}

/// Read the supplementary legal forms file
pub fn read_supplementary<P: AsRef<Path>>(path: P) -> Result<Supplementary> {
    let path = path.as_ref();
    let data = read_file(path)?;

    let supplementary = read_supplementary_from(&data, path)?;
    tracing::debug!(
        path = %path.display(),
        new_forms = supplementary.new_forms.len(),
        completions = supplementary.completion_count(),
        "read supplementary file"
    );
    Ok(supplementary)
}

/// Parse a supplementary file from a string (useful for testing)
pub fn parse_supplementary_str(content: &str) -> Result<Supplementary> {
    read_supplementary_from(content.as_bytes(), Path::new("<memory>"))
}

fn read_supplementary_from(data: &[u8], path: &Path) -> Result<Supplementary> {
    check_quoting(data, path)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut supplementary = Supplementary::default();
    for result in csv_reader.records() {
        let row = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        let fields = fields_of(&row);

        match fields.len() {
            // Blank and separator lines
            0 | 1 => continue,
            NEW_FORM_WIDTH => supplementary.new_forms.push(NewForm {
                line: line_of(&row),
                fields,
            }),
            FIELD_COUNT => {
                let record = parse_row(&fields, line_of(&row))?;
                supplementary
                    .completions
                    .entry(record.code().to_string())
                    .or_default()
                    .push(record);
            }
            found => {
                return Err(Error::UnsupportedSupplementaryRow {
                    path: PathBuf::from(path),
                    line: line_of(&row),
                    found,
                })
            }
        }
    }

    Ok(supplementary)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reject quoted fields that are left open or followed by anything but a
/// delimiter or line end
///
/// The csv reader would otherwise accept `"254M"x` as `254Mx`.
fn check_quoting(data: &[u8], path: &Path) -> Result<()> {
    let malformed = |line| Error::MalformedQuoting {
        path: path.to_path_buf(),
        line,
    };

    let data = data.strip_prefix(b"\xef\xbb\xbf".as_slice()).unwrap_or(data);
    let mut line = 1;
    let mut field_start = true;
    let mut in_quotes = false;
    let mut opened_at = line;

    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        if in_quotes {
            if byte == b'"' {
                if data.get(i + 1) == Some(&b'"') {
                    // Escaped quote
                    i += 1;
                } else {
                    in_quotes = false;
                    if !matches!(data.get(i + 1), None | Some(b',' | b'\n' | b'\r')) {
                        return Err(malformed(line));
                    }
                }
            }
        } else if byte == b'"' && field_start {
            in_quotes = true;
            opened_at = line;
        }

        if byte == b'\n' {
            line += 1;
        }
        field_start = !in_quotes && matches!(byte, b',' | b'\n' | b'\r');
        i += 1;
    }

    if in_quotes {
        return Err(malformed(opened_at));
    }
    Ok(())
}

fn fields_of(row: &StringRecord) -> Vec<String> {
    row.iter().map(str::to_string).collect()
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}
