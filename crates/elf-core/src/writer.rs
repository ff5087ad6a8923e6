//! CSV and JSON serialization of ELF records
//!
//! CSV output always quotes every field and ends lines with `\n`, whatever
//! the platform, matching the dialect of the published snapshots.

use crate::error::{Error, Result};
use crate::record::{Record, FIELDS};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a header row and records to a CSV file
///
/// An empty `header` falls back to the schema's column names. The header
/// may be of any width.
pub fn write_csv<'a, P, I>(path: P, header: &[String], records: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Record>,
{
    let path = path.as_ref();
    let file = File::create(path)?;

    let written = write_csv_to(BufWriter::new(file), header, records).map_err(|e| match e {
        Error::Csv { source, .. } => Error::Csv {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    tracing::info!(path = %path.display(), rows = written, "wrote CSV");
    Ok(written)
}

/// Write a header row and records as CSV to any writer
///
/// Returns the number of data rows written.
pub fn write_csv_to<'a, W, I>(writer: W, header: &[String], records: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    let csv_error = |e: csv::Error| Error::Csv {
        path: "<writer>".into(),
        source: e,
    };

    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    if header.is_empty() {
        csv_writer.write_record(FIELDS).map_err(csv_error)?;
    } else {
        csv_writer.write_record(header).map_err(csv_error)?;
    }

    let mut written = 0;
    for record in records {
        csv_writer.write_record(record.fields()).map_err(csv_error)?;
        written += 1;
    }

    csv_writer.flush()?;
    Ok(written)
}

/// Write records to a pretty-printed JSON array
pub fn write_json<'a, P, I>(path: P, records: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Record>,
{
    let path = path.as_ref();
    let records: Vec<&Record> = records.into_iter().collect();

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writeln!(writer)?;
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = records.len(), "wrote JSON");
    Ok(records.len())
}
