//! Writers for the filtered point file and the object-point report.
//!
//! - [`filter_rows`] re-reads the raw source and copies the header and every
//!   row whose ID was not removed, byte for byte and in source order
//! - [`write_object_points`] lists the removed points as `id,elevation` CSV

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::loaders::{Sample, DELIMITER, ID_COLUMN};
use crate::processors::filtering::RemovedIds;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open the source for the filter pass.
    #[error("failed to open source '{path}': {source}")]
    OpenSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a line from the source.
    #[error("failed to read source line {line}: {source}")]
    ReadRow {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy a line to the sink.
    #[error("failed to write source line {line}: {source}")]
    WriteRow {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// A source line whose ID cannot be read during the filter pass.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Row counts from a filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    /// Data rows copied to the output.
    pub kept: usize,
    /// Data rows dropped because their ID was removed.
    pub removed: usize,
}

impl FilterCounts {
    /// Data rows seen, excluding the header and empty lines.
    #[inline]
    pub fn total(&self) -> usize {
        self.kept + self.removed
    }
}

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Reads the ID field of a data line.
fn row_id(content: &str, line: u64) -> Result<i64> {
    let field = content
        .split(DELIMITER as char)
        .nth(ID_COLUMN)
        .unwrap_or_default()
        .trim();

    field.parse::<i64>().map_err(|_| WriteError::MalformedRow {
        line,
        reason: format!("invalid id value '{}'", field),
    })
}

/// Reads one line into `buf`, terminator included.
///
/// `\n`, `\r` and `\r\n` all end a line, the same terminators the loader's
/// CSV reader accepts. Returns the number of bytes read; 0 at end of input.
fn read_line_any<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    let start = buf.len();
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            break;
        }

        match available.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) => {
                let terminator = available[i];
                buf.extend_from_slice(&available[..=i]);
                reader.consume(i + 1);

                if terminator == b'\r' {
                    let next = reader.fill_buf()?;
                    if next.first() == Some(&b'\n') {
                        buf.push(b'\n');
                        reader.consume(1);
                    }
                }
                break;
            }
            None => {
                let len = available.len();
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
    Ok(buf.len() - start)
}

/// Copy the header and every non-removed data row from `reader` to `writer`.
///
/// Lines are copied verbatim including their terminators, so the output is
/// byte-identical to the matching input lines. Empty lines are dropped, as the
/// loader drops them; a line holding only whitespace is malformed in both
/// passes. The writer is not flushed.
///
/// # Errors
///
/// Returns an error if a line cannot be read or written, is not UTF-8, or
/// has a non-numeric ID.
pub fn filter_rows<R: BufRead, W: Write>(
    mut reader: R,
    writer: &mut W,
    removed: &RemovedIds,
) -> Result<FilterCounts> {
    let mut counts = FilterCounts::default();
    let mut buf = Vec::with_capacity(256);
    let mut line: u64 = 1;

    // Header
    let read = read_line_any(&mut reader, &mut buf)
        .map_err(|e| WriteError::ReadRow { line, source: e })?;
    if read == 0 {
        return Ok(counts);
    }
    writer
        .write_all(&buf)
        .map_err(|e| WriteError::WriteRow { line, source: e })?;

    loop {
        buf.clear();
        line += 1;

        let read = read_line_any(&mut reader, &mut buf)
            .map_err(|e| WriteError::ReadRow { line, source: e })?;
        if read == 0 {
            break;
        }

        let text = std::str::from_utf8(&buf).map_err(|_| WriteError::MalformedRow {
            line,
            reason: "line is not valid UTF-8".to_string(),
        })?;
        let content = text.trim_end_matches(&['\r', '\n'][..]);
        if content.is_empty() {
            continue;
        }

        if removed.contains(row_id(content, line)?) {
            counts.removed += 1;
            continue;
        }

        writer
            .write_all(&buf)
            .map_err(|e| WriteError::WriteRow { line, source: e })?;
        counts.kept += 1;
    }

    Ok(counts)
}

/// Filter the file at `input` into `output`.
///
/// The input is opened fresh, so it is read from the start regardless of any
/// earlier pass. The output is created (or truncated) and its parent
/// directories are created if needed.
///
/// # Errors
///
/// See [`filter_rows`]; additionally fails if either file cannot be opened or
/// the output cannot be flushed.
pub fn write_filtered_csv(input: &Path, output: &Path, removed: &RemovedIds) -> Result<FilterCounts> {
    let source = File::open(input).map_err(|e| WriteError::OpenSource {
        path: input.display().to_string(),
        source: e,
    })?;

    ensure_parent_dirs(output)?;
    let mut writer = create_buffered_writer(output)?;

    let counts = filter_rows(BufReader::new(source), &mut writer, removed)?;

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: output.display().to_string(),
        source: e,
    })?;

    Ok(counts)
}

/// Write object points to CSV.
///
/// Creates a CSV file with headers "id,elevation" and one row per sample,
/// ordered by ID.
///
/// # Errors
///
/// Returns an error if:
/// - Parent directories cannot be created
/// - File cannot be created or written to
pub fn write_object_points(path: &Path, objects: &[Sample]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut csv_writer = csv::Writer::from_writer(create_buffered_writer(path)?);

    let path_str = path.display().to_string();

    csv_writer
        .write_record(["id", "elevation"])
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    let mut ordered = objects.to_vec();
    ordered.sort_unstable_by_key(|s| s.id);

    for sample in &ordered {
        csv_writer
            .write_record(&[sample.id.to_string(), sample.elevation.to_string()])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}
