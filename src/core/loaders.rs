//! Sample loader for delimited elevation files.
//!
//! The expected layout is a header line followed by comma-separated data
//! lines. Only two fields matter:
//! - field 0: integer point ID
//! - field 3: elevation
//!
//! Everything else on the line is carried through untouched by the filter
//! pass in [`crate::core::writers`].

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use thiserror::Error;

/// Field holding the point ID.
pub const ID_COLUMN: usize = 0;

/// Field holding the elevation.
pub const ELEVATION_COLUMN: usize = 3;

/// Minimum number of fields a data line must have.
pub const MIN_FIELDS: usize = ELEVATION_COLUMN + 1;

/// Field delimiter.
pub const DELIMITER: u8 = b',';

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("no data rows in {0}")]
    EmptyInput(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// One elevation-tagged point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Row identity from the source file.
    pub id: i64,
    /// Elevation the classification reasons about.
    pub elevation: f64,
}

impl Sample {
    #[inline]
    pub fn new(id: i64, elevation: f64) -> Self {
        Self { id, elevation }
    }
}

/// Samples in source order.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    /// Creates an empty sample set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sample set with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Adds a sample.
    #[inline]
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in the order they were read.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Sorts by elevation, consuming the set.
    pub fn into_sorted(self) -> SortedSamples {
        SortedSamples::from_samples(self.samples)
    }
}

impl From<Vec<Sample>> for SampleSet {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

/// Samples sorted ascending by elevation.
///
/// Ties keep no particular order. The elevations are mirrored into a plain
/// `f64` slice so the statistics code can scan them without touching IDs.
#[derive(Debug, Clone)]
pub struct SortedSamples {
    samples: Vec<Sample>,
    elevations: Vec<f64>,
}

impl SortedSamples {
    /// Sorts the given samples by elevation.
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_unstable_by(|a, b| a.elevation.total_cmp(&b.elevation));
        let elevations = samples.iter().map(|s| s.elevation).collect();
        Self {
            samples,
            elevations,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    /// Returns true if every adjacent pair is in non-decreasing order.
    pub fn is_sorted(&self) -> bool {
        self.elevations.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Parses an ID field. `line` is the 1-based line number used in errors.
pub(crate) fn parse_id(field: &str, line: u64) -> Result<i64> {
    field
        .trim()
        .parse::<i64>()
        .map_err(|_| LoaderError::MalformedRow {
            line,
            reason: format!("invalid id value '{}'", field.trim()),
        })
}

/// Parses an elevation field, rejecting NaN and infinities.
pub(crate) fn parse_elevation(field: &str, line: u64) -> Result<f64> {
    let value = field
        .trim()
        .parse::<f64>()
        .map_err(|_| LoaderError::MalformedRow {
            line,
            reason: format!("invalid elevation value '{}'", field.trim()),
        })?;

    if !value.is_finite() {
        return Err(LoaderError::MalformedRow {
            line,
            reason: format!("elevation '{}' is not finite", field.trim()),
        });
    }

    Ok(value)
}

/// Read samples from any reader.
///
/// The first line is treated as a header and skipped. Empty lines are skipped;
/// a line holding only whitespace is malformed. `\n`, `\r` and `\r\n` all end
/// a line. `source` only names the input in errors.
///
/// # Errors
///
/// Fails on the first malformed data line (too few fields, non-numeric ID or
/// elevation) and when there are no data lines at all.
pub fn read_samples<R: Read>(reader: R, source: &Path) -> Result<SampleSet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .delimiter(DELIMITER)
        .from_reader(reader);

    let mut set = SampleSet::with_capacity(4096);
    let mut seen = HashSet::with_capacity(4096);
    let mut duplicates = 0usize;

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        if record.len() < MIN_FIELDS {
            return Err(LoaderError::MalformedRow {
                line,
                reason: format!(
                    "expected at least {} fields, found {}",
                    MIN_FIELDS,
                    record.len()
                ),
            });
        }

        let id = parse_id(&record[ID_COLUMN], line)?;
        let elevation = parse_elevation(&record[ELEVATION_COLUMN], line)?;

        if !seen.insert(id) {
            duplicates += 1;
        }
        set.push(Sample::new(id, elevation));
    }

    if set.is_empty() {
        return Err(LoaderError::EmptyInput(source.to_path_buf()));
    }
    if duplicates > 0 {
        warn!(
            "{}: {} rows reuse an earlier id; rows sharing an id are kept or removed together",
            source.display(),
            duplicates
        );
    }

    debug!("{}: read {} samples", source.display(), set.len());
    Ok(set)
}

/// Load samples from a delimited file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or any data line is
/// malformed. See [`read_samples`].
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<SampleSet> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_samples(BufReader::new(file), path)
}
