//! Descriptive statistics over elevation prefixes.
//!
//! Skewness here is Fisher's moment coefficient normalised by the sample
//! standard deviation:
//!
//! ```text
//! mean     = Σv / N
//! std_dev  = sqrt(Σ(v - mean)² / (N - 1))
//! skewness = Σ(v - mean)³ / (N · std_dev³)
//! ```
//!
//! Every call is a fresh three-pass scan. The threshold search only asks for
//! O(log N) prefixes, so running moments are not worth the bookkeeping.

use std::fmt;

use thiserror::Error;

/// Why a statistic could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedReason {
    /// Only one value in range; the sample standard deviation divides by zero.
    SingleSample,
    /// Every value in range is identical; skewness divides by zero.
    ZeroVariance,
    /// An intermediate result overflowed or became NaN.
    NonFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleSample => write!(f, "range holds a single sample"),
            Self::ZeroVariance => write!(f, "all values in range are identical"),
            Self::NonFinite => write!(f, "result is not finite"),
        }
    }
}

/// Errors from the statistics engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("cannot compute statistics over an empty sequence")]
    Empty,

    #[error("index {end} is out of range for a sequence of {len} values")]
    IndexOutOfRange { end: usize, len: usize },

    #[error("statistic undefined over indices 0..={end}: {reason}")]
    UndefinedStatistic { end: usize, reason: UndefinedReason },
}

/// Result type for statistics operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(StatsError::Empty);
    }
    let sum: f64 = values.iter().sum();
    Ok(sum / values.len() as f64)
}

/// Sample standard deviation (denominator `N - 1`).
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    let mu = mean(values)?;
    let end = values.len() - 1;
    if values.len() == 1 {
        return Err(undefined(end, UndefinedReason::SingleSample));
    }
    let sum_sq: f64 = values.iter().map(|&v| (v - mu).powi(2)).sum();
    finite(end, (sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Skewness of `values[0..=end]`.
///
/// # Errors
///
/// - [`StatsError::IndexOutOfRange`] if `end >= values.len()`
/// - [`StatsError::UndefinedStatistic`] if the range holds a single value,
///   holds only identical values, or the result is not finite
pub fn skewness_up_to(values: &[f64], end: usize) -> Result<f64> {
    if values.is_empty() {
        return Err(StatsError::Empty);
    }
    if end >= values.len() {
        return Err(StatsError::IndexOutOfRange {
            end,
            len: values.len(),
        });
    }

    let prefix = &values[..=end];
    if prefix.len() == 1 {
        return Err(undefined(end, UndefinedReason::SingleSample));
    }
    // Checked on the raw values: the rounded mean of identical values can
    // differ from them by an ulp and fake a tiny non-zero variance.
    let first = prefix[0];
    if prefix.iter().all(|&v| v == first) {
        return Err(undefined(end, UndefinedReason::ZeroVariance));
    }

    let n = prefix.len() as f64;
    let mu = mean(prefix)?;
    let std_dev = sample_std_dev(prefix)?;
    if std_dev == 0.0 {
        return Err(undefined(end, UndefinedReason::ZeroVariance));
    }

    let sum_cubed: f64 = prefix.iter().map(|&v| (v - mu).powi(3)).sum();
    finite(end, sum_cubed / (n * std_dev.powi(3)))
}

/// Skewness over a whole slice.
pub fn skewness(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(StatsError::Empty);
    }
    skewness_up_to(values, values.len() - 1)
}

/// Summary moments of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
}

impl Moments {
    /// Computes count, mean, sample standard deviation and skewness.
    pub fn of(values: &[f64]) -> Result<Self> {
        Ok(Self {
            count: values.len(),
            mean: mean(values)?,
            std_dev: sample_std_dev(values)?,
            skewness: skewness(values)?,
        })
    }
}

#[inline]
fn undefined(end: usize, reason: UndefinedReason) -> StatsError {
    StatsError::UndefinedStatistic { end, reason }
}

#[inline]
fn finite(end: usize, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(undefined(end, UndefinedReason::NonFinite))
    }
}
