//! Skewness-minimising split search.
//!
//! Starting from the whole elevation-sorted sequence, the bound walks left
//! while the prefix is right-skewed and right while it is left-skewed. On
//! round `k` the bound moves by `bound >> k`, i.e. the step is taken from the
//! *current* bound rather than from a fixed `[lo, hi]` interval. The walk is
//! therefore data dependent, may oscillate, and is not guaranteed to land on
//! the global minimum of |skewness|. It is a fixed heuristic and is kept
//! exactly as such.
//!
//! The search stops when |skewness| drops to the tolerance or when the next
//! step would be zero.

use log::{debug, info};

use super::statistics::{skewness_up_to, Result, StatsError};

/// One move of the search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStep {
    /// Round number, starting at 1. The step size is `bound >> step_exponent`.
    pub step_exponent: u32,
    /// Distance the bound moved this round.
    pub step: usize,
    /// Bound after the move.
    pub bound_index: usize,
    /// Skewness of `[0, bound_index]` after the move.
    pub skewness: f64,
}

/// Result of a finished search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Final split index into the sorted sequence.
    pub bound_index: usize,
    /// Skewness of the whole sequence.
    pub initial_skewness: f64,
    /// Skewness of `[0, bound_index]`.
    pub final_skewness: f64,
    /// Every move, in order. Empty if the whole sequence was already within
    /// tolerance or too short to move.
    pub steps: Vec<SearchStep>,
}

impl SearchOutcome {
    /// Number of rounds that moved (or tried to move) the bound.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }
}

/// Step size for round `exponent`; zero once the shift exceeds the width.
#[inline]
fn step_size(bound: usize, exponent: u32) -> usize {
    bound.checked_shr(exponent).unwrap_or(0)
}

/// Find the split index whose prefix skewness is closest to zero.
///
/// `values` must be sorted ascending. `tolerance` is the acceptable
/// |skewness|; with a tolerance of 0 the walk runs until the step bottoms out
/// or a prefix is exactly symmetric.
///
/// A rightward move past the end of the sequence is clamped to the last
/// index.
///
/// # Errors
///
/// Propagates [`StatsError`] from the statistics engine, e.g. when the bound
/// lands on a prefix whose values are all identical.
pub fn find_minimal_skewness_index(values: &[f64], tolerance: f64) -> Result<SearchOutcome> {
    if values.is_empty() {
        return Err(StatsError::Empty);
    }

    let last = values.len() - 1;
    let mut bound = last;
    let initial_skewness = skewness_up_to(values, bound)?;
    let mut skewness = initial_skewness;
    let mut steps = Vec::new();

    info!(
        "Initial skewness over {} values: {:.6}",
        values.len(),
        initial_skewness
    );

    let mut exponent: u32 = 1;
    loop {
        let step = step_size(bound, exponent);
        if skewness.abs() <= tolerance || step == 0 {
            break;
        }

        if skewness > 0.0 {
            bound -= step;
        } else if skewness < 0.0 {
            bound = (bound + step).min(last);
        }

        skewness = skewness_up_to(values, bound)?;
        debug!(
            "({:02}) skewness up to index {}: {:.6}",
            exponent, bound, skewness
        );
        steps.push(SearchStep {
            step_exponent: exponent,
            step,
            bound_index: bound,
            skewness,
        });
        exponent += 1;
    }

    info!(
        "Lowest skewness {:.6} found at index {} after {} iterations",
        skewness,
        bound,
        steps.len()
    );

    Ok(SearchOutcome {
        bound_index: bound,
        initial_skewness,
        final_skewness: skewness,
        steps,
    })
}
