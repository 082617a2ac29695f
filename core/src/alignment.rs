//! Time-sorted trajectories and alignment of ground truth onto estimate timestamps.
//!
//! A [`Trajectory`] owns its samples and guarantees they are ordered by non-decreasing timestamp.
//! The [`TrajectoryAligner`] uses a truth trajectory to produce a truth sample at an arbitrary
//! instant by interpolating between the first consecutive pair of truth samples that brackets it.

use log::debug;
use std::ops::Deref;

use crate::error::{NeesError, Result};
use crate::state::{SNAP_TOLERANCE, StateSample};

/// An owned sequence of state samples sorted by non-decreasing timestamp
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    samples: Vec<StateSample>,
}

impl Trajectory {
    /// Wrap a sequence of samples, verifying that time never decreases.
    ///
    /// # Errors
    /// [`NeesError::UnsortedTimestamps`] naming the first sample that is earlier than its predecessor.
    pub fn new(samples: Vec<StateSample>) -> Result<Self> {
        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].timestamp() < pair[0].timestamp() {
                return Err(NeesError::UnsortedTimestamps {
                    index: index + 1,
                    previous: pair[0].timestamp(),
                    current: pair[1].timestamp(),
                });
            }
        }
        Ok(Trajectory { samples })
    }
    /// First and last timestamps, or `None` for an empty trajectory
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.timestamp(), last.timestamp())),
            _ => None,
        }
    }
    /// True if `t` lies within `[first - tolerance, last + tolerance]`.
    ///
    /// With at least two samples this is exactly the set of times the aligner can match.
    pub fn contains_time(&self, t: f64, tolerance: f64) -> bool {
        self.span()
            .is_some_and(|(first, last)| t > first - tolerance && t < last + tolerance)
    }
    pub fn samples(&self) -> &[StateSample] {
        &self.samples
    }
    pub fn into_samples(self) -> Vec<StateSample> {
        self.samples
    }
}

impl Deref for Trajectory {
    type Target = [StateSample];

    fn deref(&self) -> &Self::Target {
        &self.samples
    }
}

impl TryFrom<Vec<StateSample>> for Trajectory {
    type Error = NeesError;

    fn try_from(samples: Vec<StateSample>) -> Result<Self> {
        Trajectory::new(samples)
    }
}

/// Produces ground truth samples at arbitrary times by interpolating a truth sequence
#[derive(Clone, Copy, Debug)]
pub struct TrajectoryAligner<'a> {
    truths: &'a [StateSample],
    tolerance: f64,
}

impl<'a> TrajectoryAligner<'a> {
    pub fn new(truths: &'a [StateSample]) -> Self {
        Self::with_tolerance(truths, SNAP_TOLERANCE)
    }
    pub fn with_tolerance(truths: &'a [StateSample], tolerance: f64) -> Self {
        TrajectoryAligner { truths, tolerance }
    }
    /// Find the truth state at time `s`.
    ///
    /// Consecutive truth pairs are scanned from the beginning of the sequence on every call; the first
    /// pair for which [`StateSample::interpolate_with_tolerance`] succeeds provides the result. No state
    /// is carried between calls, so estimates can be aligned in any order.
    ///
    /// # Returns
    /// * `Some((pair_index, sample))` where `pair_index` is the index of the left truth sample
    /// * `None` if no pair brackets `s` (including when there are fewer than two truth samples)
    pub fn align(&self, s: f64) -> Option<(usize, StateSample)> {
        for (i, pair) in self.truths.windows(2).enumerate() {
            if let Some(truth) =
                StateSample::interpolate_with_tolerance(&pair[0], &pair[1], s, self.tolerance)
            {
                debug!(
                    "t={s:.6}: matched truth pair {i} [{:.6}, {:.6}]",
                    pair[0].timestamp(),
                    pair[1].timestamp()
                );
                return Some((i, truth));
            }
        }
        debug!("t={s:.6}: no bracketing truth pair");
        None
    }
}
