//! Normalized Estimated Error Squared (NEES) and batch evaluation of an estimate trajectory.
//!
//! [`nees`] scores one estimate against one (already aligned) truth sample. [`evaluate`] walks an
//! estimate trajectory, aligns the truth onto each estimate with a [`TrajectoryAligner`] and collects a
//! [`NeesReport`]. A singular estimate covariance fails only its own sample; the batch carries on.
//!
//! Reference: R. Labbe, _Kalman and Bayesian Filters in Python_, chapter 8, "Designing Kalman Filters".

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::alignment::TrajectoryAligner;
use crate::config::EvaluationConfig;
use crate::error::{NeesError, Result};
use crate::linalg::{InversionOptions, try_quadratic_form_inverse};
use crate::state::{STATE_DIMENSION, StateSample, normalize_angles};

/// NEES of an estimate against the truth at the same instant.
///
/// $$
/// \epsilon = (x - \hat{x})^T P^{-1} (x - \hat{x})
/// $$
///
/// The roll, pitch and yaw errors are normalized to $(-\pi, \pi]$ before forming the quadratic form, so
/// that two headings either side of the wrap-around are close rather than $2\pi$ apart.
///
/// # Errors
/// [`NeesError::SingularCovariance`] if the estimate covariance cannot be inverted.
pub fn nees(truth: &StateSample, estimate: &StateSample) -> Result<f64> {
    nees_with_options(truth, estimate, InversionOptions::default())
}

pub fn nees_with_options(
    truth: &StateSample,
    estimate: &StateSample,
    options: InversionOptions,
) -> Result<f64> {
    let mut error = truth.mean() - estimate.mean();
    normalize_angles(&mut error);
    try_quadratic_form_inverse(estimate.covariance(), &error, options).ok_or(
        NeesError::SingularCovariance {
            timestamp: estimate.timestamp(),
        },
    )
}

/// One evaluated estimate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeesSample {
    /// Position of the estimate in the input sequence
    pub index: usize,
    pub timestamp: f64,
    pub nees: f64,
}

/// An estimate that was aligned with the truth but could not be scored
#[derive(Debug)]
pub struct SampleFailure {
    pub index: usize,
    pub timestamp: f64,
    pub error: NeesError,
}

/// Result of evaluating an estimate trajectory against ground truth
#[derive(Debug, Default)]
pub struct NeesReport {
    /// Scored estimates, in estimate order
    pub samples: Vec<NeesSample>,
    /// Aligned estimates whose NEES could not be computed, in estimate order
    pub failures: Vec<SampleFailure>,
    /// Number of estimates with no bracketing truth pair
    pub unmatched: usize,
}

impl NeesReport {
    /// The NEES sequence, one value per scored estimate, in estimate order
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.nees).collect()
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// Average NEES over the scored estimates, `None` if nothing was scored
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(|s| s.nees).sum::<f64>() / self.samples.len() as f64)
    }
    /// Consistency check on the average NEES.
    ///
    /// A consistent estimator has NEES distributed as $\chi^2$ with [`STATE_DIMENSION`] degrees of freedom,
    /// so its mean should not exceed the dimension. An optimistic (overconfident) filter fails this test.
    pub fn is_consistent(&self) -> bool {
        self.mean()
            .is_some_and(|mean| mean <= STATE_DIMENSION as f64)
    }
    /// Write the scored samples to a CSV file with columns `index,timestamp,nees`.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for sample in &self.samples {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Evaluate NEES for every estimate with the default configuration.
///
/// # Arguments
/// * `estimates` - Estimate samples sorted by time.
/// * `truths` - Ground truth samples sorted by time.
///
/// # Returns
/// A [`NeesReport`] whose [`NeesReport::values`] holds one NEES per estimate that could be aligned and
/// scored, in estimate order.
///
/// # Example
///
/// ```
/// use nees::{evaluate, StateCovariance, StateSample, StateVector};
///
/// let truth = |t: f64, v: f64| {
///     StateSample::new(t, StateVector::repeat(v), StateCovariance::identity()).unwrap()
/// };
/// let truths = vec![truth(0.0, 0.0), truth(1.0, 1.0)];
/// let estimates = vec![truth(0.5, 0.5), truth(3.0, 0.0)];
/// let report = evaluate(&estimates, &truths);
/// assert_eq!(report.len(), 1);
/// assert_eq!(report.unmatched, 1);
/// assert!(report.values()[0].abs() < 1e-12);
/// ```
pub fn evaluate(estimates: &[StateSample], truths: &[StateSample]) -> NeesReport {
    evaluate_with_config(estimates, truths, &EvaluationConfig::default())
}

/// Evaluate NEES for every estimate using the tolerances from `config`.
pub fn evaluate_with_config(
    estimates: &[StateSample],
    truths: &[StateSample],
    config: &EvaluationConfig,
) -> NeesReport {
    let aligner = TrajectoryAligner::with_tolerance(truths, config.snap_tolerance);
    let options = config.inversion_options();
    let mut report = NeesReport::default();
    for (index, estimate) in estimates.iter().enumerate() {
        let Some((_, truth)) = aligner.align(estimate.timestamp()) else {
            report.unmatched += 1;
            continue;
        };
        match nees_with_options(&truth, estimate, options) {
            Ok(nees) => report.samples.push(NeesSample {
                index,
                timestamp: estimate.timestamp(),
                nees,
            }),
            Err(error) => {
                warn!("estimate {index} at t={:.6}: {error}", estimate.timestamp());
                report.failures.push(SampleFailure {
                    index,
                    timestamp: estimate.timestamp(),
                    error,
                });
            }
        }
    }
    info!(
        "evaluated {} estimates: {} scored, {} failed, {} without truth",
        estimates.len(),
        report.samples.len(),
        report.failures.len(),
        report.unmatched
    );
    report
}
