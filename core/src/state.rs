//! Twelve-state pose and twist samples.
//!
//! A [`StateSample`] is one output of an estimator (or one ground truth record) at one instant: a
//! timestamp, a mean vector and a covariance matrix. Samples are immutable once built. Interpolation
//! produces a new sample and never touches its inputs.

use nalgebra::{DMatrix, DVector, Matrix6, SMatrix, SVector};
use std::fmt::{self, Display};

use crate::error::{NeesError, Result};
use crate::linalg::is_symmetric;
use crate::normalize_angle;

/// Number of states in a sample
pub const STATE_DIMENSION: usize = 12;
/// Default tolerance (seconds) within which a target time snaps to an interpolation endpoint
pub const SNAP_TOLERANCE: f64 = 0.001;
/// Default absolute tolerance for the covariance symmetry check
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

pub const X: usize = 0;
pub const Y: usize = 1;
pub const Z: usize = 2;
pub const ROLL: usize = 3;
pub const PITCH: usize = 4;
pub const YAW: usize = 5;
pub const VX: usize = 6;
pub const VY: usize = 7;
pub const VZ: usize = 8;
pub const V_ROLL: usize = 9;
pub const V_PITCH: usize = 10;
pub const V_YAW: usize = 11;
/// Indices of the angular components that live on the circle
pub const ANGLE_INDICES: [usize; 3] = [ROLL, PITCH, YAW];

pub type StateVector = SVector<f64, STATE_DIMENSION>;
pub type StateCovariance = SMatrix<f64, STATE_DIMENSION, STATE_DIMENSION>;

/// Wrap the roll, pitch and yaw components of a state-sized vector to $(-\pi, \pi]$ in place
pub fn normalize_angles(vector: &mut StateVector) {
    for i in ANGLE_INDICES {
        vector[i] = normalize_angle(vector[i]);
    }
}

/// Assemble the full covariance from pose (rows/cols 0..6) and twist (rows/cols 6..12) blocks
pub fn block_covariance(pose: &Matrix6<f64>, twist: &Matrix6<f64>) -> StateCovariance {
    let mut covariance = StateCovariance::zeros();
    covariance.fixed_view_mut::<6, 6>(0, 0).copy_from(pose);
    covariance.fixed_view_mut::<6, 6>(6, 6).copy_from(twist);
    covariance
}

/// A timestamped twelve-state mean and covariance
///
/// The state is ordered `[x, y, z, roll, pitch, yaw, vx, vy, vz, v_roll, v_pitch, v_yaw]`. Angles are
/// normalized on construction. Construction validates the sample: the timestamp and every
/// component must be finite, and the covariance must be symmetric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateSample {
    timestamp: f64,
    mean: StateVector,
    covariance: StateCovariance,
}

impl Display for StateSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateSample {{ t: {:.6}, x: [", self.timestamp)?;
        for (i, value) in self.mean.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value:.4}")?;
        }
        write!(f, "] }}")
    }
}

impl StateSample {
    /// Build a sample from a fixed-size mean and covariance.
    ///
    /// # Arguments
    /// * `timestamp` - Time of the sample in seconds.
    /// * `mean` - State mean; roll, pitch and yaw are wrapped to $(-\pi, \pi]$.
    /// * `covariance` - State covariance; must be symmetric to within [`SYMMETRY_TOLERANCE`].
    ///
    /// # Errors
    /// [`NeesError::NonFiniteValue`] or [`NeesError::NonSymmetricCovariance`].
    pub fn new(timestamp: f64, mean: StateVector, covariance: StateCovariance) -> Result<Self> {
        Self::with_symmetry_tolerance(timestamp, mean, covariance, SYMMETRY_TOLERANCE)
    }
    /// Same as [`StateSample::new`] with an explicit symmetry tolerance.
    pub fn with_symmetry_tolerance(
        timestamp: f64,
        mut mean: StateVector,
        covariance: StateCovariance,
        tolerance: f64,
    ) -> Result<Self> {
        if !timestamp.is_finite() {
            return Err(NeesError::NonFiniteValue {
                field: "timestamp",
                timestamp,
            });
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(NeesError::NonFiniteValue {
                field: "mean",
                timestamp,
            });
        }
        if covariance.iter().any(|v| !v.is_finite()) {
            return Err(NeesError::NonFiniteValue {
                field: "covariance",
                timestamp,
            });
        }
        if !is_symmetric(&covariance, tolerance) {
            return Err(NeesError::NonSymmetricCovariance { timestamp });
        }
        normalize_angles(&mut mean);
        Ok(StateSample {
            timestamp,
            mean,
            covariance,
        })
    }
    /// Build a sample from dynamically sized data, checking the dimensions.
    ///
    /// # Errors
    /// [`NeesError::DimensionMismatch`] if the mean is not of length 12 or the covariance is not
    /// 12 by 12, plus anything [`StateSample::new`] rejects.
    pub fn from_dynamic(
        timestamp: f64,
        mean: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Result<Self> {
        if mean.len() != STATE_DIMENSION {
            return Err(NeesError::DimensionMismatch {
                what: "mean",
                expected: (STATE_DIMENSION, 1),
                found: (mean.len(), 1),
            });
        }
        if covariance.shape() != (STATE_DIMENSION, STATE_DIMENSION) {
            return Err(NeesError::DimensionMismatch {
                what: "covariance",
                expected: (STATE_DIMENSION, STATE_DIMENSION),
                found: covariance.shape(),
            });
        }
        Self::new(
            timestamp,
            StateVector::from_column_slice(mean.as_slice()),
            StateCovariance::from_iterator(covariance.iter().copied()),
        )
    }
    /// Build a sample from a mean and block-diagonal pose/twist covariance.
    ///
    /// The pose covariance fills rows and columns 0..6, the twist covariance rows and columns 6..12;
    /// all cross terms are zero.
    pub fn from_blocks(
        timestamp: f64,
        mean: StateVector,
        pose_covariance: &Matrix6<f64>,
        twist_covariance: &Matrix6<f64>,
    ) -> Result<Self> {
        Self::new(
            timestamp,
            mean,
            block_covariance(pose_covariance, twist_covariance),
        )
    }
    /// Time of the sample in seconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }
    pub fn mean(&self) -> &StateVector {
        &self.mean
    }
    pub fn covariance(&self) -> &StateCovariance {
        &self.covariance
    }
    /// Interpolate between two samples at time `s` using the default snap tolerance.
    ///
    /// See [`StateSample::interpolate_with_tolerance`].
    pub fn interpolate(a: &StateSample, b: &StateSample, s: f64) -> Option<StateSample> {
        Self::interpolate_with_tolerance(a, b, s, SNAP_TOLERANCE)
    }
    /// Interpolate between two samples at time `s`.
    ///
    /// If `s` is within `tolerance` of `a` then `a` is returned as is, otherwise if it is within
    /// `tolerance` of `b` then `b` is returned. If `s` lies strictly between the two timestamps, mean
    /// and covariance are blended linearly with weights
    ///
    /// $$
    /// w_a = \frac{t_b - s}{t_b - t_a}, \quad w_b = \frac{s - t_a}{t_b - t_a}
    /// $$
    ///
    /// and the angles of the blended mean are normalized again. The covariance blend is a plain
    /// weighted sum, not a probabilistic fusion of the two distributions.
    ///
    /// # Returns
    /// * `Some(sample)` stamped at `s` (or the snapped endpoint)
    /// * `None` if `s` is not bracketed by the two samples
    pub fn interpolate_with_tolerance(
        a: &StateSample,
        b: &StateSample,
        s: f64,
        tolerance: f64,
    ) -> Option<StateSample> {
        if (a.timestamp - s).abs() < tolerance {
            Some(*a)
        } else if (b.timestamp - s).abs() < tolerance {
            Some(*b)
        } else if a.timestamp < s && s < b.timestamp {
            let span = b.timestamp - a.timestamp;
            let a_weight = (b.timestamp - s) / span;
            let b_weight = (s - a.timestamp) / span;
            let mut mean = a.mean * a_weight + b.mean * b_weight;
            let covariance = a.covariance * a_weight + b.covariance * b_weight;
            normalize_angles(&mut mean);
            Some(StateSample {
                timestamp: s,
                mean,
                covariance,
            })
        } else {
            None
        }
    }
}
