//! Filter consistency toolbox: Normalized Estimated Error Squared (NEES)
//!
//! This crate scores a state estimator against ground truth. Given a time-ordered sequence of ground
//! truth states and a time-ordered sequence of estimated states (each a mean vector with a covariance),
//! it computes the NEES statistic at every estimate timestamp, interpolating the ground truth trajectory
//! so that it lines up in time with each estimate. It does not perform any estimation itself: both
//! trajectories are assumed to be already computed, whether they came from a live system, a log replay,
//! or a file on disk.
//!
//! This crate is primarily built off of the following dependencies:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): Provides the fixed-size vectors, matrices and decompositions.
//! - [`serde`](https://crates.io/crates/serde) and [`csv`](https://crates.io/crates/csv): Provides trajectory and result I/O.
//! - [`log`](https://crates.io/crates/log): Provides structured diagnostics for alignment and per-sample failures.
//!
//! ## Crate overview
//!
//! This crate is organized into several modules:
//! - [state]: The immutable twelve-state sample type and time interpolation between two samples.
//! - [alignment]: Validated trajectories and alignment of ground truth onto estimate timestamps.
//! - [consistency]: The NEES computation and the batch evaluator with its report.
//! - [linalg]: Linear algebra helpers for symmetric covariance checks and guarded inversion.
//! - [messages]: Raw odometry records (pose, twist, covariances) and CSV import/export.
//! - [config]: Evaluation configuration and its JSON/YAML/TOML serialization.
//! - [error]: The error type shared across the crate.
//!
//! ## State definition
//!
//! The state vector is the twelve element pose and twist of a rigid body:
//!
//! $$
//! x = [x, y, z, \phi, \theta, \psi, v_x, v_y, v_z, \omega_x, \omega_y, \omega_z]
//! $$
//!
//! Where:
//! - $x$, $y$, and $z$ are positions (meters).
//! - $\phi$, $\theta$, and $\psi$ are roll, pitch and yaw (radians), always kept within $(-\pi, \pi]$.
//! - $v_x$, $v_y$, and $v_z$ are linear velocities (m/s).
//! - $\omega_x$, $\omega_y$, and $\omega_z$ are angular velocities (rad/s).
//!
//! The covariance is the corresponding $12 \times 12$ matrix. When built from odometry the pose block
//! occupies rows and columns 0 to 5, the twist block rows and columns 6 to 11, and the cross terms are zero.
//!
//! ## NEES
//!
//! For a ground truth state $x$ and an estimate $\hat{x}$ with covariance $P$, the estimation error is
//! $e = x - \hat{x}$ (with angle components wrapped back to $(-\pi, \pi]$) and
//!
//! $$
//! \epsilon = e^T P^{-1} e
//! $$
//!
//! For a consistent filter $\epsilon$ is $\chi^2$ distributed with as many degrees of freedom as there are
//! states, so its mean over a run should not exceed the state dimension.
//!
//! ## Alignment
//!
//! Ground truth is rarely sampled at the same instants as the estimate. For every estimate, consecutive
//! pairs of truth samples are scanned from the start of the truth trajectory; the first pair that brackets
//! (or, within a small tolerance, coincides with) the estimate timestamp is linearly interpolated to that
//! timestamp. Estimates outside the truth trajectory produce no output.
pub mod alignment;
pub mod config;
pub mod consistency;
pub mod error;
pub mod linalg;
pub mod messages;
pub mod state;

pub use alignment::{Trajectory, TrajectoryAligner};
pub use config::{EvaluationConfig, LoggingConfig};
pub use consistency::{NeesReport, NeesSample, SampleFailure, evaluate, evaluate_with_config, nees};
pub use error::{NeesError, Result};
pub use state::{STATE_DIMENSION, StateCovariance, StateSample, StateVector};

use nalgebra::{Quaternion, UnitQuaternion};
use std::f64::consts::PI;

/// Normalize an angle to the range $(-\pi, \pi]$ radians
///
/// The angle is first reduced modulo $2\pi$ into $[0, 2\pi)$ and then shifted down by $2\pi$ if the
/// result exceeds $\pi$. As a consequence both $\pi$ and $-\pi$ map to $\pi$.
///
/// # Arguments
/// * `angle` - The angle in radians.
/// # Returns
/// * The equivalent angle in the range $(-\pi, \pi]$.
/// # Example
/// ```rust
/// use nees::normalize_angle;
/// use std::f64::consts::PI;
/// assert_eq!(normalize_angle(3.0 * PI), PI);
/// assert_eq!(normalize_angle(-PI), PI);
/// assert_eq!(normalize_angle(0.0), 0.0);
/// ```
pub fn normalize_angle(angle: f64) -> f64 {
    let mut wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}
/// Convert a timestamp split into whole seconds and nanoseconds to floating point seconds
///
/// # Example
/// ```rust
/// use nees::seconds;
/// assert_eq!(seconds(12, 500_000_000), 12.5);
/// ```
pub fn seconds(sec: i64, nanosec: u32) -> f64 {
    sec as f64 + nanosec as f64 / 1e9
}
/// Convert a quaternion to roll, pitch and yaw
///
/// The quaternion is given in (w, x, y, z) order and does not need to be unit length; it is normalized
/// before conversion. Angles follow the static XYZ convention, i.e. the rotation matrix is
/// $R = R_z(\psi) R_y(\theta) R_x(\phi)$.
///
/// # Arguments
/// * `w`, `x`, `y`, `z` - Quaternion components.
/// # Returns
/// * `Some((roll, pitch, yaw))` in radians, or `None` if the quaternion has zero (or non-finite) norm.
/// # Example
/// ```rust
/// use nees::quaternion_to_euler;
/// use std::f64::consts::FRAC_PI_2;
/// let (roll, pitch, yaw) = quaternion_to_euler(FRAC_PI_2.cos(), 0.0, 0.0, FRAC_PI_2.sin()).unwrap();
/// assert!(roll.abs() < 1e-12);
/// assert!(pitch.abs() < 1e-12);
/// assert!((yaw.abs() - std::f64::consts::PI).abs() < 1e-12);
/// ```
pub fn quaternion_to_euler(w: f64, x: f64, y: f64, z: f64) -> Option<(f64, f64, f64)> {
    let q = Quaternion::new(w, x, y, z);
    let norm = q.norm();
    if !norm.is_finite() || norm <= f64::EPSILON {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(q).euler_angles())
}
