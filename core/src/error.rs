//! Error types for NEES evaluation

use thiserror::Error;

/// Errors raised while building samples, loading trajectories or computing NEES.
///
/// Alignment misses (an estimate with no bracketing truth pair) are not errors and never show up here.
#[derive(Error, Debug)]
pub enum NeesError {
    #[error("{what} has shape {found:?}, expected {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("covariance at t={timestamp} is not symmetric")]
    NonSymmetricCovariance { timestamp: f64 },

    #[error("non-finite {field} at t={timestamp}")]
    NonFiniteValue { field: &'static str, timestamp: f64 },

    #[error("timestamps decrease at sample {index} ({previous} -> {current})")]
    UnsortedTimestamps {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("orientation quaternion at t={timestamp} has zero or non-finite norm")]
    InvalidQuaternion { timestamp: f64 },

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' has unparseable value '{value}'")]
    InvalidField { column: String, value: String },

    #[error("invalid configuration: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("estimate covariance at t={timestamp} is singular or ill-conditioned")]
    SingularCovariance { timestamp: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, NeesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = NeesError::UnsortedTimestamps {
            index: 3,
            previous: 2.0,
            current: 1.5,
        };
        assert_eq!(err.to_string(), "timestamps decrease at sample 3 (2 -> 1.5)");
        let err = NeesError::SingularCovariance { timestamp: 0.25 };
        assert!(err.to_string().contains("t=0.25"));
    }

    #[test]
    fn config_message_names_field() {
        let err = NeesError::InvalidConfig {
            field: "snap_tolerance",
            value: -1.0,
            reason: "must be finite and non-negative",
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: snap_tolerance = -1 (must be finite and non-negative)"
        );
    }
}
