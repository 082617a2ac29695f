//! Linear algebra helpers for covariance checks and guarded inversion.
//!
//! Public API:
//!     pub fn symmetrize(matrix: &StateCovariance) -> StateCovariance
//!     pub fn is_symmetric(matrix: &StateCovariance, tolerance: f64) -> bool
//!     pub fn reciprocal_condition(matrix: &StateCovariance) -> f64
//!     pub fn try_quadratic_form_inverse(p, e, options) -> Option<f64>
//!
//! Strategy for eᵀ P⁻¹ e:
//! 1) Reject P whose reciprocal condition number is below the floor (singular or nearly so)
//! 2) Cholesky solve on the symmetrized P (fast path for positive definite P)
//! 3) General LU inverse for symmetric but indefinite P

use nalgebra::linalg::{Cholesky, SVD};

use crate::state::{StateCovariance, StateVector};

/// Symmetrize a matrix: P ← 0.5 (P + Pᵀ)
///
/// Simple matrix symmetrization function that reduces round-off errors associated
/// with floating point arithmetic.
///
/// # Arguments
/// * `m` - the matrix to symmetrize
///
/// # Returns
/// A symmetrized version of the input matrix.
#[inline]
pub fn symmetrize(m: &StateCovariance) -> StateCovariance {
    0.5 * (m + m.transpose())
}
/// Check that `|P[i,j] - P[j,i]| <= tolerance` for every off-diagonal pair
pub fn is_symmetric(m: &StateCovariance, tolerance: f64) -> bool {
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (m[(i, j)] - m[(j, i)]).abs() > tolerance {
                return false;
            }
        }
    }
    true
}
/// Reciprocal of the 2-norm condition number, σ_min / σ_max.
///
/// Zero for the zero matrix or any exactly singular matrix; one for a scaled identity.
pub fn reciprocal_condition(m: &StateCovariance) -> f64 {
    let singular_values = SVD::new(*m, false, false).singular_values;
    let max = singular_values.max();
    if max <= 0.0 || !max.is_finite() {
        return 0.0;
    }
    singular_values.min() / max
}

#[derive(Debug, Clone, Copy)]
pub struct InversionOptions {
    pub min_reciprocal_condition: f64, // e.g., 1e-15
}

impl Default for InversionOptions {
    fn default() -> Self {
        Self {
            min_reciprocal_condition: 1e-15,
        }
    }
}
/// Evaluate the quadratic form eᵀ P⁻¹ e without panicking.
///
/// Returns None if P is singular or its reciprocal condition number is below
/// `options.min_reciprocal_condition`.
pub fn try_quadratic_form_inverse(
    p: &StateCovariance,
    e: &StateVector,
    options: InversionOptions,
) -> Option<f64> {
    if reciprocal_condition(p) < options.min_reciprocal_condition {
        return None;
    }
    let p_sym = symmetrize(p);
    // Cholesky (fast path)
    if let Some(ch) = Cholesky::new(p_sym) {
        return Some(e.dot(&ch.solve(e)));
    }
    // Indefinite but invertible
    p_sym.try_inverse().map(|inv| e.dot(&(inv * e)))
}

/* =============================== Tests ==================================== */
