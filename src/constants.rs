//! Numeric constants for fit stability
//!
//! Thresholds, iteration caps and physical constants shared by the fitting
//! stages. Tunable values live in [`crate::config`]; these are fixed.

/// Minimum number of points for the algebraic circle fit.
pub const MIN_CIRCLE_POINTS: usize = 4;

/// Number of parameters in the full scattering model used for chi-square
/// (fr, Ql, |Qc|, phi).
pub const MODEL_PARAMETERS: usize = 4;

/// Absolute tolerance on the Lagrange multiplier in the Newton iteration.
/// Matches the conventional secant/Newton default of ~1.48e-8.
pub const NEWTON_TOLERANCE: f64 = 1.48e-8;

/// Iteration cap for the Newton iteration on the characteristic polynomial.
pub const NEWTON_MAX_ITERATIONS: usize = 50;

/// Leading conic coefficient below this (relative to the coefficient vector
/// norm) means the points are collinear and describe a line, not a circle.
pub const DEGENERATE_CONIC_EPSILON: f64 = 1e-12;

/// Predicted phase drifts below this are treated as unmeasurable, even on
/// noiseless data where the residual spread collapses to rounding error.
pub const MIN_MEASURABLE_PHASE_DRIFT: f64 = 1e-8;

/// Reduced Planck constant in J·s.
pub const HBAR: f64 = 1.054_571_817e-34;
