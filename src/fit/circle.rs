//! Algebraic circle fit (Chernov-Lesort / Taubin style).
//!
//! Each complex sample is a point `(x, y)`. The circle
//! `A·z + B·x + C·y + D = 0` with `z = x² + y²` is fitted by minimizing the
//! algebraic distance under the constraint `B² + C² − 4AD = 1`, which leads to
//! a generalized eigenproblem whose multiplier is the root of a quartic near
//! zero. Cf. S. Probst et al., "Efficient and robust analysis of complex
//! scattering data under noise in microwave resonators", arXiv:1410.3365.

use nalgebra::{Matrix4, Vector4};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEGENERATE_CONIC_EPSILON, MIN_CIRCLE_POINTS, NEWTON_MAX_ITERATIONS, NEWTON_TOLERANCE,
};
use crate::error::{FitError, Result};

/// A circle in the complex plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Complex64,
    pub radius: f64,
}

impl Circle {
    /// Point on the circle at angle `angle` measured from the center
    pub fn point_at(&self, angle: f64) -> Complex64 {
        self.center + Complex64::from_polar(self.radius, angle)
    }
}

/// Fit a circle to complex points
///
/// # Errors
/// * `InsufficientData` with fewer than 4 points
/// * `DegenerateCircle` when all points coincide or lie on a line
/// * `RootNotFound` when the multiplier iteration diverges
pub fn fit_circle(points: &[Complex64]) -> Result<Circle> {
    if points.len() < MIN_CIRCLE_POINTS {
        return Err(FitError::InsufficientData {
            needed: MIN_CIRCLE_POINTS,
            available: points.len(),
        });
    }

    // Normalize to comparable numbers
    let (re_min, re_max, im_min, im_max) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), z| (a.min(z.re), b.max(z.re), c.min(z.im), d.max(z.im)),
    );
    let offset = Complex64::new(0.5 * (re_max + re_min), 0.5 * (im_max + im_min));
    let amp_norm = points
        .iter()
        .map(|z| (z - offset).norm())
        .fold(0.0, f64::max);
    if !(amp_norm > 0.0 && amp_norm.is_finite()) {
        return Err(FitError::DegenerateCircle("points coincide".into()));
    }

    let mut m = moment_matrix(points.iter().map(|z| (z - offset) / amp_norm));
    let eta = constraint_multiplier(&m)?;

    m[(3, 0)] += 2.0 * eta;
    m[(0, 3)] += 2.0 * eta;
    m[(1, 1)] -= eta;
    m[(2, 2)] -= eta;

    let svd = m.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| FitError::DegenerateCircle("singular value decomposition failed".into()))?;
    let smallest = svd.singular_values.imin();
    let coeffs: Vector4<f64> = v_t.row(smallest).transpose();

    let (center, radius) = circle_from_conic(&coeffs)?;
    Ok(Circle {
        center: center * amp_norm + offset,
        radius: radius * amp_norm,
    })
}

/// Power sums of x, y and z = x² + y² arranged as the symmetric matrix of the
/// conic (z, x, y, 1)
fn moment_matrix(points: impl Iterator<Item = Complex64>) -> Matrix4<f64> {
    let mut m = Matrix4::zeros();
    for p in points {
        let v = Vector4::new(p.norm_sqr(), p.re, p.im, 1.0);
        m += v * v.transpose();
    }
    m
}

/// Root of the characteristic quartic det(M − η·B) = 0 nearest zero
fn constraint_multiplier(m: &Matrix4<f64>) -> Result<f64> {
    let m = |r: usize, c: usize| m[(r, c)];

    let a0 = ((m(2, 0) * m(3, 2) - m(2, 2) * m(3, 0)) * m(1, 1)
        - m(1, 2) * m(2, 0) * m(3, 1)
        - m(1, 0) * m(2, 1) * m(3, 2)
        + m(1, 0) * m(2, 2) * m(3, 1)
        + m(1, 2) * m(2, 1) * m(3, 0))
        * m(0, 3)
        + (m(0, 2) * m(2, 3) * m(3, 0) - m(0, 2) * m(2, 0) * m(3, 3)
            + m(0, 0) * m(2, 2) * m(3, 3)
            - m(0, 0) * m(2, 3) * m(3, 2))
            * m(1, 1)
        + (m(0, 1) * m(1, 3) * m(3, 0) - m(0, 1) * m(1, 0) * m(3, 3)
            - m(0, 0) * m(1, 3) * m(3, 1))
            * m(2, 2)
        + (-m(0, 1) * m(1, 2) * m(2, 3) - m(0, 2) * m(1, 3) * m(2, 1)) * m(3, 0)
        + ((m(2, 3) * m(3, 1) - m(2, 1) * m(3, 3)) * m(1, 2) + m(2, 1) * m(3, 2) * m(1, 3))
            * m(0, 0)
        + (m(1, 0) * m(2, 3) * m(3, 2) + m(2, 0) * (m(1, 2) * m(3, 3) - m(1, 3) * m(3, 2)))
            * m(0, 1)
        + ((m(2, 1) * m(3, 3) - m(2, 3) * m(3, 1)) * m(1, 0) + m(1, 3) * m(2, 0) * m(3, 1))
            * m(0, 2);

    let a1 = ((m(3, 0) - 2.0 * m(2, 2)) * m(1, 1) - m(1, 0) * m(3, 1) + m(2, 2) * m(3, 0)
        + 2.0 * m(1, 2) * m(2, 1)
        - m(2, 0) * m(3, 2))
        * m(0, 3)
        + (2.0 * m(2, 0) * m(3, 2) - m(0, 0) * m(3, 3) - 2.0 * m(2, 2) * m(3, 0)
            + 2.0 * m(0, 2) * m(2, 3))
            * m(1, 1)
        + (-m(0, 0) * m(3, 3) + 2.0 * m(0, 1) * m(1, 3) + 2.0 * m(1, 0) * m(3, 1)) * m(2, 2)
        + (-m(0, 1) * m(1, 3) + 2.0 * m(1, 2) * m(2, 1) - m(0, 2) * m(2, 3)) * m(3, 0)
        + (m(1, 3) * m(3, 1) + m(2, 3) * m(3, 2)) * m(0, 0)
        + (m(1, 0) * m(3, 3) - 2.0 * m(1, 2) * m(2, 3)) * m(0, 1)
        + (m(2, 0) * m(3, 3) - 2.0 * m(1, 3) * m(2, 1)) * m(0, 2)
        - 2.0 * m(1, 2) * m(2, 0) * m(3, 1)
        - 2.0 * m(1, 0) * m(2, 1) * m(3, 2);

    let a2 = (2.0 * m(1, 1) - m(3, 0) + 2.0 * m(2, 2)) * m(0, 3)
        + (2.0 * m(3, 0) - 4.0 * m(2, 2)) * m(1, 1)
        - 2.0 * m(2, 0) * m(3, 2)
        + 2.0 * m(2, 2) * m(3, 0)
        + m(0, 0) * m(3, 3)
        + 4.0 * m(1, 2) * m(2, 1)
        - 2.0 * m(0, 1) * m(1, 3)
        - 2.0 * m(1, 0) * m(3, 1)
        - 2.0 * m(0, 2) * m(2, 3);

    let a3 = -2.0 * m(3, 0) + 4.0 * m(1, 1) + 4.0 * m(2, 2) - 2.0 * m(0, 3);
    let a4 = -4.0;

    let poly = |x: f64| a0 + x * (a1 + x * (a2 + x * (a3 + x * a4)));
    let dpoly = |x: f64| a1 + x * (2.0 * a2 + x * (3.0 * a3 + x * 4.0 * a4));

    newton(poly, dpoly, 0.0)
}

/// Newton iteration from `x0`, stopping on an absolute step below
/// [`NEWTON_TOLERANCE`]
fn newton(f: impl Fn(f64) -> f64, df: impl Fn(f64) -> f64, x0: f64) -> Result<f64> {
    let mut x = x0;
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let value = f(x);
        if value == 0.0 {
            return Ok(x);
        }
        let slope = df(x);
        if slope == 0.0 || !slope.is_finite() {
            break;
        }
        let next = x - value / slope;
        if !next.is_finite() {
            break;
        }
        if (next - x).abs() < NEWTON_TOLERANCE {
            return Ok(next);
        }
        x = next;
    }
    Err(FitError::RootNotFound {
        iterations: NEWTON_MAX_ITERATIONS,
    })
}

/// Center and radius of the circle A·z + B·x + C·y + D = 0
fn circle_from_conic(coeffs: &Vector4<f64>) -> Result<(Complex64, f64)> {
    let (a, b, c, d) = (coeffs[0], coeffs[1], coeffs[2], coeffs[3]);
    if a.abs() <= DEGENERATE_CONIC_EPSILON * coeffs.norm() {
        return Err(FitError::DegenerateCircle("points are collinear".into()));
    }
    let center = Complex64::new(-b / (2.0 * a), -c / (2.0 * a));
    // Recompute the radius from the coefficients rather than trusting the
    // constraint, which rounding may have violated
    let radius = (b * b + c * c - 4.0 * a * d).sqrt() / (2.0 * a.abs());
    if !radius.is_finite() || !center.re.is_finite() || !center.im.is_finite() {
        return Err(FitError::DegenerateCircle("non-finite circle parameters".into()));
    }
    Ok((center, radius))
}
