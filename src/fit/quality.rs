//! Quality factors and their statistical errors.

use nalgebra::{Matrix4, Vector4};
use num_complex::Complex64;

use crate::config::PortType;
use crate::constants::MODEL_PARAMETERS;
use crate::error::{FitError, Result};
use crate::model::{ResonatorParams, Sample, canonical_partials};
use crate::result::{CalibrationResult, FitWarning, ParameterErrors, QualityFactors};

/// Quality factors plus optional errors and the warnings raised on the way
#[derive(Debug, Clone)]
pub struct QualityExtraction {
    pub quality: QualityFactors,
    pub errors: Option<ParameterErrors>,
    pub warnings: Vec<FitWarning>,
}

/// Coupling and internal Q from the normalized radius
///
/// `|Qc| = Ql / (n·r0_norm)` and `Qc = |Qc| / cos φ`; Qi follows from
/// `1/Qi = 1/Ql − 1/Qc` with and without the diameter correction.
pub fn quality_factors(ql: f64, r0_norm: f64, phi: f64, n_ports: f64) -> (f64, f64, f64, f64) {
    let qc_abs = ql / (n_ports * r0_norm);
    let qc = qc_abs / phi.cos();
    let qi = 1.0 / (1.0 / ql - 1.0 / qc);
    let qi_no_dia_corr = 1.0 / (1.0 / ql - 1.0 / qc_abs);
    (qc_abs, qc, qi, qi_no_dia_corr)
}

/// Extract the quality factors of a calibrated measurement
///
/// The reduced chi-square is always computed. With `calc_errors` the
/// covariance of (fr, Ql, |Qc|, φ) is estimated from the analytic Jacobian of
/// the canonical model; a singular J·Jᵗ is reported as a warning and leaves
/// the errors empty.
pub fn extract_quality(
    samples: &[Sample],
    calibration: &CalibrationResult,
    port: PortType,
    calc_errors: bool,
) -> Result<QualityExtraction> {
    if samples.len() <= MODEL_PARAMETERS {
        return Err(FitError::InsufficientData {
            needed: MODEL_PARAMETERS + 1,
            available: samples.len(),
        });
    }
    let n_ports = port.n_ports();
    let ql = calibration.ql;
    let phi = calibration.phi;
    let (qc_abs, qc, qi, qi_no_dia_corr) =
        quality_factors(ql, calibration.r0_norm, phi, n_ports);

    let mut warnings = Vec::new();
    if qc_abs > ql {
        let warning = FitWarning::NegativeInternalQ { qc_abs, ql };
        log::warn!("{}", warning);
        warnings.push(warning);
    }

    let model = ResonatorParams::canonical(calibration.fr, ql, qc, phi);
    let residuals: Vec<(f64, Complex64)> = calibration
        .normalize(samples)
        .iter()
        .map(|s| (s.frequency, s.value - model.scattering(s.frequency, port)))
        .collect();
    let chi_square = residuals.iter().map(|(_, r)| r.norm_sqr()).sum::<f64>()
        / (samples.len() - MODEL_PARAMETERS) as f64;

    let quality = QualityFactors {
        qc,
        qc_abs,
        qi,
        qi_no_dia_corr,
        chi_square,
    };
    log::info!(
        "quality factors: Ql {:.2}, Qc {:.2}, |Qc| {:.2}, Qi {:.2}, chi-square {:.3e}",
        ql,
        qc,
        qc_abs,
        qi,
        chi_square
    );

    let errors = if calc_errors {
        match covariance(&residuals, calibration, n_ports, qc_abs, chi_square) {
            Some(cov) => Some(propagate_errors(&cov, ql, qc_abs, qc, phi)),
            None => {
                let warning = FitWarning::SingularCovariance;
                log::warn!("{}", warning);
                warnings.push(warning);
                None
            }
        }
    } else {
        None
    };

    Ok(QualityExtraction {
        quality,
        errors,
        warnings,
    })
}

/// Covariance of (fr, Ql, |Qc|, φ), or `None` when J·Jᵗ is singular
fn covariance(
    residuals: &[(f64, Complex64)],
    calibration: &CalibrationResult,
    n_ports: f64,
    qc_abs: f64,
    chi_square: f64,
) -> Option<Matrix4<f64>> {
    let mut normal = Matrix4::<f64>::zeros();
    for &(f, residual) in residuals {
        let distance = residual.norm();
        if distance == 0.0 {
            continue;
        }
        // Project the model derivatives onto the residual direction
        let direction = (residual / distance).conj();
        let partials = canonical_partials(
            f,
            calibration.fr,
            calibration.ql,
            qc_abs,
            calibration.phi,
            n_ports,
        );
        let row = Vector4::from_iterator(partials.iter().map(|d| (d * direction).re));
        normal += row * row.transpose();
    }

    let inverse = normal.try_inverse()?;
    if inverse.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(inverse * chi_square)
}

/// Standard errors from the covariance diagonal, Qi errors by first-order
/// propagation
fn propagate_errors(cov: &Matrix4<f64>, ql: f64, qc_abs: f64, qc: f64, phi: f64) -> ParameterErrors {
    // Rounding can push a quadratic form of a near-singular covariance below zero
    let c = |i: usize, j: usize| cov[(i, j)];

    let inv_no_corr = 1.0 / ql - 1.0 / qc_abs;
    let d_ql = 1.0 / (inv_no_corr * ql).powi(2);
    let d_qc_abs = -1.0 / (inv_no_corr * qc_abs).powi(2);
    let qi_no_dia_corr_err =
        (d_ql * d_ql * c(1, 1) + d_qc_abs * d_qc_abs * c(2, 2) + 2.0 * d_ql * d_qc_abs * c(1, 2))
            .max(0.0)
            .sqrt();

    let inv = 1.0 / ql - 1.0 / qc;
    let d_ql = 1.0 / (inv * ql).powi(2);
    let d_qc_abs = -phi.cos() / (inv * qc_abs).powi(2);
    let d_phi = -phi.sin() / (inv * inv * qc_abs);
    let qi_err = (d_ql * d_ql * c(1, 1)
        + d_qc_abs * d_qc_abs * c(2, 2)
        + d_phi * d_phi * c(3, 3)
        + 2.0 * (d_ql * d_qc_abs * c(1, 2) + d_ql * d_phi * c(1, 3) + d_qc_abs * d_phi * c(2, 3)))
        .max(0.0)
        .sqrt();

    ParameterErrors {
        fr_err: c(0, 0).sqrt(),
        ql_err: c(1, 1).sqrt(),
        qc_abs_err: c(2, 2).sqrt(),
        phi_err: c(3, 3).sqrt(),
        qi_err,
        qi_no_dia_corr_err,
    }
}
