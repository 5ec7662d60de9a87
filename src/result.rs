//! Fit result records.
//!
//! Every stage of the fit returns an immutable record that is threaded into
//! the next stage. [`FitResult`] bundles them for consumers such as the
//! output formatters.

use std::f64::consts::PI;
use std::fmt;

use num_complex::Complex64;
use serde::Serialize;

use crate::config::PortType;
use crate::constants::HBAR;
use crate::model::{ResonatorParams, Sample};

/// Non-fatal condition raised during a fit
///
/// The fit still produces a result; the caller decides whether to trust it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitWarning {
    /// The unwrapped phase spans less than the configured fraction of 2π
    PartialPhaseCoverage { span_rad: f64 },
    /// The delay estimator hit its iteration cap
    DelayNotConverged { iterations: usize, delay: f64 },
    /// The mismatch angle is larger than the assumed background leakage allows
    FanoLeakageExceeded { sin_phi: f64, b: f64 },
    /// |Qc| exceeds Ql
    ///
    /// Raised on the literal `|Qc| > Ql` comparison. For an overcoupled or
    /// strongly undercoupled fit this points to a bad fit or a wrong port
    /// count; Qi itself may still be positive.
    NegativeInternalQ { qc_abs: f64, ql: f64 },
    /// J·Jᵗ could not be inverted, no parameter errors are available
    SingularCovariance,
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitWarning::PartialPhaseCoverage { span_rad } => write!(
                f,
                "data does not cover a full circle (only {:.1} rad), increase the frequency span around the resonance",
                span_rad
            ),
            FitWarning::DelayNotConverged { iterations, delay } => write!(
                f,
                "delay did not converge after {} iterations (last estimate {:.4} ns)",
                iterations,
                delay * 1e9
            ),
            FitWarning::FanoLeakageExceeded { sin_phi, b } => write!(
                f,
                "measurement cannot be explained with assumed Fano leakage (sin(phi) = {:.4} > b = {:.4})",
                sin_phi, b
            ),
            FitWarning::NegativeInternalQ { qc_abs, ql } => write!(
                f,
                "|Qc| = {:.1} exceeds Ql = {:.1}, check the fit quality and the port count",
                qc_abs, ql
            ),
            FitWarning::SingularCovariance => write!(f, "error calculation failed, covariance is singular"),
        }
    }
}

/// Canonical transform mapping raw data onto a circle whose off-resonant
/// point sits at (1, 0)
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationResult {
    /// Circle center in the delay-corrected raw frame
    #[serde(rename = "c")]
    pub center: Complex64,
    /// Circle radius in the raw frame
    pub r0: f64,
    /// Circle radius after scaling by 1/a
    pub r0_norm: f64,
    /// Delay removed from the raw data in seconds
    pub delay: f64,
    /// Delay still present after correction, as seen by the phase fit
    pub delay_remaining: f64,
    pub a: f64,
    pub alpha: f64,
    pub phi: f64,
    pub theta: f64,
    pub fr: f64,
    #[serde(rename = "Ql")]
    pub ql: f64,
    #[serde(rename = "SNR")]
    pub snr: f64,
    /// Standard deviation of the radial residuals
    pub sigma: f64,
}

impl CalibrationResult {
    /// Off-resonant point in the delay-corrected raw frame
    pub fn off_resonant_point(&self) -> Complex64 {
        Complex64::from_polar(self.a, self.alpha)
    }

    /// Remove the cable delay from raw data
    pub fn corrected(&self, samples: &[Sample]) -> Vec<Sample> {
        samples
            .iter()
            .map(|s| {
                Sample::new(
                    s.frequency,
                    s.value * Complex64::from_polar(1.0, 2.0 * PI * self.delay * s.frequency),
                )
            })
            .collect()
    }

    /// Move raw data into canonical position
    ///
    /// The rotation of the circle by φ around the off-resonant point is kept.
    pub fn normalize(&self, samples: &[Sample]) -> Vec<Sample> {
        samples
            .iter()
            .map(|s| {
                let rotation =
                    Complex64::from_polar(1.0, -self.alpha + 2.0 * PI * self.delay * s.frequency);
                Sample::new(s.frequency, s.value / self.a * rotation)
            })
            .collect()
    }
}

/// Quality factors derived from the normalized circle
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QualityFactors {
    /// Coupling Q with diameter correction
    #[serde(rename = "Qc")]
    pub qc: f64,
    #[serde(rename = "Qc_abs")]
    pub qc_abs: f64,
    #[serde(rename = "Qi")]
    pub qi: f64,
    #[serde(rename = "Qi_no_dia_corr")]
    pub qi_no_dia_corr: f64,
    /// Reduced chi-square of the canonical model
    pub chi_square: f64,
}

/// One-sigma parameter errors from the covariance matrix
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParameterErrors {
    pub fr_err: f64,
    #[serde(rename = "Ql_err")]
    pub ql_err: f64,
    #[serde(rename = "Qc_abs_err")]
    pub qc_abs_err: f64,
    pub phi_err: f64,
    #[serde(rename = "Qi_err")]
    pub qi_err: f64,
    #[serde(rename = "Qi_no_dia_corr_err")]
    pub qi_no_dia_corr_err: f64,
}

/// Systematic Q range from Fano interference with a background path
///
/// Bounds are NaN when the assumed leakage cannot explain the measured
/// mismatch angle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FanoRange {
    /// Rescaled background amplitude b/(1 − b)
    #[serde(rename = "fano_b")]
    pub b: f64,
    #[serde(rename = "Qc_min")]
    pub qc_min: f64,
    #[serde(rename = "Qc_max")]
    pub qc_max: f64,
    #[serde(rename = "Qi_min")]
    pub qi_min: f64,
    #[serde(rename = "Qi_max")]
    pub qi_max: f64,
}

impl FanoRange {
    pub fn is_valid(&self) -> bool {
        !(self.qc_min.is_nan() || self.qc_max.is_nan())
    }
}

/// Drive power at the resonator input
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Power(f64);

impl Power {
    pub fn from_watts(watts: f64) -> Self {
        Self(watts)
    }

    pub fn from_dbm(dbm: f64) -> Self {
        Self(10f64.powf(dbm / 10.0) * 1e-3)
    }

    pub fn watts(&self) -> f64 {
        self.0
    }

    pub fn dbm(&self) -> f64 {
        10.0 * (self.0 * 1e3).log10()
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} dBm", self.dbm())
    }
}

/// Complete result of one resonator fit
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    #[serde(flatten)]
    pub calibration: CalibrationResult,
    #[serde(flatten)]
    pub quality: QualityFactors,
    #[serde(flatten)]
    pub errors: Option<ParameterErrors>,
    #[serde(flatten)]
    pub fano: FanoRange,
    pub port: PortType,
    pub n_ports: f64,
    /// Iterations used when the delay was estimated
    pub delay_iterations: Option<usize>,
    pub warnings: Vec<FitWarning>,
}

impl FitResult {
    pub fn fr(&self) -> f64 {
        self.calibration.fr
    }

    pub fn ql(&self) -> f64 {
        self.calibration.ql
    }

    pub fn qc(&self) -> f64 {
        self.quality.qc
    }

    pub fn qi(&self) -> f64 {
        self.quality.qi
    }

    pub fn phi(&self) -> f64 {
        self.calibration.phi
    }

    pub fn delay(&self) -> f64 {
        self.calibration.delay
    }

    /// Fitted model in the raw measurement frame
    pub fn params(&self) -> ResonatorParams {
        ResonatorParams {
            fr: self.calibration.fr,
            ql: self.calibration.ql,
            qc: self.quality.qc,
            phi: self.calibration.phi,
            a: self.calibration.a,
            alpha: self.calibration.alpha,
            delay: self.calibration.delay,
        }
    }

    /// Model value at `f` in the raw frame
    pub fn model(&self, f: f64) -> Complex64 {
        self.params().scattering(f, self.port)
    }

    /// Model value at `f` in canonical position
    pub fn model_normalized(&self, f: f64) -> Complex64 {
        ResonatorParams::canonical(
            self.calibration.fr,
            self.calibration.ql,
            self.quality.qc,
            self.calibration.phi,
        )
        .scattering(f, self.port)
    }

    fn decay_rates(&self, corrected: bool) -> (f64, f64) {
        let fr = self.calibration.fr;
        let (qc, qi) = if corrected {
            (self.quality.qc, self.quality.qi)
        } else {
            (self.quality.qc_abs, self.quality.qi_no_dia_corr)
        };
        (2.0 * PI * fr / qc, 2.0 * PI * fr / qi)
    }

    /// Average photon number in the resonator for a drive power
    ///
    /// `corrected` selects the diameter-corrected Qc and Qi.
    pub fn photons_in_resonator(&self, power: Power, corrected: bool) -> f64 {
        let (k_c, k_i) = self.decay_rates(corrected);
        let fr = self.calibration.fr;
        4.0 * k_c / (2.0 * PI * HBAR * fr * (k_c + k_i).powi(2)) * power.watts()
    }

    /// Drive power that keeps one photon in the resonator on average
    pub fn single_photon_limit(&self, corrected: bool) -> Power {
        Power::from_watts(1.0 / self.photons_in_resonator(Power::from_watts(1.0), corrected))
    }
}
