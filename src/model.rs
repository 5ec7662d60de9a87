//! Resonator scattering model and measurement samples.
//!
//! The full model for S11 of a reflection measurement or S21 of a notch
//! measurement is
//!
//! ```text
//! S(f) = a·exp(i(α − 2π·f·τ)) · (1 − 2·Ql / (n·Qc·cos(φ)·exp(−iφ) · (1 + 2i·Ql·(f/fr − 1))))
//! ```
//!
//! where `n` is the port count. Dropping `a`, `α` and `τ` gives the canonical
//! form whose off-resonant point sits at (1, 0).

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::PortType;
use crate::error::{FitError, Result};

/// One point of a frequency sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Frequency in Hz
    pub frequency: f64,
    /// Complex scattering parameter
    pub value: Complex64,
}

impl Sample {
    pub fn new(frequency: f64, value: Complex64) -> Self {
        Self { frequency, value }
    }
}

/// Pair a frequency column with a value column
pub fn samples_from_columns(frequencies: &[f64], values: &[Complex64]) -> Result<Vec<Sample>> {
    if frequencies.len() != values.len() {
        return Err(FitError::LengthMismatch {
            frequencies: frequencies.len(),
            values: values.len(),
        });
    }
    Ok(frequencies
        .iter()
        .zip(values)
        .map(|(&f, &z)| Sample::new(f, z))
        .collect())
}

/// Reject NaN or infinite frequencies and values
pub(crate) fn check_finite(samples: &[Sample]) -> Result<()> {
    match samples
        .iter()
        .position(|s| !s.frequency.is_finite() || !s.value.re.is_finite() || !s.value.im.is_finite())
    {
        Some(i) => Err(FitError::NonFinite(format!("sample {}", i))),
        None => Ok(()),
    }
}

/// Physical resonator parameters plus the environment transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonatorParams {
    /// Resonance frequency in Hz
    pub fr: f64,
    /// Loaded quality factor
    pub ql: f64,
    /// Coupling quality factor with diameter correction, 1/Qc = Re{exp(iφ)/|Qc|}
    pub qc: f64,
    /// Impedance mismatch angle in radians
    pub phi: f64,
    /// Environment amplitude scale
    pub a: f64,
    /// Environment phase offset in radians
    pub alpha: f64,
    /// Cable delay in seconds
    pub delay: f64,
}

impl ResonatorParams {
    /// Parameters of an ideal environment (a = 1, α = 0, τ = 0)
    pub fn canonical(fr: f64, ql: f64, qc: f64, phi: f64) -> Self {
        Self {
            fr,
            ql,
            qc,
            phi,
            a: 1.0,
            alpha: 0.0,
            delay: 0.0,
        }
    }

    /// Evaluate the scattering model at `f`
    pub fn scattering(&self, f: f64, port: PortType) -> Complex64 {
        let complex_qc = self.qc * self.phi.cos() * Complex64::from_polar(1.0, -self.phi);
        let lorentzian = Complex64::new(1.0, 2.0 * self.ql * (f / self.fr - 1.0));
        let environment = Complex64::from_polar(self.a, self.alpha - 2.0 * PI * f * self.delay);
        environment * (1.0 - 2.0 * self.ql / (complex_qc * port.n_ports() * lorentzian))
    }

    /// Evaluate the model over a sweep
    pub fn sweep(&self, frequencies: &[f64], port: PortType) -> Vec<Sample> {
        frequencies
            .iter()
            .map(|&f| Sample::new(f, self.scattering(f, port)))
            .collect()
    }
}

/// Parameters of the phase response of a circle centered on the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseModelParams {
    /// Resonance frequency in Hz
    pub fr: f64,
    /// Loaded quality factor
    pub ql: f64,
    /// Offset phase in radians
    pub theta: f64,
    /// Residual delay in seconds
    pub delay: f64,
}

impl PhaseModelParams {
    pub fn to_array(&self) -> [f64; 4] {
        [self.fr, self.ql, self.theta, self.delay]
    }

    pub fn from_array(p: [f64; 4]) -> Self {
        Self {
            fr: p[0],
            ql: p[1],
            theta: p[2],
            delay: p[3],
        }
    }

    /// Phase of a strongly overcoupled reflection resonator with a linear
    /// background slope
    pub fn phase(&self, f: f64) -> f64 {
        self.theta - 2.0 * PI * self.delay * (f - self.fr)
            + 2.0 * (2.0 * self.ql * (1.0 - f / self.fr)).atan()
    }

    /// Partial derivatives of [`Self::phase`] with respect to
    /// (fr, Ql, theta, delay)
    pub fn phase_gradient(&self, f: f64) -> [f64; 4] {
        let u = 2.0 * self.ql * (1.0 - f / self.fr);
        let lorentz = 1.0 / (1.0 + u * u);
        [
            2.0 * PI * self.delay + 4.0 * self.ql * f / (self.fr * self.fr) * lorentz,
            4.0 * (1.0 - f / self.fr) * lorentz,
            1.0,
            -2.0 * PI * (f - self.fr),
        ]
    }
}

/// Partial derivatives of the canonical model with respect to
/// (fr, Ql, |Qc|, φ), evaluated at `f`
pub fn canonical_partials(
    f: f64,
    fr: f64,
    ql: f64,
    qc_abs: f64,
    phi: f64,
    n_ports: f64,
) -> [Complex64; 4] {
    let i = Complex64::i();
    let rot = Complex64::from_polar(1.0, phi);
    let lorentzian = 1.0 + 2.0 * i * ql * (f / fr - 1.0);
    let shifted = fr + 2.0 * i * ql * (f - fr);
    [
        -4.0 * i * ql * ql * rot * f / (n_ports * qc_abs * shifted * shifted),
        -2.0 * rot / (n_ports * qc_abs * lorentzian * lorentzian),
        2.0 * ql * rot / (n_ports * qc_abs * qc_abs * lorentzian),
        -2.0 * i * ql * rot / (n_ports * qc_abs * lorentzian),
    ]
}

/// Evenly spaced frequency grid including both endpoints
pub fn linspace(start: f64, stop: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (points - 1) as f64;
            (0..points).map(|i| start + step * i as f64).collect()
        }
    }
}
