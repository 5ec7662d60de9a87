use serde::Deserialize;

use crate::config::PortType;
use crate::model::{ResonatorParams, Sample, linspace};

/// Resonator and environment used to synthesize a sweep
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResonatorModel {
    pub fr: f64,
    pub ql: f64,
    /// Diameter-corrected coupling Q
    pub qc: f64,
    pub phi: f64,
    pub a: f64,
    pub alpha: f64,
    pub delay: f64,
    pub port: PortType,
}

impl Default for ResonatorModel {
    fn default() -> Self {
        Self {
            fr: 5e9,
            ql: 5000.0,
            qc: 10000.0,
            phi: 0.0,
            a: 1.0,
            alpha: 0.0,
            delay: 0.0,
            port: PortType::Notch,
        }
    }
}

impl ResonatorModel {
    pub fn params(&self) -> ResonatorParams {
        ResonatorParams {
            fr: self.fr,
            ql: self.ql,
            qc: self.qc,
            phi: self.phi,
            a: self.a,
            alpha: self.alpha,
            delay: self.delay,
        }
    }

    /// Internal Q implied by Ql and the diameter-corrected Qc
    pub fn qi(&self) -> f64 {
        1.0 / (1.0 / self.ql - 1.0 / self.qc)
    }

    /// Noiseless sweep over `frequencies`
    pub fn sweep(&self, frequencies: &[f64]) -> Vec<Sample> {
        self.params().sweep(frequencies, self.port)
    }
}

/// Linear frequency grid
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start: 4.9e9,
            stop: 5.1e9,
            points: 401,
        }
    }
}

impl SweepConfig {
    /// Grid of `points` frequencies centered on `center` spanning `span`
    pub fn centered(center: f64, span: f64, points: usize) -> Self {
        Self {
            start: center - 0.5 * span,
            stop: center + 0.5 * span,
            points,
        }
    }

    pub fn frequencies(&self) -> Vec<f64> {
        linspace(self.start, self.stop, self.points)
    }
}
