//! Configuration for the resonator circle fit.
//!
//! ## Port configuration
//!
//! The scattering model differs between a one-port reflection measurement and
//! a two-port notch (hanger) measurement only in the number of ports that
//! load the resonator. Select it with `FitConfig::port`:
//!
//! ```ignore
//! port: PortType::Notch,       // S21 of a hanger resonator, n_ports = 2
//! port: PortType::Reflection,  // S11 of a single-port resonator, n_ports = 1
//! ```
//!
//! ## TOML
//!
//! Every field has a default, so a config file only needs the overrides:
//!
//! ```toml
//! port = "notch"
//! delay = { fixed = 5.0e-8 }
//! fano = { isolation_db = 20.0 }
//!
//! [solver]
//! max_iterations = 400
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Measurement geometry of the resonator
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    /// Single-port resonator probed in reflection (S11)
    Reflection,
    /// Two-port resonator side-coupled to a feedline, probed in transmission (S21)
    #[default]
    Notch,
}

impl PortType {
    /// Number of ports loading the resonator
    pub fn n_ports(&self) -> f64 {
        match self {
            PortType::Reflection => 1.0,
            PortType::Notch => 2.0,
        }
    }
}

/// Cable delay handling
///
/// Whether the delay is estimated from the data is always an explicit choice.
///
/// # Parsing formats
/// - `auto` or `estimate` - estimate the delay iteratively
/// - `50e-9` - fixed delay in seconds (no suffix)
/// - `50ns`, `0.05us`, `50000ps` - fixed delay with unit suffix
///
/// # Example
/// ```
/// use circlefit::config::DelayMode;
///
/// let mode: DelayMode = "5e-8".parse().unwrap();
/// assert_eq!(mode, DelayMode::Fixed(5e-8));
/// assert_eq!("auto".parse::<DelayMode>().unwrap(), DelayMode::Estimate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayMode {
    /// Remove a known delay in seconds
    Fixed(f64),
    /// Estimate the delay by alternating circle and phase fits
    Estimate,
}

impl Default for DelayMode {
    fn default() -> Self {
        Self::Fixed(0.0)
    }
}

impl fmt::Display for DelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayMode::Fixed(seconds) => write!(f, "{:.4}ns", seconds * 1e9),
            DelayMode::Estimate => write!(f, "estimate"),
        }
    }
}

impl FromStr for DelayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("auto") || s.eq_ignore_ascii_case("estimate") {
            return Ok(Self::Estimate);
        }

        // Longest suffixes first so "ns" is not read as "s"
        const UNITS: [(&str, f64); 6] = [
            ("ns", 1e-9),
            ("ps", 1e-12),
            ("us", 1e-6),
            ("μs", 1e-6),
            ("ms", 1e-3),
            ("s", 1.0),
        ];

        let (num, scale) = UNITS
            .iter()
            .find_map(|&(suffix, scale)| s.strip_suffix(suffix).map(|n| (n, scale)))
            .unwrap_or((s, 1.0));

        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid delay: {}", s))?;
        if !value.is_finite() {
            return Err("delay must be finite".to_string());
        }
        Ok(Self::Fixed(value * scale))
    }
}

/// Assumed strength of the background path for the Fano uncertainty range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoLeakage {
    /// Suppression of the background path in dB
    IsolationDb(f64),
    /// Relative background amplitude b (linear)
    Amplitude(f64),
}

impl FanoLeakage {
    /// Linear background amplitude before the b/(1-b) rescaling
    pub fn amplitude(&self) -> f64 {
        match *self {
            FanoLeakage::IsolationDb(db) => 10f64.powf(-db / 20.0),
            FanoLeakage::Amplitude(b) => b,
        }
    }
}

impl Default for FanoLeakage {
    fn default() -> Self {
        Self::IsolationDb(15.0)
    }
}

/// Top-level fit configuration
///
/// Use `FitConfig::default()` for a notch resonator with no cable delay.
///
/// # Example
/// ```
/// use circlefit::config::{DelayMode, FitConfig, PortType};
///
/// let mut config = FitConfig::default();
/// config.port = PortType::Reflection;
/// config.delay = DelayMode::Estimate;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Measurement geometry
    pub port: PortType,
    /// Cable delay handling
    pub delay: DelayMode,
    /// Background path assumption for the Fano range
    pub fano: FanoLeakage,
    /// Compute parameter standard errors from the covariance matrix
    pub calc_errors: bool,
    /// Phase model fit settings
    pub phase: PhaseFitConfig,
    /// Delay estimator settings (only used with `DelayMode::Estimate`)
    pub delay_fit: DelayFitConfig,
    /// Least-squares solver settings shared by all phase fit stages
    pub solver: SolverConfig,
}

/// Phase model fit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseFitConfig {
    /// Gaussian kernel width in samples used to smooth the phase before
    /// locating the resonance from its steepest slope
    pub smoothing_sigma: f64,
    /// Samples averaged at each end of the sweep for the offset phase guess
    pub edge_samples: usize,
    /// Fraction of a full 2π roll-off below which the data is flagged as
    /// not covering the circle
    pub min_coverage: f64,
}

/// Delay estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayFitConfig {
    /// Iteration cap for the alternating circle/phase refinement
    pub max_iterations: usize,
    /// Delay seed for each correction fit in seconds
    pub correction_seed: f64,
    /// Corrections at least this large (s) grow the estimate by at most itself
    pub coarse_threshold: f64,
    /// Corrections at least this large (s) grow the estimate by 10 %
    pub fine_threshold: f64,
    /// Fraction of samples at each end of the sweep used for the background
    /// phase slope that seeds the estimate
    pub edge_fraction: f64,
}

/// Bounded Levenberg-Marquardt solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of accepted or rejected steps
    pub max_iterations: usize,
    /// Relative cost reduction tolerance
    pub ftol: f64,
    /// Relative step size tolerance
    pub xtol: f64,
    /// Scaled gradient tolerance
    pub gtol: f64,
    /// Initial damping factor
    pub initial_damping: f64,
}

impl FitConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| FitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FitError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if let DelayMode::Fixed(delay) = self.delay
            && !delay.is_finite()
        {
            return Err(FitError::Config("fixed delay must be finite".into()));
        }
        match self.fano {
            FanoLeakage::IsolationDb(db) if !db.is_finite() => {
                return Err(FitError::Config("isolation must be finite".into()));
            }
            FanoLeakage::Amplitude(b) if !(0.0..1.0).contains(&b) => {
                return Err(FitError::Config(
                    "background amplitude must be in [0, 1)".into(),
                ));
            }
            _ => {}
        }
        if self.phase.smoothing_sigma <= 0.0 {
            return Err(FitError::Config("smoothing_sigma must be positive".into()));
        }
        if self.phase.edge_samples == 0 {
            return Err(FitError::Config("edge_samples must be at least 1".into()));
        }
        if !(self.phase.min_coverage > 0.0 && self.phase.min_coverage <= 1.0) {
            return Err(FitError::Config("min_coverage must be in (0, 1]".into()));
        }
        if self.delay_fit.max_iterations == 0 {
            return Err(FitError::Config(
                "delay_fit.max_iterations must be at least 1".into(),
            ));
        }
        if !(self.delay_fit.edge_fraction > 0.0 && self.delay_fit.edge_fraction <= 0.5) {
            return Err(FitError::Config("edge_fraction must be in (0, 0.5]".into()));
        }
        if self.solver.max_iterations == 0 {
            return Err(FitError::Config(
                "solver.max_iterations must be at least 1".into(),
            ));
        }
        if self.solver.ftol <= 0.0 || self.solver.xtol <= 0.0 || self.solver.gtol <= 0.0 {
            return Err(FitError::Config("solver tolerances must be positive".into()));
        }
        if self.solver.initial_damping <= 0.0 {
            return Err(FitError::Config("initial_damping must be positive".into()));
        }
        Ok(())
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            port: PortType::default(),
            delay: DelayMode::default(),
            fano: FanoLeakage::default(),
            calc_errors: true,
            phase: PhaseFitConfig::default(),
            delay_fit: DelayFitConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl Default for PhaseFitConfig {
    fn default() -> Self {
        Self {
            smoothing_sigma: 30.0,
            edge_samples: 5,
            min_coverage: 0.8,
        }
    }
}

impl Default for DelayFitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            correction_seed: 5e-11,
            coarse_threshold: 1e-8,
            fine_threshold: 1e-9,
            edge_fraction: 0.1,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            ftol: 1e-14,
            xtol: 1e-13,
            gtol: 1e-14,
            initial_damping: 1e-3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_mode_plain_seconds() {
        let mode: DelayMode = "5e-8".parse().unwrap();
        assert_eq!(mode, DelayMode::Fixed(5e-8));
    }

    #[test]
    fn test_delay_mode_with_units() {
        let DelayMode::Fixed(ns) = "50ns".parse::<DelayMode>().unwrap() else {
            panic!("expected fixed delay");
        };
        assert!((ns - 50e-9).abs() < 1e-20);

        let DelayMode::Fixed(us) = "0.05us".parse::<DelayMode>().unwrap() else {
            panic!("expected fixed delay");
        };
        assert!((us - 50e-9).abs() < 1e-20);

        let DelayMode::Fixed(ps) = "-120ps".parse::<DelayMode>().unwrap() else {
            panic!("expected fixed delay");
        };
        assert!((ps + 120e-12).abs() < 1e-24);
    }

    #[test]
    fn test_delay_mode_estimate() {
        assert_eq!("auto".parse::<DelayMode>().unwrap(), DelayMode::Estimate);
        assert_eq!("Estimate".parse::<DelayMode>().unwrap(), DelayMode::Estimate);
    }

    #[test]
    fn test_delay_mode_invalid() {
        assert!("abc".parse::<DelayMode>().is_err());
        assert!("ns".parse::<DelayMode>().is_err());
        assert!("infns".parse::<DelayMode>().is_err());
    }

    #[test]
    fn test_port_counts() {
        assert_eq!(PortType::Reflection.n_ports(), 1.0);
        assert_eq!(PortType::Notch.n_ports(), 2.0);
    }

    #[test]
    fn test_isolation_amplitude() {
        let b = FanoLeakage::IsolationDb(20.0).amplitude();
        assert!((b - 0.1).abs() < 1e-12);
        assert_eq!(FanoLeakage::Amplitude(0.3).amplitude(), 0.3);
    }

    #[test]
    fn test_toml_overrides() {
        let config = FitConfig::from_toml_str(
            r#"
            port = "reflection"
            delay = { fixed = 5.0e-8 }
            fano = { isolation_db = 20.0 }

            [solver]
            max_iterations = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.port, PortType::Reflection);
        assert_eq!(config.delay, DelayMode::Fixed(5.0e-8));
        assert_eq!(config.fano, FanoLeakage::IsolationDb(20.0));
        assert_eq!(config.solver.max_iterations, 42);
        assert_eq!(config.phase.edge_samples, 5);
    }

    #[test]
    fn test_toml_estimate_delay() {
        let config = FitConfig::from_toml_str(r#"delay = "estimate""#).unwrap();
        assert_eq!(config.delay, DelayMode::Estimate);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = FitConfig::default();
        config.phase.min_coverage = 1.5;
        assert!(config.validate().is_err());

        let mut config = FitConfig::default();
        config.fano = FanoLeakage::Amplitude(1.0);
        assert!(config.validate().is_err());

        assert!(FitConfig::from_toml_str("port = \"bogus\"").is_err());
    }
}
