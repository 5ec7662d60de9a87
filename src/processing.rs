use num_complex::Complex64;

use crate::config::{DelayMode, FitConfig};
use crate::error::Result;
use crate::fit::{PhaseGuess, calibrate, estimate_delay, extract_quality, fano_range};
use crate::model::{Sample, check_finite};
use crate::result::FitResult;

/// Runs the full fit pipeline on one sweep
///
/// Stages run in order: delay (fixed or estimated), calibration, quality
/// factors, Fano range. Each stage only sees the records returned by the
/// previous ones.
pub struct CircleFitter {
    config: FitConfig,
}

impl CircleFitter {
    pub fn new(config: FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Fit one sweep
    ///
    /// `prior` seeds the phase fit with fr, Ql and the remaining delay of a
    /// neighbouring fit, as when stepping through the powers of a power
    /// sweep.
    pub fn fit(&self, samples: &[Sample], prior: Option<&FitResult>) -> Result<FitResult> {
        check_finite(samples)?;
        let frequencies: Vec<f64> = samples.iter().map(|s| s.frequency).collect();
        let raw: Vec<Complex64> = samples.iter().map(|s| s.value).collect();

        let mut warnings = Vec::new();
        let (delay, delay_iterations) = match self.config.delay {
            DelayMode::Fixed(delay) => (delay, None),
            DelayMode::Estimate => {
                let estimate = estimate_delay(&frequencies, &raw, &self.config)?;
                warnings.extend(estimate.warning);
                (estimate.delay, Some(estimate.iterations))
            }
        };

        let guess = prior.map(|p| PhaseGuess {
            fr: p.calibration.fr,
            ql: p.calibration.ql,
            delay: p.calibration.delay_remaining,
        });
        let (calibration, warning) = calibrate(&frequencies, &raw, delay, guess, &self.config)?;
        warnings.extend(warning);

        let port = self.config.port;
        let extraction = extract_quality(samples, &calibration, port, self.config.calc_errors)?;
        warnings.extend(extraction.warnings);

        let (fano, warning) = fano_range(
            calibration.phi,
            calibration.r0_norm,
            calibration.ql,
            port.n_ports(),
            self.config.fano,
        );
        warnings.extend(warning);

        Ok(FitResult {
            calibration,
            quality: extraction.quality,
            errors: extraction.errors,
            fano,
            port,
            n_ports: port.n_ports(),
            delay_iterations,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortType;
    use crate::error::FitError;
    use crate::model::{ResonatorParams, linspace};
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_non_finite_samples() {
        let fitter = CircleFitter::new(FitConfig::default()).unwrap();
        let mut samples = ResonatorParams::canonical(5e9, 5000.0, 10000.0, 0.0)
            .sweep(&linspace(4.9e9, 5.1e9, 50), PortType::Notch);
        samples[10].value = Complex64::new(f64::NAN, 0.0);
        assert!(matches!(fitter.fit(&samples, None), Err(FitError::NonFinite(_))));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = FitConfig::default();
        config.solver.max_iterations = 0;
        assert!(matches!(CircleFitter::new(config), Err(FitError::Config(_))));
    }

    #[test]
    fn test_fit_without_errors_still_reports_chi_square() {
        let mut config = FitConfig::default();
        config.calc_errors = false;
        let fitter = CircleFitter::new(config).unwrap();
        let samples = ResonatorParams::canonical(5e9, 5000.0, 10000.0, 0.0)
            .sweep(&linspace(4.9e9, 5.1e9, 401), PortType::Notch);
        let result = fitter.fit(&samples, None).unwrap();
        assert!(result.errors.is_none());
        assert!(result.quality.chi_square < 1e-20);
        assert_relative_eq!(result.qc(), 10000.0, max_relative = 1e-5);
        assert!(result.delay_iterations.is_none());
    }
}
