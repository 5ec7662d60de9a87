use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use num_complex::Complex64;
use std::f64::consts::PI;

use super::sweep::ResonatorModel;
use crate::error::{FitError, Result};
use crate::model::Sample;

#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub phase: Option<PhaseNoiseConfig>,
    pub background: Option<BackgroundConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_additive(mut self, sigma: f64) -> Self {
        self.additive = Some(AdditiveNoiseConfig { sigma });
        self
    }

    pub fn with_phase_noise(mut self, sigma_rad: f64) -> Self {
        self.phase = Some(PhaseNoiseConfig { sigma_rad });
        self
    }

    pub fn with_background(mut self, amplitude: f64, phase: f64) -> Self {
        self.background = Some(BackgroundConfig { amplitude, phase });
        self
    }
}

/// Complex Gaussian noise, `sigma` per quadrature
#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub sigma: f64,
}

/// Random phase jitter of every sample
#[derive(Clone, Debug, serde::Deserialize)]
pub struct PhaseNoiseConfig {
    pub sigma_rad: f64,
}

/// Constant background path interfering with the resonance (Fano)
///
/// The background sees the same environment (a, α, τ) as the resonator.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct BackgroundConfig {
    /// Amplitude relative to the off-resonant signal
    pub amplitude: f64,
    pub phase: f64,
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

fn normal(sigma: f64) -> Result<Normal<f64>> {
    if !(sigma >= 0.0 && sigma.is_finite()) {
        return Err(FitError::Config(format!(
            "noise sigma must be finite and non-negative, got {}",
            sigma
        )));
    }
    Normal::new(0.0, sigma).map_err(|e| FitError::Config(format!("noise sigma {}: {}", sigma, e)))
}

fn apply_background(samples: &mut [Sample], config: &BackgroundConfig, model: &ResonatorModel) {
    for s in samples.iter_mut() {
        let environment =
            Complex64::from_polar(model.a, model.alpha - 2.0 * PI * s.frequency * model.delay);
        s.value += environment * Complex64::from_polar(config.amplitude, config.phase);
    }
}

fn apply_phase_noise(samples: &mut [Sample], config: &PhaseNoiseConfig, rng: &mut ChaCha8Rng) -> Result<()> {
    let normal = normal(config.sigma_rad)?;
    for s in samples.iter_mut() {
        s.value *= Complex64::from_polar(1.0, normal.sample(rng));
    }
    Ok(())
}

fn apply_additive_noise(
    samples: &mut [Sample],
    config: &AdditiveNoiseConfig,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let normal = normal(config.sigma)?;
    for s in samples.iter_mut() {
        s.value += Complex64::new(normal.sample(rng), normal.sample(rng));
    }
    Ok(())
}

/// Add the configured disturbances to a clean sweep
///
/// The background path needs the environment of `model`.
pub fn apply_noise(clean: &[Sample], config: &NoiseConfig, model: &ResonatorModel) -> Result<Vec<Sample>> {
    let mut samples = clean.to_vec();
    let mut rng = create_rng(config.seed);

    if let Some(ref background) = config.background {
        apply_background(&mut samples, background, model);
    }

    if let Some(ref phase) = config.phase {
        apply_phase_noise(&mut samples, phase, &mut rng)?;
    }

    if let Some(ref additive) = config.additive {
        apply_additive_noise(&mut samples, additive, &mut rng)?;
    }

    Ok(samples)
}

pub fn generate_noisy_sweep(
    model: &ResonatorModel,
    frequencies: &[f64],
    noise: &NoiseConfig,
) -> Result<Vec<Sample>> {
    apply_noise(&model.sweep(frequencies), noise, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::linspace;
    use approx::assert_relative_eq;

    fn clean() -> (ResonatorModel, Vec<Sample>) {
        let model = ResonatorModel::default();
        let samples = model.sweep(&linspace(4.9e9, 5.1e9, 401));
        (model, samples)
    }

    #[test]
    fn test_additive_noise_changes_sweep() {
        let (model, clean) = clean();
        let config = NoiseConfig::default().with_seed(42).with_additive(0.01);
        let noisy = apply_noise(&clean, &config, &model).unwrap();
        assert_eq!(clean.len(), noisy.len());
        assert_ne!(clean, noisy);
        assert_eq!(clean[3].frequency, noisy[3].frequency);
    }

    #[test]
    fn test_seeded_rng_reproducibility() {
        let (model, clean) = clean();
        let config = NoiseConfig::default()
            .with_seed(12345)
            .with_additive(0.02)
            .with_phase_noise(0.01);
        let noisy1 = apply_noise(&clean, &config, &model).unwrap();
        let noisy2 = apply_noise(&clean, &config, &model).unwrap();
        assert_eq!(noisy1, noisy2);
    }

    #[test]
    fn test_additive_noise_level() {
        let (model, clean) = clean();
        let config = NoiseConfig::default().with_seed(7).with_additive(0.05);
        let noisy = apply_noise(&clean, &config, &model).unwrap();
        let variance = clean
            .iter()
            .zip(&noisy)
            .map(|(c, n)| (n.value - c.value).norm_sqr())
            .sum::<f64>()
            / clean.len() as f64;
        // Two quadratures of variance sigma²
        assert_relative_eq!(variance, 2.0 * 0.05 * 0.05, max_relative = 0.2);
    }

    #[test]
    fn test_phase_noise_keeps_magnitude() {
        let (model, clean) = clean();
        let config = NoiseConfig::default().with_seed(3).with_phase_noise(0.1);
        let noisy = apply_noise(&clean, &config, &model).unwrap();
        for (c, n) in clean.iter().zip(&noisy) {
            assert_relative_eq!(c.value.norm(), n.value.norm(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_background_shifts_off_resonant_point() {
        let (model, clean) = clean();
        let config = NoiseConfig::default().with_background(0.05, 0.0);
        let noisy = apply_noise(&clean, &config, &model).unwrap();
        let shift = noisy[0].value - clean[0].value;
        assert_relative_eq!(shift.norm(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_sigma_is_rejected() {
        let (model, clean) = clean();
        let config = NoiseConfig::default().with_additive(-1.0);
        assert!(matches!(apply_noise(&clean, &config, &model), Err(FitError::Config(_))));
        let config = NoiseConfig::default().with_phase_noise(f64::NAN);
        assert!(matches!(apply_noise(&clean, &config, &model), Err(FitError::Config(_))));
        let config = NoiseConfig::default().with_additive(0.0);
        assert_eq!(apply_noise(&clean, &config, &model).unwrap(), clean);
    }

    #[test]
    fn test_builder_pattern() {
        let config = NoiseConfig::default()
            .with_seed(1)
            .with_additive(0.01)
            .with_background(0.02, 1.0);
        assert_eq!(config.seed, Some(1));
        assert!(config.additive.is_some());
        assert!(config.phase.is_none());
        assert!(config.background.is_some());
    }
}
