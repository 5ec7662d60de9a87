#![allow(dead_code)]

use circlefit::config::PortType;
use circlefit::simulation::{NoiseConfig, ResonatorModel, SweepConfig, generate_noisy_sweep};
use circlefit::{FitConfig, FitResult, Sample};

/// Notch resonator with a tilted and scaled environment
pub fn notch_model() -> ResonatorModel {
    ResonatorModel {
        fr: 5e9,
        ql: 5000.0,
        qc: 10000.0,
        phi: 0.1,
        a: 0.8,
        alpha: 0.3,
        delay: 0.0,
        port: PortType::Notch,
    }
}

/// Sweep of `points` samples covering `linewidths` resonance widths around fr
pub fn sweep_around(model: &ResonatorModel, linewidths: f64, points: usize) -> Vec<f64> {
    SweepConfig::centered(model.fr, linewidths * model.fr / model.ql, points).frequencies()
}

pub fn clean_sweep(model: &ResonatorModel, frequencies: &[f64]) -> Vec<Sample> {
    model.sweep(frequencies)
}

pub fn noisy_sweep(model: &ResonatorModel, frequencies: &[f64], sigma: f64, seed: u64) -> Vec<Sample> {
    let noise = NoiseConfig::default().with_seed(seed).with_additive(sigma);
    generate_noisy_sweep(model, frequencies, &noise).expect("Failed to generate noisy sweep")
}

pub fn config_for(model: &ResonatorModel) -> FitConfig {
    FitConfig {
        port: model.port,
        ..FitConfig::default()
    }
}

pub fn assert_recovers(result: &FitResult, model: &ResonatorModel, tolerance: f64) {
    let rel = |fitted: f64, expected: f64| ((fitted - expected) / expected).abs();
    assert!(
        (result.fr() - model.fr).abs() < tolerance * model.fr / model.ql,
        "fr: expected {}, got {}",
        model.fr,
        result.fr()
    );
    assert!(
        rel(result.ql(), model.ql) < tolerance,
        "Ql: expected {}, got {}",
        model.ql,
        result.ql()
    );
    assert!(
        rel(result.qc(), model.qc) < tolerance,
        "Qc: expected {}, got {}",
        model.qc,
        result.qc()
    );
    assert!(
        rel(result.qi(), model.qi()) < 3.0 * tolerance,
        "Qi: expected {}, got {}",
        model.qi(),
        result.qi()
    );
}
