mod test_sweeps;

use approx::assert_relative_eq;
use circlefit::config::{FanoLeakage, FitConfig};
use circlefit::simulation::{NoiseConfig, ResonatorModel, generate_noisy_sweep};
use circlefit::{CircleFitter, FitWarning};

use test_sweeps::{clean_sweep, sweep_around};

#[test]
fn test_range_brackets_nominal_quality_factors() {
    // r0_norm = Ql / (2·|Qc|) = 0.4
    let phi: f64 = 0.05;
    let model = ResonatorModel {
        qc: 6250.0 / phi.cos(),
        phi,
        ..ResonatorModel::default()
    };
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 401));
    let result = CircleFitter::new(FitConfig::default())
        .unwrap()
        .fit(&samples, None)
        .unwrap();

    assert_relative_eq!(result.calibration.r0_norm, 0.4, max_relative = 1e-4);
    assert_relative_eq!(result.quality.qc_abs, 6250.0, max_relative = 1e-4);

    let fano = &result.fano;
    assert!(fano.is_valid());
    assert_relative_eq!(fano.b, 10f64.powf(-0.75) / (1.0 - 10f64.powf(-0.75)), max_relative = 1e-12);
    assert!(fano.qc_min < result.quality.qc_abs && result.quality.qc_abs < fano.qc_max);
    assert!(fano.qi_min < result.qi() && result.qi() < fano.qi_max);
    assert!(fano.qi_max.is_finite());
}

#[test]
fn test_injected_background_stays_inside_range() {
    let b = 0.05;
    let model = ResonatorModel::default();
    let frequencies = sweep_around(&model, 40.0, 401);

    let mut config = FitConfig::default();
    config.fano = FanoLeakage::Amplitude(b);
    let fitter = CircleFitter::new(config).unwrap();

    for psi in [0.0, 1.0, 2.5, 4.0, 5.5] {
        let noise = NoiseConfig::default().with_background(b, psi);
        let samples = generate_noisy_sweep(&model, &frequencies, &noise).unwrap();
        let result = fitter.fit(&samples, None).unwrap();

        assert!(
            !result
                .warnings
                .iter()
                .any(|w| matches!(w, FitWarning::FanoLeakageExceeded { .. })),
            "psi = {}: {:?}",
            psi,
            result.warnings
        );
        // The background only shifts the circle, the resonance itself is untouched
        assert_relative_eq!(result.ql(), model.ql, max_relative = 1e-4);

        let fano = &result.fano;
        assert!(
            fano.qc_min <= model.qc && model.qc <= fano.qc_max,
            "psi = {}: Qc {} outside {}..{}",
            psi,
            model.qc,
            fano.qc_min,
            fano.qc_max
        );
        assert!(
            fano.qi_min <= model.qi() && model.qi() <= fano.qi_max,
            "psi = {}: Qi {} outside {}..{}",
            psi,
            model.qi(),
            fano.qi_min,
            fano.qi_max
        );
    }
}

#[test]
fn test_large_mismatch_exceeds_assumed_leakage() {
    let model = ResonatorModel {
        phi: 0.5,
        ..ResonatorModel::default()
    };
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 401));

    let mut config = FitConfig::default();
    config.fano = FanoLeakage::IsolationDb(30.0);
    let result = CircleFitter::new(config).unwrap().fit(&samples, None).unwrap();

    assert!(
        result
            .warnings
            .iter()
            .any(|w| matches!(w, FitWarning::FanoLeakageExceeded { .. }))
    );
    assert!(!result.fano.is_valid());
    assert!(result.fano.qc_min.is_nan());
    // The fit itself is unaffected
    assert_relative_eq!(result.phi(), 0.5, epsilon = 1e-4);
}
