mod test_sweeps;

use approx::assert_relative_eq;
use circlefit::config::{DelayMode, FitConfig, PortType};
use circlefit::simulation::{ResonatorModel, SweepConfig};
use circlefit::{CircleFitter, FitError, FitWarning, samples_from_columns};

use test_sweeps::{assert_recovers, clean_sweep, config_for, notch_model, sweep_around};

#[test]
fn test_recovers_canonical_notch() {
    let model = ResonatorModel::default();
    let samples = clean_sweep(&model, &SweepConfig::default().frequencies());

    let fitter = CircleFitter::new(FitConfig::default()).unwrap();
    let result = fitter.fit(&samples, None).unwrap();

    assert!((result.fr() - 5e9).abs() < 1e3, "fr = {}", result.fr());
    assert_relative_eq!(result.ql(), 5000.0, epsilon = 1.0);
    assert_relative_eq!(result.qc(), 10000.0, epsilon = 5.0);
    assert_relative_eq!(result.quality.qc_abs, 10000.0, epsilon = 5.0);
    assert_relative_eq!(result.qi(), 10000.0, epsilon = 10.0);
    assert!(result.phi().abs() < 1e-4, "phi = {}", result.phi());
    assert_relative_eq!(result.calibration.a, 1.0, epsilon = 1e-6);
    assert_relative_eq!(result.calibration.r0_norm, 0.25, epsilon = 1e-6);
    // |Qc| = 2·Ql trips only the |Qc| > Ql check
    assert_eq!(
        result.warnings,
        vec![FitWarning::NegativeInternalQ {
            qc_abs: result.quality.qc_abs,
            ql: result.ql()
        }]
    );
}

#[test]
fn test_recovers_tilted_environment() {
    let model = notch_model();
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 401));

    let result = CircleFitter::new(config_for(&model))
        .unwrap()
        .fit(&samples, None)
        .unwrap();

    assert_recovers(&result, &model, 1e-4);
    assert_relative_eq!(result.phi(), 0.1, epsilon = 1e-4);
    assert_relative_eq!(result.calibration.a, 0.8, epsilon = 1e-5);
    assert_relative_eq!(result.calibration.alpha, 0.3, epsilon = 1e-4);
}

#[test]
fn test_recovers_reflection_resonator() {
    let model = ResonatorModel {
        qc: 6000.0,
        port: PortType::Reflection,
        ..ResonatorModel::default()
    };
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 401));

    let result = CircleFitter::new(config_for(&model))
        .unwrap()
        .fit(&samples, None)
        .unwrap();

    assert_eq!(result.port, PortType::Reflection);
    assert_relative_eq!(result.n_ports, 1.0);
    assert_recovers(&result, &model, 1e-4);
}

#[test]
fn test_recovers_falling_sweep() {
    let model = ResonatorModel::default();
    let mut samples = clean_sweep(&model, &SweepConfig::default().frequencies());
    samples.reverse();

    let result = CircleFitter::new(FitConfig::default())
        .unwrap()
        .fit(&samples, None)
        .unwrap();

    assert!((result.fr() - 5e9).abs() < 1e3, "fr = {}", result.fr());
    assert_relative_eq!(result.ql(), 5000.0, max_relative = 1e-4);
    assert_relative_eq!(result.qc(), 10000.0, max_relative = 1e-4);
    assert_relative_eq!(result.qi(), 10000.0, max_relative = 1e-3);
}

#[test]
fn test_fixed_delay_is_removed() {
    let model = ResonatorModel {
        delay: 30e-9,
        ..notch_model()
    };
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 801));

    let mut config = config_for(&model);
    config.delay = DelayMode::Fixed(30e-9);
    let result = CircleFitter::new(config).unwrap().fit(&samples, None).unwrap();

    assert_relative_eq!(result.delay(), 30e-9);
    assert!(result.delay_iterations.is_none());
    assert_recovers(&result, &model, 1e-4);
}

#[test]
fn test_warm_start_from_prior_fit() {
    let first = notch_model();
    let frequencies = sweep_around(&first, 40.0, 401);
    let fitter = CircleFitter::new(config_for(&first)).unwrap();
    let prior = fitter.fit(&clean_sweep(&first, &frequencies), None).unwrap();

    // Next power step: slightly shifted and more lossy
    let second = ResonatorModel {
        fr: first.fr + 2e4,
        ql: 4500.0,
        ..first.clone()
    };
    let result = fitter
        .fit(&clean_sweep(&second, &frequencies), Some(&prior))
        .unwrap();

    assert_recovers(&result, &second, 1e-4);
}

#[test]
fn test_fitted_model_reproduces_data() {
    let model = notch_model();
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 201));
    let result = CircleFitter::new(config_for(&model))
        .unwrap()
        .fit(&samples, None)
        .unwrap();

    for s in &samples {
        let residual = (result.model(s.frequency) - s.value).norm();
        assert!(residual < 1e-4, "residual {} at {} Hz", residual, s.frequency);
    }

    // Canonical data lies on a circle through (1, 0)
    let normalized = result.calibration.normalize(&samples);
    assert_relative_eq!(normalized[0].value.re, 1.0, epsilon = 5e-3);
}

#[test]
fn test_canonical_model_matches_normalized_data() {
    let model = ResonatorModel {
        delay: 20e-9,
        ..notch_model()
    };
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 201));
    let mut config = config_for(&model);
    config.delay = DelayMode::Fixed(20e-9);
    let result = CircleFitter::new(config).unwrap().fit(&samples, None).unwrap();

    for s in result.calibration.normalize(&samples) {
        let residual = (result.model_normalized(s.frequency) - s.value).norm();
        assert!(residual < 1e-6, "residual {} at {} Hz", residual, s.frequency);
    }
}

#[test]
fn test_parameter_errors_are_reported() {
    let model = notch_model();
    let samples = clean_sweep(&model, &sweep_around(&model, 40.0, 401));
    let result = CircleFitter::new(config_for(&model))
        .unwrap()
        .fit(&samples, None)
        .unwrap();

    let errors = result.errors.expect("errors requested by default");
    for value in [
        errors.fr_err,
        errors.ql_err,
        errors.qc_abs_err,
        errors.phi_err,
        errors.qi_err,
        errors.qi_no_dia_corr_err,
    ] {
        assert!(value.is_finite() && value >= 0.0, "error = {}", value);
    }
    assert!(errors.ql_err < 1.0);
}

#[test]
fn test_mismatched_columns_are_rejected() {
    let frequencies = [4.9e9, 5.0e9, 5.1e9];
    let values = [num_complex::Complex64::new(1.0, 0.0); 2];
    assert!(matches!(
        samples_from_columns(&frequencies, &values),
        Err(FitError::LengthMismatch {
            frequencies: 3,
            values: 2
        })
    ));
}

#[test]
fn test_too_few_points_fail() {
    let model = ResonatorModel::default();
    let samples = clean_sweep(&model, &[4.99e9, 5.0e9, 5.01e9]);
    let fitter = CircleFitter::new(FitConfig::default()).unwrap();
    assert!(matches!(
        fitter.fit(&samples, None),
        Err(FitError::InsufficientData { .. })
    ));
}
