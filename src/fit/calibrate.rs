use std::f64::consts::PI;

use num_complex::Complex64;

use super::circle::fit_circle;
use super::delay::remove_delay;
use super::phase::{PhaseGuess, fit_phase};
use crate::config::FitConfig;
use crate::error::Result;
use crate::numeric::{periodic_boundary, std_dev};
use crate::result::{CalibrationResult, FitWarning};

/// Find the canonical transform of raw data with a known delay
///
/// Removes the delay, fits the circle, fits the phase of the centered data
/// and locates the off-resonant point at angle θ − π on the circle. A guess
/// from a neighbouring fit (for example the previous power of a sweep) seeds
/// the phase fit.
pub fn calibrate(
    frequencies: &[f64],
    raw: &[Complex64],
    delay: f64,
    guess: Option<PhaseGuess>,
    config: &FitConfig,
) -> Result<(CalibrationResult, Option<FitWarning>)> {
    let corrected = remove_delay(frequencies, raw, delay);
    let circle = fit_circle(&corrected)?;
    log::info!(
        "circle: center ({:.6}, {:.6}), radius {:.6}",
        circle.center.re,
        circle.center.im,
        circle.radius
    );

    let centered: Vec<Complex64> = corrected.iter().map(|z| z - circle.center).collect();
    let phase_fit = fit_phase(frequencies, &centered, guess, &config.phase, &config.solver)?;
    let params = phase_fit.params;

    let theta = periodic_boundary(params.theta);
    let beta = periodic_boundary(theta - PI);
    let off_resonant = circle.point_at(beta);
    let a = off_resonant.norm();
    let alpha = off_resonant.arg();
    let phi = periodic_boundary(beta - alpha);

    let radial: Vec<f64> = centered.iter().map(|z| z.norm() - circle.radius).collect();
    let sigma = std_dev(&radial);
    let snr = circle.radius.abs() / sigma;

    let result = CalibrationResult {
        center: circle.center,
        r0: circle.radius,
        r0_norm: circle.radius / a,
        delay,
        delay_remaining: params.delay,
        a,
        alpha,
        phi,
        theta,
        fr: params.fr,
        ql: params.ql,
        snr,
        sigma,
    };
    log::info!(
        "calibration: fr {:.6e} Hz, Ql {:.2}, a {:.6}, alpha {:.6}, phi {:.6}, SNR {:.1}",
        result.fr,
        result.ql,
        result.a,
        result.alpha,
        result.phi,
        result.snr
    );
    Ok((result, phase_fit.warning))
}
