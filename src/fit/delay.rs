//! Iterative cable delay estimation.
//!
//! A residual delay rotates every sample about the origin. The estimator
//! alternates between removing the current estimate, fitting a circle,
//! centering, and fitting the phase model; the delay seen by the phase fit
//! is converted back to a correction of the raw delay.

use std::f64::consts::PI;

use num_complex::Complex64;

use super::circle::fit_circle;
use super::phase::{PhaseGuess, fit_phase};
use crate::config::{DelayFitConfig, FitConfig};
use crate::constants::MIN_MEASURABLE_PHASE_DRIFT;
use crate::error::{FitError, Result};
use crate::numeric::{linear_slope, periodic_boundary, std_dev, unwrap_phase};
use crate::result::FitWarning;

/// Below this |a·cos φ| relative to the radius the leverage factor is not
/// trusted and the phase-fit correction is applied unscaled
const MIN_LEVERAGE: f64 = 1e-3;

/// Outcome of the delay estimator
#[derive(Debug, Clone, PartialEq)]
pub struct DelayEstimate {
    /// Delay in seconds
    pub delay: f64,
    pub iterations: usize,
    pub warning: Option<FitWarning>,
}

/// Multiply by exp(2πi·f·τ), undoing a cable delay τ
pub fn remove_delay(frequencies: &[f64], values: &[Complex64], delay: f64) -> Vec<Complex64> {
    frequencies
        .iter()
        .zip(values)
        .map(|(&f, &z)| z * Complex64::from_polar(1.0, 2.0 * PI * delay * f))
        .collect()
}

/// First estimate from the background phase slope at both ends of the sweep
///
/// Far from resonance the phase is dominated by −2π·f·τ.
pub fn background_slope_delay(
    frequencies: &[f64],
    values: &[Complex64],
    edge_fraction: f64,
) -> Result<f64> {
    let n = frequencies.len().min(values.len());
    if n < 2 {
        return Err(FitError::InsufficientData {
            needed: 2,
            available: n,
        });
    }
    let edge = ((n as f64 * edge_fraction).ceil() as usize).clamp(2, n);
    let phase = unwrap_phase(&values[..n].iter().map(|z| z.arg()).collect::<Vec<_>>());

    let slopes: Vec<f64> = [0..edge, n - edge..n]
        .into_iter()
        .filter_map(|range| linear_slope(&frequencies[range.clone()], &phase[range]))
        .collect();
    if slopes.is_empty() {
        return Err(FitError::InsufficientData {
            needed: 2,
            available: n,
        });
    }
    let slope = slopes.iter().sum::<f64>() / slopes.len() as f64;
    Ok(-slope / (2.0 * PI))
}

/// Apply a correction to the running estimate without overshooting
///
/// A correction against the estimate's sign halves the estimate when it is
/// larger than the estimate itself, otherwise takes a step in the
/// correction's direction capped at a tenth of the correction seed.
/// Same-sign corrections are applied in tiers: large ones grow the estimate
/// by at most its own size, medium ones by 10 %, small ones in full.
pub fn next_delay(delay: f64, correction: f64, config: &DelayFitConfig) -> f64 {
    if delay == 0.0 {
        return correction;
    }
    if correction * delay < 0.0 {
        if correction.abs() > delay.abs() {
            delay * 0.5
        } else {
            delay + correction.signum() * correction.abs().min(0.1 * config.correction_seed)
        }
    } else if correction.abs() >= config.coarse_threshold {
        delay + correction.signum() * correction.abs().min(delay.abs())
    } else if correction.abs() >= config.fine_threshold {
        delay * 1.1
    } else {
        delay + correction
    }
}

/// Estimate the cable delay of raw data
pub fn estimate_delay(
    frequencies: &[f64],
    raw: &[Complex64],
    config: &FitConfig,
) -> Result<DelayEstimate> {
    let settings = &config.delay_fit;
    let span = frequencies.last().copied().unwrap_or(0.0) - frequencies.first().copied().unwrap_or(0.0);

    let mut delay = background_slope_delay(frequencies, raw, settings.edge_fraction)?;
    log::info!("initial delay estimate from background slope: {:.4} ns", delay * 1e9);

    let mut guess: Option<PhaseGuess> = None;
    for iteration in 1..=settings.max_iterations {
        let corrected = remove_delay(frequencies, raw, delay);
        let circle = fit_circle(&corrected)?;
        let centered: Vec<Complex64> = corrected.iter().map(|z| z - circle.center).collect();

        let fit = fit_phase(frequencies, &centered, guess, &config.phase, &config.solver)?;
        let seen = fit.params.delay;
        guess = Some(PhaseGuess {
            fr: fit.params.fr,
            ql: fit.params.ql,
            delay: settings.correction_seed,
        });

        let drift = 2.0 * PI * span.abs() * seen.abs();
        let noise = std_dev(&fit.residuals(frequencies)).max(MIN_MEASURABLE_PHASE_DRIFT);
        log::info!(
            "delay iteration {}: estimate {:.6} ns, phase fit delay {:.4e} s, drift {:.3e} rad, noise {:.3e} rad",
            iteration,
            delay * 1e9,
            seen,
            drift,
            noise
        );
        if drift <= noise {
            log::info!("delay converged after {} iterations: {:.6} ns", iteration, delay * 1e9);
            return Ok(DelayEstimate {
                delay,
                iterations: iteration,
                warning: None,
            });
        }

        // The phase fit sees the rotation about the circle center; the
        // off-resonant point at distance a moves by a·cos φ per radian of
        // rotation about the origin
        let off_resonant = circle.point_at(fit.params.theta - PI);
        let phi = periodic_boundary((fit.params.theta - PI) - off_resonant.arg());
        let leverage = off_resonant.norm() * phi.cos();
        let correction = if leverage.abs() > MIN_LEVERAGE * circle.radius {
            seen * circle.radius / leverage
        } else {
            seen
        };

        delay = next_delay(delay, correction, settings);
    }

    let warning = FitWarning::DelayNotConverged {
        iterations: settings.max_iterations,
        delay,
    };
    log::warn!("{}", warning);
    Ok(DelayEstimate {
        delay,
        iterations: settings.max_iterations,
        warning: Some(warning),
    })
}
