//! Staged fit of the phase response of a centered circle.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use super::lsq::{Bounds, LeastSquaresProblem, solve_bounded};
use crate::config::{PhaseFitConfig, SolverConfig};
use crate::constants::MIN_CIRCLE_POINTS;
use crate::error::{FitError, Result};
use crate::model::PhaseModelParams;
use crate::numeric::{argmax_abs, gaussian_filter, gradient, mean, periodic_boundary, unwrap_phase};
use crate::result::FitWarning;

const FR: usize = 0;
const QL: usize = 1;
const THETA: usize = 2;
const DELAY: usize = 3;

/// Parameter subsets fitted in sequence, each stage seeded by the previous one
const STAGES: [&[usize]; 5] = [&[QL], &[FR, THETA], &[DELAY], &[FR, QL], &[FR, QL, THETA, DELAY]];

/// Smallest loaded Q the solver may visit
const MIN_QL: f64 = 1e-6;

/// Starting point for the phase fit supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseGuess {
    pub fr: f64,
    pub ql: f64,
    pub delay: f64,
}

/// Outcome of a phase model fit
#[derive(Debug, Clone)]
pub struct PhaseFit {
    pub params: PhaseModelParams,
    /// Unwrapped measured phase
    pub phase: Vec<f64>,
    /// Roll-off assumed for the delay guess (2π unless coverage is partial)
    pub roll_off: f64,
    pub warning: Option<FitWarning>,
}

impl PhaseFit {
    /// Measured minus fitted phase, wrapped to [-π, π)
    pub fn residuals(&self, frequencies: &[f64]) -> Vec<f64> {
        frequencies
            .iter()
            .zip(&self.phase)
            .map(|(&f, &p)| periodic_boundary(p - self.params.phase(f)))
            .collect()
    }
}

/// Wrapped phase residuals with a subset of the parameters free
struct StageProblem<'a> {
    frequencies: &'a [f64],
    phase: &'a [f64],
    base: [f64; 4],
    free: &'a [usize],
}

impl StageProblem<'_> {
    fn full(&self, params: &[f64]) -> PhaseModelParams {
        let mut all = self.base;
        for (&k, &p) in self.free.iter().zip(params) {
            all[k] = p;
        }
        PhaseModelParams::from_array(all)
    }
}

impl LeastSquaresProblem for StageProblem<'_> {
    // |periodic(Δ)| equals the circular distance π − |π − |Δ||, the signed
    // form keeps the objective differentiable
    fn residuals(&self, params: &[f64]) -> DVector<f64> {
        let model = self.full(params);
        DVector::from_iterator(
            self.frequencies.len(),
            self.frequencies
                .iter()
                .zip(self.phase)
                .map(|(&f, &p)| periodic_boundary(p - model.phase(f))),
        )
    }

    fn jacobian(&self, params: &[f64]) -> DMatrix<f64> {
        let model = self.full(params);
        let mut jacobian = DMatrix::zeros(self.frequencies.len(), self.free.len());
        for (i, &f) in self.frequencies.iter().enumerate() {
            let grad = model.phase_gradient(f);
            for (j, &k) in self.free.iter().enumerate() {
                jacobian[(i, j)] = -grad[k];
            }
        }
        jacobian
    }
}

/// Fit `theta − 2π·delay·(f − fr) + 2·atan(2·Ql·(1 − f/fr))` to the phase of
/// data centered on the origin
///
/// Without a guess, fr comes from the steepest slope of the smoothed phase,
/// Ql from the span and the delay from the background slope left after
/// removing the roll-off. The offset phase is always guessed from the ends
/// of the sweep.
pub fn fit_phase(
    frequencies: &[f64],
    centered: &[Complex64],
    guess: Option<PhaseGuess>,
    config: &PhaseFitConfig,
    solver: &SolverConfig,
) -> Result<PhaseFit> {
    if frequencies.len() != centered.len() {
        return Err(FitError::LengthMismatch {
            frequencies: frequencies.len(),
            values: centered.len(),
        });
    }
    let n = frequencies.len();
    if n < MIN_CIRCLE_POINTS {
        return Err(FitError::InsufficientData {
            needed: MIN_CIRCLE_POINTS,
            available: n,
        });
    }

    let phase = unwrap_phase(&centered.iter().map(|z| z.arg()).collect::<Vec<_>>());
    let (lo, hi) = phase
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let coverage = hi - lo;

    let (roll_off, warning) = if coverage <= config.min_coverage * 2.0 * PI {
        let warning = FitWarning::PartialPhaseCoverage { span_rad: coverage };
        log::warn!("{}", warning);
        (coverage, Some(warning))
    } else {
        (2.0 * PI, None)
    };

    let (f_first, f_last) = (frequencies[0], frequencies[n - 1]);
    let span = f_last - f_first;

    let guess = match guess {
        Some(guess) => guess,
        None => {
            let slope = gradient(&gaussian_filter(&phase, config.smoothing_sigma));
            let peak = argmax_abs(&slope).unwrap_or(n / 2);
            let fr = frequencies[peak];
            // The resonance rolls the phase off by −2π on a rising sweep and
            // by +2π on a falling one
            let roll_off = roll_off.copysign(span);
            PhaseGuess {
                fr,
                ql: 2.0 * fr / span.abs(),
                delay: -(phase[n - 1] - phase[0] + roll_off) / (2.0 * PI * span),
            }
        }
    };
    let edge = config.edge_samples.min(n);
    let theta = 0.5 * (mean(&phase[..edge]) + mean(&phase[n - edge..]));

    log::debug!(
        "phase fit guess: fr {:.6e} Hz, Ql {:.1}, theta {:.4}, delay {:.4e} s",
        guess.fr,
        guess.ql,
        theta,
        guess.delay
    );

    let (fr_low, fr_high) = if span > 0.0 {
        (f_first - span, f_last + span)
    } else {
        (f_last + span, f_first - span)
    };
    let mut lower = [f64::NEG_INFINITY; 4];
    let mut upper = [f64::INFINITY; 4];
    lower[FR] = fr_low;
    upper[FR] = fr_high;
    lower[QL] = MIN_QL;

    let mut current = [guess.fr, guess.ql, theta, guess.delay];
    for free in STAGES {
        let problem = StageProblem {
            frequencies,
            phase: &phase,
            base: current,
            free,
        };
        let start: Vec<f64> = free.iter().map(|&k| current[k]).collect();
        let bounds = Bounds {
            lower: free.iter().map(|&k| lower[k]).collect(),
            upper: free.iter().map(|&k| upper[k]).collect(),
        };
        let report = solve_bounded(&problem, &start, &bounds, solver)?;
        for (&k, &p) in free.iter().zip(&report.params) {
            current[k] = p;
        }
        log::info!("phase stage {:?}: {:?}", free, &report.params);
    }

    Ok(PhaseFit {
        params: PhaseModelParams::from_array(current),
        phase,
        roll_off,
        warning,
    })
}
