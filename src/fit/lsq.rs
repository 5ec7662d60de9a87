use nalgebra::{DMatrix, DVector};

use crate::config::SolverConfig;
use crate::error::{FitError, Result};

/// Damping above this means no downhill step exists from the current point
const MAX_DAMPING: f64 = 1e16;
const MIN_DAMPING: f64 = 1e-15;

/// A nonlinear least-squares objective with an analytic Jacobian
pub trait LeastSquaresProblem {
    /// Residual vector at `params`
    fn residuals(&self, params: &[f64]) -> DVector<f64>;

    /// Jacobian of the residuals (rows: residuals, columns: parameters)
    fn jacobian(&self, params: &[f64]) -> DMatrix<f64>;
}

/// Box constraints on the parameters
#[derive(Debug, Clone)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    /// No constraints on `n` parameters
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    fn clamp(&self, params: &mut [f64]) {
        for ((p, lo), hi) in params.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.clamp(*lo, *hi);
        }
    }
}

/// Why the solver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Scaled gradient below `gtol`
    Gradient,
    /// Relative cost reduction below `ftol`
    CostTolerance,
    /// Relative step below `xtol`
    StepTolerance,
    /// No step reduced the cost, even with maximal damping
    NoProgress,
    /// Iteration cap reached
    MaxIterations,
}

/// Outcome of a least-squares solve
#[derive(Debug, Clone)]
pub struct LeastSquaresReport {
    pub params: Vec<f64>,
    /// Half the sum of squared residuals
    pub cost: f64,
    pub iterations: usize,
    pub termination: Termination,
}

/// Bounded Levenberg-Marquardt minimization of ½‖r(x)‖²
///
/// Jacobian columns are normalized to unit length before each step so that
/// parameters of wildly different magnitude (Hz next to seconds) share one
/// trust region. Trial points are projected onto the bounds.
pub fn solve_bounded<P: LeastSquaresProblem>(
    problem: &P,
    initial: &[f64],
    bounds: &Bounds,
    config: &SolverConfig,
) -> Result<LeastSquaresReport> {
    let n = initial.len();
    let mut x = initial.to_vec();
    bounds.clamp(&mut x);

    let mut r = problem.residuals(&x);
    if r.iter().any(|v| !v.is_finite()) {
        return Err(FitError::Solver("non-finite residuals at start point".into()));
    }
    let mut cost = 0.5 * r.norm_squared();
    let mut damping = config.initial_damping;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        if cost == 0.0 {
            return Ok(report(x, cost, iterations, Termination::Gradient));
        }

        let jacobian = problem.jacobian(&x);
        let scale: Vec<f64> = (0..n)
            .map(|j| {
                let norm = jacobian.column(j).norm();
                if norm > 0.0 && norm.is_finite() { norm } else { 1.0 }
            })
            .collect();
        let mut scaled = jacobian;
        for (j, s) in scale.iter().enumerate() {
            let mut column = scaled.column_mut(j);
            column /= *s;
        }

        let gradient = scaled.tr_mul(&r);
        if gradient.amax() <= config.gtol * r.norm() {
            return Ok(report(x, cost, iterations, Termination::Gradient));
        }
        let normal = scaled.tr_mul(&scaled);

        loop {
            iterations += 1;

            let mut damped = normal.clone();
            for j in 0..n {
                damped[(j, j)] += damping;
            }
            let Some(cholesky) = damped.cholesky() else {
                damping *= 10.0;
                if damping > MAX_DAMPING {
                    return Ok(report(x, cost, iterations, Termination::NoProgress));
                }
                continue;
            };
            let step_scaled = cholesky.solve(&(-&gradient));

            let mut trial: Vec<f64> = x
                .iter()
                .zip(step_scaled.iter().zip(&scale))
                .map(|(xi, (d, s))| xi + d / s)
                .collect();
            bounds.clamp(&mut trial);

            let r_trial = problem.residuals(&trial);
            let cost_trial = 0.5 * r_trial.norm_squared();

            if cost_trial.is_finite() && cost_trial < cost {
                let reduction = cost - cost_trial;
                let small_step = x
                    .iter()
                    .zip(&trial)
                    .all(|(old, new)| (new - old).abs() <= config.xtol * (old.abs() + config.xtol));

                log::trace!(
                    "lm iteration {}: cost {:.6e} -> {:.6e}, damping {:.1e}",
                    iterations,
                    cost,
                    cost_trial,
                    damping
                );

                x = trial;
                r = r_trial;
                let previous = cost;
                cost = cost_trial;
                damping = (damping / 10.0).max(MIN_DAMPING);

                if reduction <= config.ftol * previous {
                    return Ok(report(x, cost, iterations, Termination::CostTolerance));
                }
                if small_step {
                    return Ok(report(x, cost, iterations, Termination::StepTolerance));
                }
                break;
            }

            damping *= 10.0;
            if damping > MAX_DAMPING {
                return Ok(report(x, cost, iterations, Termination::NoProgress));
            }
            if iterations >= config.max_iterations {
                break;
            }
        }
    }

    Ok(report(x, cost, iterations, Termination::MaxIterations))
}

fn report(params: Vec<f64>, cost: f64, iterations: usize, termination: Termination) -> LeastSquaresReport {
    log::debug!(
        "least squares finished after {} iterations ({:?}), cost {:.6e}",
        iterations,
        termination,
        cost
    );
    LeastSquaresReport {
        params,
        cost,
        iterations,
        termination,
    }
}
