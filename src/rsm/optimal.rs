//! Minimum-Ra search over the coded design cube `[-1, 1]³`.
//!
//! The minimiser is a projected Newton method for box constraints:
//!
//! 1. Coordinates resting on a bound with the gradient pushing outward form
//!    the active set and are held fixed.
//! 2. The free coordinates take a Newton step through the Cholesky factor of
//!    the reduced Hessian when it is positive definite, and a steepest-descent
//!    step otherwise.
//! 3. An Armijo backtracking search runs along the projection arc
//!    `P(x + α d)`, so every iterate stays feasible.
//!
//! Derivatives are central finite differences, which are exact up to rounding
//! for the quadratic surface. Convergence means the infinity norm of the
//! projected gradient fell below the configured tolerance.

use nalgebra::{DMatrix, DVector};

use super::stats::t_value;
use super::types::{
    ActiveBound, ConfidenceInterval, FittedModel, Minimum, OptimalSettings, OptimizerConfig,
};
use crate::coding::CodedPoint;
use crate::error::{Error, Result};
use crate::features::TERM_COUNT;

/// Lower bound of every coded coordinate.
pub const LOWER: f64 = -1.0;
/// Upper bound of every coded coordinate.
pub const UPPER: f64 = 1.0;

/// Smallest diagonal of the reduced Hessian treated as genuine curvature.
/// Finite-difference noise on a flat direction sits far below this.
const CURVATURE_FLOOR: f64 = 1e-6;

/// Distance from a bound within which a coordinate counts as resting on it.
const BOUND_EPSILON: f64 = 1e-12;

/// Minimise `objective` over `[-1, 1]³` starting from `x0`.
///
/// The objective must be defined slightly outside the box: finite differences
/// step past the bounds by at most the configured Hessian step.
///
/// # Errors
///
/// * `InvalidParams` for a non-positive tolerance or step, or an Armijo
///   constant outside `(0, 1)`
/// * `InfeasibleStart` if `x0` is non-finite or outside the box
/// * `NotConverged` if the projected gradient is still above tolerance after
///   `max_iterations` steps, or the line search cannot make progress
pub fn minimize<F>(objective: F, x0: [f64; 3], config: &OptimizerConfig) -> Result<Minimum>
where
    F: Fn(&[f64; 3]) -> f64,
{
    validate_config(config)?;
    if x0.iter().any(|&v| !(LOWER..=UPPER).contains(&v)) {
        return Err(Error::InfeasibleStart { point: x0 });
    }

    let mut x = x0;
    let mut value = objective(&x);
    if !value.is_finite() {
        return Err(Error::InfeasibleStart { point: x0 });
    }

    let mut iterations = 0;
    while iterations < config.max_iterations {
        let grad = gradient(&objective, &x, config.gradient_step);
        let norm = projected_gradient_norm(&x, &grad);
        tracing::trace!(iteration = iterations, value, gradient_norm = norm, "projected newton");

        if norm < config.gradient_tolerance {
            return Ok(finish(x, value, iterations, norm));
        }

        let direction = search_direction(&objective, &x, &grad, config.hessian_step);

        match line_search(&objective, &x, value, &grad, &direction, config) {
            Some((next, next_value)) => {
                x = next;
                value = next_value;
            }
            None => {
                tracing::debug!(
                    iteration = iterations,
                    gradient_norm = norm,
                    "line search stalled"
                );
                return Err(Error::NotConverged {
                    iterations,
                    gradient_norm: norm,
                });
            }
        }
        iterations += 1;
    }

    let norm = projected_gradient_norm(&x, &gradient(&objective, &x, config.gradient_step));
    if norm < config.gradient_tolerance {
        Ok(finish(x, value, iterations, norm))
    } else {
        Err(Error::NotConverged {
            iterations,
            gradient_norm: norm,
        })
    }
}

/// The cube center followed by its eight corners.
#[must_use]
pub fn multi_start_points() -> [[f64; 3]; 9] {
    let mut points = [[0.0; 3]; 9];
    for (i, point) in points.iter_mut().skip(1).enumerate() {
        for (bit, coord) in point.iter_mut().enumerate() {
            *coord = if i & (1 << bit) == 0 { LOWER } else { UPPER };
        }
    }
    points
}

/// Run [`minimize`] from every point of [`multi_start_points`] and keep the
/// lowest converged minimum.
///
/// # Errors
///
/// The first start's error if no start converges.
pub fn minimize_multi_start<F>(objective: F, config: &OptimizerConfig) -> Result<Minimum>
where
    F: Fn(&[f64; 3]) -> f64,
{
    let results: Vec<Result<Minimum>> = multi_start_points()
        .iter()
        .map(|&start| minimize(&objective, start, config))
        .collect();
    best_of(results)
}

/// Lowest-valued `Ok` minimum; ties go to the earliest start.
pub(crate) fn best_of(results: Vec<Result<Minimum>>) -> Result<Minimum> {
    let mut best: Option<Minimum> = None;
    let mut first_error: Option<Error> = None;

    for result in results {
        match result {
            Ok(m) => {
                if best.map_or(true, |b| m.value < b.value) {
                    best = Some(m);
                }
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match (best, first_error) {
        (Some(m), _) => Ok(m),
        (None, Some(e)) => Err(e),
        (None, None) => Err(Error::invalid_params("no start points")),
    }
}

/// Locate the minimum-Ra setting of a fitted surface from one start point.
///
/// # Errors
///
/// `InvalidParams` for a confidence level outside `(0, 1)`, otherwise as
/// [`minimize`].
pub fn optimize(
    model: &FittedModel,
    start: &CodedPoint,
    config: &OptimizerConfig,
    confidence_level: f64,
) -> Result<OptimalSettings> {
    validate_confidence(confidence_level)?;
    let minimum = minimize(surface_objective(model), start.as_array(), config)?;
    Ok(settings_from_minimum(model, minimum, confidence_level))
}

/// [`optimize`] from the cube center and all eight corners.
///
/// # Errors
///
/// As [`optimize`] and [`minimize_multi_start`].
pub fn optimize_multi_start(
    model: &FittedModel,
    config: &OptimizerConfig,
    confidence_level: f64,
) -> Result<OptimalSettings> {
    validate_confidence(confidence_level)?;
    let minimum = minimize_multi_start(surface_objective(model), config)?;
    Ok(settings_from_minimum(model, minimum, confidence_level))
}

/// Predicted Ra as a function of a coded `[V, F, t]` triple.
pub(crate) fn surface_objective(model: &FittedModel) -> impl Fn(&[f64; 3]) -> f64 + Sync + '_ {
    move |x: &[f64; 3]| model.predict_point(&CodedPoint::from_array(*x))
}

pub(crate) fn validate_confidence(confidence_level: f64) -> Result<()> {
    if confidence_level > 0.0 && confidence_level < 1.0 {
        Ok(())
    } else {
        Err(Error::invalid_params(format!(
            "confidence level must lie in (0, 1), got {confidence_level}"
        )))
    }
}

/// Decode a minimum and attach the confidence interval for the mean Ra.
pub(crate) fn settings_from_minimum(
    model: &FittedModel,
    minimum: Minimum,
    confidence_level: f64,
) -> OptimalSettings {
    let coded = CodedPoint::from_array(minimum.point);
    let predicted_roughness = model.predict_point(&coded);

    let confidence_interval = model.prediction_variance(&coded).map(|variance| {
        let df = model.diagnostics().n_obs - TERM_COUNT;
        let half_width = t_value(confidence_level, df) * variance.sqrt();
        ConfidenceInterval {
            lower: predicted_roughness - half_width,
            upper: predicted_roughness + half_width,
            level: confidence_level,
        }
    });

    tracing::debug!(
        point = %coded,
        predicted_roughness,
        iterations = minimum.iterations,
        "optimum located"
    );

    OptimalSettings {
        coded,
        raw: coded.to_raw(),
        predicted_roughness,
        minimum,
        confidence_interval,
    }
}

fn validate_config(config: &OptimizerConfig) -> Result<()> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(config.gradient_tolerance) {
        return Err(Error::invalid_params("gradient tolerance must be positive"));
    }
    if !positive(config.gradient_step) || !positive(config.hessian_step) {
        return Err(Error::invalid_params("finite-difference steps must be positive"));
    }
    if !(config.armijo > 0.0 && config.armijo < 1.0) {
        return Err(Error::invalid_params(format!(
            "Armijo constant must lie in (0, 1), got {}",
            config.armijo
        )));
    }
    Ok(())
}

fn finish(point: [f64; 3], value: f64, iterations: usize, gradient_norm: f64) -> Minimum {
    let active = point.map(|v| {
        if v <= LOWER + BOUND_EPSILON {
            ActiveBound::Lower
        } else if v >= UPPER - BOUND_EPSILON {
            ActiveBound::Upper
        } else {
            ActiveBound::Free
        }
    });
    Minimum {
        point,
        value,
        iterations,
        gradient_norm,
        active,
    }
}

fn gradient<F: Fn(&[f64; 3]) -> f64>(f: &F, x: &[f64; 3], h: f64) -> [f64; 3] {
    let mut g = [0.0; 3];
    for (i, gi) in g.iter_mut().enumerate() {
        let mut forward = *x;
        let mut backward = *x;
        forward[i] += h;
        backward[i] -= h;
        *gi = (f(&forward) - f(&backward)) / (2.0 * h);
    }
    g
}

fn hessian<F: Fn(&[f64; 3]) -> f64>(f: &F, x: &[f64; 3], h: f64) -> [[f64; 3]; 3] {
    let shifted = |steps: &[(usize, f64)]| {
        let mut p = *x;
        for &(i, s) in steps {
            p[i] += s;
        }
        f(&p)
    };

    let center = f(x);
    let mut hm = [[0.0; 3]; 3];
    for i in 0..3 {
        hm[i][i] = (shifted(&[(i, h)]) - 2.0 * center + shifted(&[(i, -h)])) / (h * h);
        for j in (i + 1)..3 {
            let v = (shifted(&[(i, h), (j, h)])
                - shifted(&[(i, h), (j, -h)])
                - shifted(&[(i, -h), (j, h)])
                + shifted(&[(i, -h), (j, -h)]))
                / (4.0 * h * h);
            hm[i][j] = v;
            hm[j][i] = v;
        }
    }
    hm
}

/// Whether coordinate `i` is held at its bound this iteration.
fn is_binding(x: &[f64; 3], g: &[f64; 3], i: usize) -> bool {
    (x[i] <= LOWER + BOUND_EPSILON && g[i] > 0.0) || (x[i] >= UPPER - BOUND_EPSILON && g[i] < 0.0)
}

fn projected_gradient_norm(x: &[f64; 3], g: &[f64; 3]) -> f64 {
    (0..3)
        .filter(|&i| !is_binding(x, g, i))
        .map(|i| g[i].abs())
        .fold(0.0, f64::max)
}

fn search_direction<F: Fn(&[f64; 3]) -> f64>(
    f: &F,
    x: &[f64; 3],
    g: &[f64; 3],
    hessian_step: f64,
) -> [f64; 3] {
    // Binding coordinates follow -g and are clamped back by the projection.
    let mut d = [-g[0], -g[1], -g[2]];

    let free: Vec<usize> = (0..3).filter(|&i| !is_binding(x, g, i)).collect();
    if free.is_empty() {
        return d;
    }

    let hm = hessian(f, x, hessian_step);
    let reduced = DMatrix::from_fn(free.len(), free.len(), |a, b| hm[free[a]][free[b]]);
    if reduced.diagonal().iter().any(|&v| v < CURVATURE_FLOOR) {
        return d;
    }

    if let Some(chol) = reduced.cholesky() {
        let rhs = DVector::from_iterator(free.len(), free.iter().map(|&i| -g[i]));
        let step = chol.solve(&rhs);
        if step.iter().all(|v| v.is_finite()) {
            for (k, &i) in free.iter().enumerate() {
                d[i] = step[k];
            }
        }
    }
    d
}

fn project(x: [f64; 3]) -> [f64; 3] {
    x.map(|v| v.clamp(LOWER, UPPER))
}

/// Backtracking along `P(x + α d)` until
/// `f(x_α) ≤ f(x) + σ · gᵀ(x_α - x)`.
fn line_search<F: Fn(&[f64; 3]) -> f64>(
    f: &F,
    x: &[f64; 3],
    value: f64,
    g: &[f64; 3],
    d: &[f64; 3],
    config: &OptimizerConfig,
) -> Option<([f64; 3], f64)> {
    let mut alpha = 1.0;
    for _ in 0..=config.max_backtracks {
        let candidate = project([
            x[0] + alpha * d[0],
            x[1] + alpha * d[1],
            x[2] + alpha * d[2],
        ]);
        let decrease: f64 = (0..3).map(|i| g[i] * (candidate[i] - x[i])).sum();
        let candidate_value = f(&candidate);

        if decrease < 0.0
            && candidate_value.is_finite()
            && candidate_value <= value + config.armijo * decrease
        {
            return Some((candidate, candidate_value));
        }
        alpha *= 0.5;
    }
    None
}
