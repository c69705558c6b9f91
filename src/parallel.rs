//! Parallel surface sampling and multi-start optimisation.
//!
//! This module provides rayon versions of the grid sampler and the
//! multi-start minimiser. Enable with the `parallel` feature flag. Results are
//! identical to the sequential versions: work is split per grid row or per
//! start point and collected back in order.
//!
//! # Usage
//!
//! ```ignore
//! use roughness::parallel::par_surface_slice;
//! use roughness::rsm::{fit_dataset, FactorPair, FitConfig};
//! use roughness::Dataset;
//!
//! let model = fit_dataset(&Dataset::machining(), &FitConfig::default()).unwrap();
//! let slice = par_surface_slice(&model, FactorPair::SpeedFeed, 101).unwrap();
//! assert_eq!(slice.values.dim(), (101, 101));
//! ```
//!
//! For the 13-run machining surface the sequential versions are usually just
//! as fast; the parallel ones pay off for fine grids.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::Result;
use crate::rsm::{
    best_of, coded_axis, minimize, multi_start_points, settings_from_minimum, surface_objective,
    validate_confidence, FactorPair, FittedModel, Minimum, OptimalSettings, OptimizerConfig,
    SurfaceSlice,
};

/// Parallel [`surface_slice`](crate::rsm::surface_slice): grid rows are
/// evaluated concurrently.
///
/// # Errors
///
/// `InvalidParams` if `resolution < 2`.
pub fn par_surface_slice(
    model: &FittedModel,
    pair: FactorPair,
    resolution: usize,
) -> Result<SurfaceSlice> {
    let axis = coded_axis(resolution)?;

    let rows: Vec<Vec<f64>> = (0..resolution)
        .into_par_iter()
        .map(|i| {
            axis.iter()
                .map(|&b| model.predict_point(&pair.point(axis[i], b)))
                .collect()
        })
        .collect();

    let mut values = Array2::zeros((resolution, resolution));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, v) in row.into_iter().enumerate() {
            values[[i, j]] = v;
        }
    }

    Ok(SurfaceSlice { pair, axis, values })
}

/// Parallel [`minimize_multi_start`](crate::rsm::minimize_multi_start): each
/// start point runs on its own task.
///
/// # Errors
///
/// The first start's error if no start converges.
pub fn par_minimize_multi_start<F>(objective: F, config: &OptimizerConfig) -> Result<Minimum>
where
    F: Fn(&[f64; 3]) -> f64 + Sync,
{
    let results: Vec<Result<Minimum>> = multi_start_points()
        .par_iter()
        .map(|&start| minimize(&objective, start, config))
        .collect();
    best_of(results)
}

/// Parallel [`optimize_multi_start`](crate::rsm::optimize_multi_start).
///
/// # Errors
///
/// As [`par_minimize_multi_start`], plus `InvalidParams` for a confidence
/// level outside `(0, 1)`.
pub fn par_optimize_multi_start(
    model: &FittedModel,
    config: &OptimizerConfig,
    confidence_level: f64,
) -> Result<OptimalSettings> {
    validate_confidence(confidence_level)?;
    let minimum = par_minimize_multi_start(surface_objective(model), config)?;
    Ok(settings_from_minimum(model, minimum, confidence_level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsm::{fit_dataset, optimize_multi_start, surface_slice, FitConfig};
    use crate::Dataset;

    fn machining_model() -> FittedModel {
        fit_dataset(&Dataset::machining(), &FitConfig::default()).unwrap()
    }

    #[test]
    fn test_par_surface_slice_matches_sequential() {
        let model = machining_model();
        for pair in FactorPair::ALL {
            let seq = surface_slice(&model, pair, 17).unwrap();
            let par = par_surface_slice(&model, pair, 17).unwrap();
            assert_eq!(seq, par);
        }
    }

    #[test]
    fn test_par_surface_slice_validates_resolution() {
        let model = machining_model();
        assert!(par_surface_slice(&model, FactorPair::FeedDepth, 1).is_err());
    }

    #[test]
    fn test_par_multi_start_matches_sequential() {
        let model = machining_model();
        let config = OptimizerConfig::default();
        let seq = optimize_multi_start(&model, &config, 0.95).unwrap();
        let par = par_optimize_multi_start(&model, &config, 0.95).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_par_minimize_multi_start_linear() {
        let min = par_minimize_multi_start(
            |x| x[0] - x[1] + 0.5 * x[2],
            &OptimizerConfig::default(),
        )
        .unwrap();
        assert_eq!(min.point, [-1.0, 1.0, -1.0]);
    }
}
