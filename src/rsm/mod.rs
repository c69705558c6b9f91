//! Response-surface analysis of machining roughness.
//!
//! This module fits and interprets the full second-order model
//!
//! ```text
//! Ra = β0 + β1·X1 + β2·X2 + β3·X3 + β4·X1² + β5·X1X2 + β6·X1X3
//!         + β7·X2² + β8·X2X3 + β9·X3²
//! ```
//!
//! in coded cutting speed (X1), feed (X2) and depth of cut (X3):
//! - Least-squares fit with rank check, R², MSE and coefficient inference
//! - Influence percentages read off the coded coefficients
//! - Minimum-Ra operating point inside the design cube
//! - Surface slices and one-factor traces for plotting
//!
//! ## Quick Start
//!
//! ```rust
//! use roughness::rsm::{analyze, AnalysisConfig};
//! use roughness::Dataset;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let result = analyze(&Dataset::machining(), &AnalysisConfig::default())?;
//!
//! println!("R² = {:.4}", result.model.r_squared());
//! println!("optimum: {}", result.optimum.coded);
//! assert!(result.optimum.coded.in_unit_cube(0.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Influence Schemes
//!
//! ### Listed terms
//!
//! `|β|` of V, F, t, V², F², t² over their sum. The interaction terms do not
//! enter the denominator.
//!
//! ### Per factor
//!
//! `|β_linear| + |β_quadratic|` of each factor over the sum of the three.
//!
//! ## Optimisation
//!
//! A projected Newton method on the box `[-1, 1]³`. The surface is convex for
//! the machining data, so the single start from the design center finds the
//! global minimum; [`optimize_multi_start`] covers saddle-shaped fits.

mod influence;
mod optimal;
mod regression;
mod stats;
mod surface;
mod types;

pub use influence::{effect_equation, factor_shares, influence, listed_shares, LISTED_TERMS};
pub use optimal::{
    minimize, minimize_multi_start, multi_start_points, optimize, optimize_multi_start,
};
pub use regression::{fit, fit_dataset, mean_squared_error, r_squared};
pub use stats::{
    f_distribution_p_value, ln_gamma, regularized_incomplete_beta, students_t_p_value, t_value,
};
pub use surface::{coded_axis, effect_trace, surface_slice, EffectTrace, FactorPair, SurfaceSlice};
pub use types::{
    ActiveBound, AnalysisConfig, CoefficientEstimate, ConfidenceInterval, EffectEquation,
    FactorShare, FitConfig, FitDiagnostics, FittedModel, InfluenceReport, Minimum,
    OptimalSettings, OptimizerConfig, PredictionRow, RegressionAnova, SurfaceAnalysis, TermShare,
};

#[cfg(feature = "parallel")]
pub(crate) use optimal::{best_of, settings_from_minimum, surface_objective, validate_confidence};

use crate::dataset::Dataset;
use crate::error::Result;

/// Run the complete analysis: fit, predictions, influence and optimum.
///
/// # Arguments
/// * `dataset` - Measured runs (raw settings and Ra)
/// * `config` - Fit, optimiser and reporting settings
///
/// # Errors
/// * `RankDeficient` if the runs cannot support all ten model terms
/// * `Undefined` if Ra is constant or every listed coefficient is zero
/// * `InfeasibleStart` / `NotConverged` from the optimiser
/// * `InvalidParams` for an out-of-range confidence level or optimiser setting
///
/// # Example
///
/// ```rust
/// use roughness::rsm::{analyze, AnalysisConfig};
/// use roughness::Dataset;
///
/// let config = AnalysisConfig {
///     multi_start: true,
///     ..Default::default()
/// };
/// let result = analyze(&Dataset::machining(), &config).unwrap();
/// assert_eq!(result.predictions.len(), 13);
/// assert!((result.optimum.predicted_roughness - 0.7125).abs() < 1e-3);
/// ```
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> Result<SurfaceAnalysis> {
    let span = tracing::info_span!("analyze", runs = dataset.len());
    let _enter = span.enter();

    let model = fit_dataset(dataset, &config.fit)?;
    tracing::info!(
        r_squared = model.r_squared(),
        mse = model.mse(),
        "surface fitted"
    );

    let predictions = prediction_table(dataset, &model);
    let influence = influence(&model)?;

    let optimum = if config.multi_start {
        multi_start_optimum(&model, config)?
    } else {
        optimize(
            &model,
            &config.start,
            &config.optimizer,
            config.confidence_level,
        )?
    };

    tracing::info!(
        optimum = %optimum.coded,
        predicted_roughness = optimum.predicted_roughness,
        "analysis complete"
    );

    Ok(SurfaceAnalysis {
        model,
        predictions,
        influence,
        optimum,
    })
}

#[cfg(feature = "parallel")]
fn multi_start_optimum(model: &FittedModel, config: &AnalysisConfig) -> Result<OptimalSettings> {
    crate::parallel::par_optimize_multi_start(model, &config.optimizer, config.confidence_level)
}

#[cfg(not(feature = "parallel"))]
fn multi_start_optimum(model: &FittedModel, config: &AnalysisConfig) -> Result<OptimalSettings> {
    optimize_multi_start(model, &config.optimizer, config.confidence_level)
}

/// Observed against fitted Ra for every run.
#[must_use]
pub fn prediction_table(dataset: &Dataset, model: &FittedModel) -> Vec<PredictionRow> {
    dataset
        .observations()
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let predicted = model.predict_point(&obs.coded());
            PredictionRow {
                index: i + 1,
                actual: obs.roughness,
                predicted,
                abs_difference: (obs.roughness - predicted).abs(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::Factor;
    use crate::error::Error;
    use crate::features::Term;

    #[test]
    fn test_analyze_machining_end_to_end() {
        let result = analyze(&Dataset::machining(), &AnalysisConfig::default()).unwrap();

        let expected = [0.74, 0.077, 0.214, 0.069, 0.51, 0.4325, 0.455, 0.445, 0.4725, 0.41];
        for (c, e) in result.model.coefficients().iter().zip(expected) {
            assert!((c - e).abs() < 1e-8);
        }
        assert!((result.model.r_squared() - 0.984_269).abs() < 1e-6);
        assert!((result.model.mse() - 0.001_695_38).abs() < 1e-8);

        let opt = &result.optimum;
        assert!((opt.raw.speed - 105.194).abs() < 1e-3);
        assert!((opt.raw.feed - 0.080_716).abs() < 1e-3);
        assert!((opt.raw.depth - 0.960_989).abs() < 1e-3);
        assert!((opt.predicted_roughness - 0.712_463).abs() < 1e-3);

        let listed: Vec<f64> = result.influence.listed.iter().map(|s| s.percent).collect();
        for (got, want) in listed.iter().zip([4.46, 12.41, 4.00, 29.57, 25.80, 23.77]) {
            assert!((got - want).abs() < 0.01);
        }
        let factors: Vec<f64> = result.influence.factors.iter().map(|s| s.percent).collect();
        for (got, want) in factors.iter().zip([34.03, 38.20, 27.77]) {
            assert!((got - want).abs() < 0.01);
        }
    }

    #[test]
    fn test_prediction_table() {
        let dataset = Dataset::machining();
        let result = analyze(&dataset, &AnalysisConfig::default()).unwrap();

        assert_eq!(result.predictions.len(), 13);
        let first = &result.predictions[0];
        assert_eq!(first.index, 1);
        assert!((first.actual - 1.81).abs() < 1e-12);
        assert!((first.predicted - 1.832).abs() < 1e-8);
        assert!((first.abs_difference - 0.022).abs() < 1e-8);

        let center = &result.predictions[12];
        assert!((center.predicted - 0.74).abs() < 1e-8);

        for (row, fitted) in result
            .predictions
            .iter()
            .zip(result.model.diagnostics().fitted_values.iter())
        {
            assert!((row.predicted - fitted).abs() < 1e-12);
        }
    }

    #[test]
    fn test_score_in_unit_interval() {
        let dataset = Dataset::machining();
        let result = analyze(&dataset, &AnalysisConfig::default()).unwrap();
        let score = result
            .model
            .score(&dataset.design_matrix(), &dataset.responses())
            .unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!((score - result.model.r_squared()).abs() < 1e-12);
    }

    #[test]
    fn test_multi_start_matches_single_start() {
        let dataset = Dataset::machining();
        let single = analyze(&dataset, &AnalysisConfig::default()).unwrap();
        let multi = analyze(
            &dataset,
            &AnalysisConfig {
                multi_start: true,
                ..Default::default()
            },
        )
        .unwrap();

        let gap = single.optimum.predicted_roughness - multi.optimum.predicted_roughness;
        assert!(gap.abs() < 1e-9);
    }

    #[test]
    fn test_effect_equations_in_report() {
        let result = analyze(&Dataset::machining(), &AnalysisConfig::default()).unwrap();
        let speed = result
            .influence
            .equations
            .iter()
            .find(|e| e.factor == Factor::CuttingSpeed)
            .unwrap();
        let linear = result.model.coefficient(Term::Linear(Factor::CuttingSpeed));
        assert!((speed.linear - linear).abs() < 1e-15);
        assert!((speed.quadratic - 0.51).abs() < 1e-8);
    }

    #[test]
    fn test_analyze_rank_deficient_dataset() {
        let rows: Vec<[f64; 4]> = crate::dataset::MACHINING_DATA[..7].to_vec();
        let dataset = Dataset::from_rows(&rows).unwrap();
        let err = analyze(&dataset, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, Error::RankDeficient { required: 10, .. }));
    }

    #[test]
    fn test_analyze_invalid_confidence() {
        let config = AnalysisConfig {
            confidence_level: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            analyze(&Dataset::machining(), &config),
            Err(Error::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_analyze_infeasible_start() {
        let config = AnalysisConfig {
            start: crate::coding::CodedPoint::new(0.0, -1.2, 0.0),
            ..Default::default()
        };
        assert!(matches!(
            analyze(&Dataset::machining(), &config),
            Err(Error::InfeasibleStart { .. })
        ));
    }
}
