//! # Roughness
//!
//! Second-order response-surface modelling of machined surface roughness (Ra)
//! as a function of cutting speed, feed and depth of cut.
//!
//! ## Overview
//!
//! A 13-run turning experiment is analysed with the classic response-surface
//! workflow:
//! - **Coding**: each factor is mapped to `[-1, 1]` around its design center
//! - **Expansion**: every coded run becomes a ten-term quadratic feature row
//! - **Fitting**: ordinary least squares through an SVD, with rank check,
//!   R², MSE and coefficient inference
//! - **Influence**: percentage contribution of terms and factors
//! - **Optimisation**: the minimum-Ra setting inside the design cube
//!
//! ## Quick Start
//!
//! ```rust
//! use roughness::{analyze, AnalysisConfig, Dataset};
//!
//! let result = analyze(&Dataset::machining(), &AnalysisConfig::default()).unwrap();
//!
//! assert!((result.model.intercept() - 0.74).abs() < 1e-8);
//! assert!(result.model.r_squared() > 0.98);
//!
//! let best = result.optimum.raw;
//! println!(
//!     "V = {:.2} m/min, F = {:.4} mm/rev, t = {:.3} mm -> Ra = {:.4}",
//!     best.speed, best.feed, best.depth, result.optimum.predicted_roughness
//! );
//! ```
//!
//! The individual stages are available on their own:
//!
//! ```rust
//! use roughness::rsm::{fit_dataset, influence, FitConfig};
//! use roughness::Dataset;
//!
//! let model = fit_dataset(&Dataset::machining(), &FitConfig::default()).unwrap();
//! let report = influence(&model).unwrap();
//! let total: f64 = report.factors.iter().map(|f| f.percent).sum();
//! assert!((total - 100.0).abs() < 1e-9);
//! ```
//!
//! ## Coding
//!
//! | factor            | symbol | center | half-range |
//! |-------------------|--------|--------|------------|
//! | cutting speed     | V      | 105    | 15         |
//! | feed              | F      | 0.085  | 0.015      |
//! | depth of cut      | t      | 0.95   | 0.15       |
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization of configs and results
//! - `parallel`: Enable parallel surface sampling and multi-start search using rayon

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coding;
pub mod dataset;
pub mod error;
pub mod features;
pub mod rsm;

#[cfg(feature = "parallel")]
pub mod parallel;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::coding::{CodedPoint, Factor, FactorCoding, RawPoint};
    pub use crate::dataset::{Dataset, Observation, MACHINING_DATA};
    pub use crate::error::{Error, Result};
    pub use crate::features::{design_matrix, expand, expand_point, Term, TERM_COUNT};
    pub use crate::rsm::{
        analyze, effect_trace, fit, fit_dataset, influence, optimize, optimize_multi_start,
        surface_slice, AnalysisConfig, FactorPair, FitConfig, FittedModel, InfluenceReport,
        OptimalSettings, OptimizerConfig, SurfaceAnalysis,
    };

    #[cfg(feature = "parallel")]
    pub use crate::parallel::{par_optimize_multi_start, par_surface_slice};
}

// Re-export commonly used items at crate root
pub use coding::{CodedPoint, Factor, RawPoint};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use rsm::{analyze, AnalysisConfig, FittedModel, SurfaceAnalysis};

#[cfg(feature = "parallel")]
pub use parallel::{par_optimize_multi_start, par_surface_slice};
