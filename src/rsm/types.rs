//! Response-surface analysis types.
//!
//! Configuration, the fitted model and the derived reports.

use std::fmt;

use ndarray::{Array1, Array2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coding::{CodedPoint, Factor, RawPoint};
use crate::features::{Term, TERM_COUNT};

// ==================== Configuration ====================

/// Least-squares fit settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitConfig {
    /// Singular values below `rank_tolerance * σ_max` count as zero
    /// (default: 1e-10).
    pub rank_tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-10,
        }
    }
}

/// Bounded minimiser settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizerConfig {
    /// Iteration budget (default: 100).
    pub max_iterations: usize,
    /// Convergence threshold on the infinity norm of the projected gradient
    /// (default: 1e-7).
    pub gradient_tolerance: f64,
    /// Central-difference step for the gradient (default: 1e-6).
    pub gradient_step: f64,
    /// Central-difference step for the Hessian (default: 1e-4).
    pub hessian_step: f64,
    /// Sufficient-decrease constant of the Armijo rule (default: 1e-4).
    pub armijo: f64,
    /// Maximum step halvings per line search (default: 40).
    pub max_backtracks: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            gradient_tolerance: 1e-7,
            gradient_step: 1e-6,
            hessian_step: 1e-4,
            armijo: 1e-4,
            max_backtracks: 40,
        }
    }
}

/// Configuration for a full response-surface analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisConfig {
    /// Least-squares settings.
    pub fit: FitConfig,
    /// Minimiser settings.
    pub optimizer: OptimizerConfig,
    /// Coded start point of the minimiser (default: design center).
    pub start: CodedPoint,
    /// Restart from the cube center and all eight corners and keep the best
    /// minimum (default: false).
    pub multi_start: bool,
    /// Confidence level for the interval at the optimum (default: 0.95).
    pub confidence_level: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fit: FitConfig::default(),
            optimizer: OptimizerConfig::default(),
            start: CodedPoint::CENTER,
            multi_start: false,
            confidence_level: 0.95,
        }
    }
}

// ==================== Fitted model ====================

/// Regression ANOVA: model significance against residual error.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionAnova {
    /// Sum of squares explained by the model terms.
    pub model_ss: f64,
    /// Residual sum of squares.
    pub residual_ss: f64,
    /// Total (corrected) sum of squares.
    pub total_ss: f64,
    /// Model degrees of freedom (`p - 1`).
    pub model_df: usize,
    /// Residual degrees of freedom (`n - p`).
    pub residual_df: usize,
    /// `(model_ss / model_df) / (residual_ss / residual_df)`.
    pub f_statistic: f64,
    /// `P(F > f_statistic)`.
    pub p_value: f64,
}

/// Goodness of fit and residual summary stored with the model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitDiagnostics {
    /// Number of observations.
    pub n_obs: usize,
    /// Fitted values `X · β`.
    pub fitted_values: Array1<f64>,
    /// Residuals `y - X · β`.
    pub residuals: Array1<f64>,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Adjusted R², None when there are no residual degrees of freedom.
    pub adj_r_squared: Option<f64>,
    /// Mean squared error `mean(residual²)`.
    pub mse: f64,
    /// Unbiased residual variance `SS_res / (n - p)`, None when `n == p`.
    pub residual_variance: Option<f64>,
    /// Numerical rank of the design matrix.
    pub rank: usize,
    /// Ratio of largest to smallest singular value.
    pub condition_number: f64,
    /// Regression ANOVA, None when `n == p`.
    pub anova: Option<RegressionAnova>,
}

/// Estimate and t-test of one coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoefficientEstimate {
    /// Model term.
    pub term: Term,
    /// Least-squares estimate.
    pub estimate: f64,
    /// Standard error.
    pub std_error: f64,
    /// `estimate / std_error`.
    pub t_statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// A fitted second-order response surface.
///
/// The bias is folded into column 0 of the design matrix, so
/// `coefficients()[0]` is the intercept and every prediction is the dot
/// product of a feature row with the coefficient vector. Instances are only
/// created by [`fit`](super::fit) and are immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FittedModel {
    pub(crate) coefficients: [f64; TERM_COUNT],
    /// `(XᵀX)⁻¹` from the SVD.
    pub(crate) covariance_unscaled: Array2<f64>,
    pub(crate) diagnostics: FitDiagnostics,
}

// ==================== Influence ====================

/// Share of one term in a normalised influence scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TermShare {
    /// Model term.
    pub term: Term,
    /// `|coefficient|`.
    pub magnitude: f64,
    /// Share of the scheme total, in percent.
    pub percent: f64,
    /// Rank by share (1 = most influential).
    pub rank: usize,
}

/// Combined linear + quadratic influence of one factor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactorShare {
    /// The factor.
    pub factor: Factor,
    /// `|linear coefficient|`.
    pub linear: f64,
    /// `|quadratic coefficient|`.
    pub quadratic: f64,
    /// `linear + quadratic`.
    pub total: f64,
    /// Share of the sum of all factor totals, in percent.
    pub percent: f64,
    /// Rank by share (1 = most influential).
    pub rank: usize,
}

/// One-factor section of the surface with the other factors at coded 0:
/// `Ra(x) = intercept + linear·x + quadratic·x²`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EffectEquation {
    /// The varied factor.
    pub factor: Factor,
    /// Model intercept.
    pub intercept: f64,
    /// Linear coefficient of the factor.
    pub linear: f64,
    /// Quadratic coefficient of the factor.
    pub quadratic: f64,
}

impl EffectEquation {
    /// Evaluate at a coded value of the factor.
    #[must_use]
    pub fn eval(&self, coded: f64) -> f64 {
        self.intercept + self.linear * coded + self.quadratic * coded * coded
    }
}

impl fmt::Display for EffectEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.factor.symbol();
        write!(
            f,
            "Ra({s}) = {:.4} + {:.4}{s} + {:.4}{s}²",
            self.intercept, self.linear, self.quadratic
        )
    }
}

/// Influence of the model terms on Ra.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InfluenceReport {
    /// `|coefficient|` of the nine non-bias terms, in expansion order.
    pub magnitudes: Vec<(Term, f64)>,
    /// Shares of the six listed terms (V, F, t, V², F², t²). The interactions
    /// are not part of this scheme's denominator.
    pub listed: Vec<TermShare>,
    /// Per-factor shares.
    pub factors: Vec<FactorShare>,
    /// One-factor effect equations.
    pub equations: Vec<EffectEquation>,
}

// ==================== Optimisation ====================

/// Which bound a coordinate rests on at the solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActiveBound {
    /// Strictly inside the box.
    Free,
    /// At the lower bound.
    Lower,
    /// At the upper bound.
    Upper,
}

/// Result of a bounded minimisation in coded space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Minimum {
    /// Minimiser.
    pub point: [f64; 3],
    /// Objective at the minimiser.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Infinity norm of the projected gradient at the minimiser.
    pub gradient_norm: f64,
    /// Bound status of each coordinate.
    pub active: [ActiveBound; 3],
}

/// Confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
    /// Confidence level (e.g., 0.95 for 95%).
    pub level: f64,
}

/// Minimum-Ra operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimalSettings {
    /// Optimum in coded units.
    pub coded: CodedPoint,
    /// Optimum in machining units.
    pub raw: RawPoint,
    /// Predicted Ra at the optimum.
    pub predicted_roughness: f64,
    /// Solver details.
    pub minimum: Minimum,
    /// Confidence interval for the mean Ra at the optimum, None without
    /// residual degrees of freedom.
    pub confidence_interval: Option<ConfidenceInterval>,
}

// ==================== Analysis ====================

/// Observed against predicted Ra for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PredictionRow {
    /// 1-based run index.
    pub index: usize,
    /// Measured Ra.
    pub actual: f64,
    /// Model prediction.
    pub predicted: f64,
    /// `|actual - predicted|`.
    pub abs_difference: f64,
}

/// Complete response-surface analysis result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceAnalysis {
    /// The fitted model with diagnostics.
    pub model: FittedModel,
    /// Per-run prediction table.
    pub predictions: Vec<PredictionRow>,
    /// Term and factor influence.
    pub influence: InfluenceReport,
    /// Minimum-Ra operating point.
    pub optimum: OptimalSettings,
}
