//! Ordinary least-squares fit of the quadratic response surface.
//!
//! The coefficients come from an SVD-based least-squares solve of the design
//! matrix itself; the normal equations are never formed or inverted. The same
//! decomposition gives the numerical rank (a rank-deficient design is an
//! error, not a silently degraded fit) and `(XᵀX)⁻¹ = V Σ⁻² Vᵀ` for inference.

use nalgebra::{DMatrix, DVector, Dyn, SVD};
use ndarray::{Array1, Array2};

use super::stats::{f_distribution_p_value, students_t_p_value};
use super::types::{
    CoefficientEstimate, FitConfig, FitDiagnostics, FittedModel, RegressionAnova,
};
use crate::coding::CodedPoint;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::features::{expand_point, Term, TERM_COUNT};

/// Full SVD of the design matrix, iterated to machine precision.
///
/// The default `svd` stopping rule can halt early when two singular values
/// nearly coincide, which happens on the machining design.
fn decompose(xm: DMatrix<f64>) -> Result<SVD<f64, Dyn, Dyn>> {
    SVD::try_new(xm, true, true, f64::EPSILON, 0)
        .ok_or_else(|| Error::solve_failed("SVD did not converge"))
}

/// Fit `y ≈ X · β` by ordinary least squares.
///
/// # Arguments
/// * `x` - `N × 10` design matrix from [`design_matrix`](crate::features::design_matrix)
/// * `y` - `N` responses
/// * `config` - Rank tolerance
///
/// # Errors
/// * `DimensionMismatch` if `x` does not have 10 columns or its row count
///   differs from `y`
/// * `InvalidParams` if the inputs are empty or contain non-finite values
/// * `RankDeficient` if fewer than 10 columns are numerically independent
/// * `Undefined` if the response has zero variance (R² undefined)
pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &FitConfig) -> Result<FittedModel> {
    let (n, p) = x.dim();

    if p != TERM_COUNT {
        return Err(Error::DimensionMismatch {
            expected: format!("{} design columns", TERM_COUNT),
            actual: format!("{} columns", p),
        });
    }
    if n != y.len() {
        return Err(Error::DimensionMismatch {
            expected: format!("{} responses (one per design row)", n),
            actual: format!("{} responses", y.len()),
        });
    }
    if n == 0 {
        return Err(Error::invalid_params("design matrix has no rows"));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(Error::invalid_params("design matrix or response contains non-finite values"));
    }
    if !(config.rank_tolerance > 0.0 && config.rank_tolerance < 1.0) {
        return Err(Error::invalid_params(format!(
            "rank tolerance must lie in (0, 1), got {}",
            config.rank_tolerance
        )));
    }

    let xm = DMatrix::from_fn(n, p, |i, j| x[(i, j)]);
    let yv = DVector::from_iterator(n, y.iter().copied());

    let svd = decompose(xm)?;
    let singular = &svd.singular_values;
    let s_max = singular.iter().copied().fold(0.0_f64, f64::max);
    let threshold = config.rank_tolerance * s_max;
    let rank = singular.iter().filter(|&&s| s > threshold).count();

    tracing::debug!(rows = n, rank, s_max, "design matrix decomposed");

    if rank < p {
        return Err(Error::RankDeficient { rank, required: p });
    }

    let s_min = singular.iter().copied().fold(f64::INFINITY, f64::min);
    let condition_number = s_max / s_min;

    let beta = svd.solve(&yv, threshold).map_err(Error::solve_failed)?;
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(Error::solve_failed("non-finite coefficient"));
    }

    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| Error::solve_failed("SVD did not return right singular vectors"))?;
    let covariance_unscaled = Array2::from_shape_fn((p, p), |(i, j)| {
        (0..p)
            .map(|k| v_t[(k, i)] * v_t[(k, j)] / (singular[k] * singular[k]))
            .sum::<f64>()
    });

    let mut coefficients = [0.0; TERM_COUNT];
    for (c, b) in coefficients.iter_mut().zip(beta.iter()) {
        *c = *b;
    }

    let fitted_values = x.dot(&Array1::from(coefficients.to_vec()));
    let residuals = y - &fitted_values;
    let r_squared = r_squared(y, &fitted_values)?;
    let mse = mean_squared_error(y, &fitted_values)?;

    let df_residual = n - p;
    let residual_ss = residuals.mapv(|r| r * r).sum();
    let total_ss = total_sum_of_squares(y);

    let (residual_variance, adj_r_squared, anova) = if df_residual > 0 {
        let sigma2 = residual_ss / df_residual as f64;
        let adj = 1.0 - (1.0 - r_squared) * ((n - 1) as f64 / df_residual as f64);
        (Some(sigma2), Some(adj), Some(regression_anova(total_ss, residual_ss, p, df_residual)))
    } else {
        (None, None, None)
    };

    tracing::debug!(r_squared, mse, condition_number, "least-squares fit complete");

    Ok(FittedModel {
        coefficients,
        covariance_unscaled,
        diagnostics: FitDiagnostics {
            n_obs: n,
            fitted_values,
            residuals,
            r_squared,
            adj_r_squared,
            mse,
            residual_variance,
            rank,
            condition_number,
            anova,
        },
    })
}

/// Fit the quadratic surface to a dataset's coded settings and Ra.
///
/// # Errors
///
/// See [`fit`].
pub fn fit_dataset(dataset: &Dataset, config: &FitConfig) -> Result<FittedModel> {
    fit(&dataset.design_matrix(), &dataset.responses(), config)
}

/// `1 - SS_res / SS_tot`.
///
/// # Errors
///
/// `DimensionMismatch` for unequal lengths, `Undefined` for an empty or
/// constant response.
pub fn r_squared(y: &Array1<f64>, y_hat: &Array1<f64>) -> Result<f64> {
    check_lengths(y, y_hat)?;
    let total_ss = total_sum_of_squares(y);
    if total_ss <= 0.0 {
        return Err(Error::undefined("R² of a constant response"));
    }
    let residual_ss: f64 = y.iter().zip(y_hat).map(|(a, b)| (a - b).powi(2)).sum();
    Ok(1.0 - residual_ss / total_ss)
}

/// `mean((y - ŷ)²)`.
///
/// # Errors
///
/// `DimensionMismatch` for unequal lengths, `Undefined` for empty input.
pub fn mean_squared_error(y: &Array1<f64>, y_hat: &Array1<f64>) -> Result<f64> {
    check_lengths(y, y_hat)?;
    if y.is_empty() {
        return Err(Error::undefined("mean squared error of no observations"));
    }
    let sum: f64 = y.iter().zip(y_hat).map(|(a, b)| (a - b).powi(2)).sum();
    Ok(sum / y.len() as f64)
}

fn check_lengths(y: &Array1<f64>, y_hat: &Array1<f64>) -> Result<()> {
    if y.len() != y_hat.len() {
        return Err(Error::DimensionMismatch {
            expected: format!("{} predictions", y.len()),
            actual: format!("{} predictions", y_hat.len()),
        });
    }
    Ok(())
}

fn total_sum_of_squares(y: &Array1<f64>) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let mean = y.sum() / y.len() as f64;
    y.iter().map(|v| (v - mean).powi(2)).sum()
}

fn regression_anova(
    total_ss: f64,
    residual_ss: f64,
    p: usize,
    residual_df: usize,
) -> RegressionAnova {
    let model_df = p - 1;
    let model_ss = total_ss - residual_ss;
    let f_statistic = if residual_ss > 0.0 {
        (model_ss / model_df as f64) / (residual_ss / residual_df as f64)
    } else {
        f64::INFINITY
    };
    RegressionAnova {
        model_ss,
        residual_ss,
        total_ss,
        model_df,
        residual_df,
        f_statistic,
        p_value: f_distribution_p_value(f_statistic, model_df, residual_df),
    }
}

impl FittedModel {
    /// All ten coefficients in expansion order; index 0 is the intercept.
    #[must_use]
    pub fn coefficients(&self) -> &[f64; TERM_COUNT] {
        &self.coefficients
    }

    /// The intercept (`coefficients()[0]`).
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    /// Coefficient of one term. Interactions may name their factors in
    /// either order.
    #[must_use]
    pub fn coefficient(&self, term: Term) -> f64 {
        self.coefficients[term.index()]
    }

    /// Goodness of fit and residual summary.
    #[must_use]
    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    /// R² on the training data.
    #[must_use]
    pub fn r_squared(&self) -> f64 {
        self.diagnostics.r_squared
    }

    /// Mean squared error on the training data.
    #[must_use]
    pub fn mse(&self) -> f64 {
        self.diagnostics.mse
    }

    /// Predicted Ra at a coded point.
    #[must_use]
    pub fn predict_point(&self, point: &CodedPoint) -> f64 {
        expand_point(point)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, b)| x * b)
            .sum()
    }

    /// Predictions `X · β` for a design matrix.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `x` does not have 10 columns.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != TERM_COUNT {
            return Err(Error::DimensionMismatch {
                expected: format!("{} design columns", TERM_COUNT),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(x.dot(&Array1::from(self.coefficients.to_vec())))
    }

    /// R² of the model's predictions for `(x, y)`.
    ///
    /// # Errors
    ///
    /// As [`predict`](Self::predict) and [`r_squared`].
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_hat = self.predict(x)?;
        r_squared(y, &y_hat)
    }

    /// Mean squared error of the model's predictions for `(x, y)`.
    ///
    /// # Errors
    ///
    /// As [`predict`](Self::predict) and [`mean_squared_error`].
    pub fn mean_squared_error(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_hat = self.predict(x)?;
        mean_squared_error(y, &y_hat)
    }

    /// Standard errors, t statistics and p-values of all coefficients.
    ///
    /// None when the fit has no residual degrees of freedom.
    #[must_use]
    pub fn coefficient_estimates(&self) -> Option<Vec<CoefficientEstimate>> {
        let sigma2 = self.diagnostics.residual_variance?;
        let df = self.diagnostics.n_obs - TERM_COUNT;

        let estimates = Term::ALL
            .iter()
            .enumerate()
            .map(|(i, &term)| {
                let estimate = self.coefficients[i];
                let std_error = (sigma2 * self.covariance_unscaled[(i, i)]).max(0.0).sqrt();
                let t_statistic = if std_error > 0.0 {
                    estimate / std_error
                } else {
                    f64::INFINITY.copysign(estimate)
                };
                CoefficientEstimate {
                    term,
                    estimate,
                    std_error,
                    t_statistic,
                    p_value: students_t_p_value(t_statistic, df),
                }
            })
            .collect();

        Some(estimates)
    }

    /// Variance of the mean prediction at a coded point,
    /// `σ² · x₀ᵀ (XᵀX)⁻¹ x₀`. None without residual degrees of freedom.
    #[must_use]
    pub fn prediction_variance(&self, point: &CodedPoint) -> Option<f64> {
        let sigma2 = self.diagnostics.residual_variance?;
        let x0 = Array1::from(expand_point(point).to_vec());
        let leverage = x0.dot(&self.covariance_unscaled.dot(&x0));
        Some(sigma2 * leverage.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::Factor;
    use crate::dataset::MACHINING_DATA;
    use crate::features::design_matrix;

    const REFERENCE_COEFFICIENTS: [f64; TERM_COUNT] = [
        0.74, 0.077, 0.214, 0.069, 0.51, 0.4325, 0.455, 0.445, 0.4725, 0.41,
    ];

    fn machining_model() -> FittedModel {
        fit_dataset(&Dataset::machining(), &FitConfig::default()).unwrap()
    }

    #[test]
    fn test_fit_reproduces_reference_coefficients() {
        let model = machining_model();
        for (got, want) in model.coefficients().iter().zip(REFERENCE_COEFFICIENTS) {
            assert!((got - want).abs() < 1e-8, "got {got}, want {want}");
        }
        assert!((model.intercept() - 0.74).abs() < 1e-8);
        let feed_square = model.coefficient(Term::Square(Factor::Feed));
        assert!((feed_square - 0.445).abs() < 1e-8);
    }

    #[test]
    fn test_decomposition_reconstructs_design() {
        let x = design_matrix(&Dataset::machining().coded_points());
        let xm = DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)]);
        let rebuilt = decompose(xm.clone()).unwrap().recompose().unwrap();
        assert!((rebuilt - &xm).norm() < 1e-12);
    }

    #[test]
    fn test_coefficient_accepts_either_interaction_order() {
        let model = machining_model();
        let forward = Term::Interaction(Factor::CuttingSpeed, Factor::Feed);
        let reversed = Term::Interaction(Factor::Feed, Factor::CuttingSpeed);
        assert!((model.coefficient(reversed) - 0.4325).abs() < 1e-8);
        assert_eq!(model.coefficient(reversed), model.coefficient(forward));

        let diagonal = Term::Interaction(Factor::DepthOfCut, Factor::DepthOfCut);
        assert_eq!(
            model.coefficient(diagonal),
            model.coefficient(Term::Square(Factor::DepthOfCut))
        );
    }

    #[test]
    fn test_fit_statistics() {
        let model = machining_model();
        let diag = model.diagnostics();
        assert!((diag.r_squared - 0.984_269_416).abs() < 1e-6);
        assert!((diag.mse - 0.001_695_385).abs() < 1e-8);
        assert!((diag.adj_r_squared.unwrap() - 0.937_077_665).abs() < 1e-6);
        assert!((diag.residual_variance.unwrap() - 0.007_346_667).abs() < 1e-8);
        assert_eq!(diag.rank, TERM_COUNT);
        assert!(diag.condition_number >= 1.0);

        let anova = diag.anova.unwrap();
        assert_eq!(anova.model_df, 9);
        assert_eq!(anova.residual_df, 3);
        assert!((anova.f_statistic - 20.856_81).abs() < 1e-3);
        assert!((anova.p_value - 0.014_813).abs() < 1e-4);
        assert!((anova.model_ss + anova.residual_ss - anova.total_ss).abs() < 1e-12);
    }

    #[test]
    fn test_score_and_mse_match_diagnostics() {
        let data = Dataset::machining();
        let model = machining_model();
        let x = data.design_matrix();
        let y = data.responses();

        let score = model.score(&x, &y).unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!((score - model.r_squared()).abs() < 1e-12);
        assert!((model.mean_squared_error(&x, &y).unwrap() - model.mse()).abs() < 1e-12);
    }

    #[test]
    fn test_predictions_match_fitted_values() {
        let data = Dataset::machining();
        let model = machining_model();
        let predicted = model.predict(&data.design_matrix()).unwrap();
        for (i, point) in data.coded_points().iter().enumerate() {
            assert!((model.predict_point(point) - predicted[i]).abs() < 1e-12);
            assert!((predicted[i] - model.diagnostics().fitted_values[i]).abs() < 1e-12);
        }
        // Run 1 reference prediction
        assert!((predicted[0] - 1.832).abs() < 1e-8);
        // Design center reproduces the intercept
        assert!((model.predict_point(&CodedPoint::CENTER) - model.intercept()).abs() < 1e-12);
    }

    #[test]
    fn test_replicated_points_predict_identically() {
        let mut rows = MACHINING_DATA.to_vec();
        rows.push([105.0, 0.085, 0.95, 0.80]);
        rows.push([105.0, 0.085, 0.95, 0.77]);
        let data = Dataset::from_rows(&rows).unwrap();
        let model = fit_dataset(&data, &FitConfig::default()).unwrap();

        let fitted = &model.diagnostics().fitted_values;
        assert!((fitted[12] - fitted[13]).abs() < 1e-12);
        assert!((fitted[13] - fitted[14]).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&model.r_squared()));
    }

    #[test]
    fn test_coefficient_estimates() {
        let model = machining_model();
        let table = model.coefficient_estimates().unwrap();
        assert_eq!(table.len(), TERM_COUNT);
        assert!((table[0].std_error - 0.085_712_698).abs() < 1e-8);
        assert!((table[1].std_error - 0.033_196_385).abs() < 1e-8);
        assert!((table[5].std_error - 0.205_531_830).abs() < 1e-8);
        assert!((table[1].p_value - 0.103_128).abs() < 1e-4);
        for row in &table {
            assert!((row.t_statistic * row.std_error - row.estimate).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&row.p_value));
        }
    }

    #[test]
    fn test_prediction_variance_at_center() {
        let model = machining_model();
        // x₀ = e₀ and [(XᵀX)⁻¹]₀₀ = 1 for this design
        let var = model.prediction_variance(&CodedPoint::CENTER).unwrap();
        assert!((var - 0.007_346_667).abs() < 1e-8);
    }

    #[test]
    fn test_rank_deficient_design_is_rejected() {
        let data = Dataset::from_rows(&MACHINING_DATA[..7]).unwrap();
        let err = fit_dataset(&data, &FitConfig::default()).unwrap_err();
        assert!(matches!(err, Error::RankDeficient { required: 10, .. }));

        // Thirteen rows, but only five distinct settings
        let rows: Vec<[f64; 4]> = MACHINING_DATA[..5].iter().cycle().take(13).copied().collect();
        let data = Dataset::from_rows(&rows).unwrap();
        let err = fit_dataset(&data, &FitConfig::default()).unwrap_err();
        assert!(matches!(err, Error::RankDeficient { rank: 5, .. }));
    }

    #[test]
    fn test_fit_dimension_errors() {
        let data = Dataset::machining();
        let x = data.design_matrix();
        let y = data.responses();

        let short_y = y.slice(ndarray::s![..12]).to_owned();
        assert!(matches!(
            fit(&x, &short_y, &FitConfig::default()),
            Err(Error::DimensionMismatch { .. })
        ));

        let narrow = x.slice(ndarray::s![.., ..9]).to_owned();
        assert!(matches!(
            fit(&narrow, &y, &FitConfig::default()),
            Err(Error::DimensionMismatch { .. })
        ));

        let model = machining_model();
        assert!(model.predict(&narrow).is_err());
    }

    #[test]
    fn test_fit_rejects_non_finite_and_constant_response() {
        let data = Dataset::machining();
        let x = data.design_matrix();
        let mut y = data.responses();
        y[3] = f64::NAN;
        assert!(matches!(
            fit(&x, &y, &FitConfig::default()),
            Err(Error::InvalidParams { .. })
        ));

        let constant = Array1::from_elem(13, 1.0);
        assert!(matches!(
            fit(&x, &constant, &FitConfig::default()),
            Err(Error::Undefined { .. })
        ));
    }

    #[test]
    fn test_saturated_design_has_no_inference() {
        // Center, six axial points and one point per interaction: exactly ten
        // independent settings.
        let points = [
            CodedPoint::CENTER,
            CodedPoint::new(-1.0, 0.0, 0.0),
            CodedPoint::new(1.0, 0.0, 0.0),
            CodedPoint::new(0.0, -1.0, 0.0),
            CodedPoint::new(0.0, 1.0, 0.0),
            CodedPoint::new(0.0, 0.0, -1.0),
            CodedPoint::new(0.0, 0.0, 1.0),
            CodedPoint::new(1.0, 1.0, 0.0),
            CodedPoint::new(1.0, 0.0, 1.0),
            CodedPoint::new(0.0, 1.0, 1.0),
        ];
        let x = design_matrix(&points);
        let y = Array1::from(vec![0.7, 1.2, 1.3, 0.9, 1.5, 1.0, 1.1, 2.0, 1.9, 1.8]);
        let model = fit(&x, &y, &FitConfig::default()).unwrap();

        let diag = model.diagnostics();
        assert!((diag.r_squared - 1.0).abs() < 1e-9);
        assert!(diag.residual_variance.is_none());
        assert!(diag.adj_r_squared.is_none());
        assert!(diag.anova.is_none());
        assert!(model.coefficient_estimates().is_none());
        assert!(model.prediction_variance(&CodedPoint::CENTER).is_none());
    }

    #[test]
    fn test_corner_only_design_aliases_squares() {
        // At the cube corners every square equals the intercept column.
        let points: Vec<CodedPoint> = [-1.0, 1.0]
            .iter()
            .flat_map(|&a| [-1.0, 1.0].into_iter().map(move |b| (a, b)))
            .flat_map(|(a, b)| [-1.0, 1.0].into_iter().map(move |c| CodedPoint::new(a, b, c)))
            .chain([CodedPoint::CENTER, CodedPoint::new(0.5, 0.0, 0.0)])
            .collect();
        let x = design_matrix(&points);
        let y = Array1::from(vec![1.0, 2.0, 1.5, 1.2, 2.2, 1.9, 1.4, 1.1, 0.7, 0.9]);
        assert!(matches!(
            fit(&x, &y, &FitConfig::default()),
            Err(Error::RankDeficient { .. })
        ));
    }
}
