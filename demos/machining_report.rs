//! Full response-surface report for the turning experiment.
//!
//! Fits the quadratic model, prints the fitted equation, goodness of fit,
//! the prediction table, both influence schemes and the minimum-Ra setting.
//!
//! Run with `RUST_LOG=roughness=debug` to see the pipeline events.

use roughness::features::Term;
use roughness::rsm::{analyze, AnalysisConfig};
use roughness::Dataset;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("Surface Roughness - Response Surface Report\n");

    let dataset = Dataset::machining();
    let result = analyze(&dataset, &AnalysisConfig::default()).expect("analysis failed");
    let model = &result.model;
    let diagnostics = model.diagnostics();

    // Fitted equation in coded variables
    let mut equation = format!("Ra = {:.4}", model.intercept());
    for (term, coef) in Term::ALL.iter().zip(model.coefficients()).skip(1) {
        let sign = if *coef < 0.0 { '-' } else { '+' };
        equation.push_str(&format!(" {sign} {:.4}{}", coef.abs(), term.label()));
    }
    println!("Fitted model (coded units):");
    println!("  {equation}");
    println!();

    println!("Goodness of fit:");
    println!("  R²:          {:.6}", diagnostics.r_squared);
    if let Some(adj) = diagnostics.adj_r_squared {
        println!("  Adjusted R²: {adj:.6}");
    }
    println!("  MSE:         {:.8}", diagnostics.mse);
    if let Some(anova) = &diagnostics.anova {
        println!(
            "  F({}, {}) = {:.3}, p = {:.5}",
            anova.model_df, anova.residual_df, anova.f_statistic, anova.p_value
        );
    }
    println!();

    if let Some(estimates) = model.coefficient_estimates() {
        println!("Coefficients:");
        println!("  {:<6} {:>9} {:>9} {:>8} {:>8}", "term", "estimate", "std err", "t", "p");
        for e in &estimates {
            println!(
                "  {:<6} {:>9.4} {:>9.4} {:>8.3} {:>8.4}",
                e.term.symbol(),
                e.estimate,
                e.std_error,
                e.t_statistic,
                e.p_value
            );
        }
        println!();
    }

    println!("Predictions:");
    println!("  {:>3} {:>8} {:>10} {:>10}", "run", "actual", "predicted", "|diff|");
    for row in &result.predictions {
        println!(
            "  {:>3} {:>8.3} {:>10.4} {:>10.4}",
            row.index, row.actual, row.predicted, row.abs_difference
        );
    }
    println!();

    println!("Influence (listed terms):");
    for share in &result.influence.listed {
        println!(
            "  {:<3} {:>7.2}%  (rank {})",
            share.term.symbol(),
            share.percent,
            share.rank
        );
    }
    println!();

    println!("Influence (per factor):");
    for share in &result.influence.factors {
        println!(
            "  {:<3} {:>7.2}%  (rank {})",
            share.factor.symbol(),
            share.percent,
            share.rank
        );
    }
    println!();

    println!("Individual effects (others at center):");
    for eq in &result.influence.equations {
        println!("  {eq}");
    }
    println!();

    let opt = &result.optimum;
    println!("Minimum Ra setting:");
    println!("  coded: {}", opt.coded);
    println!("  V = {:.4} m/min", opt.raw.speed);
    println!("  F = {:.6} mm/rev", opt.raw.feed);
    println!("  t = {:.6} mm", opt.raw.depth);
    println!("  Ra = {:.6} µm", opt.predicted_roughness);
    if let Some(ci) = &opt.confidence_interval {
        println!(
            "  {:.0}% CI: [{:.4}, {:.4}]",
            ci.level * 100.0,
            ci.lower,
            ci.upper
        );
    }
    println!(
        "  converged in {} iterations (projected gradient {:.2e})",
        opt.minimum.iterations, opt.minimum.gradient_norm
    );
}
