//! Relative influence of the model terms on Ra.
//!
//! Influence is read directly off the coded coefficients: on the coded cube
//! every term ranges over comparable magnitudes, so `|coefficient|` is a fair
//! measure of how strongly a term moves the response.

use std::cmp::Ordering;

use super::types::{EffectEquation, FactorShare, FittedModel, InfluenceReport, TermShare};
use crate::coding::Factor;
use crate::error::{Error, Result};
use crate::features::Term;

/// Terms entering the listed-term scheme, in report order.
///
/// The interactions are left out of this scheme's denominator.
pub const LISTED_TERMS: [Term; 6] = [
    Term::Linear(Factor::CuttingSpeed),
    Term::Linear(Factor::Feed),
    Term::Linear(Factor::DepthOfCut),
    Term::Square(Factor::CuttingSpeed),
    Term::Square(Factor::Feed),
    Term::Square(Factor::DepthOfCut),
];

/// Compute both influence schemes and the one-factor effect equations.
///
/// # Errors
///
/// `Undefined` if every coefficient of a scheme is zero, which would leave
/// its percentages without a denominator.
pub fn influence(model: &FittedModel) -> Result<InfluenceReport> {
    let magnitudes: Vec<(Term, f64)> = Term::ALL
        .iter()
        .skip(1)
        .map(|&term| (term, model.coefficient(term).abs()))
        .collect();

    let listed = listed_shares(model)?;
    let factors = factor_shares(model)?;
    let equations = Factor::ALL
        .iter()
        .map(|&factor| effect_equation(model, factor))
        .collect();

    if let (Some(term), Some(factor)) = (
        listed.iter().find(|s| s.rank == 1),
        factors.iter().find(|s| s.rank == 1),
    ) {
        tracing::debug!(
            top_term = %term.term,
            top_factor = %factor.factor,
            "influence computed"
        );
    }

    Ok(InfluenceReport {
        magnitudes,
        listed,
        factors,
        equations,
    })
}

/// Shares of V, F, t, V², F², t² in `|c1|+|c2|+|c3|+|c4|+|c7|+|c9|`.
///
/// # Errors
///
/// `Undefined` if all six coefficients are zero.
pub fn listed_shares(model: &FittedModel) -> Result<Vec<TermShare>> {
    let total: f64 = LISTED_TERMS
        .iter()
        .map(|&t| model.coefficient(t).abs())
        .sum();
    if total <= 0.0 {
        return Err(Error::undefined(
            "listed-term influence with all linear and quadratic coefficients zero",
        ));
    }

    let mut shares: Vec<TermShare> = LISTED_TERMS
        .iter()
        .map(|&term| {
            let magnitude = model.coefficient(term).abs();
            TermShare {
                term,
                magnitude,
                percent: magnitude / total * 100.0,
                rank: 0,
            }
        })
        .collect();

    let ranks = rank_descending(&shares.iter().map(|s| s.percent).collect::<Vec<_>>());
    for (share, rank) in shares.iter_mut().zip(ranks) {
        share.rank = rank;
    }
    Ok(shares)
}

/// Per-factor shares: `|linear| + |quadratic|` of each factor over the sum
/// of the three totals.
///
/// # Errors
///
/// `Undefined` if all three totals are zero.
pub fn factor_shares(model: &FittedModel) -> Result<Vec<FactorShare>> {
    let parts: Vec<(Factor, f64, f64)> = Factor::ALL
        .iter()
        .map(|&factor| {
            (
                factor,
                model.coefficient(Term::Linear(factor)).abs(),
                model.coefficient(Term::Square(factor)).abs(),
            )
        })
        .collect();

    let grand_total: f64 = parts.iter().map(|(_, l, q)| l + q).sum();
    if grand_total <= 0.0 {
        return Err(Error::undefined(
            "per-factor influence with all factor totals zero",
        ));
    }

    let mut shares: Vec<FactorShare> = parts
        .into_iter()
        .map(|(factor, linear, quadratic)| {
            let total = linear + quadratic;
            FactorShare {
                factor,
                linear,
                quadratic,
                total,
                percent: total / grand_total * 100.0,
                rank: 0,
            }
        })
        .collect();

    let ranks = rank_descending(&shares.iter().map(|s| s.percent).collect::<Vec<_>>());
    for (share, rank) in shares.iter_mut().zip(ranks) {
        share.rank = rank;
    }
    Ok(shares)
}

/// Section of the surface along one factor with the others held at the
/// design center.
#[must_use]
pub fn effect_equation(model: &FittedModel, factor: Factor) -> EffectEquation {
    EffectEquation {
        factor,
        intercept: model.intercept(),
        linear: model.coefficient(Term::Linear(factor)),
        quadratic: model.coefficient(Term::Square(factor)),
    }
}

/// 1-based ranks, largest value first. Ties keep input order.
fn rank_descending(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0; values.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = rank + 1;
    }
    ranks
}
