//! Grids of predicted Ra for plotting the fitted surface.

use std::fmt;

use ndarray::{Array1, Array2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::FittedModel;
use crate::coding::{CodedPoint, Factor};
use crate::error::{Error, Result};

/// Two factors spanning a surface slice; the third is held at coded 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FactorPair {
    /// Cutting speed × feed (depth of cut fixed).
    SpeedFeed,
    /// Cutting speed × depth of cut (feed fixed).
    SpeedDepth,
    /// Feed × depth of cut (cutting speed fixed).
    FeedDepth,
}

impl FactorPair {
    /// All three pairs.
    pub const ALL: [FactorPair; 3] = [
        FactorPair::SpeedFeed,
        FactorPair::SpeedDepth,
        FactorPair::FeedDepth,
    ];

    /// `(row factor, column factor)`.
    #[must_use]
    pub fn factors(self) -> (Factor, Factor) {
        match self {
            Self::SpeedFeed => (Factor::CuttingSpeed, Factor::Feed),
            Self::SpeedDepth => (Factor::CuttingSpeed, Factor::DepthOfCut),
            Self::FeedDepth => (Factor::Feed, Factor::DepthOfCut),
        }
    }

    /// The factor held at the design center.
    #[must_use]
    pub fn fixed(self) -> Factor {
        match self {
            Self::SpeedFeed => Factor::DepthOfCut,
            Self::SpeedDepth => Factor::Feed,
            Self::FeedDepth => Factor::CuttingSpeed,
        }
    }

    /// Coded point with the pair at `(a, b)` and the fixed factor at 0.
    #[must_use]
    pub fn point(self, a: f64, b: f64) -> CodedPoint {
        let (fa, fb) = self.factors();
        let mut values = [0.0; 3];
        values[fa.index()] = a;
        values[fb.index()] = b;
        CodedPoint::from_array(values)
    }
}

impl fmt::Display for FactorPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.factors();
        write!(f, "{a}×{b}")
    }
}

/// Predicted Ra over a square grid of one factor pair.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceSlice {
    /// The varied factors.
    pub pair: FactorPair,
    /// Coded grid coordinates, shared by both axes.
    pub axis: Array1<f64>,
    /// `values[(i, j)]` is Ra at `(axis[i], axis[j])`.
    pub values: Array2<f64>,
}

impl SurfaceSlice {
    /// Grid cell with the lowest predicted Ra, as `(row, column, Ra)`.
    #[must_use]
    pub fn min_cell(&self) -> Option<(usize, usize, f64)> {
        self.values
            .indexed_iter()
            .map(|((i, j), &v)| (i, j, v))
            .fold(None, |best, cell| match best {
                Some(b) if b.2 <= cell.2 => Some(b),
                _ => Some(cell),
            })
    }
}

/// Predicted Ra along one factor, the others at the design center.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EffectTrace {
    /// The varied factor.
    pub factor: Factor,
    /// Coded coordinates.
    pub axis: Array1<f64>,
    /// Ra at each coordinate.
    pub values: Array1<f64>,
}

/// `resolution` evenly spaced coded values from -1 to 1 inclusive.
///
/// # Errors
///
/// `InvalidParams` if `resolution < 2`.
pub fn coded_axis(resolution: usize) -> Result<Array1<f64>> {
    if resolution < 2 {
        return Err(Error::invalid_params(format!(
            "grid resolution must be at least 2, got {resolution}"
        )));
    }
    Ok(Array1::linspace(-1.0, 1.0, resolution))
}

/// Evaluate the surface on a `resolution × resolution` grid over coded
/// `[-1, 1]²` for `pair`.
///
/// # Errors
///
/// `InvalidParams` if `resolution < 2`.
pub fn surface_slice(
    model: &FittedModel,
    pair: FactorPair,
    resolution: usize,
) -> Result<SurfaceSlice> {
    let axis = coded_axis(resolution)?;
    let values = Array2::from_shape_fn((resolution, resolution), |(i, j)| {
        model.predict_point(&pair.point(axis[i], axis[j]))
    });
    Ok(SurfaceSlice { pair, axis, values })
}

/// Evaluate the surface along `factor` with the other two at coded 0.
///
/// # Errors
///
/// `InvalidParams` if `resolution < 2`.
pub fn effect_trace(model: &FittedModel, factor: Factor, resolution: usize) -> Result<EffectTrace> {
    let axis = coded_axis(resolution)?;
    let values = axis.mapv(|x| {
        let mut point = [0.0; 3];
        point[factor.index()] = x;
        model.predict_point(&CodedPoint::from_array(point))
    });
    Ok(EffectTrace {
        factor,
        axis,
        values,
    })
}
