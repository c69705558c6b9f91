//! Second-order polynomial feature expansion.
//!
//! Every coded point `(x1, x2, x3)` expands to ten terms in this fixed order:
//!
//! | index | term   |
//! |-------|--------|
//! | 0     | 1      |
//! | 1     | x1     |
//! | 2     | x2     |
//! | 3     | x3     |
//! | 4     | x1²    |
//! | 5     | x1·x2  |
//! | 6     | x1·x3  |
//! | 7     | x2²    |
//! | 8     | x2·x3  |
//! | 9     | x3²    |
//!
//! Coefficient indices everywhere in the crate follow this table.

use std::fmt;

use ndarray::Array2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coding::{CodedPoint, Factor};

/// Number of terms in the full quadratic model of three factors.
pub const TERM_COUNT: usize = 10;

/// A term of the quadratic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term {
    /// Constant term.
    Intercept,
    /// First-order term of a factor.
    Linear(Factor),
    /// Pure quadratic term of a factor.
    Square(Factor),
    /// Two-factor interaction. Either order names the same term, and a
    /// factor paired with itself is its [`Term::Square`].
    Interaction(Factor, Factor),
}

impl Term {
    /// All terms in expansion order.
    pub const ALL: [Term; TERM_COUNT] = [
        Term::Intercept,
        Term::Linear(Factor::CuttingSpeed),
        Term::Linear(Factor::Feed),
        Term::Linear(Factor::DepthOfCut),
        Term::Square(Factor::CuttingSpeed),
        Term::Interaction(Factor::CuttingSpeed, Factor::Feed),
        Term::Interaction(Factor::CuttingSpeed, Factor::DepthOfCut),
        Term::Square(Factor::Feed),
        Term::Interaction(Factor::Feed, Factor::DepthOfCut),
        Term::Square(Factor::DepthOfCut),
    ];

    /// The same term as it appears in [`Term::ALL`]: interaction factors in
    /// design-matrix order, `Interaction(a, a)` as `Square(a)`.
    #[must_use]
    pub fn canonical(self) -> Self {
        match self {
            Self::Interaction(a, b) if a == b => Self::Square(a),
            Self::Interaction(a, b) if a > b => Self::Interaction(b, a),
            other => other,
        }
    }

    /// Position of the term in the feature vector.
    #[must_use]
    pub fn index(self) -> usize {
        match self.canonical() {
            Self::Intercept => 0,
            Self::Linear(f) => 1 + f.index(),
            Self::Square(Factor::CuttingSpeed) => 4,
            Self::Square(Factor::Feed) => 7,
            Self::Square(Factor::DepthOfCut) => 9,
            Self::Interaction(Factor::CuttingSpeed, Factor::Feed) => 5,
            Self::Interaction(Factor::CuttingSpeed, _) => 6,
            Self::Interaction(..) => 8,
        }
    }

    /// Equation label in coded variables (`X1` = V, `X2` = F, `X3` = t).
    #[must_use]
    pub fn label(self) -> String {
        let x = |f: Factor| format!("X{}", f.index() + 1);
        match self.canonical() {
            Self::Intercept => "1".to_string(),
            Self::Linear(f) => x(f),
            Self::Square(f) => format!("{}²", x(f)),
            Self::Interaction(a, b) => format!("{}{}", x(a), x(b)),
        }
    }

    /// Label in factor symbols (`V`, `F²`, `Vt`, ...).
    #[must_use]
    pub fn symbol(self) -> String {
        match self.canonical() {
            Self::Intercept => "1".to_string(),
            Self::Linear(f) => f.symbol().to_string(),
            Self::Square(f) => format!("{}²", f.symbol()),
            Self::Interaction(a, b) => format!("{}{}", a.symbol(), b.symbol()),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}

/// Expand a coded triple into `[1, x1, x2, x3, x1², x1x2, x1x3, x2², x2x3, x3²]`.
///
/// # Example
///
/// ```
/// use roughness::features::expand;
///
/// assert_eq!(expand(0.0, 0.0, 0.0), [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
/// assert_eq!(expand(1.0, 2.0, 3.0)[5], 2.0);
/// ```
#[inline]
#[must_use]
pub fn expand(x1: f64, x2: f64, x3: f64) -> [f64; TERM_COUNT] {
    [
        1.0,
        x1,
        x2,
        x3,
        x1 * x1,
        x1 * x2,
        x1 * x3,
        x2 * x2,
        x2 * x3,
        x3 * x3,
    ]
}

/// Expand a coded point.
#[inline]
#[must_use]
pub fn expand_point(point: &CodedPoint) -> [f64; TERM_COUNT] {
    expand(point.speed, point.feed, point.depth)
}

/// Stack the expansions of `points` into an `N × 10` design matrix.
#[must_use]
pub fn design_matrix(points: &[CodedPoint]) -> Array2<f64> {
    let mut x = Array2::zeros((points.len(), TERM_COUNT));
    for (mut row, point) in x.rows_mut().into_iter().zip(points) {
        for (cell, value) in row.iter_mut().zip(expand_point(point)) {
            *cell = value;
        }
    }
    x
}
