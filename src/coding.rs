//! Factor coding: affine maps between raw machining units and coded units.
//!
//! Response-surface designs are analysed on dimensionless *coded* factors so
//! that the design points sit on the cube `[-1, 1]^3`:
//!
//! ```text
//! coded = (raw - center) / half_range
//! raw   = coded * half_range + center
//! ```
//!
//! The three factor codings are fixed constants. They anchor the fit, the
//! optimiser's search box and the decoding of the optimum, so every stage must
//! use the same pair.
//!
//! # Example
//!
//! ```
//! use roughness::coding::{Factor, RawPoint};
//!
//! assert_eq!(Factor::CuttingSpeed.code(120.0), 1.0);
//! assert_eq!(Factor::DepthOfCut.decode(0.0), 0.95);
//!
//! let coded = RawPoint::new(105.0, 0.085, 0.95).to_coded();
//! assert!(coded.as_array().iter().all(|c| c.abs() < 1e-12));
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Center and half-range of one factor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactorCoding {
    /// Raw value mapped to coded 0.
    pub center: f64,
    /// Raw distance mapped to one coded unit.
    pub half_range: f64,
}

/// Coding of cutting speed V (m/min): 90..120 maps to -1..1.
pub const CUTTING_SPEED: FactorCoding = FactorCoding {
    center: 105.0,
    half_range: 15.0,
};

/// Coding of feed F (mm/rev): 0.07..0.10 maps to -1..1.
pub const FEED: FactorCoding = FactorCoding {
    center: 0.085,
    half_range: 0.015,
};

/// Coding of depth of cut t (mm): 0.8..1.1 maps to -1..1.
pub const DEPTH_OF_CUT: FactorCoding = FactorCoding {
    center: 0.95,
    half_range: 0.15,
};

impl FactorCoding {
    /// Create a coding, rejecting half-ranges that cannot be inverted.
    ///
    /// # Errors
    ///
    /// `InvalidCoding` for a zero or non-finite half-range or center.
    pub fn new(center: f64, half_range: f64) -> Result<Self> {
        if !center.is_finite() || !half_range.is_finite() || half_range == 0.0 {
            return Err(Error::InvalidCoding { center, half_range });
        }
        Ok(Self { center, half_range })
    }

    /// Map a raw value to coded units.
    #[inline]
    #[must_use]
    pub fn code(&self, raw: f64) -> f64 {
        code(raw, self.center, self.half_range)
    }

    /// Map a coded value back to raw units.
    #[inline]
    #[must_use]
    pub fn decode(&self, coded: f64) -> f64 {
        decode(coded, self.center, self.half_range)
    }
}

/// `(raw - center) / half_range`.
#[inline]
#[must_use]
pub fn code(raw: f64, center: f64, half_range: f64) -> f64 {
    (raw - center) / half_range
}

/// `coded * half_range + center`.
#[inline]
#[must_use]
pub fn decode(coded: f64, center: f64, half_range: f64) -> f64 {
    coded * half_range + center
}

/// The three machining factors, in design-matrix order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Factor {
    /// Cutting speed V.
    CuttingSpeed,
    /// Feed F.
    Feed,
    /// Depth of cut t.
    DepthOfCut,
}

impl Factor {
    /// All factors in design-matrix order.
    pub const ALL: [Factor; 3] = [Factor::CuttingSpeed, Factor::Feed, Factor::DepthOfCut];

    /// Position of the factor in a coded triple (0, 1 or 2).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::CuttingSpeed => 0,
            Self::Feed => 1,
            Self::DepthOfCut => 2,
        }
    }

    /// The factor's fixed coding.
    #[must_use]
    pub fn coding(self) -> FactorCoding {
        match self {
            Self::CuttingSpeed => CUTTING_SPEED,
            Self::Feed => FEED,
            Self::DepthOfCut => DEPTH_OF_CUT,
        }
    }

    /// Short symbol (`V`, `F`, `t`).
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::CuttingSpeed => "V",
            Self::Feed => "F",
            Self::DepthOfCut => "t",
        }
    }

    /// Raw unit of the factor.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::CuttingSpeed => "m/min",
            Self::Feed => "mm/rev",
            Self::DepthOfCut => "mm",
        }
    }

    /// Code a raw value of this factor.
    #[must_use]
    pub fn code(self, raw: f64) -> f64 {
        self.coding().code(raw)
    }

    /// Decode a coded value of this factor.
    #[must_use]
    pub fn decode(self, coded: f64) -> f64 {
        self.coding().decode(coded)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A factor setting in raw machining units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawPoint {
    /// Cutting speed (m/min).
    pub speed: f64,
    /// Feed (mm/rev).
    pub feed: f64,
    /// Depth of cut (mm).
    pub depth: f64,
}

impl RawPoint {
    /// Create a raw point.
    #[must_use]
    pub fn new(speed: f64, feed: f64, depth: f64) -> Self {
        Self { speed, feed, depth }
    }

    /// Code every factor with its fixed coding.
    #[must_use]
    pub fn to_coded(&self) -> CodedPoint {
        CodedPoint::new(
            Factor::CuttingSpeed.code(self.speed),
            Factor::Feed.code(self.feed),
            Factor::DepthOfCut.code(self.depth),
        )
    }

    /// Values as `[V, F, t]`.
    #[must_use]
    pub fn as_array(&self) -> [f64; 3] {
        [self.speed, self.feed, self.depth]
    }
}

/// A factor setting in coded units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodedPoint {
    /// Coded cutting speed.
    pub speed: f64,
    /// Coded feed.
    pub feed: f64,
    /// Coded depth of cut.
    pub depth: f64,
}

impl CodedPoint {
    /// The design center, coded `(0, 0, 0)`.
    pub const CENTER: CodedPoint = CodedPoint {
        speed: 0.0,
        feed: 0.0,
        depth: 0.0,
    };

    /// Create a coded point.
    #[must_use]
    pub fn new(speed: f64, feed: f64, depth: f64) -> Self {
        Self { speed, feed, depth }
    }

    /// Build from a `[V, F, t]` array.
    #[must_use]
    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Values as `[V, F, t]`.
    #[must_use]
    pub fn as_array(&self) -> [f64; 3] {
        [self.speed, self.feed, self.depth]
    }

    /// Coded value of one factor.
    #[must_use]
    pub fn get(&self, factor: Factor) -> f64 {
        self.as_array()[factor.index()]
    }

    /// Decode every factor back to raw units.
    #[must_use]
    pub fn to_raw(&self) -> RawPoint {
        RawPoint::new(
            Factor::CuttingSpeed.decode(self.speed),
            Factor::Feed.decode(self.feed),
            Factor::DepthOfCut.decode(self.depth),
        )
    }

    /// Whether every coordinate lies in `[-1, 1]` (with `tol` slack).
    #[must_use]
    pub fn in_unit_cube(&self, tol: f64) -> bool {
        self.as_array()
            .iter()
            .all(|&c| (-1.0 - tol..=1.0 + tol).contains(&c))
    }
}

impl fmt::Display for CodedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(V={:.4}, F={:.4}, t={:.4})",
            self.speed, self.feed, self.depth
        )
    }
}
