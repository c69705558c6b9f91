//! Observation tables.
//!
//! A [`Dataset`] is an ordered, validated list of `(V, F, t, Ra)` observations.
//! The turning experiment this crate was built for ships as an embedded
//! constant ([`MACHINING_DATA`]); other tables can be supplied as rows or as
//! delimited text.

use ndarray::{Array1, Array2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coding::{CodedPoint, RawPoint};
use crate::error::{Error, Result};
use crate::features::design_matrix;

/// Turning experiment: cutting speed (m/min), feed (mm/rev), depth of cut (mm)
/// and measured surface roughness Ra (µm). Row 13 is the design center.
pub const MACHINING_DATA: [[f64; 4]; 13] = [
    [120.0, 0.1, 0.8, 1.81],
    [120.0, 0.07, 1.1, 1.62],
    [120.0, 0.07, 0.8, 1.51],
    [90.0, 0.1, 1.1, 1.87],
    [90.0, 0.1, 0.8, 1.69],
    [90.0, 0.07, 1.1, 1.41],
    [90.0, 0.085, 0.95, 1.21],
    [120.0, 0.085, 0.95, 1.29],
    [105.0, 0.07, 0.95, 0.89],
    [105.0, 0.1, 0.95, 1.48],
    [105.0, 0.085, 0.8, 1.11],
    [105.0, 0.085, 1.1, 1.19],
    [105.0, 0.085, 0.95, 0.74],
];

/// One measured run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    /// Factor settings in raw units.
    pub setting: RawPoint,
    /// Measured surface roughness Ra (µm).
    pub roughness: f64,
}

impl Observation {
    /// Create an observation.
    #[must_use]
    pub fn new(speed: f64, feed: f64, depth: f64, roughness: f64) -> Self {
        Self {
            setting: RawPoint::new(speed, feed, depth),
            roughness,
        }
    }

    /// The coded factor settings.
    #[must_use]
    pub fn coded(&self) -> CodedPoint {
        self.setting.to_coded()
    }
}

/// A validated observation table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    /// The embedded 13-run turning experiment.
    #[must_use]
    pub fn machining() -> Self {
        Self {
            observations: MACHINING_DATA
                .iter()
                .map(|r| Observation::new(r[0], r[1], r[2], r[3]))
                .collect(),
        }
    }

    /// Build from `[V, F, t, Ra]` rows.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDataset` if the table is empty or a value is not finite.
    pub fn from_rows(rows: &[[f64; 4]]) -> Result<Self> {
        let observations = rows
            .iter()
            .map(|r| Observation::new(r[0], r[1], r[2], r[3]))
            .collect();
        Self::from_observations(observations)
    }

    /// Build from variable-length rows, as produced by a generic table reader.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDataset` if a row does not have exactly four values, the
    /// table is empty, or a value is not finite.
    pub fn from_slices(rows: &[Vec<f64>]) -> Result<Self> {
        let mut observations = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != 4 {
                return Err(Error::invalid_dataset(format!(
                    "row {}: expected 4 values (V, F, t, Ra), found {}",
                    i + 1,
                    row.len()
                )));
            }
            observations.push(Observation::new(row[0], row[1], row[2], row[3]));
        }
        Self::from_observations(observations)
    }

    /// Build from observations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDataset` if the list is empty or a value is not finite.
    pub fn from_observations(observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(Error::invalid_dataset("no observations"));
        }
        for (i, obs) in observations.iter().enumerate() {
            let values = [
                obs.setting.speed,
                obs.setting.feed,
                obs.setting.depth,
                obs.roughness,
            ];
            if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                return Err(Error::invalid_dataset(format!(
                    "row {}: non-finite value {}",
                    i + 1,
                    bad
                )));
            }
        }
        Ok(Self { observations })
    }

    /// Parse delimited text: four numeric fields per line separated by commas,
    /// semicolons or whitespace. Blank lines and `#` comments are skipped. The
    /// first content line may be a header, provided none of its fields is a
    /// number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDataset` naming the first offending line.
    ///
    /// # Example
    ///
    /// ```
    /// use roughness::Dataset;
    ///
    /// let text = "V,F,t,Ra\n120,0.1,0.8,1.81\n90,0.07,1.1,1.41\n";
    /// let data = Dataset::parse_delimited(text).unwrap();
    /// assert_eq!(data.len(), 2);
    ///
    /// assert!(Dataset::parse_delimited("V,F,t,Ra\n120,fast,0.8,1.81\n").is_err());
    /// ```
    pub fn parse_delimited(text: &str) -> Result<Self> {
        let mut observations = Vec::new();
        let mut seen_content = false;

        for (line_idx, line) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let fields: Vec<&str> = content
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();

            let parsed: Vec<Option<f64>> = fields.iter().map(|f| f.parse::<f64>().ok()).collect();
            let is_header = !seen_content && parsed.iter().all(Option::is_none);
            seen_content = true;
            if is_header {
                continue;
            }

            let values = match parsed.into_iter().collect::<Option<Vec<f64>>>() {
                Some(values) => values,
                None => {
                    return Err(Error::invalid_dataset(format!(
                        "line {}: non-numeric entry in {:?}",
                        line_no, content
                    )));
                }
            };

            if values.len() != 4 {
                return Err(Error::invalid_dataset(format!(
                    "line {}: expected 4 fields (V, F, t, Ra), found {}",
                    line_no,
                    values.len()
                )));
            }
            observations.push(Observation::new(values[0], values[1], values[2], values[3]));
        }

        Self::from_observations(observations)
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Always false for a validated dataset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The observations in table order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Coded settings of every observation.
    #[must_use]
    pub fn coded_points(&self) -> Vec<CodedPoint> {
        self.observations.iter().map(Observation::coded).collect()
    }

    /// Measured Ra as a vector.
    #[must_use]
    pub fn responses(&self) -> Array1<f64> {
        self.observations.iter().map(|o| o.roughness).collect()
    }

    /// The `N × 10` second-order design matrix of the coded settings.
    #[must_use]
    pub fn design_matrix(&self) -> Array2<f64> {
        design_matrix(&self.coded_points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machining_dataset_shape() {
        let data = Dataset::machining();
        assert_eq!(data.len(), 13);
        assert_eq!(data.responses().len(), 13);
        assert_eq!(data.design_matrix().dim(), (13, 10));
        assert!((data.observations()[12].roughness - 0.74).abs() < 1e-12);
    }

    #[test]
    fn test_machining_design_is_coded_to_cube() {
        for point in Dataset::machining().coded_points() {
            assert!(point.in_unit_cube(1e-9));
        }
    }

    #[test]
    fn test_from_slices_rejects_short_row() {
        let rows = vec![vec![120.0, 0.1, 0.8, 1.81], vec![90.0, 0.1, 0.8]];
        let err = Dataset::from_slices(&rows).unwrap_err();
        assert!(matches!(err, Error::InvalidDataset { .. }));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(Dataset::from_rows(&[]).is_err());
        assert!(Dataset::from_rows(&[[120.0, f64::NAN, 0.8, 1.0]]).is_err());
        assert!(Dataset::from_rows(&[[120.0, 0.1, 0.8, f64::INFINITY]]).is_err());
    }

    #[test]
    fn test_parse_delimited_matches_embedded_table() {
        let mut text = String::from("# turning runs\nV;F;t;Ra\n\n");
        for row in MACHINING_DATA {
            text.push_str(&format!("{} {} {} {}\n", row[0], row[1], row[2], row[3]));
        }
        let parsed = Dataset::parse_delimited(&text).unwrap();
        assert_eq!(parsed, Dataset::machining());
    }

    #[test]
    fn test_parse_delimited_errors() {
        let err =
            Dataset::parse_delimited("120,0.1,0.8,1.81\n120,0.1,abc,1.81\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = Dataset::parse_delimited("120,0.1,0.8\n").unwrap_err();
        assert!(err.to_string().contains("expected 4 fields"));

        assert!(Dataset::parse_delimited("V,F,t,Ra\n").is_err());
        assert!(Dataset::parse_delimited("").is_err());
    }

    #[test]
    fn test_parse_delimited_bad_first_row_is_not_a_header() {
        let err =
            Dataset::parse_delimited("120,fast,0.8,1.81\n90,0.07,1.1,1.41\n").unwrap_err();
        assert!(matches!(err, Error::InvalidDataset { .. }));
        assert!(err.to_string().contains("line 1"), "{err}");

        // comments and blank lines ahead of the header are fine
        let data = Dataset::parse_delimited("# run log\n\nV F t Ra\n90 0.07 1.1 1.41\n").unwrap();
        assert_eq!(data.len(), 1);
    }
}
