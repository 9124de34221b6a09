//! Validated 1-D coordinate axes for regular grids.
//!
//! Every source grid axis must be strictly increasing and uniformly
//! spaced; the regridding arithmetic (block slicing, floor-truncation
//! indexing) depends on both. Violations are construction errors and
//! make the dataset unusable.

use thiserror::Error;

/// Relative tolerance for the uniform-spacing check.
const SPACING_TOLERANCE: f64 = 1e-6;

/// Errors raised while validating a coordinate axis.
#[derive(Debug, Error)]
pub enum AxisError {
    #[error("axis '{axis}' has {len} values, need at least 2")]
    TooShort { axis: String, len: usize },

    #[error("axis '{axis}' is not strictly increasing at index {index}")]
    NotIncreasing { axis: String, index: usize },

    #[error(
        "axis '{axis}' is not uniformly spaced: step {found} at index {index}, expected {expected}"
    )]
    NonUniform {
        axis: String,
        index: usize,
        expected: f64,
        found: f64,
    },
}

/// A strictly increasing, uniformly spaced coordinate vector.
#[derive(Debug, Clone)]
pub struct CoordAxis {
    values: Vec<f64>,
    spacing: f64,
}

impl CoordAxis {
    /// Validate and wrap a coordinate vector.
    ///
    /// `axis` names the axis in error messages (e.g. "X", "Y").
    pub fn from_values(axis: &str, values: Vec<f64>) -> Result<Self, AxisError> {
        if values.len() < 2 {
            return Err(AxisError::TooShort {
                axis: axis.to_string(),
                len: values.len(),
            });
        }

        let spacing = values[1] - values[0];
        if spacing <= 0.0 {
            return Err(AxisError::NotIncreasing {
                axis: axis.to_string(),
                index: 1,
            });
        }

        let tol = spacing.abs() * SPACING_TOLERANCE;
        for (i, pair) in values.windows(2).enumerate() {
            let step = pair[1] - pair[0];
            if step <= 0.0 {
                return Err(AxisError::NotIncreasing {
                    axis: axis.to_string(),
                    index: i + 1,
                });
            }
            if (step - spacing).abs() > tol {
                return Err(AxisError::NonUniform {
                    axis: axis.to_string(),
                    index: i + 1,
                    expected: spacing,
                    found: step,
                });
            }
        }

        Ok(Self { values, spacing })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grid spacing (always positive).
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// First (smallest) coordinate.
    pub fn min(&self) -> f64 {
        self.values[0]
    }

    /// Last (largest) coordinate.
    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Indices of all coordinates v with `lo <= v <= hi`.
    ///
    /// Returns an empty range when the interval misses the axis.
    pub fn slice_range(&self, lo: f64, hi: f64) -> std::ops::Range<usize> {
        let start = self.values.partition_point(|&v| v < lo);
        let end = self.values.partition_point(|&v| v <= hi);
        start..end.max(start)
    }

    /// Truncation index of `coord` relative to `origin`:
    /// `floor((coord - origin) / spacing)`.
    ///
    /// This is nearest-neighbor-by-truncation: a coordinate exactly on a
    /// grid node maps to that node, anything between two nodes maps to
    /// the lower-indexed one.
    pub fn floor_index(&self, coord: f64, origin: f64) -> i64 {
        ((coord - origin) / self.spacing).floor() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(values: &[f64]) -> Result<CoordAxis, AxisError> {
        CoordAxis::from_values("X", values.to_vec())
    }

    #[test]
    fn test_uniform_axis_accepted() {
        let a = axis(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(a.spacing(), 1.0);
        assert_eq!(a.min(), 0.0);
        assert_eq!(a.max(), 3.0);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_non_uniform_axis_rejected() {
        let err = axis(&[0.0, 1.0, 2.5, 3.5]).unwrap_err();
        assert!(matches!(err, AxisError::NonUniform { index: 2, .. }));
    }

    #[test]
    fn test_descending_axis_rejected() {
        let err = axis(&[3.0, 2.0, 1.0]).unwrap_err();
        assert!(matches!(err, AxisError::NotIncreasing { .. }));
    }

    #[test]
    fn test_short_axis_rejected() {
        let err = axis(&[1.0]).unwrap_err();
        assert!(matches!(err, AxisError::TooShort { len: 1, .. }));
    }

    #[test]
    fn test_slice_range_inclusive() {
        let a = axis(&[0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(a.slice_range(1.0, 3.0), 1..4);
        assert_eq!(a.slice_range(0.5, 2.5), 1..3);
        assert_eq!(a.slice_range(10.0, 20.0), 5..5);
        assert_eq!(a.slice_range(-5.0, 10.0), 0..5);
    }

    #[test]
    fn test_floor_index_truncates_toward_lower() {
        let a = axis(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        // Exactly on a node: that node, no off-by-one.
        assert_eq!(a.floor_index(2.0, 0.0), 2);
        // Between nodes: the lower-indexed neighbor, never the closer one.
        assert_eq!(a.floor_index(2.5, 0.0), 2);
        assert_eq!(a.floor_index(2.99, 0.0), 2);
        assert_eq!(a.floor_index(0.5, 1.0), -1);
    }
}
