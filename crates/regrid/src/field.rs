//! Dense output fields on the target grid.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// A regridded field: dense `(time, y, x)` values aligned to the target
/// grid, with CF-style coordinate metadata.
///
/// Cells the source did not cover hold [`Field::MISSING`]; use
/// [`Field::is_missing`] rather than comparing against the sentinel
/// directly.
#[derive(Debug, Clone)]
pub struct Field {
    /// Variable name.
    pub name: String,
    /// Row-major `(time, y, x)` values.
    pub data: Vec<f32>,
    pub nt: usize,
    pub ny: usize,
    pub nx: usize,
    /// Time stamps, one per step.
    pub times: Vec<DateTime<Utc>>,
    /// Output latitude vector (degrees north), length `ny`.
    pub latitude: Vec<f64>,
    /// Output longitude vector (degrees east), length `nx`.
    pub longitude: Vec<f64>,
    /// Variable attributes (source attrs plus provenance).
    pub attrs: BTreeMap<String, String>,
}

impl Field {
    /// The missing-value sentinel. Fields are float32 and the reserved
    /// sentinel is NaN; cells never written during extraction keep it.
    pub const MISSING: f32 = f32::NAN;

    /// Whether a value is the missing sentinel.
    pub fn is_missing(value: f32) -> bool {
        value.is_nan()
    }

    /// Allocate a sentinel-filled field on the target grid.
    pub fn filled(
        name: impl Into<String>,
        times: Vec<DateTime<Utc>>,
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        attrs: BTreeMap<String, String>,
    ) -> Self {
        let (nt, ny, nx) = (times.len(), latitude.len(), longitude.len());
        Self {
            name: name.into(),
            data: vec![Self::MISSING; nt * ny * nx],
            nt,
            ny,
            nx,
            times,
            latitude,
            longitude,
            attrs,
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nt, self.ny, self.nx)
    }

    pub fn get(&self, t: usize, j: usize, i: usize) -> Option<f32> {
        if t >= self.nt || j >= self.ny || i >= self.nx {
            return None;
        }
        self.data.get((t * self.ny + j) * self.nx + i).copied()
    }

    pub fn set(&mut self, t: usize, j: usize, i: usize, value: f32) {
        debug_assert!(t < self.nt && j < self.ny && i < self.nx);
        self.data[(t * self.ny + j) * self.nx + i] = value;
    }

    /// Number of cells holding the missing sentinel.
    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| Self::is_missing(**v)).count()
    }

    /// CF attributes for the output latitude coordinate.
    pub fn latitude_attrs() -> [(&'static str, &'static str); 3] {
        [
            ("units", "degrees_north"),
            ("standard_name", "latitude"),
            ("long_name", "latitude"),
        ]
    }

    /// CF attributes for the output longitude coordinate.
    pub fn longitude_attrs() -> [(&'static str, &'static str); 3] {
        [
            ("units", "degrees_east"),
            ("standard_name", "longitude"),
            ("long_name", "longitude"),
        ]
    }
}
