//! Gridded data source abstraction.
//!
//! A [`GriddedSource`] opens a locator (path or URL) into a labeled,
//! time-indexed array collection with `X`/`Y` coordinate vectors, time
//! stamps, an optional `depth` dimension per variable, and a CF
//! grid-mapping attribute record describing the native projection.
//!
//! The regridding engine only ever materializes a spatial/time
//! sub-block of a variable ([`GriddedSource::read_block`]); the full
//! source grid is never loaded.

pub mod error;
pub mod memory;
pub mod testdata;
pub mod zarr;

pub use error::{Result, SourceError};
pub use memory::{MemorySource, MemorySourceBuilder};
pub use zarr::ZarrSource;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use grid_common::TimeRange;
use serde_json::{Map, Value};

/// A resolved variable within a source.
///
/// Resolution is an explicit capability: [`GriddedSource::resolve`]
/// matches the storage variable name first, then the CF
/// `standard_name`, and returns `None` when neither matches.
#[derive(Debug, Clone)]
pub struct VariableHandle {
    /// Storage variable name.
    pub name: String,
    /// CF standard name, when declared.
    pub standard_name: Option<String>,
    /// Physical units, when declared.
    pub units: Option<String>,
    /// Whether the stored variable carries a depth dimension.
    pub has_depth: bool,
    /// All string attributes of the variable (propagated to outputs).
    pub attrs: BTreeMap<String, String>,
}

/// A fully materialized sub-block of one variable.
///
/// Data is laid out `(time, y, x)` row-major. `x0`/`y0` are the actual
/// coordinates of the first included column/row, which is what the
/// floor-truncation index arithmetic is relative to.
#[derive(Debug, Clone)]
pub struct Block {
    pub data: Vec<f32>,
    pub nt: usize,
    pub ny: usize,
    pub nx: usize,
    /// Coordinate of the first included column.
    pub x0: f64,
    /// Coordinate of the first included row.
    pub y0: f64,
    /// Time stamps of the included steps, ascending.
    pub times: Vec<DateTime<Utc>>,
}

impl Block {
    /// Value at `(t, j, i)`, or `None` when any index is out of range.
    pub fn get(&self, t: usize, j: usize, i: usize) -> Option<f32> {
        if t >= self.nt || j >= self.ny || i >= self.nx {
            return None;
        }
        self.data.get((t * self.ny + j) * self.nx + i).copied()
    }
}

/// Contract for gridded data backends.
///
/// Implementations expose the source's regular grid geometry and
/// support lazy sub-block extraction; opening and reading are
/// synchronous and any I/O failure is fatal.
pub trait GriddedSource {
    /// The URL or path this source was opened from.
    fn locator(&self) -> &str;

    /// X coordinate vector, native units, ascending.
    fn x(&self) -> &[f64];

    /// Y coordinate vector, native units, ascending.
    fn y(&self) -> &[f64];

    /// Time stamps, ascending.
    fn times(&self) -> &[DateTime<Utc>];

    /// CF grid-mapping attributes describing the native projection.
    fn grid_mapping(&self) -> &Map<String, Value>;

    /// Resolve a requested variable by name or CF standard name.
    fn resolve(&self, name: &str) -> Option<VariableHandle>;

    /// Materialize the sub-block of `var` covering the closed time
    /// interval and the inclusive coordinate ranges `x_range`/`y_range`.
    ///
    /// When the variable has a depth dimension, only index 0 (the
    /// shallowest stored level) is read; deeper levels are discarded.
    fn read_block(
        &self,
        var: &VariableHandle,
        time: &TimeRange,
        x_range: (f64, f64),
        y_range: (f64, f64),
    ) -> Result<Block>;
}

/// Open a locator into a gridded source.
///
/// Accepts filesystem paths and `file://` URLs pointing at Zarr V3
/// stores.
pub fn open(locator: &str) -> Result<Box<dyn GriddedSource>> {
    let path = locator.strip_prefix("file://").unwrap_or(locator);
    Ok(Box::new(ZarrSource::open(locator, path)?))
}

/// Indices of all ascending coordinates v with `lo <= v <= hi`.
pub(crate) fn coord_slice(coords: &[f64], lo: f64, hi: f64) -> std::ops::Range<usize> {
    let start = coords.partition_point(|&v| v < lo);
    let end = coords.partition_point(|&v| v <= hi);
    start..end.max(start)
}
