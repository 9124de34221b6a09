//! A single gridded source dataset and its regridding logic.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use grid_common::{CoordAxis, TimeRange};
use grid_source::{GriddedSource, VariableHandle};
use projection::Projection;
use tracing::{debug, info, warn};

use crate::error::{RegridError, Result};
use crate::field::Field;
use crate::target::Target;

/// The target grid expressed in a dataset's native coordinates.
///
/// Computed once per distinct target and reused for every variable and
/// time window pulled from the same dataset.
#[derive(Debug)]
pub struct GridMapping {
    /// Projected x of every target mesh cell, row-major `(ny, nx)`.
    pub target_x: Vec<f64>,
    /// Projected y of every target mesh cell.
    pub target_y: Vec<f64>,
    /// True where the projected coordinate falls inside the dataset's
    /// `[xmin, xmax) x [ymin, ymax)` extent (upper bounds exclusive).
    pub inbounds: Vec<bool>,
    pub any_inbounds: bool,
}

/// One configured source dataset: geometry, projection and the cached
/// target mapping.
///
/// Immutable after construction except for cache population.
pub struct Dataset {
    name: String,
    url: String,
    variables: Vec<String>,
    source: Box<dyn GriddedSource>,
    x: CoordAxis,
    y: CoordAxis,
    projection: Projection,
    /// Target cache key -> computed mapping. Guarded so compute-once
    /// survives a multi-threaded caller.
    grid_cache: Mutex<HashMap<String, Arc<GridMapping>>>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Dataset ({} / {})>", self.name, self.url)
    }
}

impl Dataset {
    /// Open a dataset through the source factory.
    pub fn open(name: &str, url: &str, variables: Vec<String>) -> Result<Self> {
        let source = grid_source::open(url)?;
        Self::from_source(name, source, variables)
    }

    /// Build a dataset over an already opened source.
    ///
    /// Fails when either coordinate axis is not uniformly spaced or the
    /// grid mapping cannot be turned into a projection; a dataset that
    /// fails construction is unusable.
    pub fn from_source(
        name: &str,
        source: Box<dyn GriddedSource>,
        variables: Vec<String>,
    ) -> Result<Self> {
        info!(
            dataset = name,
            url = source.locator(),
            ?variables,
            "opening dataset"
        );

        let geometry = |source: grid_common::AxisError| RegridError::Geometry {
            dataset: name.to_string(),
            source,
        };
        let x = CoordAxis::from_values("X", source.x().to_vec()).map_err(geometry)?;
        let y = CoordAxis::from_values("Y", source.y().to_vec()).map_err(geometry)?;

        debug!(
            dataset = name,
            nx = x.len(),
            dx = x.spacing(),
            ny = y.len(),
            dy = y.spacing(),
            "grid spacing"
        );
        debug!(
            dataset = name,
            xmin = x.min(),
            xmax = x.max(),
            ymin = y.min(),
            ymax = y.max(),
            "grid extent"
        );

        let projection = Projection::from_grid_mapping(source.grid_mapping()).map_err(|e| {
            RegridError::Projection {
                dataset: name.to_string(),
                source: e,
            }
        })?;
        debug!(dataset = name, projection = ?projection, "derived projection");

        Ok(Self {
            name: name.to_string(),
            url: source.locator().to_string(),
            variables,
            source,
            x,
            y,
            projection,
            grid_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether this dataset is declared to supply `var`.
    pub fn declares(&self, var: &str) -> bool {
        self.variables.iter().any(|v| v == var)
    }

    /// Resolve `var` against the underlying source.
    pub fn resolve(&self, var: &str) -> Option<VariableHandle> {
        self.source.resolve(var)
    }

    /// The location of the target grid in this dataset's coordinate
    /// system, memoized per target identity.
    pub fn calculate_grid(&self, target: &Target) -> Arc<GridMapping> {
        let key = target.cache_key();

        let mut cache = self.grid_cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mapping) = cache.get(&key) {
            return Arc::clone(mapping);
        }

        debug!(
            dataset = %self.name,
            target = %key,
            "calculating target grid mapping"
        );

        let (target_x, target_y) = self.projection.forward_mesh(&target.xx, &target.yy);

        let (xmin, xmax) = (self.x.min(), self.x.max());
        let (ymin, ymax) = (self.y.min(), self.y.max());
        let inbounds: Vec<bool> = target_x
            .iter()
            .zip(&target_y)
            .map(|(&x, &y)| x >= xmin && x < xmax && y >= ymin && y < ymax)
            .collect();

        let any_inbounds = inbounds.iter().any(|&b| b);
        if !any_inbounds {
            warn!(dataset = %self.name, "target is outside the domain of this dataset");
        }

        let mapping = Arc::new(GridMapping {
            target_x,
            target_y,
            inbounds,
            any_inbounds,
        });
        cache.insert(key, Arc::clone(&mapping));
        mapping
    }

    /// Extract `var` onto the target grid for the closed time interval
    /// `[t0, t1]`, nearest-neighbor-by-truncation.
    ///
    /// A target entirely outside this dataset's domain yields an
    /// all-missing field, not an error. Cells outside the domain stay
    /// at [`Field::MISSING`].
    pub fn regrid(
        &self,
        var: &VariableHandle,
        target: &Target,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
    ) -> Result<Field> {
        info!(
            dataset = %self.name,
            variable = %var.name,
            %t0,
            %t1,
            "regridding"
        );

        let mapping = self.calculate_grid(target);
        let time = TimeRange::new(t0, t1);

        let mut attrs = var.attrs.clone();
        attrs.insert("grid_mapping".to_string(), target.proj_name.clone());
        attrs.insert("source".to_string(), self.url.clone());

        if !mapping.any_inbounds {
            // Domain mismatch degrades to an all-missing result.
            let range = time.indices_within(self.source.times());
            let times = self.source.times()[range].to_vec();
            return Ok(Field::filled(
                var.name.clone(),
                times,
                target.y.clone(),
                target.x.clone(),
                attrs,
            ));
        }

        // Minimal enclosing sub-block of the in-bounds target cells,
        // expanded by one grid spacing per side against floor rounding
        // at the block edges.
        let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY);
        for (idx, &inb) in mapping.inbounds.iter().enumerate() {
            if inb {
                x0 = x0.min(mapping.target_x[idx]);
                x1 = x1.max(mapping.target_x[idx]);
                y0 = y0.min(mapping.target_y[idx]);
                y1 = y1.max(mapping.target_y[idx]);
            }
        }
        let (dx, dy) = (self.x.spacing(), self.y.spacing());

        debug!(
            dataset = %self.name,
            x0 = x0 - dx,
            x1 = x1 + dx,
            y0 = y0 - dy,
            y1 = y1 + dy,
            "loading block"
        );
        let block = self
            .source
            .read_block(var, &time, (x0 - dx, x1 + dx), (y0 - dy, y1 + dy))?;

        let mut field = Field::filled(
            var.name.clone(),
            block.times.clone(),
            target.y.clone(),
            target.x.clone(),
            attrs,
        );

        for (idx, &inb) in mapping.inbounds.iter().enumerate() {
            if !inb {
                continue;
            }
            let bi = self.x.floor_index(mapping.target_x[idx], block.x0);
            let bj = self.y.floor_index(mapping.target_y[idx], block.y0);
            if bi < 0 || bj < 0 {
                continue;
            }

            let (j, i) = (idx / target.nx, idx % target.nx);
            for t in 0..block.nt {
                if let Some(value) = block.get(t, bj as usize, bi as usize) {
                    field.set(t, j, i, value);
                }
            }
        }

        debug!(
            dataset = %self.name,
            block_shape = ?(block.nt, block.ny, block.nx),
            field_shape = ?field.shape(),
            missing = field.missing_count(),
            "block extracted"
        );

        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use grid_common::BoundingBox;
    use grid_source::MemorySource;

    fn hours(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|h| Utc.with_ymd_and_hms(2024, 3, 1, h as u32, 0, 0).unwrap())
            .collect()
    }

    /// 4x4 lat/lon grid, dx=dy=1, origin (0,0);
    /// value = t*1000 + row*100 + col.
    fn dataset(nt: usize) -> Dataset {
        let mut data = Vec::new();
        for t in 0..nt {
            for j in 0..4 {
                for i in 0..4 {
                    data.push((t * 1000 + j * 100 + i) as f32);
                }
            }
        }
        let source = MemorySource::builder("mem://test")
            .x(vec![0.0, 1.0, 2.0, 3.0])
            .y(vec![0.0, 1.0, 2.0, 3.0])
            .times(hours(nt))
            .scalar("temp", Some("sea_water_temperature"), Some("degC"), data)
            .build()
            .unwrap();

        Dataset::from_source("test", Box::new(source), vec!["temp".into()]).unwrap()
    }

    #[test]
    fn test_non_uniform_axis_is_fatal() {
        let source = MemorySource::builder("mem://bad")
            .x(vec![0.0, 1.0, 2.5])
            .y(vec![0.0, 1.0, 2.0])
            .times(hours(1))
            .scalar("temp", None, None, vec![0.0; 9])
            .build()
            .unwrap();

        let err = Dataset::from_source("bad", Box::new(source), vec![]).unwrap_err();
        assert!(matches!(err, RegridError::Geometry { .. }));
    }

    #[test]
    fn test_calculate_grid_is_memoized() {
        let ds = dataset(1);
        let target = Target::new(BoundingBox::new(0.0, 0.0, 2.0, 2.0), 3, 3).unwrap();

        let a = ds.calculate_grid(&target);
        let b = ds.calculate_grid(&target);
        assert!(Arc::ptr_eq(&a, &b));

        // A different target never reuses the entry.
        let other = Target::new(BoundingBox::new(0.0, 0.0, 2.0, 2.0), 3, 4).unwrap();
        let c = ds.calculate_grid(&other);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_inbounds_upper_bound_exclusive() {
        let ds = dataset(1);
        // Mesh rows/cols at 0..3 inclusive; 3.0 == xmax/ymax is out.
        let target = Target::new(BoundingBox::new(0.0, 0.0, 3.0, 3.0), 4, 4).unwrap();
        let mapping = ds.calculate_grid(&target);

        assert!(mapping.inbounds[0]); // (0, 0)
        assert!(!mapping.inbounds[3]); // (3.0, 0)
        assert!(!mapping.inbounds[12]); // (0, 3.0)
        assert!(mapping.any_inbounds);
    }

    #[test]
    fn test_outside_domain_is_all_missing() {
        let ds = dataset(2);
        let target = Target::new(BoundingBox::new(100.0, 100.0, 110.0, 110.0), 5, 5).unwrap();

        let mapping = ds.calculate_grid(&target);
        assert!(!mapping.any_inbounds);

        let var = ds.resolve("temp").unwrap();
        let times = hours(2);
        let field = ds.regrid(&var, &target, times[0], times[1]).unwrap();

        assert_eq!(field.shape(), (2, 5, 5));
        assert_eq!(field.missing_count(), 2 * 5 * 5);
    }

    #[test]
    fn test_truncation_picks_lower_node() {
        let ds = dataset(1);
        // One in-bounds point at (2.5, 2.5): floor selects node (2, 2).
        let target = Target::new(BoundingBox::new(2.5, 2.5, 20.0, 20.0), 8, 8).unwrap();
        let var = ds.resolve("temp").unwrap();
        let t = hours(1)[0];

        let field = ds.regrid(&var, &target, t, t).unwrap();
        assert_eq!(field.get(0, 0, 0), Some(202.0));
        // Everything else is outside the 4x4 domain.
        assert_eq!(field.missing_count(), 8 * 8 - 1);
    }

    #[test]
    fn test_point_on_node_maps_to_that_node() {
        let ds = dataset(1);
        let target = Target::new(BoundingBox::new(1.0, 2.0, 30.0, 30.0), 8, 8).unwrap();
        let var = ds.resolve("temp").unwrap();
        let t = hours(1)[0];

        let field = ds.regrid(&var, &target, t, t).unwrap();
        // Target (1.0, 2.0) sits exactly on source node (col 1, row 2).
        assert_eq!(field.get(0, 0, 0), Some(201.0));
    }

    #[test]
    fn test_output_shape_and_attrs() {
        let ds = dataset(3);
        let target = Target::new(BoundingBox::new(0.2, 0.2, 2.8, 2.8), 7, 5).unwrap();
        let var = ds.resolve("temp").unwrap();
        let times = hours(3);

        // Closed interval [t0, t1] keeps both endpoints.
        let field = ds.regrid(&var, &target, times[0], times[2]).unwrap();
        assert_eq!(field.shape(), (3, 5, 7));
        assert_eq!(field.missing_count(), 0);

        assert_eq!(field.attrs.get("grid_mapping").unwrap(), "latitude_longitude");
        assert_eq!(field.attrs.get("source").unwrap(), "mem://test");
        assert_eq!(field.attrs.get("units").unwrap(), "degC");
    }

    #[test]
    fn test_time_subset() {
        let ds = dataset(4);
        let target = Target::new(BoundingBox::new(0.2, 0.2, 2.8, 2.8), 4, 4).unwrap();
        let var = ds.resolve("temp").unwrap();
        let times = hours(4);

        let field = ds.regrid(&var, &target, times[1], times[2]).unwrap();
        assert_eq!(field.nt, 2);
        assert_eq!(field.times, &times[1..3]);
        // First step of the output is source t=1 (values offset 1000).
        let v = field.get(0, 0, 0).unwrap();
        assert!((1000.0..2000.0).contains(&v), "got {v}");
    }
}
