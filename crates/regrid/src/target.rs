//! The destination grid for all extracted fields.

use std::collections::BTreeMap;

use grid_common::BoundingBox;

use crate::error::{RegridError, Result};

/// CF grid-mapping record attached to the output collection.
#[derive(Debug, Clone)]
pub struct GridMappingRecord {
    /// Name of the grid-mapping entry (also the `grid_mapping` value
    /// stamped on every output field).
    pub name: String,
    pub attrs: BTreeMap<String, String>,
}

/// A rectangular lat/lon target grid.
///
/// Constructed from a bounding box in degrees and a resolution; output
/// coordinate vectors include both endpoints.
#[derive(Debug, Clone)]
pub struct Target {
    pub bbox: BoundingBox,
    pub nx: usize,
    pub ny: usize,
    /// Output longitude vector, length `nx`.
    pub x: Vec<f64>,
    /// Output latitude vector, length `ny`.
    pub y: Vec<f64>,
    /// 2-D longitude mesh, row-major `(ny, nx)`.
    pub xx: Vec<f64>,
    /// 2-D latitude mesh, row-major `(ny, nx)`.
    pub yy: Vec<f64>,
    /// Projection name of the target grid.
    pub proj_name: String,
}

impl Target {
    pub fn new(bbox: BoundingBox, nx: usize, ny: usize) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(RegridError::Target(format!(
                "resolution must be at least 2x2, got {nx}x{ny}"
            )));
        }

        let x: Vec<f64> = (0..nx)
            .map(|i| bbox.min_x + i as f64 * bbox.width() / (nx - 1) as f64)
            .collect();
        let y: Vec<f64> = (0..ny)
            .map(|j| bbox.min_y + j as f64 * bbox.height() / (ny - 1) as f64)
            .collect();

        let mut xx = Vec::with_capacity(ny * nx);
        let mut yy = Vec::with_capacity(ny * nx);
        for &lat in &y {
            for &lon in &x {
                xx.push(lon);
                yy.push(lat);
            }
        }

        Ok(Self {
            bbox,
            nx,
            ny,
            x,
            y,
            xx,
            yy,
            proj_name: "latitude_longitude".to_string(),
        })
    }

    /// Stable identity of this target, used as the key for per-dataset
    /// grid-mapping caches. Two targets with the same parameters share
    /// a key; any parameter change produces a different key.
    pub fn cache_key(&self) -> String {
        format!("{}_{}x{}", self.bbox.cache_key(), self.nx, self.ny)
    }

    /// Number of mesh cells.
    pub fn mesh_len(&self) -> usize {
        self.ny * self.nx
    }

    /// The CF grid-mapping record describing the target projection.
    pub fn grid_mapping(&self) -> GridMappingRecord {
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "grid_mapping_name".to_string(),
            "latitude_longitude".to_string(),
        );
        GridMappingRecord {
            name: self.proj_name.clone(),
            attrs,
        }
    }
}
