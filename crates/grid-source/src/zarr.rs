//! Zarr V3 gridded source implementation.
//!
//! Store layout: a root group whose attributes carry the dataset
//! geometry (`x`, `y`, `time` as RFC 3339 strings, `grid_mapping` as a
//! CF attribute record, and optionally `variables` mapping variable
//! name to CF standard name). Each variable is a `(time, y, x)` or
//! `(time, depth, y, x)` float32 array directly under the root.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use grid_common::TimeRange;
use serde_json::{Map, Value};
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::storage::{ReadableStorageTraits, StoreKey};
use zarrs_filesystem::FilesystemStore;

use crate::error::{Result, SourceError};
use crate::{coord_slice, Block, GriddedSource, VariableHandle};

/// A Zarr V3 store on the local filesystem.
pub struct ZarrSource {
    locator: String,
    store: Arc<FilesystemStore>,
    x: Vec<f64>,
    y: Vec<f64>,
    times: Vec<DateTime<Utc>>,
    grid_mapping: Map<String, Value>,
    /// variable name -> CF standard name, from group attributes.
    standard_names: BTreeMap<String, String>,
}

impl ZarrSource {
    /// Open a Zarr store; `locator` is kept for provenance, `path` is
    /// the filesystem location.
    pub fn open(locator: &str, path: &str) -> Result<Self> {
        tracing::info!(locator, "opening zarr store");

        let store = Arc::new(
            FilesystemStore::new(path).map_err(|e| SourceError::open_failed(e.to_string()))?,
        );

        let attrs = Self::read_group_attrs(&store)?;

        let x = Self::coord_vector(&attrs, "x")?;
        let y = Self::coord_vector(&attrs, "y")?;
        let times = Self::time_vector(&attrs)?;

        let grid_mapping = attrs
            .get("grid_mapping")
            .and_then(|v| v.as_object())
            .cloned()
            .ok_or_else(|| SourceError::invalid_metadata("missing grid_mapping attribute"))?;

        let standard_names = attrs
            .get("variables")
            .and_then(|v| v.as_object())
            .map(|vars| {
                vars.iter()
                    .filter_map(|(name, sn)| {
                        sn.as_str().map(|sn| (name.clone(), sn.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(
            nx = x.len(),
            ny = y.len(),
            nt = times.len(),
            "zarr store geometry"
        );

        Ok(Self {
            locator: locator.to_string(),
            store,
            x,
            y,
            times,
            grid_mapping,
            standard_names,
        })
    }

    /// Read the root group's attribute record from `zarr.json`.
    fn read_group_attrs(store: &Arc<FilesystemStore>) -> Result<Map<String, Value>> {
        let key = StoreKey::new("zarr.json")
            .map_err(|e| SourceError::invalid_metadata(e.to_string()))?;
        let bytes = store
            .get(&key)
            .map_err(|e| SourceError::Storage(e.to_string()))?
            .ok_or_else(|| SourceError::open_failed("store has no root zarr.json"))?;

        let doc: Value = serde_json::from_slice(&bytes)?;
        Ok(doc
            .get("attributes")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default())
    }

    fn coord_vector(attrs: &Map<String, Value>, name: &str) -> Result<Vec<f64>> {
        attrs
            .get(name)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect::<Vec<_>>())
            .filter(|v: &Vec<f64>| !v.is_empty())
            .ok_or_else(|| {
                SourceError::invalid_metadata(format!("missing coordinate vector '{name}'"))
            })
    }

    fn time_vector(attrs: &Map<String, Value>) -> Result<Vec<DateTime<Utc>>> {
        let raw = attrs
            .get("time")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SourceError::invalid_metadata("missing time vector"))?;

        raw.iter()
            .map(|v| {
                let s = v
                    .as_str()
                    .ok_or_else(|| SourceError::invalid_metadata("time stamp is not a string"))?;
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| SourceError::invalid_metadata(format!("bad time stamp '{s}': {e}")))
            })
            .collect()
    }

    fn open_array(&self, name: &str) -> Result<Array<FilesystemStore>> {
        Array::open(self.store.clone(), &format!("/{name}"))
            .map_err(|e| SourceError::open_failed(e.to_string()))
    }

    fn handle_from_array(&self, name: &str, array: &Array<FilesystemStore>) -> VariableHandle {
        let attrs: BTreeMap<String, String> = array
            .attributes()
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        VariableHandle {
            name: name.to_string(),
            standard_name: attrs.get("standard_name").cloned(),
            units: attrs.get("units").cloned(),
            has_depth: array.shape().len() == 4,
            attrs,
        }
    }
}

impl GriddedSource for ZarrSource {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn x(&self) -> &[f64] {
        &self.x
    }

    fn y(&self) -> &[f64] {
        &self.y
    }

    fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    fn grid_mapping(&self) -> &Map<String, Value> {
        &self.grid_mapping
    }

    fn resolve(&self, name: &str) -> Option<VariableHandle> {
        // Storage name first, then CF standard name.
        let storage_name = if self.standard_names.contains_key(name) {
            name.to_string()
        } else {
            self.standard_names
                .iter()
                .find(|(_, sn)| sn.as_str() == name)
                .map(|(n, _)| n.clone())
                .unwrap_or_else(|| name.to_string())
        };

        match self.open_array(&storage_name) {
            Ok(array) => Some(self.handle_from_array(&storage_name, &array)),
            Err(e) => {
                tracing::debug!(variable = name, error = %e, "variable did not resolve");
                None
            }
        }
    }

    fn read_block(
        &self,
        var: &VariableHandle,
        time: &TimeRange,
        x_range: (f64, f64),
        y_range: (f64, f64),
    ) -> Result<Block> {
        let array = self.open_array(&var.name)?;
        let shape = array.shape();

        let (expect_ny, expect_nx) = (self.y.len() as u64, self.x.len() as u64);
        if shape.len() < 3
            || shape[shape.len() - 1] != expect_nx
            || shape[shape.len() - 2] != expect_ny
        {
            return Err(SourceError::invalid_metadata(format!(
                "variable '{}' shape {:?} does not match grid ({expect_ny} x {expect_nx})",
                var.name, shape
            )));
        }

        let tr = time.indices_within(&self.times);
        let xr = coord_slice(&self.x, x_range.0, x_range.1);
        let yr = coord_slice(&self.y, y_range.0, y_range.1);

        if xr.is_empty() || yr.is_empty() {
            return Err(SourceError::EmptyBlock {
                requested: format!(
                    "x {}..{}, y {}..{}",
                    x_range.0, x_range.1, y_range.0, y_range.1
                ),
                extent: format!(
                    "x {}..{}, y {}..{}",
                    self.x[0],
                    self.x[self.x.len() - 1],
                    self.y[0],
                    self.y[self.y.len() - 1]
                ),
            });
        }

        // Depth axis, when present, is pinned to index 0.
        let (start, sub_shape) = if var.has_depth {
            (
                vec![tr.start as u64, 0, yr.start as u64, xr.start as u64],
                vec![tr.len() as u64, 1, yr.len() as u64, xr.len() as u64],
            )
        } else {
            (
                vec![tr.start as u64, yr.start as u64, xr.start as u64],
                vec![tr.len() as u64, yr.len() as u64, xr.len() as u64],
            )
        };

        let subset = ArraySubset::new_with_start_shape(start, sub_shape)
            .map_err(|e| SourceError::read_failed(e.to_string()))?;

        let data: Vec<f32> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| SourceError::read_failed(e.to_string()))?;

        tracing::debug!(
            variable = %var.name,
            nt = tr.len(),
            ny = yr.len(),
            nx = xr.len(),
            "materialized block"
        );

        Ok(Block {
            data,
            nt: tr.len(),
            ny: yr.len(),
            nx: xr.len(),
            x0: self.x[xr.start],
            y0: self.y[yr.start],
            times: self.times[tr].to_vec(),
        })
    }
}
