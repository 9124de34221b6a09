//! Test fixture generation.
//!
//! Writes small Zarr V3 stores with known value patterns for unit and
//! integration tests. Fixtures are a few kilobytes; tests create them
//! in temporary directories rather than committing them.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::{StoreKey, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::error::{Result, SourceError};

/// One variable of a fixture store.
pub struct FixtureVariable<'a> {
    pub name: &'a str,
    pub standard_name: Option<&'a str>,
    pub units: Option<&'a str>,
    /// Number of depth levels; 0 for a depth-less variable.
    pub nz: usize,
    /// Dense `(time, [depth,] y, x)` values.
    pub data: Vec<f32>,
}

/// Test grid values: `t * 10000 + row * 100 + col`.
///
/// The pattern makes it easy to verify which source cell a regridded
/// value came from.
pub fn create_test_grid(nt: usize, ny: usize, nx: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nt * ny * nx);
    for t in 0..nt {
        for row in 0..ny {
            for col in 0..nx {
                data.push((t * 10000 + row * 100 + col) as f32);
            }
        }
    }
    data
}

/// A latitude/longitude grid-mapping record.
pub fn latlon_grid_mapping() -> Map<String, Value> {
    json!({ "grid_mapping_name": "latitude_longitude" })
        .as_object()
        .cloned()
        .unwrap_or_default()
}

/// Write a complete fixture store understood by [`crate::ZarrSource`].
pub fn write_store(
    path: &Path,
    x: &[f64],
    y: &[f64],
    times: &[DateTime<Utc>],
    grid_mapping: Map<String, Value>,
    variables: &[FixtureVariable<'_>],
) -> Result<()> {
    let store = Arc::new(
        FilesystemStore::new(path).map_err(|e| SourceError::Storage(e.to_string()))?,
    );

    // Root group metadata with the dataset geometry.
    let standard_names: BTreeMap<&str, &str> = variables
        .iter()
        .filter_map(|v| v.standard_name.map(|sn| (v.name, sn)))
        .collect();

    let group = json!({
        "zarr_format": 3,
        "node_type": "group",
        "attributes": {
            "x": x,
            "y": y,
            "time": times.iter().map(|t| t.to_rfc3339()).collect::<Vec<_>>(),
            "grid_mapping": grid_mapping,
            "variables": standard_names,
        }
    });

    let key = StoreKey::new("zarr.json").map_err(|e| SourceError::Storage(e.to_string()))?;
    let bytes = serde_json::to_vec_pretty(&group)?;
    store
        .set(&key, bytes.into())
        .map_err(|e| SourceError::Storage(e.to_string()))?;

    // One float32 array per variable, whole array as a single chunk.
    for var in variables {
        let mut shape = vec![times.len() as u64];
        if var.nz > 0 {
            shape.push(var.nz as u64);
        }
        shape.push(y.len() as u64);
        shape.push(x.len() as u64);

        let expect: u64 = shape.iter().product();
        if var.data.len() as u64 != expect {
            return Err(SourceError::invalid_metadata(format!(
                "fixture variable '{}' has {} values, expected {expect}",
                var.name,
                var.data.len()
            )));
        }

        let mut attrs = Map::new();
        if let Some(sn) = var.standard_name {
            attrs.insert("standard_name".to_string(), json!(sn));
        }
        if let Some(u) = var.units {
            attrs.insert("units".to_string(), json!(u));
        }

        let chunk_grid: zarrs::array::ChunkGrid = shape
            .clone()
            .try_into()
            .map_err(|e| SourceError::invalid_metadata(format!("{e:?}")))?;

        let mut binding = ArrayBuilder::new(
            shape.clone(),
            DataType::Float32,
            chunk_grid,
            FillValue::from(f32::NAN),
        );
        let builder = binding.attributes(attrs);

        let array = builder
            .build(store.clone(), &format!("/{}", var.name))
            .map_err(|e| SourceError::Storage(e.to_string()))?;

        array
            .store_metadata()
            .map_err(|e| SourceError::Storage(e.to_string()))?;

        let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
            .map_err(|e| SourceError::Storage(e.to_string()))?;
        array
            .store_array_subset_elements(&subset, &var.data)
            .map_err(|e| SourceError::Storage(e.to_string()))?;
    }

    Ok(())
}
