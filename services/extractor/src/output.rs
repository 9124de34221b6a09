//! Zarr V3 output writer.
//!
//! Writes extracted fields as one store: a root group whose attributes
//! carry the target geometry (`x`, `y`, `time`, `grid_mapping`,
//! `variables`), with each field as a `(time, y, x)` float32 array
//! chunked per time step. The layout matches what the source reader
//! expects, so extractor output can itself be opened as a source.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use zarrs::array::{ArrayBuilder, ChunkGrid, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::{StoreKey, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use regrid::{Field, Target};

/// Write all extracted fields to a Zarr store at `path`.
///
/// Geometry attributes come from the target and the first field's time
/// stamps; every array additionally records its own stamps, since
/// datasets may step time differently within the same interval.
pub fn write_store(path: &Path, target: &Target, fields: &[Field]) -> Result<()> {
    info!(path = %path.display(), fields = fields.len(), "writing output store");

    let store = Arc::new(
        FilesystemStore::new(path)
            .with_context(|| format!("creating output store at {}", path.display()))?,
    );

    write_group_metadata(&store, target, fields)?;
    for field in fields {
        write_field(&store, field)?;
    }

    Ok(())
}

fn write_group_metadata(
    store: &Arc<FilesystemStore>,
    target: &Target,
    fields: &[Field],
) -> Result<()> {
    let record = target.grid_mapping();
    let grid_mapping: Map<String, Value> = record
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    let times: Vec<String> = fields
        .first()
        .map(|f| f.times.iter().map(|t| t.to_rfc3339()).collect())
        .unwrap_or_default();

    let mut variables = Map::new();
    for field in fields {
        if let Some(sn) = field.attrs.get("standard_name") {
            variables.insert(field.name.clone(), json!(sn));
        }
    }

    let group = json!({
        "zarr_format": 3,
        "node_type": "group",
        "attributes": {
            "x": target.x,
            "y": target.y,
            "time": times,
            "grid_mapping": grid_mapping,
            "variables": variables,
            "latitude_attrs": attr_map(&Field::latitude_attrs()),
            "longitude_attrs": attr_map(&Field::longitude_attrs()),
        }
    });

    let key = StoreKey::new("zarr.json").map_err(|e| anyhow::anyhow!("{e}"))?;
    let bytes = serde_json::to_vec_pretty(&group)?;
    store
        .set(&key, bytes.into())
        .context("writing group metadata")?;
    Ok(())
}

fn write_field(store: &Arc<FilesystemStore>, field: &Field) -> Result<()> {
    let (nt, ny, nx) = field.shape();
    debug!(variable = %field.name, nt, ny, nx, "writing field");

    let shape = vec![nt as u64, ny as u64, nx as u64];
    // One chunk per time step.
    let chunk_grid: ChunkGrid = vec![1, ny as u64, nx as u64]
        .try_into()
        .map_err(|e| anyhow::anyhow!("chunk grid: {e:?}"))?;

    let mut attrs = Map::new();
    for (k, v) in &field.attrs {
        attrs.insert(k.clone(), json!(v));
    }
    attrs.insert(
        "time".to_string(),
        json!(field.times.iter().map(|t| t.to_rfc3339()).collect::<Vec<_>>()),
    );

    let mut binding = ArrayBuilder::new(
        shape.clone(),
        DataType::Float32,
        chunk_grid,
        FillValue::from(Field::MISSING),
    );
    let builder = binding.attributes(attrs);

    let array = builder
        .build(store.clone(), &format!("/{}", field.name))
        .with_context(|| format!("building array '{}'", field.name))?;
    array
        .store_metadata()
        .with_context(|| format!("writing metadata for '{}'", field.name))?;

    let subset = ArraySubset::new_with_start_shape(vec![0, 0, 0], shape)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    array
        .store_array_subset_elements(&subset, &field.data)
        .with_context(|| format!("writing data for '{}'", field.name))?;

    Ok(())
}

fn attr_map(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}
