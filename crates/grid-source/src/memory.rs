//! In-memory gridded source.
//!
//! Used by unit and integration tests, and as the reference
//! implementation of the [`GriddedSource`] contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use grid_common::TimeRange;
use serde_json::{json, Map, Value};

use crate::error::{Result, SourceError};
use crate::{coord_slice, Block, GriddedSource, VariableHandle};

/// One stored variable: dense `(time, [depth,] y, x)` data.
#[derive(Debug, Clone)]
struct MemoryVariable {
    standard_name: Option<String>,
    units: Option<String>,
    attrs: BTreeMap<String, String>,
    /// Number of depth levels; 0 when the variable has no depth axis.
    nz: usize,
    data: Vec<f32>,
}

/// An in-memory implementation of [`GriddedSource`].
#[derive(Debug)]
pub struct MemorySource {
    locator: String,
    x: Vec<f64>,
    y: Vec<f64>,
    times: Vec<DateTime<Utc>>,
    grid_mapping: Map<String, Value>,
    variables: BTreeMap<String, MemoryVariable>,
}

impl MemorySource {
    pub fn builder(locator: impl Into<String>) -> MemorySourceBuilder {
        MemorySourceBuilder::new(locator)
    }
}

impl GriddedSource for MemorySource {
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
        let (var_name, var) = self
            .variables
            .get_key_value(name)
            .or_else(|| {
                self.variables
                    .iter()
                    .find(|(_, v)| v.standard_name.as_deref() == Some(name))
            })?;

        Some(VariableHandle {
            name: var_name.clone(),
            standard_name: var.standard_name.clone(),
            units: var.units.clone(),
            has_depth: var.nz > 0,
            attrs: var.attrs.clone(),
        })
    }

    fn read_block(
        &self,
        var: &VariableHandle,
        time: &TimeRange,
        x_range: (f64, f64),
        y_range: (f64, f64),
    ) -> Result<Block> {
        let stored = self
            .variables
            .get(&var.name)
            .ok_or_else(|| SourceError::read_failed(format!("no such variable: {}", var.name)))?;

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

        let (src_ny, src_nx) = (self.y.len(), self.x.len());
        let nz = stored.nz.max(1);
        let mut data = Vec::with_capacity(tr.len() * yr.len() * xr.len());

        for t in tr.clone() {
            for j in yr.clone() {
                for i in xr.clone() {
                    // Depth index 0 only; layout (time, [depth,] y, x).
                    let idx = ((t * nz) * src_ny + j) * src_nx + i;
                    data.push(stored.data[idx]);
                }
            }
        }

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

/// Builder for [`MemorySource`].
#[derive(Debug)]
pub struct MemorySourceBuilder {
    locator: String,
    x: Vec<f64>,
    y: Vec<f64>,
    times: Vec<DateTime<Utc>>,
    grid_mapping: Map<String, Value>,
    variables: BTreeMap<String, MemoryVariable>,
}

impl MemorySourceBuilder {
    pub fn new(locator: impl Into<String>) -> Self {
        let grid_mapping = json!({ "grid_mapping_name": "latitude_longitude" })
            .as_object()
            .cloned()
            .unwrap_or_default();

        Self {
            locator: locator.into(),
            x: Vec::new(),
            y: Vec::new(),
            times: Vec::new(),
            grid_mapping,
            variables: BTreeMap::new(),
        }
    }

    pub fn x(mut self, x: Vec<f64>) -> Self {
        self.x = x;
        self
    }

    pub fn y(mut self, y: Vec<f64>) -> Self {
        self.y = y;
        self
    }

    pub fn times(mut self, times: Vec<DateTime<Utc>>) -> Self {
        self.times = times;
        self
    }

    /// Replace the default latitude/longitude grid mapping.
    pub fn grid_mapping(mut self, attrs: Map<String, Value>) -> Self {
        self.grid_mapping = attrs;
        self
    }

    /// Add a depth-less variable with dense `(time, y, x)` data.
    pub fn scalar(
        self,
        name: &str,
        standard_name: Option<&str>,
        units: Option<&str>,
        data: Vec<f32>,
    ) -> Self {
        self.variable(name, standard_name, units, 0, data)
    }

    /// Add a variable with `nz` depth levels, dense `(time, depth, y, x)`.
    pub fn with_depth(
        self,
        name: &str,
        standard_name: Option<&str>,
        units: Option<&str>,
        nz: usize,
        data: Vec<f32>,
    ) -> Self {
        self.variable(name, standard_name, units, nz, data)
    }

    fn variable(
        mut self,
        name: &str,
        standard_name: Option<&str>,
        units: Option<&str>,
        nz: usize,
        data: Vec<f32>,
    ) -> Self {
        let mut attrs = BTreeMap::new();
        if let Some(sn) = standard_name {
            attrs.insert("standard_name".to_string(), sn.to_string());
        }
        if let Some(u) = units {
            attrs.insert("units".to_string(), u.to_string());
        }

        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                standard_name: standard_name.map(str::to_string),
                units: units.map(str::to_string),
                attrs,
                nz,
                data,
            },
        );
        self
    }

    pub fn build(self) -> Result<MemorySource> {
        if self.x.len() < 2 || self.y.len() < 2 {
            return Err(SourceError::invalid_metadata(
                "memory source needs at least a 2x2 grid",
            ));
        }

        let cells = self.y.len() * self.x.len();
        for (name, var) in &self.variables {
            let expect = self.times.len() * var.nz.max(1) * cells;
            if var.data.len() != expect {
                return Err(SourceError::invalid_metadata(format!(
                    "variable '{}' has {} values, expected {}",
                    name,
                    var.data.len(),
                    expect
                )));
            }
        }

        Ok(MemorySource {
            locator: self.locator,
            x: self.x,
            y: self.y,
            times: self.times,
            grid_mapping: self.grid_mapping,
            variables: self.variables,
        })
    }
}
