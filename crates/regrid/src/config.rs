//! TOML configuration for the variable taxonomy and dataset registry.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{RegridError, Result};

/// One dataset entry in the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Locator the source is opened from (path or `file://` URL).
    pub url: String,
    /// Variables this dataset is declared to supply. When omitted, the
    /// dataset is assumed to supply every configured variable.
    #[serde(default)]
    pub variables: Option<Vec<String>>,
}

/// A vector quantity derived from two component variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorPair {
    /// Name of the derived magnitude variable.
    pub name: String,
    /// X-component variable name.
    pub x: String,
    /// Y-component variable name.
    pub y: String,
}

/// The full extractor configuration.
///
/// Dataset declaration order is significant: it is the search priority
/// when resolving a variable to a dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Scalar variables to extract, by CF standard name or storage name.
    #[serde(default)]
    pub scalar_variables: Vec<String>,
    /// Vector variables, each exactly two component names `[x, y]`.
    #[serde(default)]
    pub vector_variables: Vec<Vec<String>>,
    /// Dataset registry, in priority order.
    #[serde(default)]
    pub datasets: IndexMap<String, DatasetConfig>,
}

impl SourcesConfig {
    /// Parse a configuration document.
    pub fn from_str(doc: &str) -> Result<Self> {
        let config: Self = toml::from_str(doc)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let doc = fs::read_to_string(path)?;
        Self::from_str(&doc)
    }

    fn validate(&self) -> Result<()> {
        for pair in &self.vector_variables {
            if pair.len() != 2 {
                return Err(RegridError::Config(format!(
                    "vector variable must have exactly 2 components, got {:?}",
                    pair
                )));
            }
        }
        Ok(())
    }

    /// Union of all configured variable names, scalar components first.
    /// This is what a dataset with no explicit `variables` list is
    /// assumed to supply.
    pub fn global_variables(&self) -> Vec<String> {
        let mut all = self.scalar_variables.clone();
        for pair in &self.vector_variables {
            for component in pair {
                if !all.contains(component) {
                    all.push(component.clone());
                }
            }
        }
        all
    }

    /// Keep only datasets whose name contains any of `filters`
    /// (case-sensitive substring match). An empty filter list keeps
    /// everything.
    pub fn retain_datasets(&mut self, filters: &[String]) {
        if filters.is_empty() {
            return;
        }
        self.datasets
            .retain(|name, _| filters.iter().any(|f| name.contains(f.as_str())));
    }

    /// Keep only variables whose name contains any of `filters`. Vector
    /// pairs are kept when either component matches.
    pub fn retain_variables(&mut self, filters: &[String]) {
        if filters.is_empty() {
            return;
        }
        let matches = |name: &str| filters.iter().any(|f| name.contains(f.as_str()));
        self.scalar_variables.retain(|v| matches(v));
        self.vector_variables
            .retain(|pair| pair.iter().any(|v| matches(v)));
    }

    /// The configured vector pairs with their derived names.
    pub fn vector_pairs(&self) -> Vec<VectorPair> {
        self.vector_variables
            .iter()
            .map(|pair| VectorPair {
                name: format!("{}_{}_magnitude", pair[0], pair[1]),
                x: pair[0].clone(),
                y: pair[1].clone(),
            })
            .collect()
    }
}
