//! The ordered dataset registry.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{SourcesConfig, VectorPair};
use crate::dataset::Dataset;
use crate::error::Result;
use grid_source::VariableHandle;

/// All configured datasets plus the variable taxonomy.
///
/// Dataset order is configuration order and defines search priority:
/// variable resolution walks the list and the first dataset that both
/// declares and resolves a variable wins.
#[derive(Debug)]
pub struct Sources {
    pub scalar_variables: Vec<String>,
    pub vector_variables: Vec<VectorPair>,
    datasets: Vec<Dataset>,
}

impl Sources {
    /// Load a configuration file and open every dataset it names.
    ///
    /// Any dataset that fails to open or validate is fatal.
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        info!(path = %path.as_ref().display(), "loading sources configuration");
        let config = SourcesConfig::load(path)?;
        Self::from_config(&config)
    }

    /// Open every dataset in an already parsed configuration.
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let global = config.global_variables();

        let mut datasets = Vec::with_capacity(config.datasets.len());
        for (name, dc) in &config.datasets {
            let variables = dc.variables.clone().unwrap_or_else(|| global.clone());
            datasets.push(Dataset::open(name, &dc.url, variables)?);
        }

        Ok(Self {
            scalar_variables: config.scalar_variables.clone(),
            vector_variables: config.vector_pairs(),
            datasets,
        })
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// The highest-priority dataset that declares and resolves `var`.
    ///
    /// A dataset that declares a variable but cannot resolve it is
    /// skipped with a warning, not an error.
    pub fn find_dataset_for_var(&self, var: &str) -> Option<(&Dataset, VariableHandle)> {
        for dataset in &self.datasets {
            if !dataset.declares(var) {
                continue;
            }
            match dataset.resolve(var) {
                Some(handle) => {
                    debug!(variable = var, dataset = dataset.name(), "resolved variable");
                    return Some((dataset, handle));
                }
                None => {
                    warn!(
                        variable = var,
                        dataset = dataset.name(),
                        "declared variable not present in source"
                    );
                }
            }
        }
        None
    }

    /// The highest-priority dataset that resolves both components of a
    /// vector pair. Components are never mixed across datasets.
    pub fn find_dataset_for_var_pair(
        &self,
        x: &str,
        y: &str,
    ) -> Option<(&Dataset, VariableHandle, VariableHandle)> {
        for dataset in &self.datasets {
            if !dataset.declares(x) || !dataset.declares(y) {
                continue;
            }
            if let (Some(hx), Some(hy)) = (dataset.resolve(x), dataset.resolve(y)) {
                debug!(
                    x_component = x,
                    y_component = y,
                    dataset = dataset.name(),
                    "resolved vector pair"
                );
                return Some((dataset, hx, hy));
            }
        }
        None
    }
}
