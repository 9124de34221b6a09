//! Regridding engine.
//!
//! Extracts time-varying scalar and vector fields from heterogeneous
//! gridded source datasets and resamples them onto a single
//! caller-supplied target grid with nearest-neighbor-by-truncation.
//!
//! The pieces:
//!
//! - [`Dataset`] owns one gridded source, validates its regular grid
//!   geometry, caches the target-to-source coordinate mapping per
//!   target, and implements [`Dataset::regrid`].
//! - [`Sources`] owns the ordered dataset list and the declared
//!   variable taxonomy, and resolves variable names to datasets
//!   (first match wins).
//! - [`Target`] describes the destination grid; [`Field`] is the dense
//!   `(time, y, x)` output container with an explicit missing sentinel.
//! - [`vector::magnitude`] combines two co-located component fields.

pub mod config;
pub mod dataset;
pub mod error;
pub mod field;
pub mod sources;
pub mod target;
pub mod vector;

pub use config::{DatasetConfig, SourcesConfig, VectorPair};
pub use dataset::{Dataset, GridMapping};
pub use error::{RegridError, Result};
pub use field::Field;
pub use sources::Sources;
pub use target::{GridMappingRecord, Target};
