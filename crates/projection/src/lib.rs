//! Coordinate reference system transformations.
//!
//! Each source dataset carries a CF grid-mapping attribute record; this
//! crate turns that record into a forward/inverse transform between
//! geographic coordinates (lon/lat degrees) and the dataset's native
//! projected coordinates.

pub mod lambert;
pub mod stereographic;

pub use lambert::LambertConformal;
pub use stereographic::PolarStereographic;

use serde_json::{Map, Value};
use thiserror::Error;

/// Mean Earth radius used when the grid mapping does not name one.
pub const DEFAULT_EARTH_RADIUS: f64 = 6_371_000.0;

/// Errors raised while deriving a projection from CF metadata.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("missing grid_mapping_name attribute")]
    MissingGridMappingName,

    #[error("unsupported grid_mapping_name: {0}")]
    Unsupported(String),

    #[error("invalid grid mapping attribute '{attr}': {detail}")]
    InvalidAttribute { attr: String, detail: String },
}

/// A forward/inverse transform between geographic and native coordinates.
#[derive(Debug, Clone)]
pub enum Projection {
    /// Native coordinates are themselves lon/lat degrees.
    LatitudeLongitude,
    PolarStereographic(PolarStereographic),
    LambertConformal(LambertConformal),
}

impl Projection {
    /// Derive a projection from a CF grid-mapping attribute record.
    pub fn from_grid_mapping(attrs: &Map<String, Value>) -> Result<Self, ProjectionError> {
        let name = attrs
            .get("grid_mapping_name")
            .and_then(|v| v.as_str())
            .ok_or(ProjectionError::MissingGridMappingName)?;

        match name {
            "latitude_longitude" => Ok(Self::LatitudeLongitude),
            "polar_stereographic" => Ok(Self::PolarStereographic(
                PolarStereographic::from_grid_mapping(attrs)?,
            )),
            "lambert_conformal_conic" => Ok(Self::LambertConformal(
                LambertConformal::from_grid_mapping(attrs)?,
            )),
            other => Err(ProjectionError::Unsupported(other.to_string())),
        }
    }

    /// Project geographic coordinates (degrees) to native coordinates.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        match self {
            Self::LatitudeLongitude => (lon_deg, lat_deg),
            Self::PolarStereographic(p) => p.forward(lon_deg, lat_deg),
            Self::LambertConformal(p) => p.forward(lon_deg, lat_deg),
        }
    }

    /// Unproject native coordinates back to geographic degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::LatitudeLongitude => (x, y),
            Self::PolarStereographic(p) => p.inverse(x, y),
            Self::LambertConformal(p) => p.inverse(x, y),
        }
    }

    /// Project a mesh of geographic coordinates in one pass.
    pub fn forward_mesh(&self, lons: &[f64], lats: &[f64]) -> (Vec<f64>, Vec<f64>) {
        debug_assert_eq!(lons.len(), lats.len());
        let mut xs = Vec::with_capacity(lons.len());
        let mut ys = Vec::with_capacity(lats.len());
        for (&lon, &lat) in lons.iter().zip(lats) {
            let (x, y) = self.forward(lon, lat);
            xs.push(x);
            ys.push(y);
        }
        (xs, ys)
    }
}

/// Read a numeric grid-mapping attribute, with a default when absent.
pub(crate) fn attr_f64(
    attrs: &Map<String, Value>,
    attr: &str,
    default: f64,
) -> Result<f64, ProjectionError> {
    match attrs.get(attr) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| ProjectionError::InvalidAttribute {
            attr: attr.to_string(),
            detail: format!("expected a number, got {v}"),
        }),
    }
}

/// Read the earth radius: `earth_radius` first, then `semi_major_axis`.
pub(crate) fn earth_radius(attrs: &Map<String, Value>) -> Result<f64, ProjectionError> {
    if attrs.contains_key("earth_radius") {
        attr_f64(attrs, "earth_radius", DEFAULT_EARTH_RADIUS)
    } else {
        attr_f64(attrs, "semi_major_axis", DEFAULT_EARTH_RADIUS)
    }
}
