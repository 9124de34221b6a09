//! Polar stereographic projection (spherical form).
//!
//! Used by high-latitude ocean models (e.g. stereographic grids centred
//! on the north pole with true scale at 60°N). Formulas follow Snyder,
//! "Map Projections - A Working Manual", polar aspects 21-33..21-41.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use serde_json::{Map, Value};

use crate::{attr_f64, earth_radius, ProjectionError};

/// Polar stereographic projection parameters.
#[derive(Debug, Clone)]
pub struct PolarStereographic {
    /// Straight vertical longitude from the pole, radians.
    pub lon0: f64,
    /// Standard parallel (latitude of true scale), radians, absolute value.
    pub lat_ts: f64,
    /// False easting, native units.
    pub x0: f64,
    /// False northing, native units.
    pub y0: f64,
    /// Earth radius, meters.
    pub earth_radius: f64,
    /// True for the north polar aspect, false for the south.
    pub north: bool,
}

impl PolarStereographic {
    /// Build from CF grid-mapping attributes.
    ///
    /// `latitude_of_projection_origin` must be +90 or -90;
    /// `standard_parallel` defaults to the pole itself.
    pub fn from_grid_mapping(attrs: &Map<String, Value>) -> Result<Self, ProjectionError> {
        let origin = attr_f64(attrs, "latitude_of_projection_origin", 90.0)?;
        if origin != 90.0 && origin != -90.0 {
            return Err(ProjectionError::InvalidAttribute {
                attr: "latitude_of_projection_origin".to_string(),
                detail: format!("polar aspect requires +/-90, got {origin}"),
            });
        }
        let north = origin > 0.0;

        let lon0 = attr_f64(attrs, "straight_vertical_longitude_from_pole", 0.0)?;
        let lat_ts = attr_f64(attrs, "standard_parallel", origin)?;

        Ok(Self {
            lon0: lon0.to_radians(),
            lat_ts: lat_ts.to_radians().abs(),
            x0: attr_f64(attrs, "false_easting", 0.0)?,
            y0: attr_f64(attrs, "false_northing", 0.0)?,
            earth_radius: earth_radius(attrs)?,
            north,
        })
    }

    /// Radial scale: R * (1 + sin(lat_ts)).
    fn radial(&self) -> f64 {
        self.earth_radius * (1.0 + self.lat_ts.sin())
    }

    /// Project lon/lat degrees to native x/y.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lon = lon_deg.to_radians();
        let lat = lat_deg.to_radians();
        let dlon = lon - self.lon0;

        if self.north {
            let rho = self.radial() * (FRAC_PI_4 - lat / 2.0).tan();
            (
                self.x0 + rho * dlon.sin(),
                self.y0 - rho * dlon.cos(),
            )
        } else {
            let rho = self.radial() * (FRAC_PI_4 + lat / 2.0).tan();
            (
                self.x0 + rho * dlon.sin(),
                self.y0 + rho * dlon.cos(),
            )
        }
    }

    /// Unproject native x/y back to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.x0;
        let dy = y - self.y0;
        let rho = dx.hypot(dy);

        let (lat, lon) = if self.north {
            (
                FRAC_PI_2 - 2.0 * (rho / self.radial()).atan(),
                self.lon0 + dx.atan2(-dy),
            )
        } else {
            (
                -FRAC_PI_2 + 2.0 * (rho / self.radial()).atan(),
                self.lon0 + dx.atan2(dy),
            )
        };

        (lon.to_degrees(), lat.to_degrees())
    }
}
