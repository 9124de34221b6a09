//! Lambert Conformal Conic projection (spherical form).
//!
//! Common for mid-latitude atmospheric model grids. Maps a cone tangent
//! or secant to the sphere onto a flat plane; one standard parallel
//! gives the tangent case, two the secant case.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use serde_json::{Map, Value};

use crate::{attr_f64, earth_radius, ProjectionError};

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian, radians.
    pub lon0: f64,
    /// Latitude of projection origin, radians.
    pub lat0: f64,
    /// False easting, native units.
    pub x0: f64,
    /// False northing, native units.
    pub y0: f64,
    /// Earth radius, meters.
    pub earth_radius: f64,
    /// Cone constant.
    n: f64,
    /// F constant.
    f: f64,
    /// Rho at the projection origin.
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection from explicit parameters (degrees).
    pub fn new(
        lon0_deg: f64,
        lat0_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        x0: f64,
        y0: f64,
        earth_radius: f64,
    ) -> Self {
        let lon0 = lon0_deg.to_radians();
        let lat0 = lat0_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            (latin1.cos() / latin2.cos()).ln()
                / ((FRAC_PI_4 + latin2 / 2.0).tan() / (FRAC_PI_4 + latin1 / 2.0).tan()).ln()
        };

        let f = latin1.cos() * (FRAC_PI_4 + latin1 / 2.0).tan().powf(n) / n;
        let rho0 = earth_radius * f / (FRAC_PI_4 + lat0 / 2.0).tan().powf(n);

        Self {
            lon0,
            lat0,
            x0,
            y0,
            earth_radius,
            n,
            f,
            rho0,
        }
    }

    /// Build from CF grid-mapping attributes.
    ///
    /// `standard_parallel` may be a single number or a two-element array.
    pub fn from_grid_mapping(attrs: &Map<String, Value>) -> Result<Self, ProjectionError> {
        let (latin1, latin2) = match attrs.get("standard_parallel") {
            Some(Value::Array(arr)) if arr.len() == 2 => {
                let p1 = arr[0].as_f64();
                let p2 = arr[1].as_f64();
                match (p1, p2) {
                    (Some(p1), Some(p2)) => (p1, p2),
                    _ => {
                        return Err(ProjectionError::InvalidAttribute {
                            attr: "standard_parallel".to_string(),
                            detail: "expected numeric parallels".to_string(),
                        })
                    }
                }
            }
            Some(Value::Number(n)) => {
                let p = n.as_f64().unwrap_or(f64::NAN);
                (p, p)
            }
            Some(v) => {
                return Err(ProjectionError::InvalidAttribute {
                    attr: "standard_parallel".to_string(),
                    detail: format!("expected a number or [2] array, got {v}"),
                })
            }
            None => {
                return Err(ProjectionError::InvalidAttribute {
                    attr: "standard_parallel".to_string(),
                    detail: "attribute is required".to_string(),
                })
            }
        };

        let lon0 = attr_f64(attrs, "longitude_of_central_meridian", 0.0)?;
        let lat0 = attr_f64(attrs, "latitude_of_projection_origin", latin1)?;

        Ok(Self::new(
            lon0,
            lat0,
            latin1,
            latin2,
            attr_f64(attrs, "false_easting", 0.0)?,
            attr_f64(attrs, "false_northing", 0.0)?,
            earth_radius(attrs)?,
        ))
    }

    /// Normalize a longitude difference to [-pi, pi].
    fn wrap(mut dlon: f64) -> f64 {
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }
        dlon
    }

    /// Project lon/lat degrees to native x/y.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = Self::wrap(lon_deg.to_radians() - self.lon0);

        let rho = self.earth_radius * self.f / (FRAC_PI_4 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        (
            self.x0 + rho * theta.sin(),
            self.y0 + self.rho0 - rho * theta.cos(),
        )
    }

    /// Unproject native x/y back to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.x0;
        let dy = self.rho0 - (y - self.y0);

        let rho = {
            let r = dx.hypot(dy);
            if self.n < 0.0 {
                -r
            } else {
                r
            }
        };
        let theta = if self.n < 0.0 {
            (-dx).atan2(-dy)
        } else {
            dx.atan2(dy)
        };

        let lat = 2.0 * (self.earth_radius * self.f / rho).powf(1.0 / self.n).atan() - FRAC_PI_2;
        let lon = self.lon0 + theta / self.n;

        (lon.to_degrees(), lat.to_degrees())
    }
}
