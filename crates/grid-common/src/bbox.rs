//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic or projected bounding box.
///
/// For the target grid, coordinates are in degrees; for a source
/// dataset's native grid they are in whatever units its projection
/// produces (usually meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a CLI BBOX parameter string: "xmin,xmax,ymin,ymax".
    pub fn parse(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut vals = [0.0f64; 4];
        for (v, part) in vals.iter_mut().zip(&parts) {
            *v = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let bbox = Self {
            min_x: vals[0],
            max_x: vals[1],
            min_y: vals[2],
            max_y: vals[3],
        };

        if bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
            return Err(BboxParseError::EmptyExtent(s.to_string()));
        }

        Ok(bbox)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Check if a point is contained within this bbox (inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Expand the bbox by a margin on every side.
    pub fn expand(&self, margin_x: f64, margin_y: f64) -> Self {
        Self {
            min_x: self.min_x - margin_x,
            min_y: self.min_y - margin_y,
            max_x: self.max_x + margin_x,
            max_y: self.max_y + margin_y,
        }
    }

    /// Generate a stable cache key fragment for this bbox (quantized to
    /// avoid floating point issues).
    pub fn cache_key(&self) -> String {
        format!(
            "{:.6}_{:.6}_{:.6}_{:.6}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("invalid bbox format: {0}. Expected 'xmin,xmax,ymin,ymax'")]
    InvalidFormat(String),

    #[error("invalid number in bbox: {0}")]
    InvalidNumber(String),

    #[error("bbox has empty extent: {0}")]
    EmptyExtent(String),
}
