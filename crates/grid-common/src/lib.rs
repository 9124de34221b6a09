//! Common types shared across the field-extractor crates.

pub mod axis;
pub mod bbox;
pub mod time;

pub use axis::{AxisError, CoordAxis};
pub use bbox::BoundingBox;
pub use time::TimeRange;
