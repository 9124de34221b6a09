//! Derived vector quantities.

use crate::error::{RegridError, Result};
use crate::field::Field;

/// Elementwise magnitude `sqrt(x^2 + y^2)` of two co-located component
/// fields.
///
/// Both inputs must come from the same dataset and target, so their
/// shapes and time stamps must agree. A missing value in either
/// component leaves the output cell missing.
pub fn magnitude(name: &str, x: &Field, y: &Field) -> Result<Field> {
    if x.shape() != y.shape() {
        return Err(RegridError::ShapeMismatch(format!(
            "vector components '{}' {:?} and '{}' {:?}",
            x.name,
            x.shape(),
            y.name,
            y.shape()
        )));
    }

    let mut out = Field::filled(
        name,
        x.times.clone(),
        x.latitude.clone(),
        x.longitude.clone(),
        x.attrs.clone(),
    );
    // Component units carry over; the standard name does not.
    out.attrs.remove("standard_name");

    for (idx, (&a, &b)) in x.data.iter().zip(&y.data).enumerate() {
        if !Field::is_missing(a) && !Field::is_missing(b) {
            out.data[idx] = a.hypot(b);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn times() -> Vec<DateTime<Utc>> {
        vec![Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()]
    }

    fn component(name: &str, values: &[f32]) -> Field {
        let mut f = Field::filled(
            name,
            times(),
            vec![60.0, 61.0],
            vec![5.0, 6.0],
            BTreeMap::new(),
        );
        f.data.copy_from_slice(values);
        f
    }

    #[test]
    fn test_magnitude_345() {
        let x = component("u", &[3.0, 0.0, 1.0, -3.0]);
        let y = component("v", &[4.0, 0.0, 0.0, -4.0]);

        let mag = magnitude("speed", &x, &y).unwrap();
        assert_eq!(mag.name, "speed");
        assert_eq!(mag.data, [5.0, 0.0, 1.0, 5.0]);
    }

    #[test]
    fn test_missing_propagates() {
        let x = component("u", &[3.0, Field::MISSING, 3.0, 3.0]);
        let y = component("v", &[4.0, 4.0, Field::MISSING, 4.0]);

        let mag = magnitude("speed", &x, &y).unwrap();
        assert!(Field::is_missing(mag.data[1]));
        assert!(Field::is_missing(mag.data[2]));
        assert_eq!(mag.data[0], 5.0);
        assert_eq!(mag.data[3], 5.0);
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let x = component("u", &[0.0; 4]);
        let mut y = Field::filled(
            "v",
            times(),
            vec![60.0, 61.0, 62.0],
            vec![5.0, 6.0],
            BTreeMap::new(),
        );
        y.data.fill(0.0);

        let err = magnitude("speed", &x, &y).unwrap_err();
        assert!(matches!(err, RegridError::ShapeMismatch(_)));
    }
}
