//! End-to-end extraction tests over Zarr fixtures and in-memory
//! sources.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use grid_common::BoundingBox;
use grid_source::testdata::{latlon_grid_mapping, write_store, FixtureVariable};
use grid_source::MemorySource;
use regrid::{vector, Dataset, Field, Sources, SourcesConfig, Target};

fn hours(n: usize) -> Vec<DateTime<Utc>> {
    (0..n)
        .map(|h| Utc.with_ymd_and_hms(2024, 3, 1, h as u32, 0, 0).unwrap())
        .collect()
}

/// Dense values `t * 10000 + row * 100 + col + offset`.
fn pattern(nt: usize, ny: usize, nx: usize, offset: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nt * ny * nx);
    for t in 0..nt {
        for row in 0..ny {
            for col in 0..nx {
                data.push((t * 10000 + row * 100 + col + offset) as f32);
            }
        }
    }
    data
}

/// Two Zarr datasets: a small high-priority "regional" grid carrying
/// temperature only, and a larger "global" grid carrying temperature
/// and salinity.
fn two_dataset_config(dir: &TempDir) -> SourcesConfig {
    let times = hours(2);

    let regional = dir.path().join("regional.zarr");
    write_store(
        &regional,
        &[0.0, 1.0, 2.0, 3.0],
        &[0.0, 1.0, 2.0, 3.0],
        &times,
        latlon_grid_mapping(),
        &[FixtureVariable {
            name: "temp",
            standard_name: Some("sea_water_temperature"),
            units: Some("degC"),
            nz: 0,
            data: pattern(2, 4, 4, 5000),
        }],
    )
    .unwrap();

    let global_x: Vec<f64> = (-5..=5).map(f64::from).collect();
    let global = dir.path().join("global.zarr");
    write_store(
        &global,
        &global_x,
        &global_x,
        &times,
        latlon_grid_mapping(),
        &[
            FixtureVariable {
                name: "temp",
                standard_name: Some("sea_water_temperature"),
                units: Some("degC"),
                nz: 0,
                data: pattern(2, 11, 11, 0),
            },
            FixtureVariable {
                name: "salt",
                standard_name: Some("sea_water_salinity"),
                units: Some("1e-3"),
                nz: 0,
                data: pattern(2, 11, 11, 0),
            },
        ],
    )
    .unwrap();

    let doc = format!(
        r#"
scalar_variables = ["temp", "salt"]

[datasets.regional]
url = "{}"
variables = ["temp"]

[datasets.global]
url = "{}"
"#,
        regional.display(),
        global.display()
    );
    SourcesConfig::from_str(&doc).unwrap()
}

#[test]
fn test_priority_and_extraction_from_config() {
    let dir = TempDir::new().unwrap();
    let sources = Sources::from_config(&two_dataset_config(&dir)).unwrap();
    let target = Target::new(BoundingBox::new(0.2, 0.2, 2.8, 2.8), 4, 4).unwrap();
    let times = hours(2);

    // temp comes from the regional dataset (offset 5000 pattern).
    let (ds, var) = sources.find_dataset_for_var("temp").unwrap();
    assert_eq!(ds.name(), "regional");
    let field = ds.regrid(&var, &target, times[0], times[1]).unwrap();
    assert_eq!(field.shape(), (2, 4, 4));
    // Target (0.2, 0.2) truncates to regional node (row 0, col 0).
    assert_eq!(field.get(0, 0, 0), Some(5000.0));
    // Target (2.8, 2.8) truncates to node (row 2, col 2), second step.
    assert_eq!(field.get(1, 3, 3), Some(15202.0));
    assert!(field.attrs["source"].contains("regional.zarr"));
    assert_eq!(field.attrs["grid_mapping"], "latitude_longitude");
    assert_eq!(field.attrs["units"], "degC");

    // salt falls through to the global dataset; its node (0, 0) in
    // native coordinates is source column/row 5.
    let (ds, var) = sources.find_dataset_for_var("salt").unwrap();
    assert_eq!(ds.name(), "global");
    let field = ds.regrid(&var, &target, times[0], times[1]).unwrap();
    assert_eq!(field.get(0, 0, 0), Some(505.0));
    assert!(field.attrs["source"].contains("global.zarr"));
}

#[test]
fn test_partial_overlap_leaves_outside_cells_missing() {
    let dir = TempDir::new().unwrap();
    let sources = Sources::from_config(&two_dataset_config(&dir)).unwrap();
    let times = hours(2);

    // Straddles the regional domain edge: longitudes 2.0 and 2.9 are
    // inside [0, 3), 3.8 and 4.7 are not.
    let target = Target::new(BoundingBox::new(2.0, 0.5, 4.7, 1.5), 4, 2).unwrap();
    let (ds, var) = sources.find_dataset_for_var("temp").unwrap();
    let field = ds.regrid(&var, &target, times[0], times[0]).unwrap();

    assert_eq!(field.shape(), (1, 2, 4));
    assert_eq!(field.get(0, 0, 0), Some(5002.0));
    assert!(field.get(0, 0, 2).map(Field::is_missing).unwrap());
    assert!(field.get(0, 0, 3).map(Field::is_missing).unwrap());
    assert_eq!(field.missing_count(), 4);
}

#[test]
fn test_vector_magnitude_end_to_end() {
    let times = hours(1);
    let source = MemorySource::builder("mem://vec")
        .x(vec![0.0, 1.0, 2.0])
        .y(vec![0.0, 1.0, 2.0])
        .times(times.clone())
        .scalar("u", Some("x_sea_water_velocity"), Some("m s-1"), vec![3.0; 9])
        .scalar("v", Some("y_sea_water_velocity"), Some("m s-1"), vec![4.0; 9])
        .build()
        .unwrap();
    let ds = Dataset::from_source("vec", Box::new(source), vec!["u".into(), "v".into()]).unwrap();

    let target = Target::new(BoundingBox::new(0.1, 0.1, 1.9, 1.9), 3, 3).unwrap();
    let u = ds.resolve("u").unwrap();
    let v = ds.resolve("v").unwrap();

    let fu = ds.regrid(&u, &target, times[0], times[0]).unwrap();
    let fv = ds.regrid(&v, &target, times[0], times[0]).unwrap();
    let speed = vector::magnitude("u_v_magnitude", &fu, &fv).unwrap();

    assert_eq!(speed.shape(), (1, 3, 3));
    assert!(speed.data.iter().all(|&s| (s - 5.0).abs() < 1e-6));
    assert_eq!(speed.attrs["units"], "m s-1");
    assert!(!speed.attrs.contains_key("standard_name"));
}

#[test]
fn test_projected_source_grid() {
    // A polar stereographic native grid; the target mesh is projected
    // forward before index truncation.
    let attrs = json!({
        "grid_mapping_name": "polar_stereographic",
        "latitude_of_projection_origin": 90.0,
        "standard_parallel": 60.0,
        "straight_vertical_longitude_from_pole": 70.0,
        "false_easting": 0.0,
        "false_northing": 0.0,
        "earth_radius": 6371000.0
    })
    .as_object()
    .cloned()
    .unwrap();
    let proj = projection::Projection::from_grid_mapping(&attrs).unwrap();

    // Native axes spanning the projected target area with margin.
    let target = Target::new(BoundingBox::new(60.0, 65.0, 80.0, 70.0), 5, 5).unwrap();
    let (px, py) = proj.forward_mesh(&target.xx, &target.yy);
    let fold = |v: &[f64]| {
        v.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
                (lo.min(c), hi.max(c))
            })
    };
    let (xmin, xmax) = fold(&px);
    let (ymin, ymax) = fold(&py);

    let step = 50_000.0;
    let axis = |lo: f64, hi: f64| -> Vec<f64> {
        let start = (lo / step).floor() * step - 2.0 * step;
        let n = ((hi - start) / step).ceil() as usize + 3;
        (0..n).map(|i| start + i as f64 * step).collect()
    };
    let x = axis(xmin, xmax);
    let y = axis(ymin, ymax);

    let times = hours(1);
    let data = pattern(1, y.len(), x.len(), 0);
    let source = MemorySource::builder("mem://stereo")
        .x(x.clone())
        .y(y.clone())
        .times(times.clone())
        .grid_mapping(attrs)
        .scalar("ice", Some("sea_ice_area_fraction"), Some("1"), data)
        .build()
        .unwrap();
    let ds = Dataset::from_source("stereo", Box::new(source), vec!["ice".into()]).unwrap();

    let var = ds.resolve("ice").unwrap();
    let field = ds.regrid(&var, &target, times[0], times[0]).unwrap();

    assert_eq!(field.shape(), (1, 5, 5));
    assert_eq!(field.missing_count(), 0);

    // Every output cell equals the pattern value of the truncated
    // native node, recomputed independently here.
    for (idx, (&tx, &ty)) in px.iter().zip(&py).enumerate() {
        let col = ((tx - x[0]) / step).floor() as usize;
        let row = ((ty - y[0]) / step).floor() as usize;
        let expect = (row * 100 + col) as f32;
        let (j, i) = (idx / 5, idx % 5);
        assert_eq!(field.get(0, j, i), Some(expect), "cell ({j}, {i})");
    }
}

#[test]
fn test_variable_attrs_propagate_with_provenance() {
    let times = hours(1);
    let source = MemorySource::builder("mem://attrs")
        .x(vec![0.0, 1.0])
        .y(vec![0.0, 1.0])
        .times(times.clone())
        .scalar("temp", Some("sea_water_temperature"), Some("degC"), vec![7.0; 4])
        .build()
        .unwrap();
    let ds = Dataset::from_source("attrs", Box::new(source), vec!["temp".into()]).unwrap();

    let target = Target::new(BoundingBox::new(0.0, 0.0, 0.9, 0.9), 2, 2).unwrap();
    let var = ds.resolve("temp").unwrap();
    let field = ds.regrid(&var, &target, times[0], times[0]).unwrap();

    assert_eq!(field.attrs["standard_name"], "sea_water_temperature");
    assert_eq!(field.attrs["units"], "degC");
    assert_eq!(field.attrs["source"], "mem://attrs");
    assert_eq!(field.name, "temp");
    assert_eq!(field.latitude, [0.0, 0.9]);
    assert_eq!(field.longitude, [0.0, 0.9]);
}
