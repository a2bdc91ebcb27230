use approx::assert_relative_eq;
use my_code_base::metadata::variable_info;
use my_code_base::netcdf_io::{read_time_coordinate, read_timeseries};
use my_code_base::prelude::*;
use my_code_base::timeseries::{extend_annual_series, rolling_decompose};
use ndarray::{Array1, Array2};
use netcdf::{create, open, AttributeValue};
use std::path::Path;
use tempfile::tempdir;

const FILL: f32 = -999.0;
const NOLEAP_MONTH_STARTS: [f64; 12] = [
    0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0,
];

fn history_of(path: &Path) -> String {
    let file = open(path).expect("Failed to open NetCDF file");
    match file.attribute("history").map(|a| a.value()) {
        Some(Ok(AttributeValue::Str(s))) => s,
        other => panic!("unexpected history attribute: {other:?}"),
    }
}

/// Two years of monthly data on a noleap calendar with two latitudes.
///
/// Latitude 0 holds 10 in the first and 20 in the second year, latitude 1
/// holds 5 everywhere except for one fill value.
fn write_monthly_file(path: &Path) {
    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("time", 24).expect("Failed to add dimension time");
    file.add_dimension("lat", 2).expect("Failed to add dimension lat");

    let offsets: Vec<f64> = (0..2)
        .flat_map(|year| NOLEAP_MONTH_STARTS.iter().map(move |d| d + 365.0 * f64::from(year)))
        .collect();
    let mut time = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add time");
    time.put_attribute("units", "days since 2000-01-01 00:00:00")
        .expect("Failed to add units");
    time.put_attribute("calendar", "noleap")
        .expect("Failed to add calendar");
    time.put(Array1::from(offsets).view(), ..)
        .expect("Failed to write time");

    let mut lat = file
        .add_variable::<f64>("lat", &["lat"])
        .expect("Failed to add lat");
    lat.put(Array1::from(vec![70.0, 80.0]).view(), ..)
        .expect("Failed to write lat");

    let mut values = Array2::<f32>::zeros((24, 2));
    for t in 0..24 {
        values[[t, 0]] = if t < 12 { 10.0 } else { 20.0 };
        values[[t, 1]] = 5.0;
    }
    values[[3, 1]] = FILL;

    let mut var = file
        .add_variable::<f32>("tos", &["time", "lat"])
        .expect("Failed to add variable");
    var.put_attribute("_FillValue", FILL)
        .expect("Failed to add fill value");
    var.put_attribute("units", "degC").expect("Failed to add units");
    var.put(values.view(), ..).expect("Failed to write data");
}

#[test]
fn test_read_timeseries_decodes_time_and_fill_values() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("monthly.nc");
    write_monthly_file(&path);

    let ts = read_timeseries(&path, "tos", "time").unwrap();
    assert_eq!(ts.calendar, Calendar::NoLeap);
    assert_eq!(ts.dims, vec!["time", "lat"]);
    assert_eq!(ts.times.len(), 24);
    assert_eq!(ts.times[0].to_string(), "2000-01-01");
    assert_eq!(ts.times[2].to_string(), "2000-03-01");
    assert_eq!(ts.times[12].to_string(), "2001-01-01");
    assert_eq!(ts.coords["lat"], vec![70.0, 80.0]);
    assert_eq!(ts.attributes.get("units").map(String::as_str), Some("degC"));
    assert!(!ts.attributes.contains_key("_FillValue"));
    assert!(ts.data[[3, 1]].is_nan());

    assert!(read_timeseries(&path, "tos", "depth").is_err());
    assert!(read_timeseries(&path, "missing", "time").is_err());
}

#[test]
fn test_annual_mean_saved_with_provenance() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("monthly.nc");
    write_monthly_file(&input);

    let ts = read_timeseries(&input, "tos", "time").unwrap();
    let annual = weighted_annual_mean(&ts).unwrap();
    assert_eq!(annual.years, vec![2000, 2001]);
    assert_eq!(annual.dims, vec!["year", "lat"]);
    assert_relative_eq!(annual.data[[0, 0]], 10.0, epsilon = 1e-12);
    assert_relative_eq!(annual.data[[1, 0]], 20.0, epsilon = 1e-12);
    // the missing April is dropped and the remaining weights renormalised
    assert_relative_eq!(annual.data[[0, 1]], 5.0, epsilon = 1e-12);

    let output = dir.path().join("out").join("tos_annual.nc");
    let written = save(&annual, &output, SaveOptions::default()).unwrap();
    assert_eq!(written, output);

    let history = history_of(&written);
    assert!(history.contains("File saved by "));
    assert!(history.contains("integration_test.rs#"));
    assert!(history.contains("@git-commit:"));
    assert!(history.contains("Created by my-code-base"));

    let file = open(&written).unwrap();
    let info = variable_info(&file, "tos").unwrap();
    assert_eq!(
        info.dimensions,
        vec![("year".to_string(), 2), ("lat".to_string(), 2)]
    );
    let years: Vec<f64> = file.variable("year").unwrap().get_values(..).unwrap();
    assert_eq!(years, vec![2000.0, 2001.0]);

    let extended = extend_annual_series(&annual).unwrap();
    assert_eq!(extended.times.len(), 24);
    assert_relative_eq!(extended.data[[13, 0]], 20.0, epsilon = 1e-12);
}

#[test]
fn test_saved_series_reads_back() {
    let dir = tempdir().expect("Failed to create temp dir");
    let values: Vec<f64> = (0..36u32)
        .map(|i| 0.1 * f64::from(i) + (f64::from(i % 12) * std::f64::consts::PI / 6.0).sin())
        .collect();
    let ts = TimeSeries::monthly("co2", 1990, 1, values.clone(), Calendar::Day360)
        .unwrap()
        .with_attribute("units", "ppm");

    let path = save(&ts, dir.path().join("co2.nc"), SaveOptions { add_hash: true }).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("co2_") && name.ends_with(".nc"));

    let back = read_timeseries(&path, "co2", "time").unwrap();
    assert_eq!(back.calendar, Calendar::Day360);
    assert_eq!(back.times, ts.times);
    for (a, b) in back.data.iter().zip(&values) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }

    let decomposition = seasonal_decompose(&back).unwrap();
    for i in 0..36 {
        let month = i % 12;
        let sum = decomposition.trend[[i]] + decomposition.seasonality[[month]] + decomposition.residuals[[i]];
        assert_relative_eq!(sum, values[i], epsilon = 1e-9);
    }
    let decomposed_path = save(&decomposition, dir.path().join("co2_decomposed.nc"), SaveOptions::default()).unwrap();
    let file = open(&decomposed_path).unwrap();
    for name in ["trend", "seasonality", "residuals", "deseasonalized", "month"] {
        assert!(file.variable(name).is_some(), "missing {name}");
    }

    let frame = rolling_decompose(&back, 12).unwrap();
    let csv_path = save(&frame, dir.path().join("co2.csv"), SaveOptions::default()).unwrap();
    let csv = std::fs::read_to_string(csv_path).unwrap();
    assert!(csv.starts_with("time,raw,trend,seasonality,detrended,residuals\n1990-01-01,"));
    assert_eq!(csv.lines().count(), 37);
}

/// Four daily steps whose time coordinate carries the given raw offsets and attributes
fn write_daily_file(path: &Path, offsets: &[f64], time_attributes: &[(&str, f64)]) {
    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("time", offsets.len())
        .expect("Failed to add dimension time");

    let mut time = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add time");
    time.put_attribute("units", "days since 2000-01-01")
        .expect("Failed to add units");
    for (name, value) in time_attributes {
        time.put_attribute(name, *value)
            .expect("Failed to add time attribute");
    }
    time.put(Array1::from(offsets.to_vec()).view(), ..)
        .expect("Failed to write time");

    let mut var = file
        .add_variable::<f64>("pr", &["time"])
        .expect("Failed to add variable");
    var.put(Array1::from_elem(offsets.len(), 1.0).view(), ..)
        .expect("Failed to write data");
}

#[test]
fn test_time_coordinate_with_fill_values_is_rejected() {
    let dir = tempdir().expect("Failed to create temp dir");

    let path = dir.path().join("filled.nc");
    write_daily_file(&path, &[0.0, 1.0, -9999.0, 3.0], &[("_FillValue", -9999.0)]);
    let err = read_timeseries(&path, "pr", "time").unwrap_err();
    assert!(matches!(err, CodeBaseError::TimeError(_)), "{err}");
    assert!(err.to_string().contains("index 2"));

    // netCDF's default double fill without a _FillValue attribute
    let path = dir.path().join("default_fill.nc");
    write_daily_file(&path, &[0.0, 1.0, 9.969_209_968_386_869e36, 3.0], &[]);
    let err = read_timeseries(&path, "pr", "time").unwrap_err();
    assert!(matches!(err, CodeBaseError::TimeError(_)), "{err}");

    let file = open(&path).unwrap();
    assert!(my_code_base::metadata::describe_variable(&file, "time").is_err());
}

#[test]
fn test_packed_time_coordinate_is_unpacked() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("packed.nc");
    write_daily_file(
        &path,
        &[0.0, 2.0, 4.0, 6.0],
        &[("scale_factor", 0.5), ("add_offset", 31.0)],
    );

    let file = open(&path).unwrap();
    let (calendar, times) = read_time_coordinate(&file, "time").unwrap();
    assert_eq!(calendar, Calendar::Standard);
    let days: Vec<String> = times.iter().map(ToString::to_string).collect();
    assert_eq!(days, vec!["2000-02-01", "2000-02-02", "2000-02-03", "2000-02-04"]);
}
