//! NetCDF I/O: reading CF time series and writing datasets
//!
//! Reading decodes what xarray-style tools decode on load: fill values become
//! NaN, packed values are unpacked and the time coordinate is converted to
//! dates using its `units` and `calendar` attributes. Writing takes a
//! [`Dataset`] and records the creation in the `history` attribute.

use crate::dataset::Dataset;
use crate::errors::{CodeBaseError, Result};
use crate::provenance::History;
use crate::timeseries::{Calendar, TimeSeries, TimeUnits};
use chrono::NaiveDate;
use ndarray::{ArrayD, IxDyn};
use netcdf::{AttributeValue, File, Variable};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Attributes consumed while decoding and not carried over to the series
const DECODING_ATTRIBUTES: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

/// Render an attribute value as text, `None` for unsupported types.
pub(crate) fn attribute_to_string(value: &AttributeValue) -> Option<String> {
    fn join<T: ToString>(values: &[T]) -> String {
        values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
    Some(match value {
        AttributeValue::Str(s) => s.clone(),
        AttributeValue::Strs(ss) => ss.join(", "),
        AttributeValue::Double(v) => v.to_string(),
        AttributeValue::Doubles(vs) => join(vs),
        AttributeValue::Float(v) => v.to_string(),
        AttributeValue::Floats(vs) => join(vs),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Ints(vs) => join(vs),
        AttributeValue::Short(v) => v.to_string(),
        AttributeValue::Shorts(vs) => join(vs),
        AttributeValue::Uint(v) => v.to_string(),
        AttributeValue::Uints(vs) => join(vs),
        AttributeValue::Ushort(v) => v.to_string(),
        AttributeValue::Ushorts(vs) => join(vs),
        AttributeValue::Longlong(v) => v.to_string(),
        AttributeValue::Ulonglong(v) => v.to_string(),
        AttributeValue::Schar(v) => v.to_string(),
        AttributeValue::Uchar(v) => v.to_string(),
        _ => return None,
    })
}

/// First element of a numeric attribute
fn attribute_as_f64(var: &Variable, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Doubles(vs) => vs.first().copied(),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Floats(vs) => vs.first().map(|&v| f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        _ => None,
    }
}

fn attribute_as_string(var: &Variable, name: &str) -> Option<String> {
    var.attribute(name)
        .and_then(|attr| attr.value().ok())
        .and_then(|value| attribute_to_string(&value))
}

/// Read a variable as `f64`, masking fill values and unpacking packed data.
///
/// # Errors
///
/// Returns an error if the variable does not exist or cannot be read.
pub fn read_variable(file: &File, var_name: &str) -> Result<(Vec<String>, ArrayD<f64>)> {
    let var = file
        .variable(var_name)
        .ok_or_else(|| CodeBaseError::VariableNotFound {
            var: var_name.to_string(),
        })?;

    let dims: Vec<String> = var
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| attribute_as_f64(&var, name))
        .collect();
    let scale = attribute_as_f64(&var, "scale_factor").unwrap_or(1.0);
    let offset = attribute_as_f64(&var, "add_offset").unwrap_or(0.0);

    let values: Vec<f64> = var
        .get_values::<f64, _>(..)?
        .into_iter()
        .map(|v| {
            if fill_values.iter().any(|&fill| v == fill) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    debug!(
        "Read '{}' with shape {:?} ({} fill values)",
        var_name,
        shape,
        fill_values.len()
    );
    Ok((dims, ArrayD::from_shape_vec(IxDyn(&shape), values)?))
}

/// Decode a CF time coordinate into its calendar and timestamps.
///
/// Offsets pass through the same fill-value and unpacking rules as data
/// variables; a masked offset is an error since every step needs a date.
///
/// # Errors
///
/// Returns an error if the variable is missing, has no `units`, or contains
/// missing or undecodable offsets.
pub fn read_time_coordinate(file: &File, time_name: &str) -> Result<(Calendar, Vec<NaiveDate>)> {
    let time_var = file
        .variable(time_name)
        .ok_or_else(|| CodeBaseError::VariableNotFound {
            var: time_name.to_string(),
        })?;
    let units: TimeUnits = attribute_as_string(&time_var, "units")
        .ok_or_else(|| CodeBaseError::TimeError(format!("'{time_name}' has no units attribute")))?
        .parse()?;
    let calendar = match attribute_as_string(&time_var, "calendar") {
        Some(name) => name.parse()?,
        None => {
            warn!("'{}' has no calendar attribute, assuming standard", time_name);
            Calendar::Standard
        }
    };

    let (_, offsets) = read_variable(file, time_name)?;
    if let Some(index) = offsets.iter().position(|v| v.is_nan()) {
        return Err(CodeBaseError::TimeError(format!(
            "'{time_name}' has a missing value at index {index}"
        )));
    }
    let offsets: Vec<f64> = offsets.into_iter().collect();
    Ok((calendar, units.decode(&offsets, calendar)?))
}

/// Read `var_name` as a [`TimeSeries`] along `time_dim`.
///
/// The time coordinate must carry CF `units` such as `days since 1850-01-01`;
/// a missing `calendar` attribute means the standard calendar. 1-D
/// coordinate variables of the other dimensions are attached when present.
///
/// # Errors
///
/// Returns an error if a variable is missing or the time axis cannot be
/// decoded.
pub fn read_timeseries(path: impl AsRef<Path>, var_name: &str, time_dim: &str) -> Result<TimeSeries> {
    let file = netcdf::open(path.as_ref())?;
    let (dims, data) = read_variable(&file, var_name)?;
    if !dims.iter().any(|d| d == time_dim) {
        return Err(CodeBaseError::DimensionNotFound {
            var: var_name.to_string(),
            dim: time_dim.to_string(),
        });
    }

    let (calendar, times) = read_time_coordinate(&file, time_dim)?;

    let var = file
        .variable(var_name)
        .ok_or_else(|| CodeBaseError::VariableNotFound {
            var: var_name.to_string(),
        })?;
    let attributes: BTreeMap<String, String> = var
        .attributes()
        .filter(|attr| !DECODING_ATTRIBUTES.contains(&attr.name()))
        .filter_map(|attr| {
            let value = attr.value().ok()?;
            Some((attr.name().to_string(), attribute_to_string(&value)?))
        })
        .collect();

    let mut ts = TimeSeries::new(var_name, dims.clone(), time_dim, times, calendar, data)?;
    ts.attributes = attributes;
    for dim in dims.iter().filter(|d| *d != time_dim) {
        match read_variable(&file, dim) {
            Ok((coord_dims, values)) if coord_dims.len() == 1 && coord_dims[0] == *dim => {
                ts = ts.with_coord(dim, values.into_raw_vec())?;
            }
            _ => debug!("No coordinate variable for dimension '{}'", dim),
        }
    }
    Ok(ts)
}

/// Writes a [`Dataset`] to a NetCDF file
pub struct DatasetWriter<'a> {
    output_path: &'a Path,
}

impl<'a> DatasetWriter<'a> {
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write dimensions, variables and attributes; an existing file is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write(&self, ds: &Dataset) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = netcdf::create(self.output_path)?;

        for dim in &ds.dimensions {
            file.add_dimension(&dim.name, dim.len)?;
        }

        for variable in &ds.variables {
            let dim_refs: Vec<&str> = variable.dims.iter().map(String::as_str).collect();
            let mut new_var = file.add_variable::<f64>(&variable.name, &dim_refs)?;
            new_var.put(variable.data.view(), ..)?;
            for (key, value) in &variable.attributes {
                new_var.put_attribute(key, value.as_str())?;
            }
        }

        let mut attributes = ds.attributes.clone();
        History::new(&mut attributes).add(&format!(
            "Created by my-code-base {}",
            env!("CARGO_PKG_VERSION")
        ));
        for (key, value) in &attributes {
            file.add_attribute(key, value.as_str())?;
        }

        debug!(
            "Wrote {} variables to {}",
            ds.variables.len(),
            self.output_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataVariable;
    use ndarray::Array1;
    use tempfile::TempDir;

    #[test]
    fn test_attribute_to_string() {
        assert_eq!(attribute_to_string(&AttributeValue::Str("K".into())).as_deref(), Some("K"));
        assert_eq!(attribute_to_string(&AttributeValue::Double(1.5)).as_deref(), Some("1.5"));
        assert_eq!(
            attribute_to_string(&AttributeValue::Ints(vec![1, 2])).as_deref(),
            Some("1, 2")
        );
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.nc");

        let mut ds = Dataset::new();
        ds.attributes.insert("title".into(), "test".into());
        ds.add_variable(
            DataVariable::new("x", vec!["x".into()], Array1::from(vec![1.0, 2.0, 3.0]).into_dyn())
                .with_attribute("units", "m"),
        )
        .unwrap();
        DatasetWriter::new(&path).write(&ds).unwrap();
        // writing twice replaces the file
        DatasetWriter::new(&path).write(&ds).unwrap();

        let file = netcdf::open(&path).unwrap();
        let (dims, data) = read_variable(&file, "x").unwrap();
        assert_eq!(dims, vec!["x"]);
        assert_eq!(data.into_raw_vec(), vec![1.0, 2.0, 3.0]);
        let history = file
            .attribute("history")
            .and_then(|a| a.value().ok())
            .and_then(|v| attribute_to_string(&v))
            .unwrap();
        assert!(history.contains("Created by my-code-base"));
        assert!(matches!(
            read_variable(&file, "missing"),
            Err(CodeBaseError::VariableNotFound { .. })
        ));
    }
}
