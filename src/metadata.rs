//! NetCDF file inspection for the command line
//!
//! Prints global attributes, dimensions and variables. Time coordinates with
//! CF units are shown with their decoded date range.

use crate::errors::{CodeBaseError, Result};
use crate::netcdf_io::{attribute_to_string, read_time_coordinate};
use crate::timeseries::TimeUnits;
use netcdf::{File, Variable};

/// Summary of a NetCDF variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<(String, usize)>,
    pub attributes: Vec<(String, String)>,
}

impl VariableInfo {
    fn from_variable(var: &Variable) -> Self {
        Self {
            name: var.name().to_string(),
            data_type: format!("{:?}", var.vartype()).to_lowercase(),
            dimensions: var
                .dimensions()
                .iter()
                .map(|d| (d.name().to_string(), d.len()))
                .collect(),
            attributes: var
                .attributes()
                .filter_map(|attr| {
                    let value = attr.value().ok()?;
                    Some((attr.name().to_string(), attribute_to_string(&value)?))
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Shape as `(a × b × c)`
    #[must_use]
    pub fn shape_string(&self) -> String {
        let shape: Vec<String> = self.dimensions.iter().map(|(_, len)| len.to_string()).collect();
        format!("({})", shape.join(" × "))
    }
}

/// # Errors
///
/// Returns an error if the variable does not exist.
pub fn variable_info(file: &File, var_name: &str) -> Result<VariableInfo> {
    file.variable(var_name)
        .map(|var| VariableInfo::from_variable(&var))
        .ok_or_else(|| CodeBaseError::VariableNotFound {
            var: var_name.to_string(),
        })
}

/// Prints global attributes and variables of a NetCDF file.
///
/// # Errors
///
/// Returns an error if an attribute cannot be read.
pub fn print_metadata(file: &File) -> Result<()> {
    println!("\n===== Global Attributes =====");
    for attr in file.attributes() {
        let value = attr.value()?;
        let text = attribute_to_string(&value).unwrap_or_else(|| format!("{value:?}"));
        println!("- {}: {}", attr.name(), text);
    }

    println!("\n===== Variables =====");
    for var in file.variables() {
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| format!("{}[{}]", d.name(), d.len()))
            .collect();
        println!("- {} ({})", var.name(), dims.join(", "));
    }

    Ok(())
}

/// Lists all dimensions and variables, sorted by name.
pub fn list_variables_and_dimensions(file: &File) -> Result<()> {
    println!("\n Dimensions");
    println!("==============");

    let mut dimensions: Vec<_> = file.dimensions().collect();
    dimensions.sort_by_key(|d| d.name().to_string());
    if dimensions.is_empty() {
        println!("   (No dimensions found)");
    }
    for dim in dimensions {
        let unlimited = if dim.is_unlimited() { " (unlimited)" } else { "" };
        println!("    {} = {}{}", dim.name(), dim.len(), unlimited);
    }

    println!("\n Variables");
    println!("=============");

    let mut variables: Vec<VariableInfo> = file.variables().map(|v| VariableInfo::from_variable(&v)).collect();
    variables.sort_by(|a, b| a.name.cmp(&b.name));
    if variables.is_empty() {
        println!("   (No variables found)");
    }
    for info in &variables {
        if info.dimensions.is_empty() {
            println!("    {} ({}): scalar", info.name, info.data_type);
        } else {
            let names: Vec<&str> = info.dimensions.iter().map(|(n, _)| n.as_str()).collect();
            println!(
                "    {} ({}): [{}] = {}",
                info.name,
                info.data_type,
                names.join(", "),
                info.shape_string()
            );
        }

        let key_attrs: Vec<String> = ["units", "calendar", "long_name", "_FillValue"]
            .iter()
            .filter_map(|key| info.attribute(key).map(|v| format!("{key}: {v}")))
            .collect();
        if !key_attrs.is_empty() {
            println!("      └─ {}", key_attrs.join(", "));
        }
    }

    println!("\n💡 Tip: Use --decompose <variable> to split a variable into trend, seasonality and residuals");
    println!("💡 Tip: Use --threads <N> to control parallel processing threads");

    Ok(())
}

/// Describes a variable: data type, shape, attributes and, for CF time
/// coordinates, the decoded date range.
///
/// # Errors
///
/// Returns an error if the variable does not exist or cannot be read.
pub fn describe_variable(file: &File, var_name: &str) -> Result<()> {
    let info = variable_info(file, var_name)?;

    println!("\n Variable Description: {}", info.name);
    println!("={}", "=".repeat(info.name.len() + 25));
    println!(" Data type: {}", info.data_type);
    println!(" Shape: {}", info.shape_string());
    for (name, len) in &info.dimensions {
        println!("    {name} = {len}");
    }

    if info.attributes.is_empty() {
        println!("\n  Attributes: (none)");
    } else {
        println!("\n  Attributes:");
        for (key, value) in &info.attributes {
            println!("   • {key}: {value}");
        }
    }

    let is_time = info
        .attribute("units")
        .is_some_and(|u| u.parse::<TimeUnits>().is_ok());
    if is_time {
        let (calendar, times) = read_time_coordinate(file, var_name)?;
        if let (Some(first), Some(last)) = (times.first(), times.last()) {
            println!("\n Time range ({calendar}): {first} to {last}");
        }
    }

    Ok(())
}
