//! In-memory dataset: named dimensions, variables and attributes
//!
//! A [`Dataset`] is what gets written to NetCDF by [`crate::netcdf_io`]. It
//! only checks that every variable agrees with the dimension lengths.

use crate::errors::{CodeBaseError, Result};
use crate::provenance::History;
use ndarray::ArrayD;
use std::collections::BTreeMap;

/// A named dimension with its length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

/// A data or coordinate variable
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub attributes: BTreeMap<String, String>,
}

impl DataVariable {
    #[must_use]
    pub fn new(name: &str, dims: Vec<String>, data: ArrayD<f64>) -> Self {
        Self {
            name: name.to_string(),
            dims,
            data,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }
}

/// Collection of variables sharing dimensions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<DataVariable>,
    pub attributes: BTreeMap<String, String>,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dimension; re-registering with the same length is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimension exists with a different length.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        match self.dimension(name) {
            Some(existing) if existing.len != len => Err(CodeBaseError::InvalidInput(format!(
                "Dimension '{}' already has length {} (got {})",
                name, existing.len, len
            ))),
            Some(_) => Ok(()),
            None => {
                self.dimensions.push(Dimension {
                    name: name.to_string(),
                    len,
                });
                Ok(())
            }
        }
    }

    /// Add a variable, registering its dimensions on the fly.
    ///
    /// A variable with the same name replaces the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the dims do not match the array rank or a dimension
    /// length conflicts with an existing one.
    pub fn add_variable(&mut self, variable: DataVariable) -> Result<()> {
        if variable.dims.len() != variable.data.ndim() {
            return Err(CodeBaseError::InvalidInput(format!(
                "Variable '{}' has {} dims but {} axes",
                variable.name,
                variable.dims.len(),
                variable.data.ndim()
            )));
        }
        for (dim, &len) in variable.dims.iter().zip(variable.data.shape()) {
            if let Some(existing) = self.dimension(dim) {
                if existing.len != len {
                    return Err(CodeBaseError::InvalidInput(format!(
                        "Variable '{}' needs '{}' of length {} but it has length {}",
                        variable.name, dim, len, existing.len
                    )));
                }
            }
        }
        for (dim, &len) in variable.dims.iter().zip(variable.data.shape()) {
            self.add_dimension(dim, len)?;
        }
        self.variables.retain(|v| v.name != variable.name);
        self.variables.push(variable);
        Ok(())
    }

    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Names of all variables in insertion order
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Access the `history` attribute
    pub fn history(&mut self) -> History<'_> {
        History::new(&mut self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_dimension_conflicts_are_rejected() {
        let mut ds = Dataset::new();
        ds.add_variable(DataVariable::new(
            "a",
            vec!["x".into()],
            Array1::zeros(3).into_dyn(),
        ))
        .unwrap();
        let err = ds
            .add_variable(DataVariable::new(
                "b",
                vec!["x".into(), "y".into()],
                Array2::zeros((4, 2)).into_dyn(),
            ))
            .unwrap_err();
        assert!(matches!(err, CodeBaseError::InvalidInput(_)));
        assert_eq!(ds.variable_names(), vec!["a"]);
    }

    #[test]
    fn test_rank_mismatch_is_rejected() {
        let mut ds = Dataset::new();
        assert!(ds
            .add_variable(DataVariable::new("a", vec![], Array1::zeros(3).into_dyn()))
            .is_err());
    }

    #[test]
    fn test_replacing_a_variable() {
        let mut ds = Dataset::new();
        let v = DataVariable::new("a", vec!["x".into()], Array1::zeros(2).into_dyn());
        ds.add_variable(v.clone()).unwrap();
        ds.add_variable(v.with_attribute("units", "m")).unwrap();
        assert_eq!(ds.variables.len(), 1);
        assert_eq!(ds.variable("a").unwrap().attributes["units"], "m");
        assert_eq!(ds.dimension("x").unwrap().len, 2);
    }
}
