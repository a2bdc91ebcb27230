//! Routines for oceanic biogeochemistry
//!
//! - temperature correction of CO2 measurements
//! - fugacity from partial pressure
//! - salinity from conductivity
//! - water vapour pressure and xCO2 -> pCO2 conversion
//!
//! Every formula operates element-wise on equally long series; pressure and
//! temperature inputs are unit-detected through [`crate::units`].

pub mod bgc;
pub mod seawater;

pub use bgc::{fugacity, temperature_correction, CorrectionMethod};
pub use seawater::{conductivity_to_salinity, ppm_to_uatm, water_vapor_pressure, AirType};

use crate::errors::{CodeBaseError, Result};
use ndarray::ArrayView1;

/// Ensure all series entering a formula have the same length.
pub(crate) fn check_lengths(names: &[&str], series: &[ArrayView1<f64>]) -> Result<usize> {
    let expected = series.first().map_or(0, |s| s.len());
    for (name, s) in names.iter().zip(series) {
        if s.len() != expected {
            return Err(CodeBaseError::InvalidInput(format!(
                "Series '{}' has length {} but {} was expected",
                name,
                s.len(),
                expected
            )));
        }
    }
    Ok(expected)
}
