//! Unit detection and conversion for pressure and temperature series
//!
//! Field data rarely carries reliable unit metadata, so the unit of a sample is
//! inferred from its magnitude: the NaN-median of the order of magnitude of all
//! values decides whether a pressure series is in hPa, Pa or atm, and whether a
//! temperature series is in °C or K. Every assumption is logged.

use crate::errors::{CodeBaseError, Result};
use crate::utils::{nan_median, order_of_magnitude};
use ndarray::{Array1, ArrayView1};
use tracing::info;

/// Standard atmosphere in hPa
pub const ATM_IN_HPA: f64 = 1013.25;
/// Standard atmosphere in Pa
pub const ATM_IN_PA: f64 = 101_325.0;
/// Offset between the Celsius and Kelvin scales
pub const ZERO_CELSIUS_IN_KELVIN: f64 = 273.15;

/// Pressure units recognised by magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnit {
    /// Hectopascal, identical to millibar
    HectoPascal,
    /// Pascal
    Pascal,
    /// Standard atmosphere
    Atmosphere,
}

impl PressureUnit {
    /// Guess the unit of a pressure sample from the magnitude of its values.
    ///
    /// # Errors
    ///
    /// Returns [`CodeBaseError::UnitError`] if the median order of magnitude
    /// does not fall into any of the supported ranges.
    pub fn detect(values: &[f64]) -> Result<Self> {
        let magnitude = median_magnitude(values)?;
        if (2.0..=3.0).contains(&magnitude) {
            Ok(Self::HectoPascal)
        } else if (4.0..=5.0).contains(&magnitude) {
            Ok(Self::Pascal)
        } else if (-1.0..=1.0).contains(&magnitude) {
            Ok(Self::Atmosphere)
        } else {
            Err(CodeBaseError::UnitError(
                "Pressure must be given in hPa, Pa or atm".to_string(),
            ))
        }
    }

    /// Convert a value in this unit into atm
    #[must_use]
    pub fn to_atm(self, value: f64) -> f64 {
        match self {
            Self::HectoPascal => value / ATM_IN_HPA,
            Self::Pascal => value / ATM_IN_PA,
            Self::Atmosphere => value,
        }
    }

    /// Convert a value in this unit into mbar (hPa)
    #[must_use]
    pub fn to_mbar(self, value: f64) -> f64 {
        match self {
            Self::HectoPascal => value,
            Self::Pascal => value / 100.0,
            Self::Atmosphere => value * ATM_IN_HPA,
        }
    }
}

/// Temperature scales recognised by magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    /// Samples with a median below 100 are taken to be in °C, everything else in K.
    ///
    /// # Errors
    ///
    /// Returns [`CodeBaseError::UnitError`] if the sample contains no valid value.
    pub fn detect(values: &[f64]) -> Result<Self> {
        let median = nan_median(values);
        if median.is_nan() {
            return Err(CodeBaseError::UnitError(
                "Cannot infer temperature unit from an empty or all-NaN sample".to_string(),
            ));
        }
        if median < 100.0 {
            Ok(Self::Celsius)
        } else {
            Ok(Self::Kelvin)
        }
    }
}

fn median_magnitude(values: &[f64]) -> Result<f64> {
    let magnitudes = order_of_magnitude(values).ok_or_else(|| {
        CodeBaseError::UnitError("Cannot infer the unit of an all-zero sample".to_string())
    })?;
    let rounded: Vec<f64> = magnitudes.iter().map(|m| m.round()).collect();
    let median = nan_median(&rounded);
    if median.is_nan() {
        return Err(CodeBaseError::UnitError(
            "Cannot infer the unit of an all-NaN sample".to_string(),
        ));
    }
    Ok(median)
}

/// Convert pressure given in hPa, Pa or atm into atm.
///
/// # Errors
///
/// Returns an error if the unit cannot be inferred.
pub fn pressure_to_atm(p: ArrayView1<f64>) -> Result<Array1<f64>> {
    let unit = PressureUnit::detect(&p.to_vec())?;
    match unit {
        PressureUnit::HectoPascal => {
            info!("Pressure is assumed to be in hPa and was converted to atm");
        }
        PressureUnit::Pascal => info!("Pressure is assumed to be in Pa and was converted to atm"),
        PressureUnit::Atmosphere => {
            info!("Pressure is assumed to be already in atm (no conversion)");
        }
    }
    Ok(p.mapv(|v| unit.to_atm(v)))
}

/// Convert pressure given in hPa, Pa or atm into mbar (or hPa).
///
/// # Errors
///
/// Returns an error if the unit cannot be inferred.
pub fn pressure_to_mbar(p: ArrayView1<f64>) -> Result<Array1<f64>> {
    let unit = PressureUnit::detect(&p.to_vec())?;
    match unit {
        PressureUnit::HectoPascal => {
            info!("Pressure is assumed to be already in mbar (no conversion)");
        }
        PressureUnit::Pascal => {
            info!("Pressure is assumed to be in Pa and was converted to mbar (hPa)");
        }
        PressureUnit::Atmosphere => {
            info!("Pressure is assumed to be in atm and was converted to mbar (hPa)");
        }
    }
    Ok(p.mapv(|v| unit.to_mbar(v)))
}

/// Convert temperatures in °C or K into K.
///
/// # Errors
///
/// Returns an error if the unit cannot be inferred.
pub fn temperature_to_kelvin(t: ArrayView1<f64>) -> Result<Array1<f64>> {
    match TemperatureUnit::detect(&t.to_vec())? {
        TemperatureUnit::Celsius => {
            info!("Temperature is assumed to be in °C and was converted to K");
            Ok(t.mapv(|v| v + ZERO_CELSIUS_IN_KELVIN))
        }
        TemperatureUnit::Kelvin => {
            info!("Temperature is assumed to be already in K (no conversion)");
            Ok(t.to_owned())
        }
    }
}

/// Convert temperatures in °C or K into °C.
///
/// # Errors
///
/// Returns an error if the unit cannot be inferred.
pub fn temperature_to_celsius(t: ArrayView1<f64>) -> Result<Array1<f64>> {
    match TemperatureUnit::detect(&t.to_vec())? {
        TemperatureUnit::Kelvin => {
            info!("Temperature is assumed to be in K and was converted to °C");
            Ok(t.mapv(|v| v - ZERO_CELSIUS_IN_KELVIN))
        }
        TemperatureUnit::Celsius => {
            info!("Temperature is assumed to be already in °C (no conversion)");
            Ok(t.to_owned())
        }
    }
}

/// Scalar version of [`pressure_to_atm`].
///
/// # Errors
///
/// Returns an error if the unit cannot be inferred.
pub fn pressure_value_to_atm(p: f64) -> Result<f64> {
    Ok(PressureUnit::detect(&[p])?.to_atm(p))
}

/// Scalar version of [`pressure_to_mbar`].
///
/// # Errors
///
/// Returns an error if the unit cannot be inferred.
pub fn pressure_value_to_mbar(p: f64) -> Result<f64> {
    Ok(PressureUnit::detect(&[p])?.to_mbar(p))
}
