//! CO2 temperature correction and fugacity

use super::check_lengths;
use crate::errors::{CodeBaseError, Result};
use crate::units::{pressure_to_atm, temperature_to_kelvin};
use ndarray::{Array1, ArrayView1, Zip};
use std::fmt;
use std::str::FromStr;

/// Gas constant in cm³·atm·K⁻¹·mol⁻¹
pub const GAS_CONSTANT: f64 = 8.205_736_608_096_0e-2 * 1000.0;

/// Published temperature corrections for CO2 measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrectionMethod {
    /// Takahashi et al. (2009), quadratic in temperature
    #[default]
    Takahashi2009,
    /// Takahashi et al. (1993), linear in temperature
    Takahashi1993,
}

impl CorrectionMethod {
    /// Multiplicative factor correcting from `t_in` to `t_out`
    #[must_use]
    pub fn factor(self, t_out: f64, t_in: f64) -> f64 {
        match self {
            Self::Takahashi2009 => {
                (0.0433 * (t_out - t_in) - 4.35e-5 * (t_out.powi(2) - t_in.powi(2))).exp()
            }
            Self::Takahashi1993 => (0.0423 * (t_out - t_in)).exp(),
        }
    }
}

impl FromStr for CorrectionMethod {
    type Err = CodeBaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Takahashi2009" => Ok(Self::Takahashi2009),
            "Takahashi1993" => Ok(Self::Takahashi1993),
            other => Err(CodeBaseError::InvalidInput(format!(
                "Unknown method for temperature conversion: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Takahashi2009 => write!(f, "Takahashi2009"),
            Self::Takahashi1993 => write!(f, "Takahashi1993"),
        }
    }
}

/// Correct a CO2 quantity for the temperature difference between the water
/// intake and the equilibrator.
///
/// `co2` may be a mole fraction (xCO2), a partial pressure (pCO2) or a
/// fugacity (fCO2); the correction is multiplicative and therefore keeps the
/// unit. `t_out` is the temperature the data shall be corrected to (usually
/// the in-situ SST), `t_in` the one it was measured at (usually the
/// equilibrator temperature). Both must be given in the same scale.
///
/// # Errors
///
/// Returns an error if the series have different lengths.
pub fn temperature_correction(
    co2: ArrayView1<f64>,
    t_out: ArrayView1<f64>,
    t_in: ArrayView1<f64>,
    method: CorrectionMethod,
) -> Result<Array1<f64>> {
    check_lengths(&["co2", "t_out", "t_in"], &[co2.view(), t_out.view(), t_in.view()])?;
    Ok(Zip::from(&co2)
        .and(&t_out)
        .and(&t_in)
        .map_collect(|&c, &to, &ti| c * method.factor(to, ti)))
}

/// Calculate the fugacity of CO2 following Dickson et al. (2007), SOP 5.
///
/// `pco2` is the partial pressure in µatm, `p_equ` the equilibrator pressure
/// (hPa, Pa or atm), `sst` the in-situ temperature (°C or K). If `xco2`
/// (ppm) is given, the cross virial term is scaled by `(1 - xCO2·1e-6)²`.
/// The result has the unit of `pco2`.
///
/// # Errors
///
/// Returns an error if the series have different lengths or the pressure or
/// temperature unit cannot be inferred.
pub fn fugacity(
    pco2: ArrayView1<f64>,
    p_equ: ArrayView1<f64>,
    sst: ArrayView1<f64>,
    xco2: Option<ArrayView1<f64>>,
) -> Result<Array1<f64>> {
    check_lengths(&["pco2", "p_equ", "sst"], &[pco2.view(), p_equ.view(), sst.view()])?;
    if let Some(x) = xco2 {
        check_lengths(&["pco2", "xco2"], &[pco2.view(), x.view()])?;
    }

    let p_atm = pressure_to_atm(p_equ)?;
    let t_k = temperature_to_kelvin(sst)?;

    let x_c = match xco2 {
        Some(x) => x.mapv(|v| 1.0 - v * 1e-6),
        None => Array1::ones(pco2.len()),
    };

    Ok(Zip::from(&pco2)
        .and(&p_atm)
        .and(&t_k)
        .and(&x_c)
        .map_collect(|&pc, &p, &t, &xc| {
            // virial coefficients in cm³/mol
            let b_co2 = -1636.75 + 12.0408 * t - 3.27957e-2 * t.powi(2) + 3.16528e-5 * t.powi(3);
            let delta_co2 = 57.7 - 0.118 * t;
            pc * (p * (b_co2 + 2.0 * delta_co2 * xc.powi(2)) / (GAS_CONSTANT * t)).exp()
        }))
}
