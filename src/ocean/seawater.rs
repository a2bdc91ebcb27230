//! Seawater properties: salinity, water vapour pressure, xCO2 -> pCO2

use super::check_lengths;
use crate::errors::{CodeBaseError, Result};
use crate::units::{pressure_to_atm, pressure_to_mbar, temperature_to_celsius, temperature_to_kelvin};
use ndarray::{Array1, ArrayView1, Zip};

/// Conductivity of standard seawater (S=35, T=15 °C, p=0) in mS/cm
const STANDARD_CONDUCTIVITY: f64 = 42.914;

const A: [f64; 6] = [0.008, -0.1692, 25.3851, 14.0941, -7.0261, 2.7081];
const B: [f64; 6] = [0.0005, -0.0056, -0.0066, -0.0375, 0.0636, -0.0144];
const C: [f64; 5] = [6.766097e-1, 2.00564e-2, 1.104259e-4, -6.9698e-7, 1.0031e-9];
const PRESSURE_COEFFS: [f64; 3] = [2.070e-5, -6.370e-10, 3.989e-15];
const TEMPERATURE_COEFFS: [f64; 4] = [3.426e-2, 4.464e-4, 4.215e-1, -3.107e-3];
const K: f64 = 0.0162;

fn polynomial(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Practical salinity of a single sample (conductivity in mS/cm, T in °C, p in dbar).
fn practical_salinity(conductivity: f64, t: f64, p: f64) -> f64 {
    let r = conductivity / STANDARD_CONDUCTIVITY;
    let r_t = polynomial(&C, t);

    let [a1, a2, a3] = PRESSURE_COEFFS;
    let [b1, b2, b3, b4] = TEMPERATURE_COEFFS;
    let alpha = (a1 * p + a2 * p.powi(2) + a3 * p.powi(3))
        / (1.0 + b1 * t + b2 * t.powi(2) + b3 * r + b4 * t * r);
    let r_p = 1.0 + alpha;

    let xi = (r / (r_t * r_p)).sqrt();
    let delta_s = polynomial(&B, xi) * (t - 15.0) / (1.0 + K * (t - 15.0));

    polynomial(&A, xi) + delta_s
}

/// Compute salinity from conductivity after Lewis (1981), PSS-78.
///
/// Conductivity is expected in mS/cm (multiply S/m by 10 beforehand),
/// temperature in °C or K and pressure in hPa, Pa or atm; pressure is
/// converted to dbar internally.
///
/// # Errors
///
/// Returns an error if the series have different lengths or units cannot be inferred.
pub fn conductivity_to_salinity(
    conductivity: ArrayView1<f64>,
    temperature: ArrayView1<f64>,
    pressure: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    check_lengths(
        &["conductivity", "temperature", "pressure"],
        &[conductivity.view(), temperature.view(), pressure.view()],
    )?;
    let p_dbar = pressure_to_mbar(pressure)?.mapv(|p| p / 100.0);
    let t_c = temperature_to_celsius(temperature)?;

    Ok(Zip::from(&conductivity)
        .and(&t_c)
        .and(&p_dbar)
        .map_collect(|&c, &t, &p| practical_salinity(c, t, p)))
}

/// Water vapour pressure (atm) over seawater after Weiss & Price (1980).
///
/// # Errors
///
/// Returns an error if the series have different lengths or the temperature
/// unit cannot be inferred.
pub fn water_vapor_pressure(
    temperature: ArrayView1<f64>,
    salinity: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    check_lengths(&["temperature", "salinity"], &[temperature.view(), salinity.view()])?;
    let t_k = temperature_to_kelvin(temperature)?;
    Ok(Zip::from(&t_k).and(&salinity).map_collect(|&t, &s| {
        (24.4543 - 67.4509 * (100.0 / t) - 4.8489 * (t / 100.0).ln() - 0.000544 * s).exp()
    }))
}

/// Kind of air the CO2 mole fraction was measured in
#[derive(Debug, Clone, Copy)]
pub enum AirType<'a> {
    /// Water-saturated air, no vapour correction needed
    Wet,
    /// Dried air; temperature and salinity are needed for the vapour pressure
    Dry {
        temperature: ArrayView1<'a, f64>,
        salinity: ArrayView1<'a, f64>,
    },
}

/// Convert a mole fraction (ppm) into a partial pressure (µatm) after Dickson et al. (2007).
///
/// `pCO2 = xCO2 · (p_equ - pH2O)` where pH2O is zero for wet air.
///
/// # Errors
///
/// Returns an error if the series have different lengths or units cannot be inferred.
pub fn ppm_to_uatm(
    xco2: ArrayView1<f64>,
    p_equ: ArrayView1<f64>,
    air: AirType<'_>,
) -> Result<Array1<f64>> {
    check_lengths(&["xco2", "p_equ"], &[xco2.view(), p_equ.view()])?;
    let p_atm = pressure_to_atm(p_equ)?;

    let p_h2o = match air {
        AirType::Wet => Array1::zeros(xco2.len()),
        AirType::Dry {
            temperature,
            salinity,
        } => {
            if temperature.len() != xco2.len() {
                return Err(CodeBaseError::InvalidInput(
                    "Temperature and salinity must accompany every xCO2 value for dry air"
                        .to_string(),
                ));
            }
            water_vapor_pressure(temperature, salinity)?
        }
    };

    Ok(Zip::from(&xco2)
        .and(&p_atm)
        .and(&p_h2o)
        .map_collect(|&x, &p, &w| x * (p - w)))
}
