//! Calendar-aware annual means of monthly data
//!
//! Months have different lengths and the length of February depends on the
//! calendar and the year, so every month is weighted by its number of days
//! relative to the days of its year.

use super::lanes::{assemble_lanes, par_map_lanes, with_axis_len};
use super::{Calendar, Frequency, TimeSeries, YEAR_DIM};
use crate::dataset::{DataVariable, Dataset};
use crate::errors::{CodeBaseError, Result};
use chrono::NaiveDate;
use ndarray::{Array1, ArrayD, Axis};
use std::collections::BTreeMap;
use tracing::warn;

const WEIGHT_TOLERANCE: f64 = 1e-8;

/// Annual values derived from a time series
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualMean {
    pub name: String,
    /// Dims of `data`; the time dimension is replaced by `year`
    pub dims: Vec<String>,
    pub years: Vec<i32>,
    pub data: ArrayD<f64>,
    pub calendar: Calendar,
    pub coords: BTreeMap<String, Vec<f64>>,
    pub attributes: BTreeMap<String, String>,
}

impl AnnualMean {
    /// Interpret a series with one timestamp per year as annual values.
    ///
    /// # Errors
    ///
    /// Returns an error if two timestamps fall into the same year.
    pub fn from_annual_series(ts: &TimeSeries) -> Result<Self> {
        let years = ts.years();
        if years.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CodeBaseError::InvalidInput(
                "Annual series must have strictly increasing years".to_string(),
            ));
        }
        Ok(Self {
            name: ts.name.clone(),
            dims: replace_dim(&ts.dims, &ts.time_dim, YEAR_DIM),
            years,
            data: ts.data.clone(),
            calendar: ts.calendar,
            coords: ts.coords.clone(),
            attributes: ts.attributes.clone(),
        })
    }

    /// Index of the year axis
    #[must_use]
    pub fn year_axis(&self) -> usize {
        self.dims
            .iter()
            .position(|d| d == YEAR_DIM)
            .unwrap_or_default()
    }

    /// Collect the annual values and their coordinates in a [`Dataset`].
    ///
    /// # Errors
    ///
    /// Returns an error if the variables do not fit together.
    pub fn to_dataset(&self) -> Result<Dataset> {
        let mut ds = Dataset::new();
        ds.add_variable(DataVariable::new(
            YEAR_DIM,
            vec![YEAR_DIM.to_string()],
            Array1::from_iter(self.years.iter().map(|&y| f64::from(y))).into_dyn(),
        ))?;
        for (dim, values) in &self.coords {
            ds.add_variable(DataVariable::new(
                dim,
                vec![dim.clone()],
                Array1::from(values.clone()).into_dyn(),
            ))?;
        }
        ds.add_variable(
            DataVariable::new(&self.name, self.dims.clone(), self.data.clone())
                .with_attributes(self.attributes.clone()),
        )?;
        Ok(ds)
    }
}

fn replace_dim(dims: &[String], from: &str, to: &str) -> Vec<String> {
    dims.iter()
        .map(|d| if d == from { to.to_string() } else { d.clone() })
        .collect()
}

/// Day weights of every time step relative to the days of its year.
///
/// # Errors
///
/// Returns an error if the weights of a year do not add up to one.
pub fn month_weights(ts: &TimeSeries) -> Result<Vec<f64>> {
    let years = ts.years();
    let month_length: Vec<f64> = ts.days_in_month().into_iter().map(f64::from).collect();

    let mut days_per_year: BTreeMap<i32, f64> = BTreeMap::new();
    for (&year, &days) in years.iter().zip(&month_length) {
        *days_per_year.entry(year).or_default() += days;
    }

    let weights: Vec<f64> = years
        .iter()
        .zip(&month_length)
        .map(|(year, days)| days / days_per_year[year])
        .collect();

    let mut sums: BTreeMap<i32, f64> = BTreeMap::new();
    for (&year, &w) in years.iter().zip(&weights) {
        *sums.entry(year).or_default() += w;
    }
    if let Some((year, sum)) = sums
        .iter()
        .find(|(_, sum)| (**sum - 1.0).abs() > WEIGHT_TOLERANCE)
    {
        return Err(CodeBaseError::StatisticsError(format!(
            "The sum of the weights should be 1.0! Year {year} adds up to {sum}"
        )));
    }
    Ok(weights)
}

fn check_for_frequency(ts: &TimeSeries) {
    match ts.frequency() {
        Some(Frequency::Monthly) => {}
        Some(_) => warn!("Frequency seems to be not monthly. Consider another averaging method."),
        None => warn!("Cannot infer frequency"),
    }
}

/// Compute the annual mean of monthly data, weighting each month by its length.
///
/// Weights are derived per year, so leap years and partial years are handled
/// by the calendar of the series. Missing values get a weight of zero and the
/// remaining weights of the year are renormalised; years without any valid
/// value become NaN. The result has a `year` axis instead of the time axis,
/// covering every year from the first to the last timestamp.
///
/// # Errors
///
/// Returns an error if the series is empty or the weights are inconsistent.
pub fn weighted_annual_mean(ts: &TimeSeries) -> Result<AnnualMean> {
    check_for_frequency(ts);

    let years = ts.years();
    let (Some(&first), Some(&last)) = (years.iter().min(), years.iter().max()) else {
        return Err(CodeBaseError::InvalidInput(
            "Cannot average an empty time series".to_string(),
        ));
    };
    let out_years: Vec<i32> = (first..=last).collect();
    let weights = month_weights(ts)?;

    let axis = ts.time_axis()?;
    let lanes = par_map_lanes(&ts.data, axis, |values| {
        let mut sums = vec![0.0; out_years.len()];
        let mut norms = vec![0.0; out_years.len()];
        for ((&v, &w), &year) in values.iter().zip(&weights).zip(&years) {
            if v.is_nan() {
                continue;
            }
            let slot = (year - first) as usize;
            sums[slot] += v * w;
            norms[slot] += w;
        }
        sums.iter()
            .zip(&norms)
            .map(|(s, n)| s / n)
            .collect::<Vec<f64>>()
    });

    let shape = with_axis_len(ts.data.shape(), axis, out_years.len());
    let data = assemble_lanes(&shape, axis, lanes.iter().map(Vec::as_slice))?;

    Ok(AnnualMean {
        name: ts.name.clone(),
        dims: replace_dim(&ts.dims, &ts.time_dim, YEAR_DIM),
        years: out_years,
        data,
        calendar: ts.calendar,
        coords: ts.coords.clone(),
        attributes: ts.attributes.clone(),
    })
}

/// Expand annual values back to a monthly series.
///
/// Every month of a year carries the annual value; timestamps sit on the
/// first day of each month.
///
/// # Errors
///
/// Returns an error if a year cannot be represented as a date.
pub fn extend_annual_series(annual: &AnnualMean) -> Result<TimeSeries> {
    let axis = annual.year_axis();
    let indices: Vec<usize> = (0..annual.years.len())
        .flat_map(|i| std::iter::repeat(i).take(12))
        .collect();
    let data = annual.data.select(Axis(axis), &indices);

    let times = annual
        .years
        .iter()
        .flat_map(|&year| (1..=12).map(move |month| (year, month)))
        .map(|(year, month)| {
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
                CodeBaseError::TimeError(format!("Invalid date {year}-{month}-01"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut ts = TimeSeries::new(
        annual.name.clone(),
        replace_dim(&annual.dims, YEAR_DIM, "time"),
        "time",
        times,
        annual.calendar,
        data,
    )?;
    ts.coords = annual.coords.clone();
    ts.attributes = annual.attributes.clone();
    Ok(ts)
}
