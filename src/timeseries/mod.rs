//! Time-series decomposition and calendar-aware annual averaging
//!
//! The routines in this module work on a [`TimeSeries`]: a labeled
//! n-dimensional array with one time axis and a CF calendar. Every grid cell
//! is treated independently and processed on the rayon pool.
//!
//! # Organization
//!
//! - [`calendar`]: CF calendars and time coordinate encoding
//! - [`decompose`]: linear trend, seasonal cycle, residuals
//! - [`annual`]: day-weighted annual means and their monthly extension

pub mod annual;
pub mod calendar;
pub mod decompose;
mod lanes;

pub use annual::{extend_annual_series, weighted_annual_mean, AnnualMean};
pub use calendar::{Calendar, CalendarDate, TimeUnit, TimeUnits};
pub use decompose::{
    deseasonalize, linear_trend, rolling_decompose, seasonal_decompose, Decomposition,
    LinearTrend, SeasonalFrame,
};

use crate::dataset::{DataVariable, Dataset};
use crate::errors::{CodeBaseError, Result};
use chrono::{Datelike, NaiveDate};
use ndarray::{Array1, ArrayD};
use std::collections::BTreeMap;

/// Name of the month coordinate created by seasonal grouping
pub const MONTH_DIM: &str = "month";
/// Name of the year coordinate created by annual averaging
pub const YEAR_DIM: &str = "year";

/// A labeled n-dimensional array with a time axis
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Variable name
    pub name: String,
    /// Dimension names, one per array axis
    pub dims: Vec<String>,
    /// Name of the time dimension, one of `dims`
    pub time_dim: String,
    /// Timestamp of every step along the time axis
    pub times: Vec<NaiveDate>,
    /// Calendar the timestamps refer to
    pub calendar: Calendar,
    /// Values, NaN marks missing data
    pub data: ArrayD<f64>,
    /// Coordinate values of non-time dimensions
    pub coords: BTreeMap<String, Vec<f64>>,
    /// Variable attributes
    pub attributes: BTreeMap<String, String>,
}

impl TimeSeries {
    /// Create a new time series, validating dims and time axis against the data.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of dims differs from the array rank, the
    /// time dimension is missing, or the time axis length differs from the
    /// number of timestamps.
    pub fn new(
        name: impl Into<String>,
        dims: Vec<String>,
        time_dim: &str,
        times: Vec<NaiveDate>,
        calendar: Calendar,
        data: ArrayD<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if dims.len() != data.ndim() {
            return Err(CodeBaseError::InvalidInput(format!(
                "{} dimension names given for an array with {} axes",
                dims.len(),
                data.ndim()
            )));
        }
        let axis = dims
            .iter()
            .position(|d| d == time_dim)
            .ok_or_else(|| CodeBaseError::DimensionNotFound {
                var: name.clone(),
                dim: time_dim.to_string(),
            })?;
        if data.shape()[axis] != times.len() {
            return Err(CodeBaseError::InvalidInput(format!(
                "Time axis has length {} but {} timestamps were given",
                data.shape()[axis],
                times.len()
            )));
        }

        Ok(Self {
            name,
            dims,
            time_dim: time_dim.to_string(),
            times,
            calendar,
            data,
            coords: BTreeMap::new(),
            attributes: BTreeMap::new(),
        })
    }

    /// A one-dimensional monthly series starting in `start_year`-`start_month`.
    ///
    /// Timestamps are placed on the first day of every month.
    ///
    /// # Errors
    ///
    /// Returns an error if the start date is invalid.
    pub fn monthly(
        name: impl Into<String>,
        start_year: i32,
        start_month: u32,
        values: Vec<f64>,
        calendar: Calendar,
    ) -> Result<Self> {
        let times = month_starts(start_year, start_month, values.len())?;
        Self::new(
            name,
            vec!["time".to_string()],
            "time",
            times,
            calendar,
            Array1::from(values).into_dyn(),
        )
    }

    /// Attach coordinate values to a non-time dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimension does not exist or the length differs.
    pub fn with_coord(mut self, dim: &str, values: Vec<f64>) -> Result<Self> {
        let axis = self.axis_of(dim)?;
        if self.data.shape()[axis] != values.len() {
            return Err(CodeBaseError::InvalidInput(format!(
                "Coordinate '{}' has {} values but the dimension has length {}",
                dim,
                values.len(),
                self.data.shape()[axis]
            )));
        }
        self.coords.insert(dim.to_string(), values);
        Ok(self)
    }

    /// Attach an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Index of the time axis
    ///
    /// # Errors
    ///
    /// Returns an error if `time_dim` is not one of the dimensions.
    pub fn time_axis(&self) -> Result<usize> {
        self.axis_of(&self.time_dim)
    }

    /// Index of the named dimension
    ///
    /// # Errors
    ///
    /// Returns an error if the dimension does not exist.
    pub fn axis_of(&self, dim: &str) -> Result<usize> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .ok_or_else(|| CodeBaseError::DimensionNotFound {
                var: self.name.clone(),
                dim: dim.to_string(),
            })
    }

    /// Calendar month (1-12) of every time step
    #[must_use]
    pub fn months(&self) -> Vec<u32> {
        self.times.iter().map(Datelike::month).collect()
    }

    /// Calendar year of every time step
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.times.iter().map(Datelike::year).collect()
    }

    /// Number of days of the month of every time step, according to the calendar
    #[must_use]
    pub fn days_in_month(&self) -> Vec<u32> {
        self.times
            .iter()
            .map(|t| self.calendar.days_in_month(t.year(), t.month()))
            .collect()
    }

    /// Guess the sampling frequency of the time axis
    #[must_use]
    pub fn frequency(&self) -> Option<Frequency> {
        infer_frequency(&self.times)
    }

    /// Wrap the series in a [`Dataset`] with its time and other coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the variables do not fit together.
    pub fn to_dataset(&self) -> Result<Dataset> {
        let mut ds = Dataset::new();
        self.add_coordinates(&mut ds)?;
        ds.add_variable(
            DataVariable::new(&self.name, self.dims.clone(), self.data.clone())
                .with_attributes(self.attributes.clone()),
        )?;
        Ok(ds)
    }

    /// Add the CF time coordinate and the coordinates of the other dims to `ds`.
    pub(crate) fn add_coordinates(&self, ds: &mut Dataset) -> Result<()> {
        let start_year = self.times.first().map_or(1970, Datelike::year);
        let units = TimeUnits::days_since_year(start_year);
        let offsets = units.encode(&self.times, self.calendar);
        ds.add_variable(
            DataVariable::new(
                &self.time_dim,
                vec![self.time_dim.clone()],
                Array1::from(offsets).into_dyn(),
            )
            .with_attribute("units", units.to_string())
            .with_attribute("calendar", self.calendar.cf_name()),
        )?;
        self.add_spatial_coordinates(ds)
    }

    /// Add coordinates of all non-time dims to `ds`.
    pub(crate) fn add_spatial_coordinates(&self, ds: &mut Dataset) -> Result<()> {
        for (dim, values) in &self.coords {
            if *dim == self.time_dim {
                continue;
            }
            ds.add_variable(DataVariable::new(
                dim,
                vec![dim.clone()],
                Array1::from(values.clone()).into_dyn(),
            ))?;
        }
        Ok(())
    }
}

/// First-of-month timestamps for `count` consecutive months.
///
/// # Errors
///
/// Returns an error if the start month is invalid.
pub fn month_starts(start_year: i32, start_month: u32, count: usize) -> Result<Vec<NaiveDate>> {
    if !(1..=12).contains(&start_month) {
        return Err(CodeBaseError::TimeError(format!(
            "Invalid start month {start_month}"
        )));
    }
    let first = i64::from(start_year) * 12 + i64::from(start_month) - 1;
    (0..count)
        .map(|i| {
            let index = first + i as i64;
            let year = i32::try_from(index.div_euclid(12))
                .map_err(|_| CodeBaseError::TimeError("Year out of range".to_string()))?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let month = index.rem_euclid(12) as u32 + 1;
            NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| CodeBaseError::TimeError(format!("Invalid date {year}-{month}-01")))
        })
        .collect()
}

/// Sampling frequencies that can be inferred from a time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Monthly,
    Annual,
}

/// Infer the sampling frequency of a sequence of timestamps.
///
/// At least three timestamps are required. Monthly data may sit on any day of
/// the month as long as consecutive steps advance by exactly one month.
#[must_use]
pub fn infer_frequency(times: &[NaiveDate]) -> Option<Frequency> {
    if times.len() < 3 {
        return None;
    }
    let steps = || times.windows(2);

    if steps().all(|w| (w[1] - w[0]).num_days() == 1) {
        return Some(Frequency::Daily);
    }
    let month_index = |d: &NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month());
    if steps().all(|w| month_index(&w[1]) - month_index(&w[0]) == 1) {
        return Some(Frequency::Monthly);
    }
    if steps().all(|w| w[1].year() - w[0].year() == 1 && w[1].month() == w[0].month()) {
        return Some(Frequency::Annual);
    }
    None
}
