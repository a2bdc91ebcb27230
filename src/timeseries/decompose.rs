//! Decomposition of time series into trend, seasonal cycle and residuals
//!
//! The trend is a straight line fitted by least squares against the time
//! index. The seasonal cycle is the mean of the detrended series per calendar
//! month and the residuals are what remains.

use super::lanes::{assemble_lanes, par_map_lanes, with_axis_len};
use super::{Frequency, TimeSeries, MONTH_DIM};
use crate::dataset::{DataVariable, Dataset};
use crate::errors::{CodeBaseError, Result};
use crate::utils::{csv_field, nan_mean};
use chrono::NaiveDate;
use ndarray::{Array1, ArrayD, Axis};
use tracing::warn;

/// Slope and intercept of a line fitted against the time index `0..n`.
fn fit_line(values: &[f64]) -> (f64, f64) {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, y)| y.is_finite())
        .map(|(i, &y)| (i as f64, y))
        .collect();
    if points.len() < 2 {
        return (f64::NAN, f64::NAN);
    }

    let n = points.len() as f64;
    let x_mean = points.iter().map(|p| p.0).sum::<f64>() / n;
    let y_mean = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), &(x, y)| {
        (sxx + (x - x_mean).powi(2), sxy + (x - x_mean) * (y - y_mean))
    });

    let slope = sxy / sxx;
    (slope, y_mean - slope * x_mean)
}

/// Per-month NaN-skipping mean, index 0 holds January.
fn monthly_means(values: &[f64], months: &[u32]) -> [f64; 12] {
    let mut cycle = [f64::NAN; 12];
    for (m, slot) in cycle.iter_mut().enumerate() {
        *slot = nan_mean(
            values
                .iter()
                .zip(months)
                .filter(|(_, month)| **month as usize == m + 1)
                .map(|(&v, _)| v),
        );
    }
    cycle
}

/// Linear trend of every grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTrend {
    /// Change per time step
    pub slope: ArrayD<f64>,
    /// Value at the first time step
    pub intercept: ArrayD<f64>,
    /// Dims of `slope` and `intercept` (time removed)
    pub dims: Vec<String>,
}

/// Fit a straight line against the time index for every grid cell.
///
/// NaNs are skipped; cells with fewer than two valid values get NaN.
///
/// # Errors
///
/// Returns an error if the result arrays cannot be assembled.
pub fn linear_trend(ts: &TimeSeries) -> Result<LinearTrend> {
    let axis = ts.time_axis()?;
    let fits = par_map_lanes(&ts.data, axis, fit_line);

    let shape = with_axis_len(ts.data.shape(), axis, 1);
    let slopes: Vec<[f64; 1]> = fits.iter().map(|f| [f.0]).collect();
    let intercepts: Vec<[f64; 1]> = fits.iter().map(|f| [f.1]).collect();
    let slope = assemble_lanes(&shape, axis, slopes.iter().map(|s| s.as_slice()))?
        .index_axis_move(Axis(axis), 0);
    let intercept = assemble_lanes(&shape, axis, intercepts.iter().map(|s| s.as_slice()))?
        .index_axis_move(Axis(axis), 0);

    let dims = ts
        .dims
        .iter()
        .filter(|d| **d != ts.time_dim)
        .cloned()
        .collect();
    Ok(LinearTrend {
        slope,
        intercept,
        dims,
    })
}

struct LaneDecomposition {
    trend: Vec<f64>,
    detrended: Vec<f64>,
    seasonality: [f64; 12],
    residuals: Vec<f64>,
    deseasonalized: Vec<f64>,
}

fn decompose_lane(values: &[f64], months: &[u32]) -> LaneDecomposition {
    let (slope, intercept) = fit_line(values);
    let trend: Vec<f64> = (0..values.len())
        .map(|i| intercept + i as f64 * slope)
        .collect();
    let detrended: Vec<f64> = values.iter().zip(&trend).map(|(v, t)| v - t).collect();
    let seasonality = monthly_means(&detrended, months);
    let residuals: Vec<f64> = detrended
        .iter()
        .zip(months)
        .map(|(d, &m)| d - seasonality[m as usize - 1])
        .collect();
    let deseasonalized = residuals.iter().zip(&trend).map(|(r, t)| r + t).collect();

    LaneDecomposition {
        trend,
        detrended,
        seasonality,
        residuals,
        deseasonalized,
    }
}

/// Components of a seasonal decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// The decomposed input (its data is the raw series)
    pub source: TimeSeries,
    /// Linear trend evaluated at every time step
    pub trend: ArrayD<f64>,
    /// Raw series minus trend
    pub detrended: ArrayD<f64>,
    /// Mean seasonal cycle; the time axis is replaced by a month axis of length 12
    pub seasonality: ArrayD<f64>,
    /// Detrended series minus seasonal cycle
    pub residuals: ArrayD<f64>,
    /// Residuals plus trend
    pub deseasonalized: ArrayD<f64>,
}

impl Decomposition {
    /// Dims of the seasonality array
    #[must_use]
    pub fn seasonality_dims(&self) -> Vec<String> {
        self.source
            .dims
            .iter()
            .map(|d| {
                if *d == self.source.time_dim {
                    MONTH_DIM.to_string()
                } else {
                    d.clone()
                }
            })
            .collect()
    }

    /// Seasonal cycle repeated along the time axis of the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has lost its time dimension.
    pub fn seasonal_component(&self) -> Result<ArrayD<f64>> {
        let axis = self.source.time_axis()?;
        let months: Vec<usize> = self.source.months().iter().map(|&m| m as usize - 1).collect();
        Ok(self.seasonality.select(Axis(axis), &months))
    }

    /// Collect all components in a [`Dataset`].
    ///
    /// # Errors
    ///
    /// Returns an error if the variables do not fit together.
    pub fn to_dataset(&self) -> Result<Dataset> {
        let mut ds = Dataset::new();
        self.source.add_coordinates(&mut ds)?;
        ds.add_variable(DataVariable::new(
            MONTH_DIM,
            vec![MONTH_DIM.to_string()],
            Array1::from_iter((1..=12).map(f64::from)).into_dyn(),
        ))?;

        let dims = self.source.dims.clone();
        for (name, data) in [
            ("trend", &self.trend),
            ("detrended", &self.detrended),
            ("residuals", &self.residuals),
            ("deseasonalized", &self.deseasonalized),
        ] {
            ds.add_variable(
                DataVariable::new(name, dims.clone(), data.clone())
                    .with_attributes(self.source.attributes.clone()),
            )?;
        }
        ds.add_variable(
            DataVariable::new("seasonality", self.seasonality_dims(), self.seasonality.clone())
                .with_attributes(self.source.attributes.clone()),
        )?;
        Ok(ds)
    }
}

/// Decompose every grid cell into trend, seasonality and residuals.
///
/// The trend is the least-squares line against the time index, the
/// seasonality the per-calendar-month mean of the detrended series, and the
/// residuals the detrended series minus the seasonality of each step's month.
///
/// # Errors
///
/// Returns an error if the result arrays cannot be assembled.
pub fn seasonal_decompose(ts: &TimeSeries) -> Result<Decomposition> {
    if ts.frequency() != Some(Frequency::Monthly) {
        warn!("Frequency seems to be not monthly. The seasonal cycle may be meaningless.");
    }

    let axis = ts.time_axis()?;
    let months = ts.months();
    let lanes = par_map_lanes(&ts.data, axis, |values| decompose_lane(values, &months));

    let shape = ts.data.shape();
    let month_shape = with_axis_len(shape, axis, 12);
    let trend = assemble_lanes(shape, axis, lanes.iter().map(|l| l.trend.as_slice()))?;
    let detrended = assemble_lanes(shape, axis, lanes.iter().map(|l| l.detrended.as_slice()))?;
    let seasonality =
        assemble_lanes(&month_shape, axis, lanes.iter().map(|l| l.seasonality.as_slice()))?;
    let residuals = assemble_lanes(shape, axis, lanes.iter().map(|l| l.residuals.as_slice()))?;
    let deseasonalized =
        assemble_lanes(shape, axis, lanes.iter().map(|l| l.deseasonalized.as_slice()))?;

    Ok(Decomposition {
        source: ts.clone(),
        trend,
        detrended,
        seasonality,
        residuals,
        deseasonalized,
    })
}

/// Remove the mean seasonal cycle while keeping the trend.
///
/// The series is detrended, each month's long-term mean is subtracted and the
/// trend is added back. Attributes and coordinates are kept.
///
/// # Errors
///
/// Returns an error if the result arrays cannot be assembled.
pub fn deseasonalize(ts: &TimeSeries) -> Result<TimeSeries> {
    let decomposition = seasonal_decompose(ts)?;
    Ok(TimeSeries {
        data: decomposition.deseasonalized,
        ..decomposition.source
    })
}

/// Table-like decomposition of a single series, trend from a rolling mean
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalFrame {
    pub times: Vec<NaiveDate>,
    pub raw: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonality: Vec<f64>,
    pub detrended: Vec<f64>,
    pub residuals: Vec<f64>,
}

impl SeasonalFrame {
    /// Column names in output order
    pub const COLUMNS: [&'static str; 5] = ["raw", "trend", "seasonality", "detrended", "residuals"];

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values of row `i` in [`SeasonalFrame::COLUMNS`] order
    #[must_use]
    pub fn row(&self, i: usize) -> [f64; 5] {
        [
            self.raw[i],
            self.trend[i],
            self.seasonality[i],
            self.detrended[i],
            self.residuals[i],
        ]
    }

    /// Render as CSV with the dates in the first column; NaN becomes an empty field.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = format!("time,{}\n", Self::COLUMNS.join(","));
        for (i, time) in self.times.iter().enumerate() {
            let fields: Vec<String> = self.row(i).iter().map(|&v| csv_field(v)).collect();
            out.push_str(&format!("{},{}\n", time.format("%Y-%m-%d"), fields.join(",")));
        }
        out
    }
}

/// Centered rolling mean; windows that reach past the edges or hold a NaN yield NaN.
fn centered_rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let right = (window - 1) / 2;
    let left = window - 1 - right;
    (0..values.len())
        .map(|i| {
            if i < left || i + right >= values.len() {
                return f64::NAN;
            }
            let slice = &values[i - left..=i + right];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                slice.iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

/// Decompose a one-dimensional series with a rolling-mean trend.
///
/// The trend is a centered rolling mean over `freq + 1` steps (e.g. 13 for
/// monthly data), the seasonality the per-calendar-month mean of the detrended
/// series broadcast back onto every step.
///
/// # Errors
///
/// Returns an error if the series is not one-dimensional or `freq` is zero.
pub fn rolling_decompose(ts: &TimeSeries, freq: usize) -> Result<SeasonalFrame> {
    if ts.data.ndim() != 1 {
        return Err(CodeBaseError::InvalidInput(format!(
            "Expected a one-dimensional series, got {} dimensions",
            ts.data.ndim()
        )));
    }
    if freq == 0 {
        return Err(CodeBaseError::InvalidInput(
            "Frequency must be at least 1".to_string(),
        ));
    }

    let raw: Vec<f64> = ts.data.iter().copied().collect();
    let trend = centered_rolling_mean(&raw, freq + 1);
    let detrended: Vec<f64> = raw.iter().zip(&trend).map(|(r, t)| r - t).collect();

    let months = ts.months();
    let cycle = monthly_means(&detrended, &months);
    let seasonality: Vec<f64> = months.iter().map(|&m| cycle[m as usize - 1]).collect();
    let residuals = detrended
        .iter()
        .zip(&seasonality)
        .map(|(d, s)| d - s)
        .collect();

    Ok(SeasonalFrame {
        times: ts.times.clone(),
        raw,
        trend,
        seasonality,
        detrended,
        residuals,
    })
}
