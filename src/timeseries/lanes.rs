//! Parallel evaluation of per-grid-cell time series
//!
//! Every routine in [`crate::timeseries`] works on the 1-D series found along
//! the time axis of each grid cell. The lanes are copied out, processed on the
//! rayon pool and written back into freshly allocated arrays.

use crate::errors::{CodeBaseError, Result};
use ndarray::{ArrayD, ArrayView1, Axis};
use rayon::prelude::*;

/// Apply `f` to every lane of `data` along `axis` in parallel.
///
/// The results come back in the iteration order of [`ndarray::ArrayBase::lanes`].
pub(crate) fn par_map_lanes<T, F>(data: &ArrayD<f64>, axis: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&[f64]) -> T + Sync + Send,
{
    let lanes: Vec<Vec<f64>> = data
        .lanes(Axis(axis))
        .into_iter()
        .map(|lane| lane.to_vec())
        .collect();

    tracing::debug!(
        "Processing {} time series across {} threads",
        lanes.len(),
        rayon::current_num_threads()
    );

    lanes.par_iter().map(|lane| f(lane)).collect()
}

/// Build an array of `shape` whose lanes along `axis` are taken from `lanes`.
pub(crate) fn assemble_lanes<'a, I>(shape: &[usize], axis: usize, lanes: I) -> Result<ArrayD<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut out = ArrayD::from_elem(shape.to_vec(), f64::NAN);
    let lane_len = shape[axis];
    let mut filled = 0usize;
    for (mut target, source) in out.lanes_mut(Axis(axis)).into_iter().zip(lanes) {
        if source.len() != lane_len {
            return Err(CodeBaseError::StatisticsError(format!(
                "Lane has length {} but {} was expected",
                source.len(),
                lane_len
            )));
        }
        target.assign(&ArrayView1::from(source));
        filled += 1;
    }

    let expected: usize = shape
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != axis)
        .map(|(_, &len)| len)
        .product();
    if filled != expected {
        return Err(CodeBaseError::StatisticsError(format!(
            "Got {filled} lanes but the output holds {expected}"
        )));
    }
    Ok(out)
}

/// Shape of `shape` with the entry at `axis` replaced by `len`.
pub(crate) fn with_axis_len(shape: &[usize], axis: usize, len: usize) -> Vec<usize> {
    let mut new_shape = shape.to_vec();
    new_shape[axis] = len;
    new_shape
}
