//! Alignment of twin y-axes
//!
//! Two curves with the same qualitative profile drawn on twin axes should
//! overlap. [`align_curves`] keeps the first axis and computes limits for the
//! second one so that the curves share their amplitude and mean position.

use crate::errors::{CodeBaseError, Result};
use crate::utils::nan_mean;
use serde::{Deserialize, Serialize};

/// Lower and upper limit of an axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub lower: f64,
    pub upper: f64,
}

impl AxisLimits {
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    #[must_use]
    pub fn extent(&self) -> f64 {
        self.upper - self.lower
    }

    /// Position of `value` relative to the axis, 0 at the lower and 1 at the
    /// upper limit.
    #[must_use]
    pub fn relative(&self, value: f64) -> f64 {
        (value - self.lower) / self.extent()
    }
}

fn nan_extrema(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// New limits for the second axis so that `y2` lines up with `y1`.
///
/// First the extent of the second axis is chosen so that `y2` spans the same
/// fraction of it as `y1` does of the first axis. Then the limits are shifted
/// so that the means of both curves sit at the same relative height.
///
/// # Errors
///
/// Returns an error if a curve has no valid values, an axis has no extent or
/// `y1` is constant.
pub fn align_curves(ax1: AxisLimits, y1: &[f64], ax2: AxisLimits, y2: &[f64]) -> Result<AxisLimits> {
    let ((y1_min, y1_max), (y2_min, y2_max)) = match (nan_extrema(y1), nan_extrema(y2)) {
        (Some(e1), Some(e2)) => (e1, e2),
        _ => {
            return Err(CodeBaseError::InvalidInput(
                "Cannot align curves without valid values".to_string(),
            ))
        }
    };
    if ax1.extent() == 0.0 || ax2.extent() == 0.0 {
        return Err(CodeBaseError::InvalidInput("Axis limits have no extent".to_string()));
    }
    let y1_relative_amplitude = (y1_max - y1_min) / ax1.extent();
    if y1_relative_amplitude == 0.0 {
        return Err(CodeBaseError::InvalidInput(
            "Reference curve is constant".to_string(),
        ));
    }

    let lower = y2_min - ax1.relative(y1_min) * ax2.extent();
    let scaled = AxisLimits::new(lower, lower + (y2_max - y2_min) / y1_relative_amplitude);

    let mean1 = nan_mean(y1.iter().copied());
    let mean2 = nan_mean(y2.iter().copied());
    let lower = mean2 - ax1.relative(mean1) * scaled.extent();
    Ok(AxisLimits::new(lower, lower + scaled.extent()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_affine_curves_overlap_after_alignment() {
        let x: Vec<f64> = (0..100).map(|i| f64::from(i) * 4.0 * std::f64::consts::PI / 99.0).collect();
        let y1: Vec<f64> = x.iter().map(|x| x.sin() + 10.0).collect();
        let y3: Vec<f64> = x.iter().map(|x| 1.6 * x.sin() + 3.0).collect();

        let ax1 = AxisLimits::new(8.5, 11.5);
        let ax2 = align_curves(ax1, &y1, AxisLimits::new(0.0, 5.0), &y3).unwrap();
        for (a, b) in y1.iter().zip(&y3) {
            assert_abs_diff_eq!(ax1.relative(*a), ax2.relative(*b), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_nan_values_are_ignored() {
        let y1 = [0.0, f64::NAN, 2.0];
        let y2 = [10.0, f64::NAN, 30.0];
        let ax2 = align_curves(AxisLimits::new(-1.0, 3.0), &y1, AxisLimits::new(0.0, 1.0), &y2).unwrap();
        assert_abs_diff_eq!(ax2.lower, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ax2.upper, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_input() {
        let ax = AxisLimits::new(0.0, 1.0);
        assert!(align_curves(ax, &[], ax, &[1.0]).is_err());
        assert!(align_curves(ax, &[0.5, 0.5], ax, &[1.0, 2.0]).is_err());
        assert!(align_curves(AxisLimits::new(1.0, 1.0), &[0.0, 1.0], ax, &[1.0, 2.0]).is_err());
    }
}
