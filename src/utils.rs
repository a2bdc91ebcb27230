//! Small numeric helpers shared by the unit, plotting and bookkeeping modules.

/// Determine the order of magnitude of every non-zero value.
///
/// Returns `None` when all values are zero, mirroring the fact that zero has
/// no order of magnitude.
///
/// # Examples
/// ```
/// use my_code_base::utils::order_of_magnitude;
///
/// assert_eq!(order_of_magnitude(&[11.0]), Some(vec![1.0]));
/// assert_eq!(order_of_magnitude(&[234.0]), Some(vec![2.0]));
/// assert_eq!(order_of_magnitude(&[0.15]), Some(vec![-1.0]));
/// assert_eq!(order_of_magnitude(&[0.0, 0.0]), None);
/// ```
pub fn order_of_magnitude(values: &[f64]) -> Option<Vec<f64>> {
    if values.iter().all(|&x| x == 0.0) {
        return None;
    }
    Some(
        values
            .iter()
            .filter(|&&x| x != 0.0)
            .map(|x| x.abs().log10().floor())
            .collect(),
    )
}

/// Median of all non-NaN values. Returns NaN if nothing is left.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut valid: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    valid.sort_by(|a, b| a.total_cmp(b));
    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / 2.0
    } else {
        valid[mid]
    }
}

/// Mean of all non-NaN values. Returns NaN if nothing is left.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Find the element inside `items` that is closest to `pivot`.
///
/// On ties the first element wins. Returns `None` for an empty slice.
///
/// ```
/// use my_code_base::utils::find_nearest;
///
/// assert_eq!(find_nearest(&[2.0, 4.0, 5.0, 7.0, 9.0, 10.0], 4.6), Some(5.0));
/// ```
pub fn find_nearest(items: &[f64], pivot: f64) -> Option<f64> {
    items.iter().copied().fold(None, |best, x| match best {
        Some(b) if (b - pivot).abs() <= (x - pivot).abs() => Some(b),
        _ => Some(x),
    })
}

/// Create bin boundaries that have the given values as their centers.
///
/// The series is extended by its last step and the half-spacing (a central
/// difference gradient with spacing 2) is subtracted from every edge.
///
/// ```
/// use my_code_base::utils::centered_bins;
///
/// let bins = centered_bins(&[-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0]);
/// assert_eq!(bins, vec![-3.5, -2.5, -1.5, -0.5, 0.5, 1.5, 2.5, 3.5]);
/// ```
pub fn centered_bins(x: &[f64]) -> Vec<f64> {
    if x.len() < 2 {
        return x.to_vec();
    }
    let n = x.len();
    let mut extended = x.to_vec();
    extended.push(x[n - 1] + (x[n - 1] - x[n - 2]));

    let m = extended.len();
    let spacing = 2.0;
    let gradient: Vec<f64> = (0..m)
        .map(|i| {
            if i == 0 {
                (extended[1] - extended[0]) / spacing
            } else if i == m - 1 {
                (extended[m - 1] - extended[m - 2]) / spacing
            } else {
                (extended[i + 1] - extended[i - 1]) / (2.0 * spacing)
            }
        })
        .collect();

    extended
        .iter()
        .zip(gradient)
        .map(|(v, g)| v - g)
        .collect()
}

/// Simplified descriptor of a type: `my_code_base::dataset::Dataset` becomes `Dataset`.
pub fn object_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Format a value for a CSV field; NaN becomes an empty field.
pub(crate) fn csv_field(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_of_magnitude_mixed() {
        assert_eq!(order_of_magnitude(&[24.13, 254.2]), Some(vec![1.0, 2.0]));
        assert_eq!(order_of_magnitude(&[1.0]), Some(vec![0.0]));
        // zeros are dropped rather than producing -inf
        assert_eq!(order_of_magnitude(&[0.0, 1013.25]), Some(vec![3.0]));
    }

    #[test]
    fn test_nan_median() {
        assert_eq!(nan_median(&[3.0, f64::NAN, 1.0, 2.0]), 2.0);
        assert_eq!(nan_median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert!(nan_median(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_find_nearest_ties_and_empty() {
        assert_eq!(find_nearest(&[1.0, 3.0], 2.0), Some(1.0));
        assert_eq!(find_nearest(&[], 2.0), None);
    }

    #[test]
    fn test_centered_bins_irregular() {
        let bins = centered_bins(&[0.0, 1.0, 3.0]);
        // extended: [0, 1, 3, 5]; gradient/2: [0.5, 0.75, 1.0, 1.0]
        assert_eq!(bins, vec![-0.5, 0.25, 2.0, 4.0]);
    }

    #[test]
    fn test_object_type_name() {
        assert_eq!(object_type_name::<Vec<f64>>(), "Vec");
        assert_eq!(object_type_name::<crate::dataset::Dataset>(), "Dataset");
    }

    #[test]
    fn test_capture_warnings() {
        let (value, logs) = log_capture::capture_warnings(|| {
            tracing::info!("not captured");
            tracing::warn!("captured");
            7
        });
        assert_eq!(value, 7);
        assert!(logs.contains("captured"));
        assert!(!logs.contains("not captured"));
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field(1.5), "1.5");
        assert_eq!(csv_field(f64::NAN), "");
    }
}
