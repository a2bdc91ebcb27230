//! Matrix inversion and empirical covariance
//!
//! Plain [`Array2`] inputs and the row/column labelled [`LabeledMatrix`] are
//! both supported. The heavy lifting is done by `nalgebra`.

use crate::errors::{CodeBaseError, Result};
use crate::utils::csv_field;
use nalgebra::DMatrix;
use ndarray::{Array2, Axis};

fn to_nalgebra(matrix: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = matrix.dim();
    DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]])
}

fn from_nalgebra(matrix: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((matrix.nrows(), matrix.ncols()), |(i, j)| matrix[(i, j)])
}

/// Invert a square matrix.
///
/// # Errors
///
/// Returns [`CodeBaseError::NonSquareMatrix`] for non-square input and
/// [`CodeBaseError::SingularMatrix`] if no inverse exists.
pub fn inv(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(CodeBaseError::NonSquareMatrix { rows, cols });
    }
    to_nalgebra(matrix)
        .try_inverse()
        .map(|inverse| from_nalgebra(&inverse))
        .ok_or(CodeBaseError::SingularMatrix)
}

/// Empirical covariance matrix `D Dᵀ / dof`.
///
/// Rows of `x` are variables and columns are observations; `D` holds the
/// anomalies of every row about its mean. With `bias` the normalisation is by
/// the number of observations `m`, otherwise by `m - 1`.
///
/// # Errors
///
/// Returns an error if there are not enough observations for the chosen
/// normalisation.
pub fn empirical_covariance(x: &Array2<f64>, bias: bool) -> Result<Array2<f64>> {
    let m = x.ncols();
    let dof = if bias { m } else { m.saturating_sub(1) };
    if dof == 0 {
        return Err(CodeBaseError::InvalidInput(format!(
            "Cannot compute a covariance from {m} observation(s)"
        )));
    }
    let means = x
        .mean_axis(Axis(1))
        .ok_or_else(|| CodeBaseError::InvalidInput("Empty input matrix".to_string()))?;
    let anomalies = x - &means.insert_axis(Axis(1));
    Ok(anomalies.dot(&anomalies.t()) / dof as f64)
}

/// A matrix with labelled rows and columns
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    pub data: Array2<f64>,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
}

impl LabeledMatrix {
    /// # Errors
    ///
    /// Returns an error if the number of labels does not match the shape.
    pub fn new(data: Array2<f64>, row_labels: Vec<String>, col_labels: Vec<String>) -> Result<Self> {
        if data.nrows() != row_labels.len() || data.ncols() != col_labels.len() {
            return Err(CodeBaseError::InvalidInput(format!(
                "{}x{} labels given for a {}x{} matrix",
                row_labels.len(),
                col_labels.len(),
                data.nrows(),
                data.ncols()
            )));
        }
        Ok(Self {
            data,
            row_labels,
            col_labels,
        })
    }

    /// Build a matrix from named columns, rows labelled by `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if a column length differs from the index length.
    pub fn from_columns(index: Vec<String>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let rows = index.len();
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != rows) {
            return Err(CodeBaseError::InvalidInput(format!(
                "Column '{}' has {} values but the index has {}",
                name,
                values.len(),
                rows
            )));
        }
        let data = Array2::from_shape_fn((rows, columns.len()), |(i, j)| columns[j].1[i]);
        let col_labels = columns.into_iter().map(|(name, _)| name).collect();
        Self::new(data, index, col_labels)
    }

    /// Inverse of the matrix. The labels are kept in place.
    ///
    /// # Errors
    ///
    /// See [`inv`].
    pub fn inv(&self) -> Result<Self> {
        let (rows, cols) = self.data.dim();
        if rows != cols {
            return Err(CodeBaseError::NonSquareMatrix { rows, cols });
        }
        Ok(Self {
            data: inv(&self.data)?,
            row_labels: self.row_labels.clone(),
            col_labels: self.col_labels.clone(),
        })
    }

    /// Covariance between the rows, labelled by the row labels on both axes.
    ///
    /// # Errors
    ///
    /// See [`empirical_covariance`].
    pub fn empirical_covariance(&self, bias: bool) -> Result<Self> {
        Ok(Self {
            data: empirical_covariance(&self.data, bias)?,
            row_labels: self.row_labels.clone(),
            col_labels: self.row_labels.clone(),
        })
    }

    /// Render as CSV with a header row and the row labels in the first column.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.col_labels.iter().fold(String::new(), |acc, label| acc + "," + label));
        out.push('\n');
        for (label, row) in self.row_labels.iter().zip(self.data.rows()) {
            out.push_str(label);
            for &value in row {
                out.push(',');
                out.push_str(&csv_field(value));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_close(actual: &Array2<f64>, expected: &Array2<f64>) {
        assert_eq!(actual.dim(), expected.dim());
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(a, e, epsilon = 1e-9);
        }
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_inv_round_trip() {
        let a = array![[4.0, 7.0, 2.0], [3.0, 6.0, 1.0], [2.0, 5.0, 3.0]];
        let inverse = inv(&a).unwrap();
        let identity = a.dot(&inverse);
        assert_close(&identity, &Array2::eye(3));
    }

    #[test]
    fn test_inv_two_by_two() {
        let inverse = inv(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_close(&inverse, &array![[-2.0, 1.0], [1.5, -0.5]]);
    }

    #[test]
    fn test_inv_rejects_non_square_and_singular() {
        let err = inv(&array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap_err();
        assert!(matches!(err, CodeBaseError::NonSquareMatrix { rows: 2, cols: 3 }));
        let err = inv(&array![[1.0, 2.0], [2.0, 4.0]]).unwrap_err();
        assert!(matches!(err, CodeBaseError::SingularMatrix));
    }

    #[test]
    fn test_empirical_covariance_reference() {
        let x = array![[92.0, 80.0], [60.0, 30.0], [100.0, 70.0]];
        let cov = empirical_covariance(&x, false).unwrap();
        let expected = array![
            [72.0, 180.0, 180.0],
            [180.0, 450.0, 450.0],
            [180.0, 450.0, 450.0]
        ];
        assert_close(&cov, &expected);

        let biased = empirical_covariance(&x, true).unwrap();
        assert_close(&biased, &(expected / 2.0));
    }

    #[test]
    fn test_empirical_covariance_needs_two_observations() {
        assert!(empirical_covariance(&array![[1.0], [2.0]], false).is_err());
        assert!(empirical_covariance(&array![[1.0], [2.0]], true).is_ok());
    }

    #[test]
    fn test_labeled_matrix() {
        let df = LabeledMatrix::from_columns(
            labels(&["1", "2", "3"]),
            vec![
                ("A".to_string(), vec![92.0, 60.0, 100.0]),
                ("B".to_string(), vec![80.0, 30.0, 70.0]),
            ],
        )
        .unwrap();
        let cov = df.empirical_covariance(false).unwrap();
        assert_eq!(cov.row_labels, labels(&["1", "2", "3"]));
        assert_eq!(cov.col_labels, labels(&["1", "2", "3"]));
        assert_abs_diff_eq!(cov.data[[1, 2]], 450.0, epsilon = 1e-9);

        assert!(matches!(df.inv(), Err(CodeBaseError::NonSquareMatrix { .. })));

        let square = LabeledMatrix::new(
            array![[1.0, 3.0], [2.0, 4.0]],
            labels(&["0", "1"]),
            labels(&["A", "B"]),
        )
        .unwrap();
        let inverse = square.inv().unwrap();
        assert_eq!(inverse.col_labels, labels(&["A", "B"]));
        assert_abs_diff_eq!(inverse.data[[0, 0]], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_to_csv() {
        let m = LabeledMatrix::new(array![[1.0, 2.5]], labels(&["r"]), labels(&["a", "b"])).unwrap();
        assert_eq!(m.to_csv(), ",a,b\nr,1,2.5\n");
    }
}
