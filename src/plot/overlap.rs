//! Masking of grid cells that wrap around a polar stereographic map
//!
//! Curvilinear ocean grids contain cells whose corners end up on opposite
//! sides of the map once projected. Contouring such cells draws long
//! artifacts across the plot, so cells with diagonals longer than half the
//! projection range are masked.

use super::maps::Pole;
use crate::errors::{CodeBaseError, Result};
use ndarray::{s, Array2, Zip};
use tracing::debug;

/// Semi-major axis of the WGS84 ellipsoid in metres
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// Flattening of the WGS84 ellipsoid
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Polar stereographic projection on the WGS84 ellipsoid, true scale at the pole
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarStereographic {
    pub pole: Pole,
    /// Longitude pointing down from the pole, in degrees
    pub central_longitude: f64,
}

impl PolarStereographic {
    #[must_use]
    pub fn new(pole: Pole) -> Self {
        Self {
            pole,
            central_longitude: 0.0,
        }
    }

    /// Limits of the projected x coordinate in metres
    #[must_use]
    pub fn x_limits(&self) -> (f64, f64) {
        (-5e7, 5e7)
    }

    /// Limits of the projected y coordinate in metres
    #[must_use]
    pub fn y_limits(&self) -> (f64, f64) {
        (-5e7, 5e7)
    }

    /// Project a geodetic position (degrees) to map coordinates (metres).
    ///
    /// The opposite pole maps to infinity.
    #[must_use]
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e = (WGS84_FLATTENING * (2.0 - WGS84_FLATTENING)).sqrt();
        let sign = match self.pole {
            Pole::North => 1.0,
            Pole::South => -1.0,
        };
        let phi = sign * lat.to_radians();
        let dlam = (lon - self.central_longitude).to_radians();

        let esin = e * phi.sin();
        let t = (std::f64::consts::FRAC_PI_4 - phi / 2.0).tan()
            / ((1.0 - esin) / (1.0 + esin)).powf(e / 2.0);
        let rho = 2.0 * WGS84_SEMI_MAJOR_AXIS * t
            / ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt();

        (rho * dlam.sin(), -sign * rho * dlam.cos())
    }

    /// Project arrays of longitudes and latitudes.
    ///
    /// # Errors
    ///
    /// Returns an error if the arrays differ in shape.
    pub fn project_grid(&self, lon: &Array2<f64>, lat: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        if lon.dim() != lat.dim() {
            return Err(CodeBaseError::InvalidInput(format!(
                "Longitudes {:?} and latitudes {:?} differ in shape",
                lon.dim(),
                lat.dim()
            )));
        }
        let mut x = Array2::zeros(lon.dim());
        let mut y = Array2::zeros(lon.dim());
        Zip::from(&mut x)
            .and(&mut y)
            .and(lon)
            .and(lat)
            .for_each(|x, y, &lon, &lat| {
                (*x, *y) = self.project(lon, lat);
            });
        Ok((x, y))
    }
}

/// Projected coordinates with the data and its mask
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedGrid {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub data: Array2<f64>,
    /// `true` marks masked values
    pub mask: Array2<bool>,
}

impl MaskedGrid {
    /// Data with masked values replaced by NaN
    #[must_use]
    pub fn masked_data(&self) -> Array2<f64> {
        Zip::from(&self.data)
            .and(&self.mask)
            .map_collect(|&v, &masked| if masked { f64::NAN } else { v })
    }

    #[must_use]
    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// Project `lon`/`lat` and mask cells that overlap across the map.
///
/// A cell is masked if one of its diagonals is longer than half of the
/// projection's x range or cannot be computed. `lon` and `lat` either have
/// the same shape as `z` (contour style, the mask is extended by one row and
/// column) or one more row and column (pcolormesh style). Values that are
/// NaN in `z` are masked as well.
///
/// # Errors
///
/// Returns an error if the shapes do not fit together or the grid has fewer
/// than two rows or columns.
pub fn z_masked_overlap(
    projection: &PolarStereographic,
    lon: &Array2<f64>,
    lat: &Array2<f64>,
    z: &Array2<f64>,
) -> Result<MaskedGrid> {
    let (x, y) = projection.project_grid(lon, lat)?;
    let (rows, cols) = x.dim();
    if rows < 2 || cols < 2 {
        return Err(CodeBaseError::InvalidInput(format!(
            "Grid of shape {rows}x{cols} has no cells"
        )));
    }

    let (x_min, x_max) = projection.x_limits();
    let half_range = (x_max - x_min).abs() / 2.0;

    let diagonal0 = hypot_diff(
        &x.slice(s![1.., 1..]).to_owned(),
        &x.slice(s![..-1, ..-1]).to_owned(),
        &y.slice(s![1.., 1..]).to_owned(),
        &y.slice(s![..-1, ..-1]).to_owned(),
    );
    let diagonal1 = hypot_diff(
        &x.slice(s![1.., ..-1]).to_owned(),
        &x.slice(s![..-1, 1..]).to_owned(),
        &y.slice(s![1.., ..-1]).to_owned(),
        &y.slice(s![..-1, 1..]).to_owned(),
    );
    let too_long = |d: f64| d.is_nan() || d > half_range;
    let cell_mask = Zip::from(&diagonal0)
        .and(&diagonal1)
        .map_collect(|&d0, &d1| too_long(d0) || too_long(d1));

    let mask = if z.dim() == (rows, cols) {
        let mut extended = Array2::from_elem((rows, cols), false);
        extended.slice_mut(s![..-1, ..-1]).assign(&cell_mask);
        let second_last_row = extended.row(rows - 2).to_owned();
        extended.row_mut(rows - 1).assign(&second_last_row);
        let second_last_col = extended.column(cols - 2).to_owned();
        extended.column_mut(cols - 1).assign(&second_last_col);
        extended
    } else if z.dim() == (rows - 1, cols - 1) {
        cell_mask
    } else {
        return Err(CodeBaseError::InvalidInput(format!(
            "Data of shape {:?} does not fit coordinates of shape {:?}",
            z.dim(),
            (rows, cols)
        )));
    };

    let mask = Zip::from(&mask).and(z).map_collect(|&m, &v| m || v.is_nan());
    debug!(
        "Masked {} of {} grid values",
        mask.iter().filter(|&&m| m).count(),
        mask.len()
    );

    Ok(MaskedGrid {
        x,
        y,
        data: z.clone(),
        mask,
    })
}

fn hypot_diff(xa: &Array2<f64>, xb: &Array2<f64>, ya: &Array2<f64>, yb: &Array2<f64>) -> Array2<f64> {
    Zip::from(xa)
        .and(xb)
        .and(ya)
        .and(yb)
        .map_collect(|&xa, &xb, &ya, &yb| (xa - xb).hypot(ya - yb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_projection_pole_and_symmetry() {
        let north = PolarStereographic::new(Pole::North);
        let (x, y) = north.project(123.0, 90.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);

        // 0°E points down, 90°E to the right
        let (x0, y0) = north.project(0.0, 70.0);
        assert!(x0.abs() < 1e-6 && y0 < 0.0);
        let (x90, y90) = north.project(90.0, 70.0);
        assert_relative_eq!(x90, -y0, max_relative = 1e-12);
        assert!(y90.abs() < 1e-6);

        let south = PolarStereographic::new(Pole::South);
        let (sx, sy) = south.project(0.0, -70.0);
        assert!(sx.abs() < 1e-6);
        assert_relative_eq!(sy, -y0, max_relative = 1e-12);
    }

    #[test]
    fn test_projection_distance_scale() {
        // Close to the pole the map distance approaches the ground distance
        let north = PolarStereographic::new(Pole::North);
        let (_, y) = north.project(0.0, 89.0);
        assert_relative_eq!(-y, 111_700.0, max_relative = 0.01);
    }

    fn regular_grid(lons: &[f64], lats: &[f64]) -> (Array2<f64>, Array2<f64>) {
        let shape = (lats.len(), lons.len());
        (
            Array2::from_shape_fn(shape, |(_, i)| lons[i]),
            Array2::from_shape_fn(shape, |(j, _)| lats[j]),
        )
    }

    #[test]
    fn test_small_cells_are_not_masked() {
        let (lon, lat) = regular_grid(&[0.0, 10.0, 20.0, 30.0], &[60.0, 70.0, 80.0]);
        let z = Array2::from_elem((3, 4), 1.0);
        let grid = z_masked_overlap(&PolarStereographic::new(Pole::North), &lon, &lat, &z).unwrap();
        assert_eq!(grid.masked_count(), 0);
        assert_eq!(grid.x.dim(), (3, 4));
    }

    #[test]
    fn test_cells_touching_the_opposite_pole_are_masked() {
        let (lon, lat) = regular_grid(&[0.0, 10.0, 20.0], &[-90.0, 0.0, 10.0]);
        let z = Array2::from_elem((3, 3), 1.0);
        let grid = z_masked_overlap(&PolarStereographic::new(Pole::North), &lon, &lat, &z).unwrap();
        assert!(grid.mask.row(0).iter().all(|&m| m));
        assert!(!grid.mask[[1, 0]]);
        // the last row copies the row above it
        assert_eq!(grid.mask.row(2), grid.mask.row(1));
        assert!(grid.masked_data()[[0, 0]].is_nan());
        assert_relative_eq!(grid.masked_data()[[1, 1]], 1.0);
    }

    #[test]
    fn test_pcolormesh_shapes_and_nan_data() {
        let (lon, lat) = regular_grid(&[0.0, 10.0, 20.0], &[60.0, 70.0, 80.0]);
        let mut z = Array2::from_elem((2, 2), 1.0);
        z[[1, 1]] = f64::NAN;
        let grid = z_masked_overlap(&PolarStereographic::new(Pole::North), &lon, &lat, &z).unwrap();
        assert_eq!(grid.mask.dim(), (2, 2));
        assert_eq!(grid.masked_count(), 1);

        let bad = Array2::from_elem((1, 1), 1.0);
        assert!(z_masked_overlap(&PolarStereographic::new(Pole::North), &lon, &lat, &bad).is_err());
    }
}
