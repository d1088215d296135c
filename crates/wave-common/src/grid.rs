//! Forecast grid geometry.
//!
//! A forecast grid is a pair of 2-D arrays holding the longitude and latitude
//! of every cell. Both arrays are stored row-major, in the same order as the
//! data values of the forecast file they came from, so a flat offset
//! `row * cols + col` addresses the same cell in coordinates and data alike.

use serde::{Deserialize, Serialize};

use crate::{WaveError, WaveResult};

/// A fixed geographic position (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Squared Euclidean distance in coordinate space.
    pub fn distance_2(&self, other: &GeoPoint) -> f64 {
        let dx = self.lon - other.lon;
        let dy = self.lat - other.lat;
        dx * dx + dy * dy
    }
}

impl From<(f64, f64)> for GeoPoint {
    /// Builds a point from a `(lon, lat)` pair.
    fn from(pair: (f64, f64)) -> Self {
        Self {
            lon: pair.0,
            lat: pair.1,
        }
    }
}

/// A (row, column) position in a forecast grid.
///
/// Only meaningful for the grid it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex {
    pub row: usize,
    pub col: usize,
}

impl GridIndex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Recover a 2-D index from a row-major flat offset.
    pub fn from_flat(flat: usize, cols: usize) -> Self {
        Self {
            row: flat / cols,
            col: flat % cols,
        }
    }

    /// Row-major flat offset of this index.
    pub fn flat(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }
}

/// Dense row-major 2-D array.
#[derive(Debug, Clone, PartialEq)]
pub struct Array2<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> Array2<T> {
    /// Wrap a flat row-major buffer.
    pub fn from_flat(rows: usize, cols: usize, data: Vec<T>) -> WaveResult<Self> {
        if rows * cols != data.len() {
            return Err(WaveError::InvalidGrid(format!(
                "{} values cannot fill a {}x{} array",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows. Ragged input is rejected.
    pub fn from_rows(rows: Vec<Vec<T>>) -> WaveResult<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);

        let mut data = Vec::with_capacity(nrows * ncols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != ncols {
                return Err(WaveError::InvalidGrid(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    ncols
                )));
            }
            data.extend(row);
        }

        Ok(Self {
            rows: nrows,
            cols: ncols,
            data,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: GridIndex) -> Option<T> {
        if index.row >= self.rows || index.col >= self.cols {
            return None;
        }
        self.data.get(index.flat(self.cols)).copied()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Array2<U> {
        Array2 {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Map a longitude into the −180..180 convention.
///
/// Values already in range are returned unchanged, so the function is safe to
/// apply to grids that are already normalized.
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Spatial discretization of one forecast file.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastGrid {
    lons: Array2<f64>,
    lats: Array2<f64>,
}

impl ForecastGrid {
    /// Pair longitude and latitude arrays.
    ///
    /// Fails with [`WaveError::InvalidGrid`] when the shapes differ.
    pub fn new(lons: Array2<f64>, lats: Array2<f64>) -> WaveResult<Self> {
        if lons.shape() != lats.shape() {
            return Err(WaveError::InvalidGrid(format!(
                "longitude shape {:?} does not match latitude shape {:?}",
                lons.shape(),
                lats.shape()
            )));
        }
        Ok(Self { lons, lats })
    }

    /// Build from nested `[row][col]` arrays.
    pub fn from_rows(lons: Vec<Vec<f64>>, lats: Vec<Vec<f64>>) -> WaveResult<Self> {
        Self::new(Array2::from_rows(lons)?, Array2::from_rows(lats)?)
    }

    /// Same grid with every longitude mapped into −180..180.
    pub fn with_normalized_longitudes(self) -> Self {
        Self {
            lons: self.lons.map(normalize_longitude),
            lats: self.lats,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.lons.shape()
    }

    pub fn rows(&self) -> usize {
        self.lons.rows()
    }

    pub fn cols(&self) -> usize {
        self.lons.cols()
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.lons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lons.is_empty()
    }

    pub fn lons(&self) -> &Array2<f64> {
        &self.lons
    }

    pub fn lats(&self) -> &Array2<f64> {
        &self.lats
    }

    /// Coordinates of a cell.
    pub fn point(&self, index: GridIndex) -> Option<GeoPoint> {
        Some(GeoPoint {
            lon: self.lons.get(index)?,
            lat: self.lats.get(index)?,
        })
    }

    /// Iterate `(flat offset, coordinates)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, GeoPoint)> + '_ {
        self.lons
            .as_slice()
            .iter()
            .zip(self.lats.as_slice())
            .enumerate()
            .map(|(i, (&lon, &lat))| (i, GeoPoint { lon, lat }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_index_roundtrip() {
        let cols = 7;
        for flat in 0..35 {
            let idx = GridIndex::from_flat(flat, cols);
            assert_eq!(idx.flat(cols), flat);
        }
        assert_eq!(GridIndex::from_flat(9, 7), GridIndex::new(1, 2));
    }

    #[test]
    fn test_normalize_longitude() {
        assert!((normalize_longitude(272.391) - (-87.609)).abs() < 1e-9);
        assert_eq!(normalize_longitude(-87.6), -87.6);
        assert_eq!(normalize_longitude(180.0), -180.0);
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-12);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Array2::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(WaveError::InvalidGrid(_))));
    }

    #[test]
    fn test_point_lookup() {
        let grid = ForecastGrid::from_rows(
            vec![vec![-88.0, -87.0], vec![-88.0, -87.0]],
            vec![vec![42.0, 42.0], vec![43.0, 43.0]],
        )
        .unwrap();

        assert_eq!(grid.point(GridIndex::new(1, 1)), Some(GeoPoint::new(-87.0, 43.0)));
        assert_eq!(grid.point(GridIndex::new(2, 0)), None);
    }
}
