//! Nearest-cell lookup over a forecast grid.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;
use wave_common::{Array2, ForecastGrid, GeoPoint, GridIndex, WaveError, WaveResult};

/// One grid cell as stored in the R-tree: its `[lon, lat]` and its row-major
/// offset in the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GridCell {
    point: [f64; 2],
    flat: usize,
}

impl RTreeObject for GridCell {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for GridCell {
    /// Squared Euclidean distance in degrees, treating lon/lat as planar.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over the cells of one grid.
///
/// Built once per grid and queried for every station. Indices it returns
/// belong to that grid only.
pub struct GridLocator {
    tree: RTree<GridCell>,
    rows: usize,
    cols: usize,
}

impl GridLocator {
    /// Index every cell of `grid`.
    pub fn new(grid: &ForecastGrid) -> WaveResult<Self> {
        Self::from_arrays(grid.lons(), grid.lats())
    }

    /// Index parallel longitude and latitude arrays.
    ///
    /// Fails with [`WaveError::InvalidGrid`] when the shapes differ or no cell
    /// has finite coordinates. Cells with non-finite coordinates are left out.
    pub fn from_arrays(lons: &Array2<f64>, lats: &Array2<f64>) -> WaveResult<Self> {
        if lons.shape() != lats.shape() {
            return Err(WaveError::InvalidGrid(format!(
                "longitude shape {:?} does not match latitude shape {:?}",
                lons.shape(),
                lats.shape()
            )));
        }

        let cells: Vec<GridCell> = lons
            .as_slice()
            .iter()
            .zip(lats.as_slice())
            .enumerate()
            .filter(|(_, (lon, lat))| lon.is_finite() && lat.is_finite())
            .map(|(flat, (&lon, &lat))| GridCell {
                point: [lon, lat],
                flat,
            })
            .collect();

        if cells.is_empty() {
            return Err(WaveError::InvalidGrid("grid has no usable cells".into()));
        }

        let (rows, cols) = lons.shape();
        debug!(rows, cols, cells = cells.len(), "Building grid index");

        Ok(Self {
            tree: RTree::bulk_load(cells),
            rows,
            cols,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Cell closest to `point`.
    pub fn nearest(&self, point: GeoPoint) -> WaveResult<GridIndex> {
        self.tree
            .nearest_neighbor(&[point.lon, point.lat])
            .map(|cell| GridIndex::from_flat(cell.flat, self.cols))
            .ok_or_else(|| WaveError::InvalidGrid("grid has no usable cells".into()))
    }

    /// Closest cell for each query point, in query order.
    pub fn locate(&self, points: &[GeoPoint]) -> WaveResult<Vec<GridIndex>> {
        if points.is_empty() {
            return Err(WaveError::EmptyQuery);
        }
        points.iter().map(|&p| self.nearest(p)).collect()
    }
}

/// Resolve query points against a grid given as two coordinate arrays.
///
/// Builds a single index and queries it once per point.
pub fn nearest_indices(
    lons: &Array2<f64>,
    lats: &Array2<f64>,
    points: &[GeoPoint],
) -> WaveResult<Vec<GridIndex>> {
    if points.is_empty() {
        return Err(WaveError::EmptyQuery);
    }
    GridLocator::from_arrays(lons, lats)?.locate(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> ForecastGrid {
        ForecastGrid::from_rows(
            vec![vec![-88.0, -87.0], vec![-88.0, -87.0]],
            vec![vec![42.0, 42.0], vec![43.0, 43.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_chicago_resolves_to_south_west_cell() {
        // (-87.609, 41.856): distance² to (-88, 42) is 0.391² + 0.144²,
        // the smallest of the four cells.
        let grid = two_by_two();
        let locator = GridLocator::new(&grid).unwrap();
        let idx = locator.nearest(GeoPoint::new(-87.609, 41.856)).unwrap();
        assert_eq!(idx, GridIndex::new(0, 0));
    }

    #[test]
    fn test_empty_query() {
        let locator = GridLocator::new(&two_by_two()).unwrap();
        assert!(matches!(locator.locate(&[]), Err(WaveError::EmptyQuery)));
    }

    #[test]
    fn test_nan_cells_skipped() {
        let lons = Array2::from_rows(vec![vec![f64::NAN, -87.0]]).unwrap();
        let lats = Array2::from_rows(vec![vec![42.0, 42.0]]).unwrap();
        let idx = nearest_indices(&lons, &lats, &[GeoPoint::new(-88.0, 42.0)]).unwrap();
        assert_eq!(idx, vec![GridIndex::new(0, 1)]);
    }

    #[test]
    fn test_all_nan_grid_invalid() {
        let lons = Array2::from_rows(vec![vec![f64::NAN]]).unwrap();
        let lats = Array2::from_rows(vec![vec![f64::NAN]]).unwrap();
        assert!(matches!(
            GridLocator::from_arrays(&lons, &lats),
            Err(WaveError::InvalidGrid(_))
        ));
    }
}
