//! Generators for synthetic grids, fields and query points.
//!
//! Grids come in two flavours: regular lat/lon meshes, and curvilinear meshes
//! whose rows are sheared and rotated the way a Lambert grid looks in
//! geographic coordinates. Both are built over the Great Lakes by default.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wave_common::{Array2, ForecastGrid, GeoPoint, GridIndex};

/// Regular grid: row `r`, column `c` sits at
/// `(lon0 + c * dlon, lat0 + r * dlat)`.
pub fn regular_grid(
    rows: usize,
    cols: usize,
    lon0: f64,
    lat0: f64,
    dlon: f64,
    dlat: f64,
) -> ForecastGrid {
    let mut lons = Vec::with_capacity(rows * cols);
    let mut lats = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            lons.push(lon0 + c as f64 * dlon);
            lats.push(lat0 + r as f64 * dlat);
        }
    }
    build(rows, cols, lons, lats)
}

/// Curvilinear grid over Lake Michigan: each row is rotated by a few degrees
/// and spacing grows slowly to the north, so neighbouring cells are not
/// axis-aligned.
pub fn curvilinear_grid(rows: usize, cols: usize) -> ForecastGrid {
    let (lon0, lat0) = (-88.5, 41.5);
    let (dx, dy) = (0.03, 0.025);
    let angle = 0.12_f64;

    let mut lons = Vec::with_capacity(rows * cols);
    let mut lats = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        let stretch = 1.0 + r as f64 * 0.002;
        for c in 0..cols {
            let x = c as f64 * dx * stretch;
            let y = r as f64 * dy;
            lons.push(lon0 + x * angle.cos() - y * angle.sin());
            lats.push(lat0 + x * angle.sin() + y * angle.cos());
        }
    }
    build(rows, cols, lons, lats)
}

/// Same grid expressed with 0..360 longitudes, as the model writes them.
pub fn to_positive_longitudes(grid: &ForecastGrid) -> ForecastGrid {
    let lons = grid.lons().map(|lon| if lon < 0.0 { lon + 360.0 } else { lon });
    ForecastGrid::new(lons, grid.lats().clone()).unwrap()
}

fn build(rows: usize, cols: usize, lons: Vec<f64>, lats: Vec<f64>) -> ForecastGrid {
    ForecastGrid::new(
        Array2::from_flat(rows, cols, lons).unwrap(),
        Array2::from_flat(rows, cols, lats).unwrap(),
    )
    .unwrap()
}

/// Uniform random points inside a bounding box, reproducible from `seed`.
pub fn random_points(
    n: usize,
    (min_lon, min_lat, max_lon, max_lat): (f64, f64, f64, f64),
    seed: u64,
) -> Vec<GeoPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| GeoPoint::new(rng.gen_range(min_lon..max_lon), rng.gen_range(min_lat..max_lat)))
        .collect()
}

/// Reference nearest-cell search by exhaustive scan.
pub fn brute_force_nearest(grid: &ForecastGrid, point: GeoPoint) -> GridIndex {
    let (flat, _) = grid
        .cells()
        .map(|(i, cell)| (i, cell.distance_2(&point)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
    GridIndex::from_flat(flat, grid.cols())
}

/// Field values encoding their own position: `step * 1000 + flat`.
///
/// Makes it easy to check that a series was read from the right cell.
pub fn position_encoded_steps(rows: usize, cols: usize, steps: usize) -> Vec<Vec<f32>> {
    (0..steps)
        .map(|t| (0..rows * cols).map(|i| (t * 1000 + i) as f32).collect())
        .collect()
}

/// A smooth wave-height-like field in meters, highest mid-lake.
pub fn create_wave_height_grid(rows: usize, cols: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(rows * cols);
    let cy = rows as f32 / 2.0;
    let cx = cols as f32 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);
    for r in 0..rows {
        for c in 0..cols {
            let dx = c as f32 - cx;
            let dy = r as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            data.push(3.0 * (1.0 - dist / max_dist) + 0.2);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_grid_layout() {
        let grid = regular_grid(2, 3, -88.0, 42.0, 0.5, 1.0);
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.point(GridIndex::new(1, 2)), Some(GeoPoint::new(-87.0, 43.0)));
    }

    #[test]
    fn test_brute_force_exact_hit() {
        let grid = curvilinear_grid(8, 9);
        let target = GridIndex::new(5, 7);
        let point = grid.point(target).unwrap();
        assert_eq!(brute_force_nearest(&grid, point), target);
    }

    #[test]
    fn test_random_points_reproducible() {
        let bounds = (-88.0, 41.0, -86.0, 43.0);
        assert_eq!(random_points(5, bounds, 7), random_points(5, bounds, 7));
        assert!(random_points(50, bounds, 1)
            .iter()
            .all(|p| (-88.0..-86.0).contains(&p.lon) && (41.0..43.0).contains(&p.lat)));
    }

    #[test]
    fn test_positive_longitudes() {
        let grid = to_positive_longitudes(&regular_grid(1, 2, -88.0, 42.0, 1.0, 1.0));
        assert_eq!(grid.lons().as_slice(), &[272.0, 273.0]);
    }
}
