//! Lambert Conformal Conic projection for template 3.30 grids.
//!
//! Grid coordinates are measured from the first grid point: `i` along x
//! (east), `j` along y (north), in units of the grid spacing.

use std::f64::consts::PI;

use crate::sections::LambertGrid;

#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian (LoV) in radians
    lon0: f64,
    /// Longitude of first grid point in radians
    lon1: f64,
    /// Grid spacing in X direction (meters)
    dx: f64,
    /// Grid spacing in Y direction (meters)
    dy: f64,
    earth_radius: f64,
    /// Cone constant
    n: f64,
    f: f64,
    /// Rho at first grid point
    rho0: f64,
}

fn wrap_pi(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

impl LambertConformal {
    /// Build the projection from a parsed grid definition.
    pub fn from_grid(grid: &LambertGrid) -> Self {
        Self::new(
            grid.la1,
            grid.lo1,
            grid.lov,
            grid.latin1,
            grid.latin2,
            grid.dx,
            grid.dy,
            grid.earth_radius,
        )
    }

    /// All angles in degrees, spacing and radius in meters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lat1_deg: f64,
        lon1_deg: f64,
        lov_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        dx: f64,
        dy: f64,
        earth_radius: f64,
    ) -> Self {
        let lat1 = lat1_deg.to_radians();
        let lon1 = lon1_deg.to_radians();
        let lon0 = lov_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = earth_radius * f / (PI / 4.0 + lat1 / 2.0).tan().powf(n);

        Self {
            lon0,
            lon1,
            dx,
            dy,
            earth_radius,
            n,
            f,
            rho0,
        }
    }

    /// Projection coordinates of the first grid point.
    fn origin(&self) -> (f64, f64) {
        let theta0 = self.n * wrap_pi(self.lon1 - self.lon0);
        let x0 = self.rho0 * theta0.sin();
        let y0 = self.rho0 - self.rho0 * theta0.cos();
        (x0, y0)
    }

    /// Geographic (lat, lon) in degrees to fractional grid (i, j).
    pub fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = wrap_pi(lon_deg.to_radians() - self.lon0);

        let rho = self.earth_radius * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();
        let (x0, y0) = self.origin();

        ((x - x0) / self.dx, (y - y0) / self.dy)
    }

    /// Grid (i, j) to geographic (lat, lon) in degrees.
    ///
    /// Longitudes come back relative to LoV and may fall outside −180..180.
    pub fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        let (x0, y0) = self.origin();
        let x = x0 + i * self.dx;
        let y = y0 + j * self.dy;

        let rho = (x * x + (self.rho0 - y) * (self.rho0 - y)).sqrt();
        let rho = if self.n < 0.0 { -rho } else { rho };
        let theta = (x / (self.rho0 - y)).atan();

        let lat = 2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0;
        let lon = self.lon0 + theta / self.n;

        (lat.to_degrees(), lon.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Great Lakes 2.5 km product geometry.
    fn glwu() -> LambertConformal {
        LambertConformal::new(
            38.2296,
            -95.2624,
            -94.0,
            25.0,
            25.0,
            2539.703,
            2539.703,
            6_371_229.0,
        )
    }

    #[test]
    fn test_first_grid_point() {
        let proj = glwu();
        let (lat, lon) = proj.grid_to_geo(0.0, 0.0);
        assert!((lat - 38.2296).abs() < 1e-6);
        assert!((lon + 95.2624).abs() < 1e-6);

        let (i, j) = proj.geo_to_grid(38.2296, -95.2624);
        assert!(i.abs() < 1e-6);
        assert!(j.abs() < 1e-6);
    }

    #[test]
    fn test_axes_point_east_and_north() {
        let proj = glwu();
        let (lat0, lon0) = proj.grid_to_geo(0.0, 0.0);
        let (_, lon_east) = proj.grid_to_geo(10.0, 0.0);
        let (lat_north, _) = proj.grid_to_geo(0.0, 10.0);

        assert!(lon_east > lon0);
        assert!(lat_north > lat0);
    }

    #[test]
    fn test_station_inside_grid() {
        // Chicago harbor sits well inside the lake domain.
        let proj = glwu();
        let (i, j) = proj.geo_to_grid(41.856, -87.609);
        assert!(i > 0.0 && j > 0.0);

        let (lat, lon) = proj.grid_to_geo(i, j);
        assert!((lat - 41.856).abs() < 1e-6);
        assert!((lon + 87.609).abs() < 1e-6);
    }
}
