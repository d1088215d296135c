//! Test support shared by the wave monitor crates.
//!
//! - [`generators`]: synthetic lat/lon and curvilinear grids, brute-force
//!   nearest-cell reference
//! - [`grib`]: GRIB2 message builder for decoder tests
//! - [`fixtures`]: Lake Michigan stations, NDBC sample text, sample config

pub mod fixtures;
pub mod generators;
pub mod grib;

pub use fixtures::*;
pub use generators::*;
pub use grib::Grib2Builder;

/// Assert two numbers differ by at most `tolerance` (compared as `f64`).
///
/// ```ignore
/// assert_approx_eq!(meters_to_feet(1.0), 3.28084, 1e-5);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let tolerance = $tolerance as f64;
        let diff = (actual - expected).abs();
        if !(diff <= tolerance) {
            panic!(
                "values not within {:e}: actual {}, expected {} (diff {:e})",
                tolerance, actual, expected, diff
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_within_tolerance() {
        assert_approx_eq!(3.2808, 3.28084, 1e-4);
        assert_approx_eq!(-87.609_f32, -87.609, 1e-5);
    }

    #[test]
    #[should_panic(expected = "not within")]
    fn test_outside_tolerance() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "not within")]
    fn test_nan_never_passes() {
        assert_approx_eq!(f64::NAN, 1.0, 10.0);
    }
}
