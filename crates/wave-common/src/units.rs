//! Unit conversions and wind helpers applied before display.

/// Feet per meter.
pub const M_TO_FT: f64 = 3.28084;

/// Knots per meter/second.
pub const MS_TO_KT: f64 = 1.94384;

/// Reference height for wind comparisons (m).
pub const REFERENCE_HEIGHT: f64 = 10.0;

/// Power-law exponent for the neutral-stability wind profile.
pub const WIND_PROFILE_EXPONENT: f64 = 0.11;

pub fn meters_to_feet(m: f64) -> f64 {
    m * M_TO_FT
}

pub fn feet_to_meters(ft: f64) -> f64 {
    ft / M_TO_FT
}

pub fn ms_to_knots(ms: f64) -> f64 {
    ms * MS_TO_KT
}

pub fn knots_to_ms(kt: f64) -> f64 {
    kt / MS_TO_KT
}

/// Adjust a wind speed measured at `sensor_height` meters to the 10 m
/// reference height.
///
/// `corrected = observed * (10 / sensor_height)^0.11`. Assumes neutral
/// stability; see <https://www.ndbc.noaa.gov/adjust_wind.shtml>.
/// `sensor_height` must be positive; the station registry enforces this.
pub fn log_wind_correction(speed: f64, sensor_height: f64) -> f64 {
    speed * (REFERENCE_HEIGHT / sensor_height).powf(WIND_PROFILE_EXPONENT)
}

/// U (east-west) and V (north-south) components of a wind blowing from
/// `direction_deg`.
pub fn wind_components(speed: f64, direction_deg: f64) -> (f64, f64) {
    let dir = direction_deg.to_radians();
    (-speed * dir.sin(), -speed * dir.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feet_roundtrip() {
        let ft = meters_to_feet(1.0);
        assert!((ft - 3.28084).abs() < 1e-12);
        assert!((feet_to_meters(ft) - 1.0).abs() < 1e-9);

        for m in [0.0, 0.37, 2.5, 7.9] {
            assert!((feet_to_meters(meters_to_feet(m)) - m).abs() < 1e-9);
        }
    }

    #[test]
    fn test_knots_roundtrip() {
        for ms in [0.0, 1.0, 5.2, 24.7] {
            assert!((knots_to_ms(ms_to_knots(ms)) - ms).abs() < 1e-9);
        }
        assert!((ms_to_knots(10.0) - 19.4384).abs() < 1e-9);
    }

    #[test]
    fn test_log_wind_identity_at_reference_height() {
        assert_eq!(log_wind_correction(12.3, 10.0), 12.3);
    }

    #[test]
    fn test_log_wind_direction_of_adjustment() {
        // Elevated anemometers read high, low ones read low.
        assert!(log_wind_correction(10.0, 26.0) < 10.0);
        assert!(log_wind_correction(10.0, 1.0) > 10.0);

        let expected = 10.0 * (10.0_f64 / 26.0).powf(0.11);
        assert!((log_wind_correction(10.0, 26.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_wind_components() {
        // Northerly wind blows toward the south.
        let (u, v) = wind_components(1.0, 0.0);
        assert!(u.abs() < 1e-12);
        assert!((v + 1.0).abs() < 1e-12);

        // Westerly wind blows toward the east.
        let (u, v) = wind_components(1.0, 270.0);
        assert!((u - 1.0).abs() < 1e-12);
        assert!(v.abs() < 1e-12);
    }
}
