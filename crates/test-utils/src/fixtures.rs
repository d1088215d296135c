//! Common test fixtures for wave monitor tests.

use std::path::Path;

use tempfile::TempDir;
use wave_common::{Station, StationRegistry};

/// The Lake Michigan stations the monitor was deployed with.
pub mod stations {
    /// (id, lat, lon, anemometer height m)
    pub const LAKE_MICHIGAN: [(&str, f64, f64, f64); 5] = [
        ("CHII2", 41.856, -87.609, 26.0),
        ("MCYI3", 41.729, -86.912, 21.3),
        ("KNSW3", 42.589, -87.809, 20.0),
        ("MLWW3", 43.005, -87.884, 7.3),
        ("45214", 42.674, -87.026, 1.0),
    ];
}

/// Registry of the Lake Michigan stations.
pub fn lake_michigan_registry() -> StationRegistry {
    StationRegistry::new(
        stations::LAKE_MICHIGAN
            .iter()
            .map(|&(id, lat, lon, h)| Station::new(id, lat, lon, h))
            .collect(),
    )
    .unwrap()
}

/// NDBC realtime2 sample text.
pub mod ndbc {
    /// Offshore buoy: waves and wind, newest row first, one missing wave height.
    pub const BUOY_45214: &str = "\
#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
#yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
2020 10 08 14 50 200  5.0  6.0   0.6     4   3.5 210 1015.1  15.2  16.1   9.8   MM   MM    MM
2020 10 08 14 20 190  4.0  5.0    MM    MM    MM  MM 1015.3  15.0  16.1   9.7   MM   MM    MM
2020 10 08 13 50 180  3.0  4.0   0.4     4   3.2 200 1015.4  14.8  16.0   9.6   MM   MM    MM
";

    /// Coastal station: wind only, wave columns all missing.
    pub const CMAN_CHII2: &str = "\
#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
#yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
2020 10 08 15 00 270 10.3 12.4    MM    MM    MM  MM 1012.0  12.1    MM   8.0   MM -1.2    MM
2020 10 08 14 00 260  9.8 11.3    MM    MM    MM  MM 1012.4  12.3    MM   8.1   MM -1.0    MM
";

    /// Server error page saved in place of a station file.
    pub const NOT_FOUND: &str = "<html><body><h1>404 Not Found</h1></body></html>\n";
}

/// Minimal monitor configuration covering the Lake Michigan stations.
pub const SAMPLE_CONFIG_YAML: &str = r#"
paths:
  data_dir: data
  plot_dir: images
forecast:
  horizon_hours: 84
  history_days: 5
stations:
  - { id: CHII2, lat: 41.856, lon: -87.609, sensor_height: 26.0 }
  - { id: MCYI3, lat: 41.729, lon: -86.912, sensor_height: 21.3 }
  - { id: KNSW3, lat: 42.589, lon: -87.809, sensor_height: 20.0 }
  - { id: MLWW3, lat: 43.005, lon: -87.884, sensor_height: 7.3 }
  - { id: "45214", lat: 42.674, lon: -87.026, sensor_height: 1.0 }
"#;

/// Temporary directory holding the given `(file name, contents)` pairs.
pub fn temp_dir_with(files: &[(&str, &[u8])]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        write_file(dir.path(), name, contents);
    }
    dir
}

/// Write a file, creating parent directories.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
