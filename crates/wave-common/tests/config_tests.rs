//! Tests for loading the monitor configuration.

use std::io::Write;

use wave_common::config::StorageBackend;
use wave_common::{MonitorConfig, WaveError};

const MINIMAL: &str = r#"
stations:
  - id: CHII2
    lat: 41.856
    lon: -87.609
    sensor_height: 26.0
  - id: "45214"
    lat: 42.674
    lon: -87.026
    sensor_height: 1.0
"#;

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_minimal_config_uses_defaults() {
    let config = MonitorConfig::from_yaml(MINIMAL).unwrap();

    assert_eq!(config.stations.len(), 2);
    assert_eq!(config.forecast.horizon_hours, 84);
    assert_eq!(config.forecast.history_days, 5);
    assert_eq!(config.forecast.variables, vec!["HTSGW", "WIND", "WDIR"]);
    assert_eq!(config.schedule.forecast_downloads, vec!["07:35", "19:35"]);
    assert_eq!(config.schedule.plot_minutes, vec![0, 30]);
    assert_eq!(config.storage.backend, StorageBackend::Local);
    assert!(config
        .observations
        .base_url
        .starts_with("https://www.ndbc.noaa.gov/"));
}

#[test]
fn test_station_order_preserved() {
    let config = MonitorConfig::from_yaml(MINIMAL).unwrap();
    let ids: Vec<_> = config.stations.stations().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["CHII2", "45214"]);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_empty_station_list_rejected() {
    let result = MonitorConfig::from_yaml("stations: []\n");
    assert!(matches!(result, Err(WaveError::EmptyQuery)));
}

#[test]
fn test_missing_station_list_rejected() {
    let result = MonitorConfig::from_yaml("forecast:\n  horizon_hours: 84\n");
    assert!(matches!(result, Err(WaveError::EmptyQuery)));
}

#[test]
fn test_horizon_limited_to_model_length() {
    let yaml = format!("{}\nforecast:\n  horizon_hours: 200\n", MINIMAL);
    assert!(matches!(
        MonitorConfig::from_yaml(&yaml),
        Err(WaveError::Config(_))
    ));
}

#[test]
fn test_bad_download_time_rejected() {
    let yaml = format!("{}\nschedule:\n  forecast_downloads: [\"7h35\"]\n", MINIMAL);
    assert!(matches!(
        MonitorConfig::from_yaml(&yaml),
        Err(WaveError::InvalidTime(_))
    ));
}

#[test]
fn test_malformed_yaml_is_config_error() {
    assert!(matches!(
        MonitorConfig::from_yaml("stations: [ {id: "),
        Err(WaveError::Config(_))
    ));
}

// ============================================================================
// File loading
// ============================================================================

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}\nstorage:\n  backend: s3\n  bucket: wave-plots\n  prefix: buoys\n",
        MINIMAL
    )
    .unwrap();

    let config = MonitorConfig::load(file.path()).unwrap();
    assert_eq!(config.storage.backend, StorageBackend::S3);
    assert_eq!(config.storage.bucket, "wave-plots");
    assert_eq!(config.storage.prefix, "buoys");
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = MonitorConfig::load(&dir.path().join("missing.yaml"));
    assert!(matches!(result, Err(WaveError::Config(_))));
}
