//! Parsing of realtime2 station files.

use chrono::{TimeZone, Utc};
use ndbc_parser::{parse_realtime2, read_station_file, NdbcError};
use test_utils::fixtures::ndbc;
use test_utils::temp_dir_with;

#[test]
fn test_buoy_sorted_oldest_first() {
    let series = parse_realtime2("45214", ndbc::BUOY_45214).unwrap();

    assert_eq!(series.station_id, "45214");
    assert_eq!(series.len(), 3);

    let obs = series.observations();
    assert_eq!(obs[0].time, Utc.with_ymd_and_hms(2020, 10, 8, 13, 50, 0).unwrap());
    assert_eq!(obs[2].time, Utc.with_ymd_and_hms(2020, 10, 8, 14, 50, 0).unwrap());
    assert_eq!(obs[2].wind_speed, Some(5.0));
    assert_eq!(obs[2].wind_direction, Some(200.0));
    assert_eq!(obs[2].wave_height, Some(0.6));
}

#[test]
fn test_missing_readings_are_none() {
    let series = parse_realtime2("45214", ndbc::BUOY_45214).unwrap();
    let middle = &series.observations()[1];
    assert_eq!(middle.wave_height, None);
    assert_eq!(middle.wind_speed, Some(4.0));
    assert!(series.observations().iter().any(|o| o.wave_height.is_some()));
}

#[test]
fn test_wind_only_station() {
    let series = parse_realtime2("CHII2", ndbc::CMAN_CHII2).unwrap();
    assert_eq!(series.len(), 2);
    assert!(series.observations().iter().all(|o| o.wave_height.is_none()));
}

#[test]
fn test_bad_rows_dropped() {
    let text = format!(
        "{}2020 13 40 25 00 100 1.0 1.0 0.1 MM MM MM MM MM MM MM MM MM MM\n2020 10 08\n",
        ndbc::BUOY_45214
    );
    let series = parse_realtime2("45214", &text).unwrap();
    assert_eq!(series.len(), 3);
}

#[test]
fn test_error_page_rejected() {
    assert!(matches!(
        parse_realtime2("45214", ndbc::NOT_FOUND),
        Err(NdbcError::MissingHeader)
    ));
}

#[test]
fn test_header_only_has_no_rows() {
    let header: String = ndbc::BUOY_45214.lines().take(2).collect::<Vec<_>>().join("\n");
    assert!(matches!(
        parse_realtime2("45214", &header),
        Err(NdbcError::NoRows)
    ));
}

#[test]
fn test_read_station_file() {
    let dir = temp_dir_with(&[("CHII2.txt", ndbc::CMAN_CHII2.as_bytes())]);

    let series = read_station_file(dir.path(), "CHII2").unwrap();
    assert_eq!(series.observations()[1].wind_speed, Some(10.3));

    assert!(matches!(
        read_station_file(dir.path(), "KNSW3"),
        Err(NdbcError::Io(_))
    ));
}
