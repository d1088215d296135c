//! Standard meteorological realtime2 format.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeZone, Utc};
use tracing::{debug, instrument};
use wave_common::{Observation, ObservationSeries};

use crate::{NdbcError, NdbcResult};

/// Marker for a missing reading.
const MISSING: &str = "MM";

/// Column positions of the fields we read.
struct Columns {
    year: usize,
    month: usize,
    day: usize,
    hour: usize,
    minute: usize,
    wind_direction: usize,
    wind_speed: usize,
    wave_height: usize,
}

impl Columns {
    fn from_header(header: &str) -> NdbcResult<Self> {
        let names: Vec<&str> = header.trim_start_matches('#').split_whitespace().collect();
        let find = |candidates: &[&str], name: &'static str| {
            names
                .iter()
                .position(|n| candidates.contains(n))
                .ok_or(NdbcError::MissingColumn(name))
        };

        Ok(Self {
            year: find(&["YY", "YYYY"], "YY")?,
            month: find(&["MM"], "MM")?,
            day: find(&["DD"], "DD")?,
            hour: find(&["hh"], "hh")?,
            minute: find(&["mm"], "mm")?,
            wind_direction: find(&["WDIR", "WD"], "WDIR")?,
            wind_speed: find(&["WSPD"], "WSPD")?,
            wave_height: find(&["WVHT"], "WVHT")?,
        })
    }

    fn width(&self) -> usize {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.wind_direction,
            self.wind_speed,
            self.wave_height,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// Numeric cell, `None` for missing or non-numeric text.
fn value(cell: &str) -> Option<f64> {
    if cell == MISSING {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_row(fields: &[&str], cols: &Columns) -> Option<Observation> {
    let int = |i: usize| fields[i].parse::<u32>().ok();

    let mut year = int(cols.year)? as i32;
    if year < 100 {
        year += 2000;
    }
    let time = NaiveDate::from_ymd_opt(year, int(cols.month)?, int(cols.day)?)?
        .and_hms_opt(int(cols.hour)?, int(cols.minute)?, 0)?;

    Some(Observation {
        time: Utc.from_utc_datetime(&time),
        wind_speed: value(fields[cols.wind_speed]),
        wind_direction: value(fields[cols.wind_direction]),
        wave_height: value(fields[cols.wave_height]),
    })
}

/// Parse the text of a realtime2 file.
///
/// Missing and non-numeric readings become `None`. Rows that are too short
/// or carry an impossible timestamp are dropped.
pub fn parse_realtime2(station_id: &str, text: &str) -> NdbcResult<ObservationSeries> {
    let mut lines = text.lines();
    let header = lines
        .by_ref()
        .find(|l| !l.trim().is_empty())
        .filter(|l| l.starts_with('#'))
        .ok_or(NdbcError::MissingHeader)?;

    let cols = Columns::from_header(header)?;
    let width = cols.width();

    let mut observations = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let line = line.trim();
        // Units line and any repeated headers
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match (fields.len() >= width)
            .then(|| parse_row(&fields, &cols))
            .flatten()
        {
            Some(obs) => observations.push(obs),
            None => dropped += 1,
        }
    }

    if observations.is_empty() {
        return Err(NdbcError::NoRows);
    }

    debug!(
        station = station_id,
        rows = observations.len(),
        dropped,
        "Parsed realtime2 observations"
    );
    Ok(ObservationSeries::new(station_id, observations))
}

/// Location of a station's file under the data directory.
pub fn station_file_path(dir: &Path, station_id: &str) -> PathBuf {
    dir.join(format!("{}.txt", station_id))
}

/// Read and parse `{dir}/{station_id}.txt`.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn read_station_file(dir: &Path, station_id: &str) -> NdbcResult<ObservationSeries> {
    let text = std::fs::read_to_string(station_file_path(dir, station_id))?;
    parse_realtime2(station_id, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_coercion() {
        assert_eq!(value("MM"), None);
        assert_eq!(value("abc"), None);
        assert_eq!(value("NaN"), None);
        assert_eq!(value("5.0"), Some(5.0));
        assert_eq!(value("-1.2"), Some(-1.2));
    }

    #[test]
    fn test_header_columns() {
        let cols = Columns::from_header("#YY  MM DD hh mm WDIR WSPD GST  WVHT").unwrap();
        assert_eq!(cols.year, 0);
        assert_eq!(cols.wind_direction, 5);
        assert_eq!(cols.wave_height, 8);
        assert_eq!(cols.width(), 9);
    }

    #[test]
    fn test_header_missing_wave_column() {
        let result = Columns::from_header("#YY MM DD hh mm WDIR WSPD");
        assert!(matches!(result, Err(NdbcError::MissingColumn("WVHT"))));
    }
}
