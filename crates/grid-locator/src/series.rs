//! Forecast and observation series ready for plotting.
//!
//! Forecast values are taken at the located cell of each run and truncated to
//! the forecast horizon. Observations are converted to display units and the
//! measured wind is adjusted to 10 m. Nothing is resampled or interpolated.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use wave_common::units::{log_wind_correction, meters_to_feet, ms_to_knots, wind_components};
use wave_common::{
    ForecastRun, GridIndex, ObservationSeries, Parameter, Station, StationRegistry, WaveError,
    WaveResult,
};

use crate::GridLocator;

/// Values paired with their valid times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub times: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(times: Vec<DateTime<Utc>>, values: Vec<f64>) -> Self {
        debug_assert_eq!(times.len(), values.len());
        Self { times, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest finite value.
    pub fn max(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    /// Sum of the finite values, zero when there are none.
    pub fn finite_sum(&self) -> f64 {
        self.values.iter().filter(|v| v.is_finite()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    /// Pairs whose value is finite.
    fn from_pairs(pairs: impl Iterator<Item = (DateTime<Utc>, Option<f64>)>) -> Self {
        let (times, values) = pairs
            .filter_map(|(t, v)| v.filter(|v| v.is_finite()).map(|v| (t, v)))
            .unzip();
        Self { times, values }
    }
}

/// Unit vector pointing where an observed wind blows toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindVector {
    pub time: DateTime<Utc>,
    /// Value the arrow is anchored at (10 m wind, kt)
    pub speed: f64,
    pub u: f64,
    pub v: f64,
}

/// One forecast run at one station's cell.
#[derive(Debug, Clone)]
pub struct ForecastSeries {
    pub run_time: DateTime<Utc>,
    pub source: String,
    /// Cell the station resolved to in this run's grid
    pub index: GridIndex,
    pub wave_height_ft: TimeSeries,
    pub wind_speed_kt: TimeSeries,
}

/// A station's observations in display units.
#[derive(Debug, Clone, Default)]
pub struct ObservedSeries {
    pub wave_height_ft: TimeSeries,
    /// Adjusted to 10 m
    pub wind_speed_kt: TimeSeries,
    pub wind_vectors: Vec<WindVector>,
}

impl ObservedSeries {
    /// Stations without a wave sensor report nothing but missing heights.
    pub fn has_wave_heights(&self) -> bool {
        self.wave_height_ft.finite_sum() > 0.0
    }
}

/// Everything drawn on one station's chart.
#[derive(Debug, Clone)]
pub struct StationComparison {
    pub station: Station,
    /// Oldest run first
    pub forecasts: Vec<ForecastSeries>,
    /// `None` when the station file was missing or unreadable
    pub observed: Option<ObservedSeries>,
}

impl StationComparison {
    /// The run drawn as the current forecast.
    pub fn latest(&self) -> Option<&ForecastSeries> {
        self.forecasts.last()
    }
}

fn param_series(
    run: &ForecastRun,
    param: Parameter,
    index: GridIndex,
    steps: usize,
    convert: fn(f64) -> f64,
) -> WaveResult<TimeSeries> {
    let values = match run.field(param) {
        Some(field) => field.series_at(index, steps)?,
        None => return Ok(TimeSeries::default()),
    };
    let times = run.valid_times[..values.len()].to_vec();
    let values = values.into_iter().map(|v| convert(v as f64)).collect();
    Ok(TimeSeries::new(times, values))
}

/// Wave height (ft) and wind speed (kt) of `run` at `index`, covering at most
/// `horizon_hours` steps. Shorter runs yield what they have.
pub fn forecast_series(
    run: &ForecastRun,
    index: GridIndex,
    horizon_hours: usize,
) -> WaveResult<ForecastSeries> {
    let steps = run.steps().min(horizon_hours);
    Ok(ForecastSeries {
        run_time: run.run_time,
        source: run.source.clone(),
        index,
        wave_height_ft: param_series(run, Parameter::WaveHeight, index, steps, meters_to_feet)?,
        wind_speed_kt: param_series(run, Parameter::WindSpeed, index, steps, ms_to_knots)?,
    })
}

/// Convert a station's raw observations for display.
///
/// Wave heights go to feet. Wind speed is adjusted from the anemometer height
/// to 10 m, then converted to knots. Each observation with a direction also
/// yields a unit wind vector anchored at the adjusted speed.
pub fn observed_series(series: &ObservationSeries, station: &Station) -> ObservedSeries {
    let obs = series.observations();

    let wave_height_ft = TimeSeries::from_pairs(
        obs.iter()
            .map(|o| (o.time, o.wave_height.map(meters_to_feet))),
    );

    let adjusted = |speed: f64| ms_to_knots(log_wind_correction(speed, station.sensor_height));
    let wind_speed_kt =
        TimeSeries::from_pairs(obs.iter().map(|o| (o.time, o.wind_speed.map(adjusted))));

    let wind_vectors = obs
        .iter()
        .filter_map(|o| {
            let speed = adjusted(o.wind_speed?);
            let (u, v) = wind_components(1.0, o.wind_direction?);
            Some(WindVector {
                time: o.time,
                speed,
                u,
                v,
            })
        })
        .filter(|w| w.speed.is_finite())
        .collect();

    ObservedSeries {
        wave_height_ft,
        wind_speed_kt,
        wind_vectors,
    }
}

/// Pair every station with its forecast series from each run and its
/// observations.
///
/// One locator is built per run and every station is resolved against that
/// run's own grid. A run whose grid cannot be indexed is skipped. Stations
/// without an entry in `observations` get forecast-only comparisons.
pub fn build_comparisons(
    runs: &[ForecastRun],
    registry: &StationRegistry,
    observations: &HashMap<String, ObservationSeries>,
    horizon_hours: usize,
) -> WaveResult<Vec<StationComparison>> {
    if registry.is_empty() {
        return Err(WaveError::EmptyQuery);
    }

    let points = registry.points();
    let mut per_station: Vec<Vec<ForecastSeries>> = vec![Vec::new(); registry.len()];

    for run in runs {
        let indices = match GridLocator::new(&run.grid).and_then(|l| l.locate(&points)) {
            Ok(indices) => indices,
            Err(e @ WaveError::InvalidGrid(_)) => {
                warn!(source = %run.source, error = %e, "Skipping forecast run");
                continue;
            }
            Err(e) => return Err(e),
        };

        for (slot, index) in per_station.iter_mut().zip(indices) {
            slot.push(forecast_series(run, index, horizon_hours)?);
        }
    }

    let comparisons = registry
        .stations()
        .iter()
        .zip(per_station)
        .map(|(station, forecasts)| {
            let observed = observations
                .get(&station.id)
                .map(|s| observed_series(s, station));
            debug!(
                station = %station.id,
                runs = forecasts.len(),
                observed = observed.is_some(),
                "Built station comparison"
            );
            StationComparison {
                station: station.clone(),
                forecasts,
                observed,
            }
        })
        .collect();

    Ok(comparisons)
}
