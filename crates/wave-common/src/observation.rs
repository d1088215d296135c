//! Buoy and coastal station observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw sensor report. Missing readings are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    /// Wind speed at sensor height (m/s)
    pub wind_speed: Option<f64>,
    /// Direction the wind blows from (degrees true)
    pub wind_direction: Option<f64>,
    /// Significant wave height (m)
    pub wave_height: Option<f64>,
}

/// Time-ordered observations for a single station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    pub station_id: String,
    observations: Vec<Observation>,
}

impl ObservationSeries {
    /// Build a series, sorting reports oldest first.
    pub fn new(station_id: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.time);
        Self {
            station_id: station_id.into(),
            observations,
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
