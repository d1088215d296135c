//! Station registry.

use serde::{Deserialize, Serialize};

use crate::{GeoPoint, WaveError, WaveResult};

/// A fixed monitoring station (buoy or coastal C-MAN site).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// NDBC station identifier (e.g., "45214", "CHII2")
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    /// Anemometer height above the water (m)
    pub sensor_height: f64,
}

impl Station {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, sensor_height: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            sensor_height,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }

    fn validate(&self) -> WaveResult<()> {
        let invalid = |message: String| WaveError::InvalidStation {
            id: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty station id".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(invalid(format!("latitude {} out of range", self.lat)));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(invalid(format!(
                "longitude {} must use the -180..180 convention",
                self.lon
            )));
        }
        if !(self.sensor_height.is_finite() && self.sensor_height > 0.0) {
            return Err(invalid(format!(
                "sensor height {} must be positive",
                self.sensor_height
            )));
        }
        Ok(())
    }
}

/// The set of stations every forecast grid is resolved against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    /// Build a validated registry.
    ///
    /// An empty registry is rejected with [`WaveError::EmptyQuery`].
    pub fn new(stations: Vec<Station>) -> WaveResult<Self> {
        let registry = Self { stations };
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> WaveResult<()> {
        if self.stations.is_empty() {
            return Err(WaveError::EmptyQuery);
        }

        for (i, station) in self.stations.iter().enumerate() {
            station.validate()?;
            if self.stations[..i].iter().any(|s| s.id == station.id) {
                return Err(WaveError::InvalidStation {
                    id: station.id.clone(),
                    message: "duplicate station id".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Station locations in registry order.
    pub fn points(&self) -> Vec<GeoPoint> {
        self.stations.iter().map(Station::location).collect()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
