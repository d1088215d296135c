//! Common types and utilities shared across the wave monitor crates.

pub mod config;
pub mod error;
pub mod forecast;
pub mod grid;
pub mod observation;
pub mod station;
pub mod units;

pub use config::MonitorConfig;
pub use error::{WaveError, WaveResult};
pub use forecast::{ForecastField, ForecastRun, Parameter};
pub use grid::{normalize_longitude, Array2, ForecastGrid, GeoPoint, GridIndex};
pub use observation::{Observation, ObservationSeries};
pub use station::{Station, StationRegistry};
