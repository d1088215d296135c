//! Nearest-grid-point resolution and forecast/observation alignment.
//!
//! A [`GridLocator`] indexes the cells of one forecast grid once and answers
//! nearest-cell queries for station locations. [`series`] turns the located
//! forecast cells and the station observations into display-ready series.

pub mod locator;
pub mod series;

pub use locator::{nearest_indices, GridLocator};
pub use series::{
    build_comparisons, forecast_series, observed_series, ForecastSeries, ObservedSeries,
    StationComparison, TimeSeries, WindVector,
};
