//! GRIB2 reader for wave-model forecast files (WMO FM 92 GRIB Edition 2).
//!
//! Splits a file into messages, parses the sections needed to place values on
//! the grid, unpacks the data and assembles the fields of one forecast run
//! into a [`wave_common::ForecastRun`].

pub mod error;
pub mod forecast;
pub mod lambert;
pub mod reader;
pub mod sections;
pub mod unpacking;

pub use error::{Grib2Error, Grib2Result};
pub use forecast::{assemble_run, read_forecast_bytes, read_forecast_file, read_forecast_files};
pub use lambert::LambertConformal;
pub use reader::{Grib2Field, Grib2Reader};
pub use sections::{GridDefinition, ScanMode};
