//! Parser for NDBC realtime2 station files (`{station}.txt`).
//!
//! The files hold roughly 45 days of standard meteorological data, newest
//! row first, with a header line of column names and a line of units.

pub mod error;
pub mod realtime;

pub use error::{NdbcError, NdbcResult};
pub use realtime::{parse_realtime2, read_station_file, station_file_path};
