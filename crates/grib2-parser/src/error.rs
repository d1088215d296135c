//! GRIB2 reader errors.

use thiserror::Error;
use wave_common::WaveError;

pub type Grib2Result<T> = Result<T, Grib2Error>;

#[derive(Debug, Error)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Unsupported {kind} template {number}")]
    UnsupportedTemplate { kind: &'static str, number: u16 },

    #[error("Unpacking error: {0}")]
    UnpackingError(String),

    #[error("No forecast fields found in {0}")]
    NoFields(String),

    #[error(transparent)]
    Wave(#[from] WaveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Grib2Error {
    pub(crate) fn section(section: u8, reason: impl Into<String>) -> Self {
        Grib2Error::InvalidSection {
            section,
            reason: reason.into(),
        }
    }
}
