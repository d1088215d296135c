//! Error types for the wave monitor.

use thiserror::Error;

/// Result type alias using WaveError.
pub type WaveResult<T> = Result<T, WaveError>;

/// Primary error type shared by the grid, station and configuration layers.
#[derive(Debug, Error)]
pub enum WaveError {
    // === Grid Errors ===
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("No query points supplied")]
    EmptyQuery,

    #[error("Grid index ({row}, {col}) outside {rows}x{cols} grid")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    // === Station Errors ===
    #[error("Invalid station '{id}': {message}")]
    InvalidStation { id: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for WaveError {
    fn from(err: serde_yaml::Error) -> Self {
        WaveError::Config(format!("YAML error: {}", err))
    }
}
