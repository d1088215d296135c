use thiserror::Error;

pub type NdbcResult<T> = Result<T, NdbcError>;

#[derive(Debug, Error)]
pub enum NdbcError {
    #[error("Missing header line")]
    MissingHeader,

    #[error("Missing column: {0}")]
    MissingColumn(&'static str),

    #[error("No valid observation rows")]
    NoRows,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
