use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to configure {backend} store: {source}")]
    Setup {
        backend: &'static str,
        #[source]
        source: object_store::Error,
    },

    #[error("{operation} {path} failed: {source}")]
    Object {
        operation: &'static str,
        path: String,
        #[source]
        source: object_store::Error,
    },

    #[error("not a file name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
