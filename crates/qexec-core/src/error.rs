use thiserror::Error;

use crate::schema::DataType;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Type mismatch: cannot compare {left:?} with {right:?}")]
    TypeMismatch { left: DataType, right: DataType },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    // The core crate does not do I/O, but catalog implementations map their
    // I/O errors into this variant.
    #[error("I/O-like error (mapped into core): {0}")]
    IoLike(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Schema(e.to_string())
    }
}
