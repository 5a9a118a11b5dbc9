use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed {file}: {reason}")]
    Format { file: String, reason: String },

    #[error("core: {0}")]
    Core(#[from] qexec_core::Error),

    #[error("config: {0}")]
    Config(String),
}

impl From<Error> for qexec_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(inner) => inner,
            Error::Format { .. } | Error::Json(_) => qexec_core::Error::Catalog(e.to_string()),
            other => qexec_core::Error::IoLike(other.to_string()),
        }
    }
}
