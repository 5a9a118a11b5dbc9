use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan has {joins} joins, no join #{ordinal}")]
    NoSuchJoin { ordinal: usize, joins: usize },

    #[error("no statistics for {0}")]
    MissingStatistics(String),

    #[error("invalid plan: {0}")]
    Invalid(String),

    #[error(transparent)]
    Core(#[from] qexec_core::Error),
}
