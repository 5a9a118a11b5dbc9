use thiserror::Error;

use qexec_operators::OpError;
use qexec_planner::PlanError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("unsupported plan: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Operator(#[from] OpError),

    #[error(transparent)]
    Memory(#[from] qexec_mem::Error),

    #[error(transparent)]
    Core(#[from] qexec_core::Error),
}
