//! Operator trait + common interfaces.
//!
//! The exec runtime lowers a plan into a tree of `Box<dyn Operator>` and
//! drives it with the open / next / close protocol.

use qexec_core::batch::Batch;
use qexec_core::schema::Schema;

use thiserror::Error;

pub type BoxedOperator = Box<dyn Operator>;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error(transparent)]
    Core(#[from] qexec_core::Error),

    #[error(transparent)]
    Spill(#[from] qexec_mem::Error),
}

/// Trait that all operators must implement.
///
/// Invariants:
/// - `next()` returns a non-empty page holding at most the page capacity of
///   `schema()`, or `None` at end of stream. After the first `None` it keeps
///   returning `None`.
/// - `close()` releases every resource the operator owns (temporary runs
///   included) and is safe to call more than once, or without `open()`.
pub trait Operator: Send {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Output schema. Fixed at construction.
    fn schema(&self) -> &Schema;

    fn open(&mut self) -> Result<(), OpError>;

    fn next(&mut self) -> Result<Option<Batch>, OpError>;

    fn close(&mut self) -> Result<(), OpError>;
}
