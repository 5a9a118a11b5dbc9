#![forbid(unsafe_code)]
//! qexec-operators: pull-based operators (scan/select/project/sort/join/distinct).
//!
//! Design intent:
//! - Pure and synchronous; every operator yields one page per `next()`.
//! - Anything that may outgrow memory goes through the `SpillManager` of the
//!   shared `OpContext`, never through ad hoc temp files.
//! - Operators that spill own their runs and delete them in `close()`.

pub mod context;
pub mod stream;
pub mod traits;

pub mod distinct;
pub mod order_by;
pub mod project;
pub mod scan;
pub mod select;

pub mod join;
pub mod sort;

pub use context::OpContext;
pub use distinct::Distinct;
pub use join::{NestedLoopJoin, SortMergeJoin};
pub use order_by::OrderBy;
pub use project::Project;
pub use scan::{Scan, Values};
pub use select::Select;
pub use sort::{ExternalSort, SortOrder};
pub use traits::{BoxedOperator, OpError, Operator};

#[cfg(test)]
pub(crate) mod testutil;
