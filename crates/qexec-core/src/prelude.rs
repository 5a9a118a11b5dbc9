//! Convenient re-exports for downstream crates.

pub use crate::batch::Batch;
pub use crate::catalog::{Catalog, TableSource, TableStats};
pub use crate::condition::{CompareOp, Condition};
pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::id::SpillId;
pub use crate::schema::{AggKind, Attribute, DataType, Schema, SortOrder};
pub use crate::tuple::Tuple;
pub use crate::types::Scalar;
