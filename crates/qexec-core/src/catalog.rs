//! Abstract catalog interfaces.
//!
//! The concrete implementations live in `qexec-io`. We keep only traits here
//! so operators and the planner can depend on the API without pulling any
//! file handling.

use crate::error::Result;
use crate::schema::Schema;
use crate::tuple::Tuple;

/// Statistics of one base table: tuple count and, per column in schema
/// order, the number of distinct values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub tuples: u64,
    pub distinct: Vec<u64>,
}

/// A read-only stream of the tuples of a base table.
pub trait TableSource: Send {
    /// Next tuple, or `None` once the table is exhausted.
    fn next_tuple(&mut self) -> Result<Option<Tuple>>;
}

/// Resolves table names to schemas, statistics and data.
pub trait Catalog: Send + Sync {
    fn schema(&self, table: &str) -> Result<Schema>;

    fn statistics(&self, table: &str) -> Result<TableStats>;

    /// Open a fresh scan over the table's data.
    fn open_table(&self, table: &str) -> Result<Box<dyn TableSource>>;
}
