//! External multi-pass merge sort.

pub mod external;
pub mod run;

use std::cmp::Ordering;

use qexec_core::schema::{Attribute, Schema};
use qexec_core::tuple::Tuple;

use crate::traits::OpError;

pub use external::ExternalSort;
pub use qexec_core::schema::SortOrder;

/// Multi-attribute comparator: attributes compared in order, each later one
/// breaking ties of the earlier ones.
#[derive(Debug, Clone)]
pub struct SortKey {
    columns: Vec<usize>,
    order: SortOrder,
}

impl SortKey {
    pub fn resolve(schema: &Schema, attrs: &[Attribute], order: SortOrder) -> Result<Self, OpError> {
        if attrs.is_empty() {
            return Err(OpError::Plan("sort needs at least one attribute".into()));
        }
        let columns = attrs
            .iter()
            .map(|a| schema.require(a))
            .collect::<qexec_core::Result<Vec<_>>>()?;
        Ok(Self { columns, order })
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Descending order swaps the operands.
    pub fn compare(&self, a: &Tuple, b: &Tuple) -> qexec_core::Result<Ordering> {
        match self.order {
            SortOrder::Ascending => a.compare_on(b, &self.columns),
            SortOrder::Descending => b.compare_on(a, &self.columns),
        }
    }
}
