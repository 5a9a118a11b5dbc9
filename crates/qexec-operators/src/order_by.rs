//! ORDER BY: external sort with the plan's whole buffer budget.

use qexec_core::batch::Batch;
use qexec_core::schema::{Attribute, Schema};

use crate::context::OpContext;
use crate::sort::{ExternalSort, SortOrder};
use crate::traits::{BoxedOperator, OpError, Operator};

pub struct OrderBy {
    sort: ExternalSort,
}

impl OrderBy {
    pub fn new(
        child: BoxedOperator,
        attrs: &[Attribute],
        order: SortOrder,
        buffers: usize,
        ctx: OpContext,
    ) -> Result<Self, OpError> {
        Ok(Self {
            sort: ExternalSort::new(child, attrs, order, buffers, ctx)?,
        })
    }

    pub fn sort(&self) -> &ExternalSort {
        &self.sort
    }
}

impl Operator for OrderBy {
    fn name(&self) -> &'static str {
        "order_by"
    }

    fn schema(&self) -> &Schema {
        self.sort.schema()
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.sort.open()
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        self.sort.next()
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.sort.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn orders_descending_and_keeps_schema() {
        let (ctx, storage) = context(8);
        let schema = int_schema("T", &["a", "b"]);
        let child = values(schema.clone(), int_rows(&[&[1, 0], &[3, 1], &[2, 2]]), 8);
        let mut op = OrderBy::new(child, &[int_attr("T", "a")], SortOrder::Descending, 2, ctx).unwrap();
        assert_eq!(op.schema(), &schema);
        assert_eq!(run(&mut op), int_rows(&[&[3, 1], &[2, 2], &[1, 0]]));
        assert!(storage.is_empty());
    }

    #[test]
    fn unknown_sort_attribute_is_rejected() {
        let (ctx, _) = context(8);
        let child = values(int_schema("T", &["a"]), Vec::new(), 8);
        assert!(OrderBy::new(child, &[int_attr("U", "a")], SortOrder::Ascending, 2, ctx).is_err());
    }
}
