//! DISTINCT over a subset of attributes.
//!
//! Duplicates are detected against the previously emitted tuple only, so the
//! input must arrive ordered on the selected attributes. `Distinct::new`
//! puts an ascending external sort underneath to guarantee that;
//! `Distinct::over_sorted` trusts the caller.

use qexec_core::batch::Batch;
use qexec_core::schema::{Attribute, Schema};
use qexec_core::tuple::Tuple;

use crate::context::OpContext;
use crate::sort::{ExternalSort, SortOrder};
use crate::stream::TupleStream;
use crate::traits::{BoxedOperator, OpError, Operator};

pub struct Distinct {
    child: BoxedOperator,
    columns: Vec<usize>,
    capacity: usize,
    input: TupleStream,
    last: Option<Tuple>,
}

impl Distinct {
    pub fn new(
        child: BoxedOperator,
        attrs: &[Attribute],
        buffers: usize,
        ctx: OpContext,
    ) -> Result<Self, OpError> {
        let page_size = ctx.page_size;
        let sorted = ExternalSort::new(child, attrs, SortOrder::Ascending, buffers, ctx)?;
        Self::over_sorted(Box::new(sorted), attrs, page_size)
    }

    pub fn over_sorted(
        child: BoxedOperator,
        attrs: &[Attribute],
        page_size: usize,
    ) -> Result<Self, OpError> {
        if attrs.is_empty() {
            return Err(OpError::Plan("distinct needs at least one attribute".into()));
        }
        let columns = attrs
            .iter()
            .map(|a| child.schema().require(a))
            .collect::<qexec_core::Result<Vec<_>>>()?;
        let capacity = Batch::capacity_for(page_size, child.schema().tuple_width());
        Ok(Self {
            child,
            columns,
            capacity,
            input: TupleStream::new(),
            last: None,
        })
    }
}

impl Operator for Distinct {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.input.reset();
        self.last = None;
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        let mut out = Batch::new(self.capacity);
        while !out.is_full() {
            let Some(tuple) = self.input.next_tuple(self.child.as_mut())? else {
                break;
            };
            let duplicate = match &self.last {
                Some(prev) => prev.compare_on(&tuple, &self.columns)?.is_eq(),
                None => false,
            };
            if !duplicate {
                self.last = Some(tuple.clone());
                out.push(tuple)?;
            }
        }
        Ok((!out.is_empty()).then_some(out))
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.last = None;
        self.child.close()
    }
}
