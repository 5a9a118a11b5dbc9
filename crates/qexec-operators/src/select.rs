//! Selection: streaming filter on an `attribute op literal` predicate.

use qexec_core::batch::Batch;
use qexec_core::condition::Condition;
use qexec_core::schema::Schema;

use crate::stream::TupleStream;
use crate::traits::{BoxedOperator, OpError, Operator};

pub struct Select {
    child: BoxedOperator,
    condition: Condition,
    capacity: usize,
    input: TupleStream,
}

impl Select {
    pub fn new(child: BoxedOperator, condition: Condition, page_size: usize) -> Result<Self, OpError> {
        if !matches!(condition, Condition::Select { .. }) {
            return Err(OpError::Plan(format!(
                "select expects an attribute/literal predicate, got {condition}"
            )));
        }
        child.schema().require(condition.lhs())?;
        let capacity = Batch::capacity_for(page_size, child.schema().tuple_width());
        Ok(Self {
            child,
            condition,
            capacity,
            input: TupleStream::new(),
        })
    }
}

impl Operator for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.input.reset();
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        let mut out = Batch::new(self.capacity);
        while !out.is_full() {
            let Some(tuple) = self.input.next_tuple(self.child.as_mut())? else {
                break;
            };
            if self.condition.eval(&tuple, self.child.schema())? {
                out.push(tuple)?;
            }
        }
        Ok((!out.is_empty()).then_some(out))
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.child.close()
    }
}
