//! Execution context shared by every operator of one plan.

use std::sync::Arc;

use qexec_core::batch::Batch;
use qexec_core::schema::Schema;
use qexec_mem::{RunHandle, SpillManager};

use crate::traits::OpError;

#[derive(Clone)]
pub struct OpContext {
    /// Bytes per page; with a schema's tuple width this fixes page capacity.
    pub page_size: usize,
    pub spill: Arc<SpillManager>,
}

impl OpContext {
    pub fn new(page_size: usize, spill: Arc<SpillManager>) -> Self {
        Self { page_size, spill }
    }

    /// Tuples per page for `schema`.
    pub fn capacity(&self, schema: &Schema) -> usize {
        Batch::capacity_for(self.page_size, schema.tuple_width())
    }

    /// Delete every run in `runs`, emptying it. All deletions are attempted;
    /// the first failure is returned.
    pub fn delete_runs(&self, runs: &mut Vec<RunHandle>) -> Result<(), OpError> {
        let mut first_err = None;
        for run in runs.drain(..) {
            if let Err(e) = self.spill.delete_run(&run) {
                tracing::warn!(run = %run.path(), error = %e, "failed to delete run");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
