//! External sort operator: spool, run generation, multi-pass merge.

use qexec_core::batch::Batch;
use qexec_core::schema::{Attribute, Schema};
use qexec_mem::{RunHandle, RunReader};

use super::run::{generate_runs, merge_runs};
use super::{SortKey, SortOrder};
use crate::context::OpContext;
use crate::traits::{BoxedOperator, OpError, Operator};

/// Sorts an input of any size with a budget of `buffers` pages.
///
/// `open()` does all the work:
/// 1. spool the child into one unsorted run,
/// 2. cut the spool into sorted runs of `buffers` pages,
/// 3. merge `buffers - 1` runs at a time until one run remains.
///
/// `next()` then streams the final run a page at a time. Every run stays on
/// storage until `close()`, which deletes them all.
pub struct ExternalSort {
    child: BoxedOperator,
    key: SortKey,
    buffers: usize,
    ctx: OpContext,
    capacity: usize,
    passes: Vec<Vec<RunHandle>>,
    created: Vec<RunHandle>,
    output: Option<RunReader>,
}

impl ExternalSort {
    pub fn new(
        child: BoxedOperator,
        attrs: &[Attribute],
        order: SortOrder,
        buffers: usize,
        ctx: OpContext,
    ) -> Result<Self, OpError> {
        let key = SortKey::resolve(child.schema(), attrs, order)?;
        let capacity = ctx.capacity(child.schema());
        Ok(Self {
            child,
            key,
            buffers: buffers.max(1),
            ctx,
            capacity,
            passes: Vec::new(),
            created: Vec::new(),
            output: None,
        })
    }

    /// Runs of each pass, run generation first and the single final run last.
    /// Populated by `open()`; the runs themselves can be read back until
    /// `close()` deletes them.
    pub fn pass_runs(&self) -> &[Vec<RunHandle>] {
        &self.passes
    }

    pub fn key(&self) -> &SortKey {
        &self.key
    }

    /// Inputs merged per round. Two at least, so N = 1 and N = 2 still shrink
    /// the run count every round.
    fn fan_in(&self) -> usize {
        self.buffers.saturating_sub(1).max(2)
    }

    fn spool_child(&mut self) -> Result<RunHandle, OpError> {
        let spill = &self.ctx.spill;
        let mut spool = spill.create_run("sort-spool")?;
        self.created.push(spool.clone());
        self.child.open()?;
        while let Some(page) = self.child.next()? {
            if !page.is_empty() {
                spill.append_page(&mut spool, &page)?;
            }
        }
        self.child.close()?;
        Ok(spool)
    }

    fn sort_all(&mut self) -> Result<RunHandle, OpError> {
        self.passes.clear();
        let spool = self.spool_child()?;
        let spill = self.ctx.spill.clone();
        let mut spool_reader = spill.reader(&spool);
        let mut current = generate_runs(
            &spill,
            &mut spool_reader,
            &self.key,
            self.buffers,
            self.capacity,
            &mut self.created,
        )?;
        tracing::debug!(
            tuples = spool.num_tuples(),
            pages = spool.num_pages(),
            runs = current.len(),
            "sort: generated runs"
        );
        self.passes.push(current.clone());

        let fan_in = self.fan_in();
        while current.len() > 1 {
            let mut next = Vec::with_capacity(current.len().div_ceil(fan_in));
            for group in current.chunks(fan_in) {
                next.push(merge_runs(
                    &spill,
                    group,
                    &self.key,
                    self.capacity,
                    &mut self.created,
                )?);
            }
            tracing::debug!(
                pass = self.passes.len(),
                runs_in = current.len(),
                runs_out = next.len(),
                "sort: merge pass"
            );
            self.passes.push(next.clone());
            current = next;
        }

        current
            .pop()
            .ok_or_else(|| OpError::Exec("sort produced no final run".into()))
    }
}

impl Operator for ExternalSort {
    fn name(&self) -> &'static str {
        "sort_external"
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }

    fn open(&mut self) -> Result<(), OpError> {
        let last = self.sort_all()?;
        self.output = Some(self.ctx.spill.reader(&last));
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        match self.output.as_mut() {
            Some(reader) => Ok(reader.next_page()?),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.output = None;
        let child = self.child.close();
        self.ctx.delete_runs(&mut self.created)?;
        child
    }
}
