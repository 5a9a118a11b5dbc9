//! Page- and block-nested-loop joins.
//!
//! The right input is materialized once into a run. The left input is read
//! `L` pages at a time into a `PageWindow` and every left block is joined
//! against every page of the right run. `L = 1` is the page-nested variant;
//! `L = buffers - 2` is the block-nested variant.

use qexec_core::batch::Batch;
use qexec_core::condition::Condition;
use qexec_core::schema::Schema;
use qexec_mem::{PageWindow, RunHandle, RunReader};

use super::JoinKeys;
use crate::context::OpContext;
use crate::traits::{BoxedOperator, OpError, Operator};

/// Where `next()` resumes.
#[derive(Debug)]
enum NestedCursor {
    /// Load the next left block and rewind the right run.
    NextBlock,
    /// Read the next page of the right run for the current block.
    NextRightPage,
    /// Scan (left block x `right`); the next unvisited pair is
    /// (`left_row`, `right_row`).
    Probe {
        right: Batch,
        left_row: usize,
        right_row: usize,
    },
    Exhausted,
}

pub struct NestedLoopJoin {
    name: &'static str,
    left: BoxedOperator,
    right: BoxedOperator,
    schema: Schema,
    keys: JoinKeys,
    ctx: OpContext,
    capacity: usize,
    block: PageWindow,
    right_run: Option<RunHandle>,
    right_reader: Option<RunReader>,
    cursor: NestedCursor,
}

impl NestedLoopJoin {
    /// Page-nested-loop: one left page per pass over the right input.
    pub fn page(
        left: BoxedOperator,
        right: BoxedOperator,
        conditions: &[Condition],
        ctx: OpContext,
    ) -> Result<Self, OpError> {
        Self::with_block_pages("join_page_nested", left, right, conditions, 1, ctx)
    }

    /// Block-nested-loop: `buffers - 2` left pages per pass over the right
    /// input (one page goes to the right input, one to the output).
    pub fn block(
        left: BoxedOperator,
        right: BoxedOperator,
        conditions: &[Condition],
        buffers: usize,
        ctx: OpContext,
    ) -> Result<Self, OpError> {
        if buffers < 3 {
            return Err(OpError::Plan(format!(
                "block-nested join needs at least 3 buffers, got {buffers}"
            )));
        }
        Self::with_block_pages("join_block_nested", left, right, conditions, buffers - 2, ctx)
    }

    fn with_block_pages(
        name: &'static str,
        left: BoxedOperator,
        right: BoxedOperator,
        conditions: &[Condition],
        block_pages: usize,
        ctx: OpContext,
    ) -> Result<Self, OpError> {
        let keys = JoinKeys::resolve(conditions, left.schema(), right.schema())?;
        let schema = left.schema().join(right.schema());
        let capacity = ctx.capacity(&schema);
        Ok(Self {
            name,
            left,
            right,
            schema,
            keys,
            ctx,
            capacity,
            block: PageWindow::new(block_pages.max(1)),
            right_run: None,
            right_reader: None,
            cursor: NestedCursor::Exhausted,
        })
    }

    /// Left pages held per block.
    pub fn block_pages(&self) -> usize {
        self.block.max_pages()
    }

    fn materialize_right(&mut self) -> Result<RunHandle, OpError> {
        let spill = &self.ctx.spill;
        let mut run = spill.create_run("nlj-right")?;
        // close() deletes whatever is registered here, complete or not.
        self.right_run = Some(run.clone());
        self.right.open()?;
        while let Some(page) = self.right.next()? {
            spill.append_page(&mut run, &page)?;
        }
        self.right.close()?;
        tracing::debug!(
            op = self.name,
            pages = run.num_pages(),
            tuples = run.num_tuples(),
            "materialized right input"
        );
        Ok(run)
    }

    fn load_block(&mut self) -> Result<(), OpError> {
        self.block.clear();
        while self.block.has_capacity() {
            match self.left.next()? {
                Some(page) => self.block.push(page)?,
                None => break,
            }
        }
        Ok(())
    }
}

impl Operator for NestedLoopJoin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        let run = self.materialize_right()?;
        self.left.open()?;
        self.cursor = if run.is_empty() {
            NestedCursor::Exhausted
        } else {
            NestedCursor::NextBlock
        };
        self.right_reader = Some(self.ctx.spill.reader(&run));
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        let mut out = Batch::new(self.capacity);
        while !out.is_full() {
            match std::mem::replace(&mut self.cursor, NestedCursor::Exhausted) {
                NestedCursor::Exhausted => break,
                NestedCursor::NextBlock => {
                    self.load_block()?;
                    if self.block.is_empty() {
                        break;
                    }
                    if let Some(reader) = self.right_reader.as_mut() {
                        reader.rewind();
                    }
                    self.cursor = NestedCursor::NextRightPage;
                }
                NestedCursor::NextRightPage => {
                    let reader = self
                        .right_reader
                        .as_mut()
                        .ok_or_else(|| OpError::Exec("join used before open".into()))?;
                    self.cursor = match reader.next_page()? {
                        Some(right) => NestedCursor::Probe {
                            right,
                            left_row: 0,
                            right_row: 0,
                        },
                        None => NestedCursor::NextBlock,
                    };
                }
                NestedCursor::Probe {
                    right,
                    mut left_row,
                    mut right_row,
                } => {
                    let mut saved = None;
                    'scan: while let Some(l) = self.block.tuple(left_row) {
                        while let Some(r) = right.get(right_row) {
                            if out.is_full() {
                                saved = Some((left_row, right_row));
                                break 'scan;
                            }
                            if l.join_matches(r, &self.keys.left, &self.keys.right)? {
                                out.push(l.join(r))?;
                            }
                            right_row += 1;
                        }
                        right_row = 0;
                        left_row += 1;
                    }
                    self.cursor = match saved {
                        Some((left_row, right_row)) => NestedCursor::Probe {
                            right,
                            left_row,
                            right_row,
                        },
                        None => NestedCursor::NextRightPage,
                    };
                }
            }
        }
        Ok((!out.is_empty()).then_some(out))
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.cursor = NestedCursor::Exhausted;
        self.right_reader = None;
        self.block.clear();
        let left = self.left.close();
        let right = self.right.close();
        if let Some(run) = self.right_run.take() {
            self.ctx.spill.delete_run(&run)?;
        }
        left?;
        right
    }
}
