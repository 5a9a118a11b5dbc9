//! Sort-merge join.
//!
//! Both inputs are sorted ascending on their join keys with `ExternalSort`.
//! The sorted right input is spooled one run per page so any page can be
//! reloaded by index. The right side is addressed by a logical tuple index;
//! a window of `buffers - 2` right pages is kept in memory and reloaded
//! starting at the needed page on a miss.

use std::cmp::Ordering;

use qexec_core::batch::Batch;
use qexec_core::condition::Condition;
use qexec_core::schema::Schema;
use qexec_core::tuple::Tuple;
use qexec_mem::{PageWindow, RunHandle};

use super::JoinKeys;
use crate::context::OpContext;
use crate::sort::{ExternalSort, SortOrder};
use crate::traits::{BoxedOperator, OpError, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergePhase {
    NeedLeftPage,
    Merge,
    Exhausted,
}

enum Step {
    Emit(Tuple),
    AdvanceLeft,
    AdvanceRight,
}

pub struct SortMergeJoin {
    left: ExternalSort,
    right: ExternalSort,
    schema: Schema,
    keys: JoinKeys,
    ctx: OpContext,
    capacity: usize,

    /// One single-page run per sorted right page.
    right_pages: Vec<RunHandle>,
    /// `right_ends[p]` = number of right tuples in pages `0..=p`.
    right_ends: Vec<usize>,
    window: PageWindow,
    window_start: usize,

    phase: MergePhase,
    left_page: Vec<Tuple>,
    left_pos: usize,
    right_index: usize,
    /// First right index of the key group matched by the current left key.
    group_start: Option<usize>,
}

impl SortMergeJoin {
    pub fn new(
        left: BoxedOperator,
        right: BoxedOperator,
        conditions: &[Condition],
        buffers: usize,
        ctx: OpContext,
    ) -> Result<Self, OpError> {
        if buffers < 3 {
            return Err(OpError::Plan(format!(
                "sort-merge join needs at least 3 buffers, got {buffers}"
            )));
        }
        let keys = JoinKeys::resolve(conditions, left.schema(), right.schema())?;
        let (left_attrs, right_attrs) = keys.attributes(left.schema(), right.schema());
        let schema = left.schema().join(right.schema());
        let capacity = ctx.capacity(&schema);

        let left = ExternalSort::new(left, &left_attrs, SortOrder::Ascending, buffers, ctx.clone())?;
        let right =
            ExternalSort::new(right, &right_attrs, SortOrder::Ascending, buffers, ctx.clone())?;

        Ok(Self {
            left,
            right,
            schema,
            keys,
            ctx,
            capacity,
            right_pages: Vec::new(),
            right_ends: Vec::new(),
            window: PageWindow::new(buffers - 2),
            window_start: 0,
            phase: MergePhase::Exhausted,
            left_page: Vec::new(),
            left_pos: 0,
            right_index: 0,
            group_start: None,
        })
    }

    fn spool_right(&mut self) -> Result<(), OpError> {
        let spill = self.ctx.spill.clone();
        while let Some(page) = self.right.next()? {
            self.right_pages.push(spill.create_run("smj-right")?);
            if let Some(run) = self.right_pages.last_mut() {
                spill.append_page(run, &page)?;
            }
            let before = self.right_ends.last().copied().unwrap_or(0);
            self.right_ends.push(before + page.len());
        }
        tracing::debug!(
            pages = self.right_pages.len(),
            tuples = self.right_total(),
            window = self.window.max_pages(),
            "sort-merge: spooled sorted right input"
        );
        Ok(())
    }

    fn right_total(&self) -> usize {
        self.right_ends.last().copied().unwrap_or(0)
    }

    fn page_start(&self, page: usize) -> usize {
        if page == 0 {
            0
        } else {
            self.right_ends[page - 1]
        }
    }

    /// Make sure the right tuple at `index` is in the window. `false` once
    /// the right input is exhausted.
    fn load_right(&mut self, index: usize) -> Result<bool, OpError> {
        if index >= self.right_total() {
            return Ok(false);
        }
        let page = self.right_ends.partition_point(|&end| end <= index);
        let in_window = page >= self.window_start && page < self.window_start + self.window.num_pages();
        if in_window {
            return Ok(true);
        }

        self.window.clear();
        let mut next = page;
        while self.window.has_capacity() && next < self.right_pages.len() {
            let batch = self.ctx.spill.read_page(&self.right_pages[next], 0)?;
            self.window.push(batch)?;
            next += 1;
        }
        self.window_start = page;
        tracing::trace!(from = page, to = next, "sort-merge: reloaded right window");
        Ok(true)
    }

    fn right_tuple(&self, index: usize) -> Result<&Tuple, OpError> {
        let local = index - self.page_start(self.window_start);
        self.window
            .tuple(local)
            .ok_or_else(|| OpError::Exec(format!("right tuple {index} not in window")))
    }

    fn step(&self) -> Result<Step, OpError> {
        let l = &self.left_page[self.left_pos];
        let r = self.right_tuple(self.right_index)?;
        let ord = Tuple::compare_keys(l, r, &self.keys.left, &self.keys.right)?;
        Ok(match ord {
            // Equal keys holding a null never join; step past them like a
            // smaller left key.
            Ordering::Equal if l.join_matches(r, &self.keys.left, &self.keys.right)? => {
                Step::Emit(l.join(r))
            }
            Ordering::Greater => Step::AdvanceRight,
            _ => Step::AdvanceLeft,
        })
    }
}

impl Operator for SortMergeJoin {
    fn name(&self) -> &'static str {
        "join_sort_merge"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.left.open()?;
        self.right.open()?;
        self.spool_right()?;
        self.right.close()?;

        self.window.clear();
        self.window_start = 0;
        self.left_page.clear();
        self.left_pos = 0;
        self.right_index = 0;
        self.group_start = None;
        self.phase = if self.right_pages.is_empty() {
            MergePhase::Exhausted
        } else {
            MergePhase::NeedLeftPage
        };
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        let mut out = Batch::new(self.capacity);
        while !out.is_full() {
            match self.phase {
                MergePhase::Exhausted => break,
                MergePhase::NeedLeftPage => match self.left.next()? {
                    Some(page) => {
                        self.left_page = page.into_tuples();
                        self.left_pos = 0;
                        self.phase = MergePhase::Merge;
                    }
                    None => self.phase = MergePhase::Exhausted,
                },
                MergePhase::Merge => {
                    if self.left_pos >= self.left_page.len() {
                        self.phase = MergePhase::NeedLeftPage;
                        continue;
                    }
                    if !self.load_right(self.right_index)? {
                        // Right exhausted: the next left tuple may share the
                        // key of the active group, so backtrack to its start.
                        match self.group_start.take() {
                            Some(first) => {
                                self.right_index = first;
                                self.left_pos += 1;
                            }
                            None => self.phase = MergePhase::Exhausted,
                        }
                        continue;
                    }
                    match self.step()? {
                        Step::Emit(tuple) => {
                            out.push(tuple)?;
                            self.group_start.get_or_insert(self.right_index);
                            self.right_index += 1;
                        }
                        Step::AdvanceRight => {
                            self.right_index += 1;
                            self.group_start = None;
                        }
                        Step::AdvanceLeft => {
                            self.left_pos += 1;
                            if let Some(first) = self.group_start.take() {
                                self.right_index = first;
                            }
                        }
                    }
                }
            }
        }
        Ok((!out.is_empty()).then_some(out))
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.phase = MergePhase::Exhausted;
        self.window.clear();
        self.left_page.clear();
        self.right_ends.clear();
        let left = self.left.close();
        let right = self.right.close();
        self.ctx.delete_runs(&mut self.right_pages)?;
        left?;
        right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::NestedLoopJoin;
    use crate::testutil::*;
    use qexec_core::types::Scalar;

    fn cond() -> Vec<Condition> {
        vec![Condition::equi_join(int_attr("R", "a"), int_attr("S", "a"))]
    }

    fn brute_force(left: &[Tuple], right: &[Tuple], lk: &[usize], rk: &[usize]) -> Vec<Tuple> {
        let mut out = Vec::new();
        for l in left {
            for r in right {
                if l.join_matches(r, lk, rk).unwrap() {
                    out.push(l.join(r));
                }
            }
        }
        sorted(out)
    }

    #[test]
    fn sort_merge_joins_the_worked_example() {
        let (ctx, storage) = context(24);
        let r = values(int_schema("R", &["a"]), int_rows(&[&[3], &[2], &[1], &[2]]), 8);
        let s = values(
            int_schema("S", &["a", "b"]),
            int_rows(&[&[3, 30], &[2, 20], &[2, 10]]),
            16,
        );
        let mut join = SortMergeJoin::new(r, s, &cond(), 4, ctx).unwrap();
        assert_eq!(
            sorted(run(&mut join)),
            sorted(int_rows(&[
                &[2, 2, 10],
                &[2, 2, 10],
                &[2, 2, 20],
                &[2, 2, 20],
                &[3, 3, 30],
            ]))
        );
        assert!(storage.is_empty());
    }

    #[test]
    fn many_to_many_groups_backtrack_across_window_reloads() {
        let left = int_rows(&[&[5], &[2], &[2], &[1], &[2], &[3], &[5], &[7], &[3]]);
        let right = int_rows(&[
            &[2, 1],
            &[4, 2],
            &[2, 3],
            &[3, 4],
            &[5, 5],
            &[2, 6],
            &[5, 7],
            &[0, 8],
            &[3, 9],
        ]);
        let expected = brute_force(&left, &right, &[0], &[0]);
        assert_eq!(expected.len(), 3 * 3 + 2 * 2 + 2 * 2);

        // One-tuple right pages and a single-page window force a reload on
        // every backtrack; buffers = 3 leaves one page for the window.
        for (page_size, buffers) in [(8, 3), (8, 5), (64, 3), (64, 10)] {
            let (ctx, storage) = context(page_size);
            let l = values(int_schema("R", &["a"]), left.clone(), page_size);
            let r = values(int_schema("S", &["a", "b"]), right.clone(), page_size);
            let mut join = SortMergeJoin::new(l, r, &cond(), buffers, ctx).unwrap();
            let out = run(&mut join);
            assert_eq!(sorted(out), expected, "page_size={page_size} buffers={buffers}");
            assert!(storage.is_empty());
        }
    }

    #[test]
    fn matches_nested_loop_on_multi_attribute_keys() {
        let left = int_rows(&[&[1, 1, 0], &[1, 2, 1], &[2, 1, 2], &[1, 1, 3], &[2, 2, 4]]);
        let right = int_rows(&[&[1, 1, 7], &[2, 2, 8], &[1, 1, 9], &[1, 2, 6], &[3, 1, 5]]);
        let conds = vec![
            Condition::equi_join(int_attr("R", "a"), int_attr("S", "a")),
            Condition::equi_join(int_attr("R", "b"), int_attr("S", "b")),
        ];

        let (ctx, _) = context(24);
        let l = values(int_schema("R", &["a", "b", "c"]), left.clone(), 24);
        let r = values(int_schema("S", &["a", "b", "d"]), right.clone(), 24);
        let mut merge = SortMergeJoin::new(l, r, &conds, 3, ctx.clone()).unwrap();

        let l = values(int_schema("R", &["a", "b", "c"]), left, 24);
        let r = values(int_schema("S", &["a", "b", "d"]), right, 24);
        let mut nested = NestedLoopJoin::block(l, r, &conds, 3, ctx).unwrap();

        let merged = sorted(run(&mut merge));
        assert_eq!(merged.len(), 6);
        assert_eq!(merged, sorted(run(&mut nested)));
    }

    #[test]
    fn null_keys_are_skipped() {
        let (ctx, _) = context(64);
        let l = values(
            int_schema("R", &["a"]),
            vec![
                Tuple::new(vec![Scalar::Null]),
                Tuple::new(vec![Scalar::Int(4)]),
                Tuple::new(vec![Scalar::Null]),
            ],
            64,
        );
        let r = values(
            int_schema("S", &["a", "b"]),
            vec![
                Tuple::new(vec![Scalar::Null, Scalar::Int(1)]),
                Tuple::new(vec![Scalar::Int(4), Scalar::Int(2)]),
            ],
            64,
        );
        let mut join = SortMergeJoin::new(l, r, &cond(), 3, ctx).unwrap();
        assert_eq!(run(&mut join), int_rows(&[&[4, 4, 2]]));
    }

    #[test]
    fn empty_right_ends_immediately() {
        let (ctx, storage) = context(64);
        let l = values(int_schema("R", &["a"]), int_rows(&[&[1], &[2]]), 64);
        let r = values(int_schema("S", &["a", "b"]), Vec::new(), 64);
        let mut join = SortMergeJoin::new(l, r, &cond(), 3, ctx).unwrap();
        assert!(run(&mut join).is_empty());
        assert!(storage.is_empty());
    }
}
