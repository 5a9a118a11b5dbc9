//! Page-I/O cost model.
//!
//! `PlanCost` walks a plan bottom-up. Scans seed a per-attribute map of
//! distinct-value counts from catalog statistics; selections and joins scale
//! it as cardinalities shrink. The map lives for a single `estimate` call.
//!
//! Cost is counted in page reads and writes. A plan shape the engine cannot
//! execute (a hash join, or joins starved of buffers) is not an error: its
//! cost is `Cost::Infinite` so a search can discard it. Missing or malformed
//! statistics are errors.

use std::collections::HashMap;
use std::fmt;

use qexec_core::batch::Batch;
use qexec_core::catalog::Catalog;
use qexec_core::condition::{CompareOp, Condition};
use qexec_core::config::EngineConfig;
use qexec_core::schema::{Attribute, Schema};
use qexec_mem::{BufferManager, MIN_BUFFERS_PER_JOIN};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::plan::{JoinAlgorithm, Plan, PlanNode};

/// Estimated I/O cost in pages. `Finite` always orders before `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cost {
    Finite(u64),
    Infinite,
}

impl Cost {
    pub fn is_finite(self) -> bool {
        matches!(self, Cost::Finite(_))
    }

    pub fn pages(self) -> Option<u64> {
        match self {
            Cost::Finite(p) => Some(p),
            Cost::Infinite => None,
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Finite(p) => write!(f, "{p}"),
            Cost::Infinite => write!(f, "inf"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEstimate {
    pub cost: Cost,
    /// Estimated output cardinality of the plan's root.
    pub tuples: u64,
}

/// Number of passes an external sort of `pages` pages makes with `buffers`
/// buffer pages: one run-generation pass plus
/// `ceil(log_{max(buffers-1, 2)}(ceil(pages / buffers)))` merge passes.
pub fn merge_passes(pages: u64, buffers: usize) -> u64 {
    let buffers = buffers.max(1) as u64;
    let fan_in = buffers.saturating_sub(1).max(2);
    let mut runs = pages.div_ceil(buffers).max(1);
    let mut passes = 1;
    while runs > 1 {
        runs = runs.div_ceil(fan_in);
        passes += 1;
    }
    passes
}

/// Cost estimator bound to one catalog and one buffer configuration.
pub struct PlanCost<'a> {
    catalog: &'a dyn Catalog,
    page_size: usize,
    num_buffers: usize,
}

/// Running state of one costing pass.
struct Walk {
    distinct: HashMap<Attribute, u64>,
    cost: u64,
    feasible: bool,
    buffers_per_join: usize,
}

impl<'a> PlanCost<'a> {
    pub fn new(catalog: &'a dyn Catalog, page_size: usize, num_buffers: usize) -> Self {
        Self {
            catalog,
            page_size,
            num_buffers,
        }
    }

    pub fn from_config(catalog: &'a dyn Catalog, cfg: &EngineConfig) -> Self {
        Self::new(catalog, cfg.page_size_bytes, cfg.num_buffers)
    }

    pub fn estimate(&self, plan: &Plan) -> Result<PlanEstimate> {
        let buffers = BufferManager::new(self.num_buffers, plan.num_joins());
        let mut walk = Walk {
            distinct: HashMap::new(),
            cost: 0,
            feasible: true,
            buffers_per_join: buffers.buffers_per_join(),
        };
        let (tuples, _) = self.walk(plan, &mut walk)?;
        let cost = if walk.feasible {
            Cost::Finite(walk.cost)
        } else {
            Cost::Infinite
        };
        debug!(%cost, tuples, joins = plan.num_joins(), "plan estimated");
        Ok(PlanEstimate { cost, tuples })
    }

    fn pages(&self, tuples: u64, schema: &Schema) -> u64 {
        let capacity = Batch::capacity_for(self.page_size, schema.tuple_width()) as u64;
        tuples.div_ceil(capacity)
    }

    /// Returns the node's estimated cardinality and output schema.
    fn walk(&self, plan: &Plan, w: &mut Walk) -> Result<(u64, Schema)> {
        match plan.node() {
            PlanNode::Scan { table } => {
                let schema = self.catalog.schema(table)?;
                let stats = self.catalog.statistics(table)?;
                if stats.distinct.len() != schema.num_columns() {
                    return Err(PlanError::MissingStatistics(format!(
                        "{table}: {} distinct counts for {} columns",
                        stats.distinct.len(),
                        schema.num_columns()
                    )));
                }
                for (attr, &d) in schema.attributes().iter().zip(&stats.distinct) {
                    w.distinct.insert(attr.clone(), d);
                }
                w.cost = w.cost.saturating_add(self.pages(stats.tuples, &schema));
                Ok((stats.tuples, schema))
            }
            PlanNode::Select { input, condition } => {
                let (tuples, schema) = self.walk(input, w)?;
                let out = self.select_cardinality(tuples, condition, &schema, w)?;
                for attr in schema.attributes() {
                    if let Some(d) = w.distinct.get_mut(attr) {
                        *d = scale(*d, out, tuples);
                    }
                }
                Ok((out, schema))
            }
            PlanNode::Project { input, attrs } => {
                let (tuples, schema) = self.walk(input, w)?;
                Ok((tuples, schema.sub_schema(attrs)?))
            }
            PlanNode::Join {
                left,
                right,
                conditions,
                algorithm,
            } => {
                let (left_tuples, left_schema) = self.walk(left, w)?;
                let (right_tuples, right_schema) = self.walk(right, w)?;

                let mut divisor: u128 = 1;
                for cond in conditions {
                    let (l, r) = cond.join_columns(&left_schema, &right_schema)?;
                    let l_attr = &left_schema.attributes()[l];
                    let r_attr = &right_schema.attributes()[r];
                    let dl = lookup(w, l_attr)?;
                    let dr = lookup(w, r_attr)?;
                    divisor = divisor.saturating_mul(dl.max(dr).max(1) as u128);
                    let min = dl.min(dr);
                    w.distinct.insert(l_attr.clone(), min);
                    w.distinct.insert(r_attr.clone(), min);
                }

                let lp = self.pages(left_tuples, &left_schema);
                let rp = self.pages(right_tuples, &right_schema);
                match self.join_cost(*algorithm, lp, rp, w.buffers_per_join) {
                    Some(c) => w.cost = w.cost.saturating_add(c),
                    None => w.feasible = false,
                }
                let tuples = (left_tuples as u128 * right_tuples as u128).div_ceil(divisor);
                Ok((saturate(tuples), left_schema.join(&right_schema)))
            }
            PlanNode::OrderBy { input, .. } | PlanNode::Distinct { input, .. } => {
                let (tuples, schema) = self.walk(input, w)?;
                let pages = self.pages(tuples, &schema);
                w.cost = w.cost.saturating_add(sort_cost(pages, self.num_buffers));
                Ok((tuples, schema))
            }
        }
    }

    fn select_cardinality(
        &self,
        tuples: u64,
        condition: &Condition,
        schema: &Schema,
        w: &Walk,
    ) -> Result<u64> {
        let attr = &schema.attributes()[schema.require(condition.lhs())?];
        let d = lookup(w, attr)?.max(1);
        Ok(match condition.op() {
            CompareOp::Eq => tuples.div_ceil(d),
            CompareOp::Ne => tuples - tuples / d,
            _ => tuples.div_ceil(2),
        })
    }

    /// `None` when the algorithm cannot run under this budget.
    fn join_cost(&self, algorithm: JoinAlgorithm, lp: u64, rp: u64, bpj: usize) -> Option<u64> {
        if bpj < MIN_BUFFERS_PER_JOIN {
            return None;
        }
        match algorithm {
            JoinAlgorithm::PageNested => Some(lp.saturating_mul(rp)),
            JoinAlgorithm::BlockNested => {
                let block = (bpj - 2) as u64;
                Some(lp.saturating_add(lp.div_ceil(block).saturating_mul(rp)))
            }
            JoinAlgorithm::SortMerge => {
                Some(lp.saturating_add(sort_cost(rp, self.num_buffers)).saturating_add(rp))
            }
            JoinAlgorithm::Hash => None,
        }
    }
}

/// Reading and writing every page once per pass.
fn sort_cost(pages: u64, buffers: usize) -> u64 {
    pages.saturating_mul(2).saturating_mul(merge_passes(pages, buffers))
}

fn lookup(w: &Walk, attr: &Attribute) -> Result<u64> {
    w.distinct
        .get(attr)
        .copied()
        .ok_or_else(|| PlanError::MissingStatistics(format!("distinct count of {attr}")))
}

/// `ceil(out / input * d)`; an empty input keeps nothing.
fn scale(d: u64, out: u64, input: u64) -> u64 {
    if input == 0 {
        return 0;
    }
    saturate((out as u128 * d as u128).div_ceil(input as u128))
}

fn saturate(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}
