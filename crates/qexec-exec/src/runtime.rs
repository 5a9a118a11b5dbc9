//! Runtime: lower a `Plan` into operators and pull it to completion.
//!
//! - Buffers are validated up front: every join must get at least
//!   `MIN_BUFFERS_PER_JOIN` pages of the configured budget.
//! - Joins and sort-merge sorts receive the per-join share; OrderBy and
//!   Distinct sorts receive the whole budget.
//! - The operator tree is closed on every path out of `execute`, so a failure
//!   mid-query still deletes the runs it created.

use std::sync::Arc;
use std::time::{Duration, Instant};

use qexec_core::batch::Batch;
use qexec_core::catalog::Catalog;
use qexec_core::config::EngineConfig;
use qexec_core::schema::Schema;
use qexec_core::tuple::Tuple;
use qexec_mem::{BufferManager, Codec, SpillManager, Storage};
use qexec_operators::{
    BoxedOperator, Distinct, NestedLoopJoin, OpContext, OpError, Operator, OrderBy, Project, Scan,
    Select, SortMergeJoin,
};
use qexec_planner::{JoinAlgorithm, Plan, PlanCost, PlanEstimate, PlanNode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ExecError;

/// Fully materialized result of one query.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub schema: Schema,
    pub pages: Vec<Batch>,
    pub tuples: u64,
    pub elapsed: Duration,
}

impl QueryOutput {
    pub fn rows(&self) -> impl Iterator<Item = &Tuple> {
        self.pages.iter().flat_map(|p| p.iter())
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.pages.into_iter().flat_map(Batch::into_tuples).collect()
    }
}

/// Engine owns the configuration, the catalog, and the spill manager.
pub struct Engine {
    cfg: EngineConfig,
    catalog: Arc<dyn Catalog>,
    spill: Arc<SpillManager>,
}

impl Engine {
    pub fn new(
        cfg: EngineConfig,
        catalog: Arc<dyn Catalog>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, ExecError> {
        cfg.validate()?;
        let codec = Codec::from_name(&cfg.spill_codec)?;
        let root = format!("{}/{}", cfg.spill_dir.trim_end_matches('/'), Uuid::new_v4());
        debug!(spill_root = %root, ?codec, "engine created");
        let spill = Arc::new(SpillManager::new(storage, codec, root));
        Ok(Self {
            cfg,
            catalog,
            spill,
        })
    }

    /// Like `new`, with the storage backend the spill directory names.
    pub fn with_default_storage(
        cfg: EngineConfig,
        catalog: Arc<dyn Catalog>,
    ) -> Result<Self, ExecError> {
        let storage = qexec_io::build_storage(&cfg);
        Self::new(cfg, catalog, storage)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Directory under which this engine's temporary runs live.
    pub fn spill_root(&self) -> &str {
        self.spill.root_dir()
    }

    pub fn estimate(&self, plan: &Plan) -> Result<PlanEstimate, ExecError> {
        Ok(PlanCost::from_config(self.catalog.as_ref(), &self.cfg).estimate(plan)?)
    }

    /// Lower `plan` into an unopened operator tree.
    pub fn build(&self, plan: &Plan) -> Result<BoxedOperator, ExecError> {
        let buffers = BufferManager::new(self.cfg.num_buffers, plan.num_joins());
        buffers.validate()?;
        self.lower(plan, &buffers)
    }

    /// Build, open, drain and close `plan`.
    pub fn execute(&self, plan: &Plan) -> Result<QueryOutput, ExecError> {
        let started = Instant::now();
        let mut root = self.build(plan)?;

        let drained = drain(root.as_mut());
        let closed = root.close();
        if let (Err(e), Err(close_err)) = (&drained, &closed) {
            warn!(error = %e, %close_err, "close after failed query also failed");
        }
        let pages = drained?;
        closed?;

        let tuples = pages.iter().map(|p| p.len() as u64).sum();
        let elapsed = started.elapsed();
        info!(
            tuples,
            pages = pages.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "query finished"
        );
        Ok(QueryOutput {
            schema: root.schema().clone(),
            pages,
            tuples,
            elapsed,
        })
    }

    fn context(&self) -> OpContext {
        OpContext::new(self.cfg.page_size_bytes, Arc::clone(&self.spill))
    }

    fn lower(&self, plan: &Plan, buffers: &BufferManager) -> Result<BoxedOperator, ExecError> {
        let page_size = self.cfg.page_size_bytes;
        let op: BoxedOperator = match plan.node() {
            PlanNode::Scan { table } => {
                Box::new(Scan::new(Arc::clone(&self.catalog), table, page_size)?)
            }
            PlanNode::Select { input, condition } => Box::new(Select::new(
                self.lower(input, buffers)?,
                condition.clone(),
                page_size,
            )?),
            PlanNode::Project { input, attrs } => Box::new(Project::new(
                self.lower(input, buffers)?,
                attrs.clone(),
                page_size,
            )?),
            PlanNode::Join {
                left,
                right,
                conditions,
                algorithm,
            } => {
                let l = self.lower(left, buffers)?;
                let r = self.lower(right, buffers)?;
                let per_join = buffers.buffers_per_join();
                match algorithm {
                    JoinAlgorithm::PageNested => {
                        Box::new(NestedLoopJoin::page(l, r, conditions, self.context())?)
                    }
                    JoinAlgorithm::BlockNested => Box::new(NestedLoopJoin::block(
                        l,
                        r,
                        conditions,
                        per_join,
                        self.context(),
                    )?),
                    JoinAlgorithm::SortMerge => Box::new(SortMergeJoin::new(
                        l,
                        r,
                        conditions,
                        per_join,
                        self.context(),
                    )?),
                    JoinAlgorithm::Hash => {
                        return Err(ExecError::Unsupported("hash join is not executable".into()))
                    }
                }
            }
            PlanNode::OrderBy {
                input,
                attrs,
                order,
            } => Box::new(OrderBy::new(
                self.lower(input, buffers)?,
                attrs,
                *order,
                buffers.total(),
                self.context(),
            )?),
            PlanNode::Distinct { input, attrs } => Box::new(Distinct::new(
                self.lower(input, buffers)?,
                attrs,
                buffers.total(),
                self.context(),
            )?),
        };
        Ok(op)
    }
}

fn drain(op: &mut dyn Operator) -> Result<Vec<Batch>, OpError> {
    op.open()?;
    let mut pages = Vec::new();
    while let Some(page) = op.next()? {
        pages.push(page);
    }
    Ok(pages)
}
