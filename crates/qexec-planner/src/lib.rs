#![forbid(unsafe_code)]
//! qexec-planner: physical plan trees and their cost estimates.
//!
//! Design:
//! - `Plan` is a persistent tree (`Arc` nodes). Cloning a plan is O(1) and
//!   alternative plans share every untouched subtree, so a search loop can
//!   explore variants cheaply without aliasing execution state.
//! - `PlanCost` walks a plan bottom-up against catalog statistics and returns
//!   a page-I/O cost plus an output cardinality estimate.
//!
//! NOTE: No operator instantiation here; `qexec-exec` lowers plans.

pub mod cost;
pub mod error;
pub mod plan;

pub use cost::{merge_passes, Cost, PlanCost, PlanEstimate};
pub use error::{PlanError, Result};
pub use plan::{JoinAlgorithm, Plan, PlanNode};
