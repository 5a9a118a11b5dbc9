//! Physical plan trees.
//!
//! A `Plan` is a handle to an immutable node. Updates never mutate a node in
//! place: `with_join_algorithm` copies the path from the root to the target
//! join and shares every other subtree with the original plan.

use std::fmt;
use std::sync::Arc;

use qexec_core::catalog::Catalog;
use qexec_core::condition::Condition;
use qexec_core::schema::{Attribute, Schema, SortOrder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PlanError, Result};

/// Physical join method chosen for a `Join` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinAlgorithm {
    #[default]
    PageNested,
    BlockNested,
    SortMerge,
    /// Recognised but not executable: costs as infeasible.
    Hash,
}

impl JoinAlgorithm {
    pub const ALL: [JoinAlgorithm; 4] = [
        JoinAlgorithm::PageNested,
        JoinAlgorithm::BlockNested,
        JoinAlgorithm::SortMerge,
        JoinAlgorithm::Hash,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JoinAlgorithm::PageNested => "page_nested",
            JoinAlgorithm::BlockNested => "block_nested",
            JoinAlgorithm::SortMerge => "sort_merge",
            JoinAlgorithm::Hash => "hash",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanNode {
    Scan {
        table: String,
    },
    Select {
        input: Plan,
        condition: Condition,
    },
    Project {
        input: Plan,
        attrs: Vec<Attribute>,
    },
    Join {
        left: Plan,
        right: Plan,
        conditions: Vec<Condition>,
        algorithm: JoinAlgorithm,
    },
    OrderBy {
        input: Plan,
        attrs: Vec<Attribute>,
        order: SortOrder,
    },
    Distinct {
        input: Plan,
        attrs: Vec<Attribute>,
    },
}

/// Shared handle to a plan node. Cloning is O(1).
#[derive(Debug, Clone, PartialEq)]
pub struct Plan(Arc<PlanNode>);

impl Plan {
    pub fn new(node: PlanNode) -> Self {
        Plan(Arc::new(node))
    }

    pub fn scan(table: impl Into<String>) -> Self {
        Plan::new(PlanNode::Scan {
            table: table.into(),
        })
    }

    pub fn select(self, condition: Condition) -> Self {
        Plan::new(PlanNode::Select {
            input: self,
            condition,
        })
    }

    pub fn project(self, attrs: Vec<Attribute>) -> Self {
        Plan::new(PlanNode::Project { input: self, attrs })
    }

    pub fn join(self, right: Plan, conditions: Vec<Condition>, algorithm: JoinAlgorithm) -> Self {
        Plan::new(PlanNode::Join {
            left: self,
            right,
            conditions,
            algorithm,
        })
    }

    pub fn order_by(self, attrs: Vec<Attribute>, order: SortOrder) -> Self {
        Plan::new(PlanNode::OrderBy {
            input: self,
            attrs,
            order,
        })
    }

    pub fn distinct(self, attrs: Vec<Attribute>) -> Self {
        Plan::new(PlanNode::Distinct { input: self, attrs })
    }

    pub fn node(&self) -> &PlanNode {
        &self.0
    }

    /// True if both handles point at the same node (not merely equal ones).
    pub fn ptr_eq(a: &Plan, b: &Plan) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn children(&self) -> Vec<&Plan> {
        match self.node() {
            PlanNode::Scan { .. } => Vec::new(),
            PlanNode::Select { input, .. }
            | PlanNode::Project { input, .. }
            | PlanNode::OrderBy { input, .. }
            | PlanNode::Distinct { input, .. } => vec![input],
            PlanNode::Join { left, right, .. } => vec![left, right],
        }
    }

    pub fn num_joins(&self) -> usize {
        let own = matches!(self.node(), PlanNode::Join { .. }) as usize;
        own + self.children().into_iter().map(Plan::num_joins).sum::<usize>()
    }

    /// Join algorithms in pre-order (a join, then its left subtree, then its
    /// right subtree). Index `i` is the ordinal `with_join_algorithm` takes.
    pub fn join_algorithms(&self) -> Vec<JoinAlgorithm> {
        let mut out = Vec::new();
        self.collect_algorithms(&mut out);
        out
    }

    fn collect_algorithms(&self, out: &mut Vec<JoinAlgorithm>) {
        if let PlanNode::Join { algorithm, .. } = self.node() {
            out.push(*algorithm);
        }
        for child in self.children() {
            child.collect_algorithms(out);
        }
    }

    /// A new plan in which join number `ordinal` (pre-order) uses `algorithm`.
    /// `self` is left untouched.
    pub fn with_join_algorithm(&self, ordinal: usize, algorithm: JoinAlgorithm) -> Result<Plan> {
        let mut seen = 0;
        self.replace_join(ordinal, algorithm, &mut seen)
            .ok_or(PlanError::NoSuchJoin {
                ordinal,
                joins: seen,
            })
    }

    /// `None` when the target join is not inside this subtree; `seen` then
    /// counts every join it holds.
    fn replace_join(&self, ordinal: usize, algorithm: JoinAlgorithm, seen: &mut usize) -> Option<Plan> {
        let node = match self.node() {
            PlanNode::Scan { .. } => return None,
            PlanNode::Select { input, condition } => PlanNode::Select {
                input: input.replace_join(ordinal, algorithm, seen)?,
                condition: condition.clone(),
            },
            PlanNode::Project { input, attrs } => PlanNode::Project {
                input: input.replace_join(ordinal, algorithm, seen)?,
                attrs: attrs.clone(),
            },
            PlanNode::OrderBy { input, attrs, order } => PlanNode::OrderBy {
                input: input.replace_join(ordinal, algorithm, seen)?,
                attrs: attrs.clone(),
                order: *order,
            },
            PlanNode::Distinct { input, attrs } => PlanNode::Distinct {
                input: input.replace_join(ordinal, algorithm, seen)?,
                attrs: attrs.clone(),
            },
            PlanNode::Join {
                left,
                right,
                conditions,
                algorithm: current,
            } => {
                let here = *seen;
                *seen += 1;
                let (left, right, algorithm) = if here == ordinal {
                    (left.clone(), right.clone(), algorithm)
                } else if let Some(left) = left.replace_join(ordinal, algorithm, seen) {
                    (left, right.clone(), *current)
                } else {
                    let right = right.replace_join(ordinal, algorithm, seen)?;
                    (left.clone(), right, *current)
                };
                PlanNode::Join {
                    left,
                    right,
                    conditions: conditions.clone(),
                    algorithm,
                }
            }
        };
        Some(Plan::new(node))
    }

    /// Output schema of this plan, resolved against `catalog`.
    pub fn schema(&self, catalog: &dyn Catalog) -> Result<Schema> {
        Ok(match self.node() {
            PlanNode::Scan { table } => catalog.schema(table)?,
            PlanNode::Select { input, .. }
            | PlanNode::OrderBy { input, .. }
            | PlanNode::Distinct { input, .. } => input.schema(catalog)?,
            PlanNode::Project { input, attrs } => input.schema(catalog)?.sub_schema(attrs)?,
            PlanNode::Join { left, right, .. } => {
                left.schema(catalog)?.join(&right.schema(catalog)?)
            }
        })
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = depth * 2)?;
        match self.node() {
            PlanNode::Scan { table } => writeln!(f, "Scan {table}")?,
            PlanNode::Select { condition, .. } => writeln!(f, "Select {condition}")?,
            PlanNode::Project { attrs, .. } => writeln!(f, "Project [{}]", list(attrs))?,
            PlanNode::Join {
                conditions,
                algorithm,
                ..
            } => {
                let conds: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                writeln!(f, "Join/{} [{}]", algorithm.name(), conds.join(" AND "))?
            }
            PlanNode::OrderBy { attrs, order, .. } => {
                writeln!(f, "OrderBy {:?} [{}]", order, list(attrs))?
            }
            PlanNode::Distinct { attrs, .. } => writeln!(f, "Distinct [{}]", list(attrs))?,
        }
        for child in self.children() {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

fn list(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl Serialize for Plan {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        PlanNode::deserialize(deserializer).map(Plan::new)
    }
}
