//! Binary predicates: selections (attribute vs literal) and joins
//! (attribute vs attribute).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{Attribute, Schema};
use crate::tuple::Tuple;
use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    /// Whether an ordering of `lhs` relative to `rhs` satisfies the operator.
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Select {
        lhs: Attribute,
        op: CompareOp,
        literal: Scalar,
    },
    Join {
        lhs: Attribute,
        op: CompareOp,
        rhs: Attribute,
    },
}

impl Condition {
    pub fn select(lhs: Attribute, op: CompareOp, literal: impl Into<Scalar>) -> Self {
        Condition::Select {
            lhs,
            op,
            literal: literal.into(),
        }
    }

    pub fn equi_join(lhs: Attribute, rhs: Attribute) -> Self {
        Condition::Join {
            lhs,
            op: CompareOp::Eq,
            rhs,
        }
    }

    pub fn lhs(&self) -> &Attribute {
        match self {
            Condition::Select { lhs, .. } | Condition::Join { lhs, .. } => lhs,
        }
    }

    pub fn op(&self) -> CompareOp {
        match self {
            Condition::Select { op, .. } | Condition::Join { op, .. } => *op,
        }
    }

    /// Evaluate a predicate against one tuple of `schema`.
    ///
    /// A comparison involving a null value is false.
    pub fn eval(&self, tuple: &Tuple, schema: &Schema) -> Result<bool> {
        let (lhs, op) = (self.lhs(), self.op());
        let left = tuple.value(schema.require(lhs)?)?;
        let right = match self {
            Condition::Select { literal, .. } => literal,
            Condition::Join { rhs, .. } => tuple.value(schema.require(rhs)?)?,
        };
        if left.is_null() || right.is_null() {
            return Ok(false);
        }
        Ok(op.holds(left.try_cmp(right)?))
    }

    /// Resolve a join condition into `(left column, right column)` indices.
    ///
    /// Either orientation is accepted: `lhs` may name a column of the left or
    /// of the right input.
    pub fn join_columns(&self, left: &Schema, right: &Schema) -> Result<(usize, usize)> {
        let Condition::Join { lhs, rhs, .. } = self else {
            return Err(Error::Schema(format!("{self} is not a join condition")));
        };
        if let (Some(l), Some(r)) = (left.index_of(lhs), right.index_of(rhs)) {
            return Ok((l, r));
        }
        if let (Some(l), Some(r)) = (left.index_of(rhs), right.index_of(lhs)) {
            return Ok((l, r));
        }
        Err(Error::Schema(format!(
            "join condition {self} does not bind both inputs"
        )))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Select { lhs, op, literal } => {
                write!(f, "{lhs} {} {literal}", op.symbol())
            }
            Condition::Join { lhs, op, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
        }
    }
}
