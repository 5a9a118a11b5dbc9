//! Equi-join operators.
//!
//! Both families join on a conjunction of equality conditions. The key
//! columns are resolved once, at construction, from the condition list.

pub mod merge;
pub mod nested;

use qexec_core::condition::{CompareOp, Condition};
use qexec_core::schema::{Attribute, Schema};

use crate::traits::OpError;

pub use merge::SortMergeJoin;
pub use nested::NestedLoopJoin;

/// Column positions of the join key on each side, pairwise aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

impl JoinKeys {
    pub fn resolve(conditions: &[Condition], left: &Schema, right: &Schema) -> Result<Self, OpError> {
        if conditions.is_empty() {
            return Err(OpError::Plan("join needs at least one condition".into()));
        }
        let mut keys = JoinKeys {
            left: Vec::with_capacity(conditions.len()),
            right: Vec::with_capacity(conditions.len()),
        };
        for cond in conditions {
            if cond.op() != CompareOp::Eq {
                return Err(OpError::Plan(format!("only equi-joins are supported, got {cond}")));
            }
            let (l, r) = cond.join_columns(left, right)?;
            keys.left.push(l);
            keys.right.push(r);
        }
        Ok(keys)
    }

    /// The key attributes of each side, in key order.
    pub fn attributes(&self, left: &Schema, right: &Schema) -> (Vec<Attribute>, Vec<Attribute>) {
        let pick = |schema: &Schema, cols: &[usize]| {
            cols.iter()
                .filter_map(|&c| schema.attribute(c).cloned())
                .collect::<Vec<_>>()
        };
        (pick(left, &self.left), pick(right, &self.right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn resolves_multi_attribute_keys_in_either_orientation() {
        let left = int_schema("R", &["a", "b"]);
        let right = int_schema("S", &["b", "x", "a"]);
        let conds = vec![
            Condition::equi_join(int_attr("R", "a"), int_attr("S", "a")),
            Condition::equi_join(int_attr("S", "b"), int_attr("R", "b")),
        ];
        let keys = JoinKeys::resolve(&conds, &left, &right).unwrap();
        assert_eq!(keys.left, vec![0, 1]);
        assert_eq!(keys.right, vec![2, 0]);
        let (la, ra) = keys.attributes(&left, &right);
        assert_eq!(la, vec![int_attr("R", "a"), int_attr("R", "b")]);
        assert_eq!(ra, vec![int_attr("S", "a"), int_attr("S", "b")]);
    }

    #[test]
    fn rejects_non_equality_and_empty_conditions() {
        let left = int_schema("R", &["a"]);
        let right = int_schema("S", &["a"]);
        let lt = Condition::Join {
            lhs: int_attr("R", "a"),
            op: CompareOp::Lt,
            rhs: int_attr("S", "a"),
        };
        assert!(JoinKeys::resolve(&[lt], &left, &right).is_err());
        assert!(JoinKeys::resolve(&[], &left, &right).is_err());
    }
}
