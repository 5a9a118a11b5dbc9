//! Rows of typed values.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Scalar;

/// An immutable, fixed-length row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple {
    values: Vec<Scalar>,
}

impl Tuple {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, idx: usize) -> Result<&Scalar> {
        self.values.get(idx).ok_or_else(|| {
            Error::Invariant(format!(
                "column {idx} out of range for tuple of arity {}",
                self.values.len()
            ))
        })
    }

    /// Concatenate `self` and `right` (no duplicate-column elimination).
    pub fn join(&self, right: &Tuple) -> Tuple {
        let mut values = Vec::with_capacity(self.values.len() + right.values.len());
        values.extend(self.values.iter().cloned());
        values.extend(right.values.iter().cloned());
        Tuple { values }
    }

    /// Keep only the listed columns, in the listed order.
    pub fn project(&self, indices: &[usize]) -> Result<Tuple> {
        let values = indices
            .iter()
            .map(|&i| self.value(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Tuple { values })
    }

    /// Lexicographic comparison of two tuples of the same relation on `indices`.
    pub fn compare_on(&self, other: &Tuple, indices: &[usize]) -> Result<Ordering> {
        for &idx in indices {
            match self.value(idx)?.try_cmp(other.value(idx)?)? {
                Ordering::Equal => continue,
                ord => return Ok(ord),
            }
        }
        Ok(Ordering::Equal)
    }

    /// Lexicographic comparison of a left key against a right key drawn from
    /// different relations.
    pub fn compare_keys(
        left: &Tuple,
        right: &Tuple,
        left_idx: &[usize],
        right_idx: &[usize],
    ) -> Result<Ordering> {
        if left_idx.len() != right_idx.len() {
            return Err(Error::Invariant(format!(
                "join key arity differs: {} vs {}",
                left_idx.len(),
                right_idx.len()
            )));
        }
        for (&l, &r) in left_idx.iter().zip(right_idx) {
            match left.value(l)?.try_cmp(right.value(r)?)? {
                Ordering::Equal => continue,
                ord => return Ok(ord),
            }
        }
        Ok(Ordering::Equal)
    }

    /// True if any of the listed columns is null.
    pub fn has_null(&self, indices: &[usize]) -> Result<bool> {
        for &idx in indices {
            if self.value(idx)?.is_null() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Conjunctive equi-join test. A null key never matches.
    pub fn join_matches(&self, right: &Tuple, left_idx: &[usize], right_idx: &[usize]) -> Result<bool> {
        if self.has_null(left_idx)? || right.has_null(right_idx)? {
            return Ok(false);
        }
        Ok(Tuple::compare_keys(self, right, left_idx, right_idx)? == Ordering::Equal)
    }
}

impl From<Vec<Scalar>> for Tuple {
    fn from(values: Vec<Scalar>) -> Self {
        Tuple::new(values)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
