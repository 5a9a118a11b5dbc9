//! Helpers for operators that consume their input tuple by tuple and pack
//! their output into pages.

use std::cmp::Ordering;

use qexec_core::tuple::Tuple;

use crate::traits::{OpError, Operator};

/// Tuple-at-a-time view over a child's page stream.
///
/// Keeps the unconsumed remainder of the current input page between calls,
/// so a consumer can stop mid-page and resume there on its next `next()`.
#[derive(Default)]
pub struct TupleStream {
    page: std::vec::IntoIter<Tuple>,
    done: bool,
}

impl TupleStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_tuple(&mut self, child: &mut dyn Operator) -> Result<Option<Tuple>, OpError> {
        loop {
            if let Some(t) = self.page.next() {
                return Ok(Some(t));
            }
            if self.done {
                return Ok(None);
            }
            match child.next()? {
                Some(page) => self.page = page.into_tuples().into_iter(),
                None => self.done = true,
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Reject key columns whose non-null values do not share one type, so that
/// an in-memory sort over them sees a total order.
pub fn check_key_types(tuples: &[Tuple], keys: &[usize]) -> Result<(), OpError> {
    for &k in keys {
        let mut seen = None;
        for t in tuples {
            let Some(ty) = t.value(k)?.data_type() else {
                continue;
            };
            match seen {
                None => seen = Some(ty),
                Some(prev) if prev != ty => {
                    return Err(qexec_core::Error::TypeMismatch {
                        left: prev,
                        right: ty,
                    }
                    .into())
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Sort `tuples` with a fallible comparator after `check_key_types` has
/// ruled out the only way it can fail.
pub fn sort_tuples<F>(tuples: &mut [Tuple], keys: &[usize], compare: F) -> Result<(), OpError>
where
    F: Fn(&Tuple, &Tuple) -> qexec_core::Result<Ordering>,
{
    check_key_types(tuples, keys)?;
    tuples.sort_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal));
    Ok(())
}
