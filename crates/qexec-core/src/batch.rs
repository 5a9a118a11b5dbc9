//! Fixed-capacity pages of tuples.
//!
//! A page is the unit of disk I/O and of buffer accounting. Its capacity is
//! derived from the configured page size and the tuple width of the schema
//! flowing through the operator that fills it.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::tuple::Tuple;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    capacity: usize,
    tuples: Vec<Tuple>,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tuples: Vec::with_capacity(capacity),
        }
    }

    /// Number of tuples of `tuple_width` bytes that fit on a page (at least one).
    pub fn capacity_for(page_size: usize, tuple_width: usize) -> usize {
        if tuple_width == 0 {
            return page_size.max(1);
        }
        (page_size / tuple_width).max(1)
    }

    /// An empty page sized for `schema`.
    pub fn for_schema(page_size: usize, schema: &Schema) -> Self {
        Self::new(Self::capacity_for(page_size, schema.tuple_width()))
    }

    /// Build a page from tuples; more tuples than `capacity` is an error.
    pub fn from_tuples(capacity: usize, tuples: Vec<Tuple>) -> Result<Self> {
        let mut page = Batch::new(capacity);
        for t in tuples {
            page.push(t)?;
        }
        Ok(page)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tuples.len() >= self.capacity
    }

    pub fn push(&mut self, tuple: Tuple) -> Result<()> {
        if self.is_full() {
            return Err(Error::Invariant(format!(
                "page overflow: capacity {}",
                self.capacity
            )));
        }
        self.tuples.push(tuple);
        Ok(())
    }

    pub fn get(&self, idx: usize) -> Option<&Tuple> {
        self.tuples.get(idx)
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.tuples.iter()
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Tuple;
    type IntoIter = std::slice::Iter<'a, Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}
