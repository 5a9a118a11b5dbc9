//! A bounded window of pages with positional tuple lookup across page
//! boundaries. Used as the in-memory working set of block nested-loop joins
//! and of the sort-merge join's right side.

use qexec_core::batch::Batch;
use qexec_core::tuple::Tuple;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct PageWindow {
    max_pages: usize,
    pages: Vec<Batch>,
    /// `ends[i]` is the number of tuples in pages `0..=i`.
    ends: Vec<usize>,
}

impl PageWindow {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            pages: Vec::with_capacity(max_pages),
            ends: Vec::with_capacity(max_pages),
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn has_capacity(&self) -> bool {
        self.pages.len() < self.max_pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total tuples held.
    pub fn len(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    pub fn push(&mut self, page: Batch) -> Result<()> {
        if !self.has_capacity() {
            return Err(Error::WindowFull {
                capacity: self.max_pages,
            });
        }
        let end = self.len() + page.len();
        self.pages.push(page);
        self.ends.push(end);
        Ok(())
    }

    /// The `idx`-th tuple of the window, counting across pages.
    pub fn tuple(&self, idx: usize) -> Option<&Tuple> {
        let page = self.ends.partition_point(|&end| end <= idx);
        let start = if page == 0 { 0 } else { self.ends[page - 1] };
        self.pages.get(page)?.get(idx - start)
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.ends.clear();
    }
}
