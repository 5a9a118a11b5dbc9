//! Buffer manager: splits the global buffer-page budget across the joins of
//! a plan.

use crate::error::{Error, Result};

/// Every join needs one output page plus at least two working pages.
pub const MIN_BUFFERS_PER_JOIN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferManager {
    total: usize,
    joins: usize,
}

impl BufferManager {
    pub fn new(total: usize, joins: usize) -> Self {
        Self { total, joins }
    }

    /// Total buffer pages (what sorts outside of joins get).
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn num_joins(&self) -> usize {
        self.joins
    }

    /// Even (integer) share of the budget per join. A plan without joins
    /// keeps the whole budget.
    pub fn buffers_per_join(&self) -> usize {
        if self.joins == 0 {
            self.total
        } else {
            self.total / self.joins
        }
    }

    /// Reject a plan whose joins would get fewer than `MIN_BUFFERS_PER_JOIN`.
    pub fn validate(&self) -> Result<()> {
        let per_join = self.buffers_per_join();
        if self.joins > 0 && per_join < MIN_BUFFERS_PER_JOIN {
            return Err(Error::InsufficientBuffers {
                total: self.total,
                joins: self.joins,
                per_join,
                min: MIN_BUFFERS_PER_JOIN,
            });
        }
        Ok(())
    }
}
