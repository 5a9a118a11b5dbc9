//! Engine configuration that downstream crates can serialize/deserialize.
//!
//! Supplied once, before any operator is constructed, and threaded through
//! plan costing and operator instantiation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bytes per page. Fixes the page capacity of every schema.
    pub page_size_bytes: usize,

    /// Total number of buffer pages available to the plan. Divided evenly
    /// across the joins of a plan by the buffer manager.
    pub num_buffers: usize,

    /// Directory for temporary run/materialization files.
    pub spill_dir: String,

    /// Directory holding table metadata, statistics and data files.
    pub table_dir: String,

    /// Spill segment compression: "none", "zstd" or "lz4".
    pub spill_codec: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size_bytes: 4096,
            num_buffers: 64,
            spill_dir: "/tmp/qexec-spill".to_string(),
            table_dir: ".".to_string(),
            spill_codec: "none".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new(page_size_bytes: usize, num_buffers: usize) -> Self {
        Self {
            page_size_bytes,
            num_buffers,
            ..Self::default()
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `QEXEC_PAGE_SIZE`: bytes per page
    /// - `QEXEC_NUM_BUFFERS`: total buffer pages
    /// - `QEXEC_SPILL_DIR`: directory for temporary runs
    /// - `QEXEC_TABLE_DIR`: directory holding `<table>.md/.stat/.csv`
    /// - `QEXEC_SPILL_CODEC`: spill compression
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("QEXEC_PAGE_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.page_size_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("QEXEC_NUM_BUFFERS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.num_buffers = v;
            }
        }

        if let Ok(s) = std::env::var("QEXEC_SPILL_DIR") {
            cfg.spill_dir = s;
        }

        if let Ok(s) = std::env::var("QEXEC_TABLE_DIR") {
            cfg.table_dir = s;
        }

        if let Ok(s) = std::env::var("QEXEC_SPILL_CODEC") {
            cfg.spill_codec = s;
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size_bytes == 0 {
            return Err(Error::Config("page size must be positive".into()));
        }
        if self.num_buffers == 0 {
            return Err(Error::Config("at least one buffer page is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_sizes() {
        assert!(EngineConfig::new(0, 10).validate().is_err());
        assert!(EngineConfig::new(100, 0).validate().is_err());
    }
}
