//! Storage adapters implementing `qexec_mem::spill::Storage`.
//!
//! - `fs`: local filesystem (default).
//! - `MemoryStorage` (crate root): in-process maps, chosen with a
//!   `memory://` spill root.

mod fs;
pub use fs::FsStorage;

use std::sync::Arc;

use qexec_core::config::EngineConfig;
use qexec_mem::Storage;

use crate::memory_storage::MemoryStorage;

pub const MEMORY_SCHEME: &str = "memory://";

/// Pick the storage backend matching the configured spill root.
pub fn build_storage(cfg: &EngineConfig) -> Arc<dyn Storage> {
    if cfg.spill_dir.starts_with(MEMORY_SCHEME) {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(FsStorage::new())
    }
}
