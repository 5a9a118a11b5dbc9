#![forbid(unsafe_code)]
//! qexec-io: concrete `Storage` backends for the spill store and the table
//! catalogs that feed Scan and the cost model.

pub mod catalog;
pub mod error;
pub mod memory_storage;
pub mod storage;

pub use catalog::{FsCatalog, MemoryCatalog};
pub use error::{Error, Result};
pub use memory_storage::MemoryStorage;
pub use storage::{build_storage, FsStorage};
