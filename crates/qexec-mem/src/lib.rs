#![forbid(unsafe_code)]
//! qexec-mem: buffer-page budgeting, in-memory page windows, and the spill
//! store used by the disk-bounded operators.
//!
//! No filesystem access lives here. The `Storage` trait (in `spill::`) is
//! implemented by `qexec-io`; operators only ever talk to a `SpillManager`.

pub mod buffer;
pub mod error;
pub mod spill;
pub mod window;

pub use buffer::{BufferManager, MIN_BUFFERS_PER_JOIN};
pub use error::{Error, Result};
pub use spill::{Codec, PageMeta, RunHandle, RunReader, SpillManager, Storage};
pub use window::PageWindow;
