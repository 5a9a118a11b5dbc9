#![forbid(unsafe_code)]
//! qexec-exec: turns a `Plan` into an operator tree and drives it.
//!
//! The engine owns the configuration, the catalog and a spill manager rooted
//! in a private namespace under the configured spill directory, so engines
//! sharing one directory never see each other's runs.

pub mod error;
pub mod runtime;

pub use error::ExecError;
pub use runtime::{Engine, QueryOutput};
