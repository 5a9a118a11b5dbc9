#![forbid(unsafe_code)]
//! qexec-core: data model shared by every other crate of the engine.
//!
//! Scalars, tuples, pages, schemas and predicates live here together with the
//! engine configuration and the catalog *interfaces*. Nothing in this crate
//! touches the filesystem; concrete catalogs and spill storage are provided
//! by `qexec-io`.

pub mod batch;
pub mod catalog;
pub mod condition;
pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod tuple;
pub mod types;

pub use error::{Error, Result};
