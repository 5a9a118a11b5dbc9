//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use qexec_core::prelude::*;
use qexec_io::MemoryStorage;
use qexec_mem::{Codec, SpillManager};

use crate::context::OpContext;
use crate::scan::Values;
use crate::traits::{BoxedOperator, Operator};

/// Context over fresh in-memory storage; the storage is returned so tests
/// can check that every run was cleaned up.
pub fn context(page_size: usize) -> (OpContext, MemoryStorage) {
    let storage = MemoryStorage::new();
    let spill = SpillManager::new(Arc::new(storage.clone()), Codec::None, "memory://test");
    (OpContext::new(page_size, Arc::new(spill)), storage)
}

pub fn int_attr(table: &str, column: &str) -> Attribute {
    Attribute::new(table, column, DataType::Int, 4)
}

pub fn int_schema(table: &str, columns: &[&str]) -> Schema {
    Schema::new(columns.iter().map(|c| int_attr(table, c)).collect())
}

pub fn int_rows(rows: &[&[i32]]) -> Vec<Tuple> {
    rows.iter()
        .map(|r| Tuple::new(r.iter().map(|&v| Scalar::Int(v)).collect()))
        .collect()
}

pub fn values(schema: Schema, rows: Vec<Tuple>, page_size: usize) -> BoxedOperator {
    Box::new(Values::new(schema, rows, page_size))
}

/// Open, drain and close `op`, checking the page protocol along the way.
pub fn run(op: &mut dyn Operator) -> Vec<Tuple> {
    op.open().unwrap();
    let mut out = Vec::new();
    while let Some(page) = op.next().unwrap() {
        assert!(!page.is_empty(), "{} returned an empty page", op.name());
        assert!(page.len() <= page.capacity());
        out.extend(page.into_tuples());
    }
    assert!(op.next().unwrap().is_none());
    op.close().unwrap();
    op.close().unwrap();
    out
}

/// Order-insensitive view of a tuple multiset.
pub fn sorted(mut tuples: Vec<Tuple>) -> Vec<Tuple> {
    let width = tuples.first().map(|t| t.len()).unwrap_or(0);
    let all: Vec<usize> = (0..width).collect();
    tuples.sort_by(|a, b| a.compare_on(b, &all).unwrap());
    tuples
}
