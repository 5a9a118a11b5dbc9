//! External sort over filesystem spill storage.

mod common;

use std::sync::Arc;

use common::{drain, files_under, int_schema, is_sorted_on, multiset, random_rows, Lcg};
use qexec_core::prelude::*;
use qexec_io::FsStorage;
use qexec_mem::{Codec, SpillManager};
use qexec_operators::{ExternalSort, OpContext, Operator, Values};
use qexec_planner::merge_passes;
use tempfile::TempDir;

fn fs_context(dir: &TempDir, page_size: usize) -> OpContext {
    let root = dir.path().join("sort-spills").display().to_string();
    let spill = SpillManager::new(Arc::new(FsStorage::new()), Codec::None, root);
    OpContext::new(page_size, Arc::new(spill))
}

#[test]
fn sorts_random_input_under_every_budget() {
    let dir = TempDir::new().unwrap();
    let schema = int_schema("R", &["k", "v"]);
    let rows = random_rows(&mut Lcg::new(7), 500, 2, 60, 0);
    // 32-byte pages hold four 8-byte tuples: 125 pages.
    let pages = 125;

    for buffers in [1, 2, 3, 5, 16, 200] {
        let input = Box::new(Values::new(schema.clone(), rows.clone(), 32));
        let key = [schema.attribute(0).unwrap().clone()];
        let mut sort =
            ExternalSort::new(input, &key, SortOrder::Ascending, buffers, fs_context(&dir, 32))
                .unwrap();

        sort.open().unwrap();
        assert_eq!(
            sort.pass_runs().len() as u64,
            merge_passes(pages, buffers),
            "buffers = {buffers}"
        );
        let mut out = Vec::new();
        while let Some(page) = sort.next().unwrap() {
            assert!(page.len() <= 4);
            out.extend(page.into_tuples());
        }
        sort.close().unwrap();

        assert!(is_sorted_on(&out, &[0], SortOrder::Ascending));
        assert_eq!(multiset(&out), multiset(&rows));
        assert!(files_under(dir.path()).is_empty(), "runs left behind");
    }
}

#[test]
fn descending_multi_key_with_nulls() {
    let dir = TempDir::new().unwrap();
    let schema = int_schema("R", &["k", "v"]);
    let rows = random_rows(&mut Lcg::new(11), 120, 2, 5, 6);
    assert!(rows.iter().any(|t| t.value(0).unwrap().is_null()));

    let input = Box::new(Values::new(schema.clone(), rows.clone(), 24));
    let key = schema.attributes().to_vec();
    let mut sort =
        ExternalSort::new(input, &key, SortOrder::Descending, 3, fs_context(&dir, 24)).unwrap();
    let out = drain(&mut sort);

    assert!(is_sorted_on(&out, &[0, 1], SortOrder::Descending));
    assert_eq!(multiset(&out), multiset(&rows));
    // Nulls sort first ascending, so they come last here.
    let first_null = out.iter().position(|t| t.value(0).unwrap().is_null()).unwrap();
    assert!(out[first_null..].iter().all(|t| t.value(0).unwrap().is_null()));
}

#[test]
fn reopen_sorts_again() {
    let dir = TempDir::new().unwrap();
    let schema = int_schema("R", &["k"]);
    let rows = random_rows(&mut Lcg::new(3), 40, 1, 1000, 0);
    let input = Box::new(Values::new(schema.clone(), rows, 8));
    let key = schema.attributes().to_vec();
    let mut sort =
        ExternalSort::new(input, &key, SortOrder::Ascending, 2, fs_context(&dir, 8)).unwrap();

    let first = drain(&mut sort);
    let second = drain(&mut sort);
    assert_eq!(first, second);
    assert_eq!(first.len(), 40);
    assert!(files_under(dir.path()).is_empty());
}

#[cfg(feature = "zstd")]
#[test]
fn compressed_runs_sort_the_same() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("zstd").display().to_string();
    let spill = SpillManager::new(Arc::new(FsStorage::new()), Codec::Zstd, root);
    let ctx = OpContext::new(32, Arc::new(spill));

    let schema = int_schema("R", &["k", "v"]);
    let rows = random_rows(&mut Lcg::new(5), 200, 2, 20, 0);
    let input = Box::new(Values::new(schema.clone(), rows.clone(), 32));
    let key = [schema.attribute(0).unwrap().clone()];
    let mut sort = ExternalSort::new(input, &key, SortOrder::Ascending, 3, ctx).unwrap();
    let out = drain(&mut sort);
    assert!(is_sorted_on(&out, &[0], SortOrder::Ascending));
    assert_eq!(multiset(&out), multiset(&rows));
}
