use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use qexec_core::prelude::*;
use qexec_io::MemoryStorage;
use qexec_mem::{Codec, SpillManager};
use qexec_operators::{
    BoxedOperator, ExternalSort, NestedLoopJoin, OpContext, Operator, SortMergeJoin, Values,
};

const PAGE_SIZE: usize = 256;

fn schema(table: &str) -> Schema {
    Schema::new(vec![
        Attribute::new(table, "k", DataType::Int, 4),
        Attribute::new(table, "v", DataType::Int, 4),
    ])
}

fn rows(n: usize, keys: i32) -> Vec<Tuple> {
    // Multiplicative scramble keeps the input unsorted without a RNG.
    (0..n as i64)
        .map(|i| {
            let k = ((i * 2_654_435_761) % keys as i64) as i32;
            Tuple::new(vec![Scalar::Int(k), Scalar::Int(i as i32)])
        })
        .collect()
}

fn context() -> OpContext {
    let spill = SpillManager::new(Arc::new(MemoryStorage::new()), Codec::None, "memory://bench");
    OpContext::new(PAGE_SIZE, Arc::new(spill))
}

fn values(table: &str, rows: &[Tuple]) -> BoxedOperator {
    Box::new(Values::new(schema(table), rows.to_vec(), PAGE_SIZE))
}

fn drain(op: &mut dyn Operator) -> usize {
    op.open().unwrap();
    let mut n = 0;
    while let Some(page) = op.next().unwrap() {
        n += page.len();
    }
    op.close().unwrap();
    n
}

fn bench_external_sort(c: &mut Criterion) {
    let input = rows(20_000, 5_000);
    let key = [Attribute::new("R", "k", DataType::Int, 4)];
    let mut group = c.benchmark_group("external_sort");
    for buffers in [3, 16, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(buffers), &buffers, |b, &buffers| {
            b.iter(|| {
                let mut sort = ExternalSort::new(
                    values("R", &input),
                    &key,
                    SortOrder::Ascending,
                    buffers,
                    context(),
                )
                .unwrap();
                drain(&mut sort)
            })
        });
    }
    group.finish();
}

fn bench_joins(c: &mut Criterion) {
    let left = rows(2_000, 500);
    let right = rows(1_000, 500);
    let cond = [Condition::equi_join(
        Attribute::new("L", "k", DataType::Int, 4),
        Attribute::new("R", "k", DataType::Int, 4),
    )];
    let mut group = c.benchmark_group("join");
    group.bench_function("block_nested", |b| {
        b.iter(|| {
            let mut join =
                NestedLoopJoin::block(values("L", &left), values("R", &right), &cond, 16, context())
                    .unwrap();
            drain(&mut join)
        })
    });
    group.bench_function("sort_merge", |b| {
        b.iter(|| {
            let mut join =
                SortMergeJoin::new(values("L", &left), values("R", &right), &cond, 16, context())
                    .unwrap();
            drain(&mut join)
        })
    });
    group.finish();
}

criterion_group!(operators, bench_external_sort, bench_joins);
criterion_main!(operators);
