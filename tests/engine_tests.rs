//! Whole-engine behaviour: configuration, storage selection, aggregation and
//! cleanup.

mod common;

use std::sync::Arc;

use common::{files_under, int_attr, int_schema, random_rows, Lcg};
use qexec_core::prelude::*;
use qexec_exec::{Engine, ExecError};
use qexec_io::{FsCatalog, MemoryCatalog, MemoryStorage};
use qexec_planner::{JoinAlgorithm, Plan};
use tempfile::TempDir;

fn emp_catalog() -> Arc<MemoryCatalog> {
    let schema = Schema::new(vec![
        Attribute::new("EMP", "id", DataType::Int, 4),
        Attribute::new("EMP", "name", DataType::Str, 12),
        Attribute::new("EMP", "salary", DataType::Float, 4),
    ]);
    let rows = [
        (1, "ann", Some(3000.0)),
        (2, "bob", Some(1000.0)),
        (3, "cy", None),
        (4, "dee", Some(2000.0)),
    ]
    .into_iter()
    .map(|(id, name, salary): (i32, &str, Option<f32>)| {
        Tuple::new(vec![
            Scalar::Int(id),
            Scalar::from(name),
            salary.map_or(Scalar::Null, Scalar::Float),
        ])
    })
    .collect();
    let catalog = MemoryCatalog::new();
    catalog.insert("EMP", schema, rows).unwrap();
    Arc::new(catalog)
}

fn memory_engine(catalog: Arc<MemoryCatalog>) -> Engine {
    let cfg = EngineConfig {
        page_size_bytes: 40,
        num_buffers: 4,
        spill_dir: "memory://engine".into(),
        ..EngineConfig::default()
    };
    Engine::with_default_storage(cfg, catalog).unwrap()
}

#[test]
fn aggregates_over_a_selection() {
    let engine = memory_engine(emp_catalog());
    let salary = Attribute::new("EMP", "salary", DataType::Float, 4);
    let plan = Plan::scan("EMP")
        .select(Condition::select(int_attr("EMP", "id"), CompareOp::Le, 3))
        .project(vec![
            salary.clone().with_agg(AggKind::Count),
            salary.clone().with_agg(AggKind::Max),
            salary.clone().with_agg(AggKind::Avg),
        ]);
    let out = engine.execute(&plan).unwrap();
    assert_eq!(out.tuples, 1);
    assert_eq!(out.schema.tuple_width(), 12);
    let row = out.into_tuples().remove(0);
    // Nulls are skipped by every aggregate.
    assert_eq!(row.value(0).unwrap(), &Scalar::Int(2));
    assert_eq!(row.value(1).unwrap(), &Scalar::Float(3000.0));
    assert_eq!(row.value(2).unwrap(), &Scalar::Float(2000.0));
}

#[test]
fn string_columns_sort_and_reject_arithmetic() {
    let engine = memory_engine(emp_catalog());
    let name = Attribute::new("EMP", "name", DataType::Str, 12);
    let plan = Plan::scan("EMP")
        .order_by(vec![name.clone()], SortOrder::Descending)
        .project(vec![name.clone()]);
    let names: Vec<String> = engine
        .execute(&plan)
        .unwrap()
        .rows()
        .map(|t| t.to_string())
        .collect();
    assert_eq!(names, ["dee", "cy", "bob", "ann"]);

    let sum = Plan::scan("EMP").project(vec![name.with_agg(AggKind::Sum)]);
    assert!(matches!(engine.build(&sum), Err(ExecError::Operator(_))));
}

#[test]
fn filesystem_spills_are_namespaced_and_cleaned() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(FsCatalog::new(dir.path().join("tables")));
    let rows = random_rows(&mut Lcg::new(1), 300, 2, 40, 0);
    catalog.write_table("R", &int_schema("R", &["k", "v"]), &rows).unwrap();
    catalog.write_table("S", &int_schema("S", &["k", "w"]), &rows[..120]).unwrap();

    let spill_dir = dir.path().join("spill");
    let cfg = EngineConfig {
        page_size_bytes: 32,
        num_buffers: 3,
        spill_dir: spill_dir.display().to_string(),
        ..EngineConfig::default()
    };
    let a = Engine::with_default_storage(cfg.clone(), catalog.clone()).unwrap();
    let b = Engine::with_default_storage(cfg, catalog).unwrap();
    assert_ne!(a.spill_root(), b.spill_root());
    assert!(a.spill_root().starts_with(&*spill_dir.display().to_string()));

    let plan = Plan::scan("R")
        .join(
            Plan::scan("S"),
            vec![Condition::equi_join(int_attr("R", "k"), int_attr("S", "k"))],
            JoinAlgorithm::SortMerge,
        )
        .distinct(vec![int_attr("R", "k")]);
    let from_a = a.execute(&plan).unwrap();
    let from_b = b.execute(&plan).unwrap();
    assert_eq!(from_a.pages, from_b.pages);
    assert!(from_a.tuples > 0 && from_a.tuples <= 40);
    assert!(files_under(&spill_dir).is_empty());
}

#[test]
fn bad_configuration_is_rejected() {
    let catalog = emp_catalog();
    let mut cfg = EngineConfig::new(0, 4);
    assert!(matches!(
        Engine::new(cfg.clone(), catalog.clone(), Arc::new(MemoryStorage::new())),
        Err(ExecError::Core(_))
    ));
    cfg.page_size_bytes = 64;
    cfg.spill_codec = "snappy".into();
    assert!(matches!(
        Engine::new(cfg, catalog, Arc::new(MemoryStorage::new())),
        Err(ExecError::Memory(_))
    ));
}

#[test]
fn unknown_tables_fail_at_build_time() {
    let engine = memory_engine(emp_catalog());
    assert!(engine.build(&Plan::scan("NOPE")).is_err());
    assert!(engine.estimate(&Plan::scan("NOPE")).is_err());
}
