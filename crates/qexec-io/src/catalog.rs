//! Table catalogs.
//!
//! `FsCatalog` reads a directory laid out as:
//! - `<table>.md`: the table schema as JSON
//! - `<table>.stat`: line 1 the tuple count, line 2 one distinct-value count
//!   per column (whitespace separated, schema order)
//! - `<table>.csv`: the rows, no header, empty cell = null
//!
//! `MemoryCatalog` keeps the same three things in maps, for tests.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use qexec_core::catalog::{Catalog, TableSource, TableStats};
use qexec_core::config::EngineConfig;
use qexec_core::error::{Error as CoreError, Result as CoreResult};
use qexec_core::schema::{DataType, Schema};
use qexec_core::tuple::Tuple;
use qexec_core::types::Scalar;

use crate::error::{Error, Result};

/// Catalog over `<table>.md/.stat/.csv` files in one directory.
#[derive(Debug, Clone)]
pub struct FsCatalog {
    dir: PathBuf,
}

impl FsCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(&cfg.table_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, table: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{table}.{ext}"))
    }

    fn read_schema(&self, table: &str) -> Result<Schema> {
        let path = self.file(table, "md");
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn read_stats(&self, table: &str) -> Result<TableStats> {
        let schema = self.read_schema(table)?;
        let path = self.file(table, "stat");
        let text = fs::read_to_string(&path)?;
        parse_stats(&text, schema.num_columns()).map_err(|reason| Error::Format {
            file: path.display().to_string(),
            reason,
        })
    }

    /// Write a table's schema, rows and freshly computed statistics.
    ///
    /// Loads fixtures for tests and benches; the engine itself never writes
    /// tables.
    pub fn write_table(&self, table: &str, schema: &Schema, rows: &[Tuple]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.file(table, "md"), serde_json::to_vec_pretty(schema)?)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(self.file(table, "csv"))?;
        for row in rows {
            writer.write_record(row.values().iter().map(cell))?;
        }
        writer.flush()?;

        let stats = compute_stats(schema, rows);
        fs::write(self.file(table, "stat"), format_stats(&stats))?;
        tracing::debug!(table, tuples = stats.tuples, dir = %self.dir.display(), "wrote table");
        Ok(())
    }
}

impl Catalog for FsCatalog {
    fn schema(&self, table: &str) -> CoreResult<Schema> {
        Ok(self.read_schema(table)?)
    }

    fn statistics(&self, table: &str) -> CoreResult<TableStats> {
        Ok(self.read_stats(table)?)
    }

    fn open_table(&self, table: &str) -> CoreResult<Box<dyn TableSource>> {
        let schema = self.read_schema(table)?;
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(self.file(table, "csv"))
            .map_err(Error::from)?;
        Ok(Box::new(CsvTableSource {
            types: schema.attributes().iter().map(|a| a.data_type).collect(),
            records: reader.into_records(),
        }))
    }
}

/// Streams typed tuples out of a headerless CSV file.
struct CsvTableSource {
    types: Vec<DataType>,
    records: csv::StringRecordsIntoIter<File>,
}

impl TableSource for CsvTableSource {
    fn next_tuple(&mut self) -> CoreResult<Option<Tuple>> {
        let Some(record) = self.records.next() else {
            return Ok(None);
        };
        let record = record.map_err(Error::from)?;
        if record.len() != self.types.len() {
            return Err(CoreError::Catalog(format!(
                "row has {} fields, schema has {}",
                record.len(),
                self.types.len()
            )));
        }
        let values = record
            .iter()
            .zip(&self.types)
            .map(|(text, &ty)| Scalar::parse(text, ty))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Some(Tuple::new(values)))
    }
}

fn cell(value: &Scalar) -> String {
    match value {
        Scalar::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_stats(text: &str, num_columns: usize) -> std::result::Result<TableStats, String> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let first: Vec<&str> = lines
        .next()
        .ok_or("missing tuple count line")?
        .split_whitespace()
        .collect();
    let [count] = first.as_slice() else {
        return Err(format!("expected one tuple count, found {} fields", first.len()));
    };
    let tuples = count
        .parse::<u64>()
        .map_err(|e| format!("tuple count '{count}': {e}"))?;

    let distinct = lines
        .next()
        .ok_or("missing distinct counts line")?
        .split_whitespace()
        .map(|f| f.parse::<u64>().map_err(|e| format!("distinct count '{f}': {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if distinct.len() != num_columns {
        return Err(format!(
            "expected {num_columns} distinct counts, found {}",
            distinct.len()
        ));
    }
    Ok(TableStats { tuples, distinct })
}

fn format_stats(stats: &TableStats) -> String {
    let distinct: Vec<String> = stats.distinct.iter().map(u64::to_string).collect();
    format!("{}\n{}\n", stats.tuples, distinct.join(" "))
}

/// Exact statistics of an in-memory row set. Nulls are not counted as a
/// distinct value.
pub fn compute_stats(schema: &Schema, rows: &[Tuple]) -> TableStats {
    let distinct = (0..schema.num_columns())
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.values().get(col))
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
                .collect::<HashSet<_>>()
                .len() as u64
        })
        .collect();
    TableStats {
        tuples: rows.len() as u64,
        distinct,
    }
}

struct MemTable {
    schema: Schema,
    stats: TableStats,
    rows: Arc<Vec<Tuple>>,
}

/// Catalog held entirely in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table; statistics are computed from the rows.
    pub fn insert(&self, table: &str, schema: Schema, rows: Vec<Tuple>) -> Result<()> {
        let stats = compute_stats(&schema, &rows);
        self.insert_with_stats(table, schema, rows, stats)
    }

    /// Register a table with explicit statistics (they need not match the rows).
    pub fn insert_with_stats(
        &self,
        table: &str,
        schema: Schema,
        rows: Vec<Tuple>,
        stats: TableStats,
    ) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| Error::Config("memory catalog lock poisoned".into()))?;
        tables.insert(
            table.to_string(),
            MemTable {
                schema,
                stats,
                rows: Arc::new(rows),
            },
        );
        Ok(())
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&MemTable) -> T) -> CoreResult<T> {
        let tables = self
            .tables
            .read()
            .map_err(|_| CoreError::Catalog("memory catalog lock poisoned".into()))?;
        tables
            .get(table)
            .map(f)
            .ok_or_else(|| CoreError::Catalog(format!("unknown table '{table}'")))
    }
}

impl Catalog for MemoryCatalog {
    fn schema(&self, table: &str) -> CoreResult<Schema> {
        self.with_table(table, |t| t.schema.clone())
    }

    fn statistics(&self, table: &str) -> CoreResult<TableStats> {
        self.with_table(table, |t| t.stats.clone())
    }

    fn open_table(&self, table: &str) -> CoreResult<Box<dyn TableSource>> {
        let rows = self.with_table(table, |t| Arc::clone(&t.rows))?;
        Ok(Box::new(RowsSource { rows, next: 0 }))
    }
}

struct RowsSource {
    rows: Arc<Vec<Tuple>>,
    next: usize,
}

impl TableSource for RowsSource {
    fn next_tuple(&mut self) -> CoreResult<Option<Tuple>> {
        let row = self.rows.get(self.next).cloned();
        if row.is_some() {
            self.next += 1;
        }
        Ok(row)
    }
}
