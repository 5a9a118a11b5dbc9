//! Leaf operators: table scans and in-memory values.

use std::sync::Arc;

use qexec_core::batch::Batch;
use qexec_core::catalog::{Catalog, TableSource};
use qexec_core::schema::Schema;
use qexec_core::tuple::Tuple;

use crate::traits::{OpError, Operator};

/// Reads a base table through the catalog, one full page at a time.
pub struct Scan {
    table: String,
    catalog: Arc<dyn Catalog>,
    schema: Schema,
    capacity: usize,
    source: Option<Box<dyn TableSource>>,
}

impl Scan {
    pub fn new(catalog: Arc<dyn Catalog>, table: &str, page_size: usize) -> Result<Self, OpError> {
        let schema = catalog.schema(table)?;
        let capacity = Batch::capacity_for(page_size, schema.tuple_width());
        Ok(Self {
            table: table.to_string(),
            catalog,
            schema,
            capacity,
            source: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Operator for Scan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.source = Some(self.catalog.open_table(&self.table)?);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let mut page = Batch::new(self.capacity);
        while !page.is_full() {
            match source.next_tuple()? {
                Some(t) => page.push(t)?,
                None => {
                    self.source = None;
                    break;
                }
            }
        }
        Ok((!page.is_empty()).then_some(page))
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.source = None;
        Ok(())
    }
}

/// Fixed tuples held in memory, paged by the schema capacity.
pub struct Values {
    schema: Schema,
    rows: Vec<Tuple>,
    capacity: usize,
    pos: usize,
}

impl Values {
    pub fn new(schema: Schema, rows: Vec<Tuple>, page_size: usize) -> Self {
        let capacity = Batch::capacity_for(page_size, schema.tuple_width());
        Self {
            schema,
            rows,
            capacity,
            pos: 0,
        }
    }
}

impl Operator for Values {
    fn name(&self) -> &'static str {
        "values"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.pos = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        if self.pos >= self.rows.len() {
            return Ok(None);
        }
        let end = (self.pos + self.capacity).min(self.rows.len());
        let page = Batch::from_tuples(self.capacity, self.rows[self.pos..end].to_vec())?;
        self.pos = end;
        Ok(Some(page))
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.pos = self.rows.len();
        Ok(())
    }
}
