//! Column metadata and result schemas. Pure data; attached to every operator.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed byte width of an aggregated column.
pub const AGGREGATE_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Float,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AggKind {
    #[default]
    None,
    Max,
    Min,
    Sum,
    Count,
    Avg,
}

/// Direction of an ORDER BY / external sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A column of a (possibly derived) relation.
///
/// Identity is `table + column + agg`; type and width are descriptive only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub table: String,
    pub column: String,
    pub data_type: DataType,
    #[serde(default)]
    pub agg: AggKind,
    /// Byte width of one value of this column.
    pub width: usize,
}

impl Attribute {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        data_type: DataType,
        width: usize,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            data_type,
            agg: AggKind::None,
            width,
        }
    }

    pub fn with_agg(mut self, agg: AggKind) -> Self {
        self.agg = agg;
        self
    }

    /// The same column without any aggregate applied.
    pub fn base(&self) -> Attribute {
        Attribute {
            agg: AggKind::None,
            ..self.clone()
        }
    }

    /// Type of the value this attribute produces once its aggregate is applied.
    pub fn projected_type(&self) -> DataType {
        match self.agg {
            AggKind::None | AggKind::Max | AggKind::Min => self.data_type,
            AggKind::Count => DataType::Int,
            AggKind::Sum | AggKind::Avg => DataType::Float,
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.column == other.column && self.agg == other.agg
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.column.hash(state);
        self.agg.hash(state);
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.agg {
            AggKind::None => write!(f, "{}.{}", self.table, self.column),
            agg => write!(f, "{:?}({}.{})", agg, self.table, self.column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    attributes: Vec<Attribute>,
    tuple_width: usize,
}

impl Schema {
    /// Build a base-table schema; the tuple width is the sum of column widths.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let tuple_width = attributes.iter().map(|a| a.width).sum();
        Self {
            attributes,
            tuple_width,
        }
    }

    pub fn with_tuple_width(attributes: Vec<Attribute>, tuple_width: usize) -> Self {
        Self {
            attributes,
            tuple_width,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, idx: usize) -> Option<&Attribute> {
        self.attributes.get(idx)
    }

    pub fn num_columns(&self) -> usize {
        self.attributes.len()
    }

    /// Byte width of one tuple under this schema.
    pub fn tuple_width(&self) -> usize {
        self.tuple_width
    }

    pub fn index_of(&self, attr: &Attribute) -> Option<usize> {
        self.attributes.iter().position(|a| a == attr)
    }

    /// Like `index_of`, but a missing attribute is a schema error.
    pub fn require(&self, attr: &Attribute) -> Result<usize> {
        self.index_of(attr)
            .ok_or_else(|| Error::Schema(format!("attribute {attr} not in schema")))
    }

    pub fn contains(&self, attr: &Attribute) -> bool {
        self.index_of(attr).is_some()
    }

    /// Schema of a join result. Duplicate columns are not eliminated.
    pub fn join(&self, right: &Schema) -> Schema {
        let mut attributes = self.attributes.clone();
        attributes.extend(right.attributes.iter().cloned());
        Schema {
            attributes,
            tuple_width: self.tuple_width + right.tuple_width,
        }
    }

    /// Schema produced by projecting `projected` out of this schema.
    ///
    /// Each projected attribute is resolved against its base column here;
    /// aggregated columns occupy `AGGREGATE_WIDTH` bytes.
    pub fn sub_schema(&self, projected: &[Attribute]) -> Result<Schema> {
        let mut attributes = Vec::with_capacity(projected.len());
        let mut tuple_width = 0;
        for attr in projected {
            let idx = self.require(&attr.base())?;
            let resolved = self.attributes[idx].clone().with_agg(attr.agg);
            tuple_width += match resolved.agg {
                AggKind::None => resolved.width,
                _ => AGGREGATE_WIDTH,
            };
            attributes.push(resolved);
        }
        Ok(Schema {
            attributes,
            tuple_width,
        })
    }

    /// Union-compatibility check: same arity and same projected types.
    pub fn check_compat(&self, other: &Schema) -> bool {
        self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(&other.attributes)
                .all(|(a, b)| a.projected_type() == b.projected_type())
    }
}
