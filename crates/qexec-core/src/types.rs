//! Scalar values carried by tuples.
//!
//! A value slot holds one of three runtime types (or nothing). Comparisons are
//! only defined between values of the same type; anything else is reported as
//! a typed error instead of being coerced.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Int(i32),
    Float(f32),
    Str(String),
}

impl Scalar {
    /// Runtime type of the value; `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Scalar::Null => None,
            Scalar::Int(_) => Some(DataType::Int),
            Scalar::Float(_) => Some(DataType::Float),
            Scalar::Str(_) => Some(DataType::Str),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Typed comparison.
    ///
    /// Nulls compare equal to each other and sort before every value. Two
    /// non-null values of different types are a `TypeMismatch`.
    pub fn try_cmp(&self, other: &Scalar) -> Result<Ordering> {
        use Scalar::*;
        match (self, other) {
            (Null, Null) => Ok(Ordering::Equal),
            (Null, _) => Ok(Ordering::Less),
            (_, Null) => Ok(Ordering::Greater),
            (Int(a), Int(b)) => Ok(a.cmp(b)),
            (Float(a), Float(b)) => Ok(a.total_cmp(b)),
            (Str(a), Str(b)) => Ok(a.cmp(b)),
            (a, b) => Err(Error::TypeMismatch {
                left: a.data_type().unwrap_or(DataType::Str),
                right: b.data_type().unwrap_or(DataType::Str),
            }),
        }
    }

    /// Numeric view used by aggregates. Strings are a type error.
    pub fn as_f64(&self) -> Result<Option<f64>> {
        match self {
            Scalar::Null => Ok(None),
            Scalar::Int(v) => Ok(Some(f64::from(*v))),
            Scalar::Float(v) => Ok(Some(f64::from(*v))),
            Scalar::Str(s) => Err(Error::Type(format!(
                "expected a numeric value, found string '{s}'"
            ))),
        }
    }

    /// Parse a textual field (CSV cell, literal) into a value of `data_type`.
    /// An empty field is `Null`.
    pub fn parse(text: &str, data_type: DataType) -> Result<Scalar> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Scalar::Null);
        }
        match data_type {
            DataType::Int => text
                .parse::<i32>()
                .map(Scalar::Int)
                .map_err(|_| Error::Type(format!("cannot parse '{text}' as int"))),
            DataType::Float => text
                .parse::<f32>()
                .map(Scalar::Float)
                .map_err(|_| Error::Type(format!("cannot parse '{text}' as float"))),
            DataType::Str => Ok(Scalar::Str(text.to_string())),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "NULL"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_type_comparisons() {
        assert_eq!(
            Scalar::Int(1).try_cmp(&Scalar::Int(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Scalar::Str("b".into()).try_cmp(&Scalar::Str("a".into())).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Scalar::Float(1.5).try_cmp(&Scalar::Float(1.5)).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn nulls_sort_first() {
        assert_eq!(Scalar::Null.try_cmp(&Scalar::Int(-5)).unwrap(), Ordering::Less);
        assert_eq!(Scalar::Str("x".into()).try_cmp(&Scalar::Null).unwrap(), Ordering::Greater);
        assert_eq!(Scalar::Null.try_cmp(&Scalar::Null).unwrap(), Ordering::Equal);
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let err = Scalar::Int(1).try_cmp(&Scalar::Float(1.0)).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                left: DataType::Int,
                right: DataType::Float
            }
        ));
        assert!(Scalar::Str("1".into()).try_cmp(&Scalar::Int(1)).is_err());
    }

    #[test]
    fn parse_fields() {
        assert_eq!(Scalar::parse(" 42 ", DataType::Int).unwrap(), Scalar::Int(42));
        assert_eq!(Scalar::parse("", DataType::Float).unwrap(), Scalar::Null);
        assert!(Scalar::parse("abc", DataType::Int).is_err());
    }

    #[test]
    fn strings_are_not_numeric() {
        assert!(Scalar::Str("7".into()).as_f64().is_err());
        assert_eq!(Scalar::Int(7).as_f64().unwrap(), Some(7.0));
        assert_eq!(Scalar::Null.as_f64().unwrap(), None);
    }
}
