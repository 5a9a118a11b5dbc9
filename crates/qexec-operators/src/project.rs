//! Projection, with whole-input aggregation when the projected attributes
//! carry aggregate functions.

use std::cmp::Ordering;

use qexec_core::batch::Batch;
use qexec_core::schema::{AggKind, Attribute, DataType, Schema};
use qexec_core::tuple::Tuple;
use qexec_core::types::Scalar;

use crate::stream::TupleStream;
use crate::traits::{BoxedOperator, OpError, Operator};

pub struct Project {
    child: BoxedOperator,
    schema: Schema,
    indices: Vec<usize>,
    aggs: Vec<AggKind>,
    aggregated: bool,
    capacity: usize,
    input: TupleStream,
    emitted: bool,
}

impl Project {
    pub fn new(child: BoxedOperator, attrs: Vec<Attribute>, page_size: usize) -> Result<Self, OpError> {
        let input = child.schema();
        let schema = input.sub_schema(&attrs)?;
        let indices = attrs
            .iter()
            .map(|a| input.require(&a.base()))
            .collect::<qexec_core::Result<Vec<_>>>()?;

        let aggs: Vec<AggKind> = attrs.iter().map(|a| a.agg).collect();
        let aggregated = aggs.iter().any(|&a| a != AggKind::None);
        if aggregated && aggs.contains(&AggKind::None) {
            return Err(OpError::Plan(
                "cannot mix aggregated and plain columns without grouping".into(),
            ));
        }
        for attr in schema.attributes() {
            if attr.data_type == DataType::Str && !matches!(attr.agg, AggKind::None | AggKind::Count) {
                return Err(qexec_core::Error::Type(format!("cannot aggregate string column {attr}")).into());
            }
        }

        let capacity = Batch::capacity_for(page_size, schema.tuple_width());
        Ok(Self {
            child,
            schema,
            indices,
            aggs,
            aggregated,
            capacity,
            input: TupleStream::new(),
            emitted: false,
        })
    }

    fn next_projected(&mut self) -> Result<Option<Batch>, OpError> {
        let mut out = Batch::new(self.capacity);
        while !out.is_full() {
            let Some(tuple) = self.input.next_tuple(self.child.as_mut())? else {
                break;
            };
            out.push(tuple.project(&self.indices)?)?;
        }
        Ok((!out.is_empty()).then_some(out))
    }

    fn next_aggregated(&mut self) -> Result<Option<Batch>, OpError> {
        if self.emitted {
            return Ok(None);
        }
        let mut accs: Vec<Accumulator> = self.aggs.iter().map(|&a| Accumulator::new(a)).collect();
        while let Some(tuple) = self.input.next_tuple(self.child.as_mut())? {
            for (acc, &idx) in accs.iter_mut().zip(&self.indices) {
                acc.update(tuple.value(idx)?)?;
            }
        }
        self.emitted = true;
        let row = Tuple::new(accs.into_iter().map(Accumulator::finish).collect());
        Ok(Some(Batch::from_tuples(self.capacity, vec![row])?))
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&mut self) -> Result<(), OpError> {
        self.input.reset();
        self.emitted = false;
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Batch>, OpError> {
        if self.aggregated {
            self.next_aggregated()
        } else {
            self.next_projected()
        }
    }

    fn close(&mut self) -> Result<(), OpError> {
        self.child.close()
    }
}

/// Running state of one aggregated column. Nulls are skipped.
enum Accumulator {
    Extreme { keep: Ordering, best: Option<Scalar> },
    Sum(Option<f64>),
    Count(i32),
    Avg { sum: f64, n: u64 },
}

impl Accumulator {
    fn new(agg: AggKind) -> Self {
        match agg {
            AggKind::Max => Accumulator::Extreme {
                keep: Ordering::Greater,
                best: None,
            },
            AggKind::Min => Accumulator::Extreme {
                keep: Ordering::Less,
                best: None,
            },
            AggKind::Sum => Accumulator::Sum(None),
            AggKind::Count | AggKind::None => Accumulator::Count(0),
            AggKind::Avg => Accumulator::Avg { sum: 0.0, n: 0 },
        }
    }

    fn update(&mut self, value: &Scalar) -> Result<(), OpError> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Accumulator::Extreme { keep, best } => {
                let replace = match best {
                    None => true,
                    Some(b) => value.try_cmp(b)? == *keep,
                };
                if replace {
                    *best = Some(value.clone());
                }
            }
            Accumulator::Sum(total) => {
                let v = value.as_f64()?.unwrap_or(0.0);
                *total = Some(total.unwrap_or(0.0) + v);
            }
            Accumulator::Count(n) => *n += 1,
            Accumulator::Avg { sum, n } => {
                *sum += value.as_f64()?.unwrap_or(0.0);
                *n += 1;
            }
        }
        Ok(())
    }

    fn finish(self) -> Scalar {
        match self {
            Accumulator::Extreme { best, .. } => best.unwrap_or(Scalar::Null),
            Accumulator::Sum(total) => total.map_or(Scalar::Null, |t| Scalar::Float(t as f32)),
            Accumulator::Count(n) => Scalar::Int(n),
            Accumulator::Avg { n: 0, .. } => Scalar::Null,
            Accumulator::Avg { sum, n } => Scalar::Float((sum / n as f64) as f32),
        }
    }
}
