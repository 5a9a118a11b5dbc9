//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::path::Path;

use qexec_core::prelude::*;
use qexec_operators::Operator;

/// Small deterministic generator so every run sees the same data.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Uniform in `0..n`.
    pub fn below(&mut self, n: u32) -> i32 {
        (self.next_u32() % n) as i32
    }
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

/// `n` rows of `width` int columns. Column 0 draws from `0..keys` and is
/// null with probability `1/null_every` (never when `null_every` is 0).
pub fn random_rows(rng: &mut Lcg, n: usize, width: usize, keys: u32, null_every: u32) -> Vec<Tuple> {
    (0..n)
        .map(|i| {
            let mut values = Vec::with_capacity(width);
            let key = if null_every > 0 && rng.below(null_every) == 0 {
                Scalar::Null
            } else {
                Scalar::Int(rng.below(keys))
            };
            values.push(key);
            for c in 1..width {
                values.push(Scalar::Int((i * width + c) as i32));
            }
            Tuple::new(values)
        })
        .collect()
}

/// Open, drain and close an operator.
pub fn drain(op: &mut dyn Operator) -> Vec<Tuple> {
    op.open().unwrap();
    let mut out = Vec::new();
    while let Some(page) = op.next().unwrap() {
        assert!(!page.is_empty(), "{} returned an empty page", op.name());
        out.extend(page.into_tuples());
    }
    assert!(op.next().unwrap().is_none());
    op.close().unwrap();
    out
}

/// Order-insensitive view of a tuple multiset.
pub fn multiset(tuples: &[Tuple]) -> Vec<String> {
    let mut out: Vec<String> = tuples.iter().map(|t| t.to_string()).collect();
    out.sort();
    out
}

/// Equi-join of `left` and `right` on single columns by brute force.
pub fn nested_join(left: &[Tuple], right: &[Tuple], l: usize, r: usize) -> Vec<Tuple> {
    let mut out = Vec::new();
    for lt in left {
        for rt in right {
            if lt.join_matches(rt, &[l], &[r]).unwrap() {
                out.push(lt.join(rt));
            }
        }
    }
    out
}

pub fn is_sorted_on(tuples: &[Tuple], columns: &[usize], order: SortOrder) -> bool {
    tuples.windows(2).all(|w| {
        let ord = w[0].compare_on(&w[1], columns).unwrap();
        match order {
            SortOrder::Ascending => ord != Ordering::Greater,
            SortOrder::Descending => ord != Ordering::Less,
        }
    })
}

/// Regular files left anywhere under `dir`.
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(files_under(&path));
        } else {
            out.push(path.display().to_string());
        }
    }
    out
}
