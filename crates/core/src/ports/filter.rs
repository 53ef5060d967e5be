//! Storage-neutral filter predicates.
//!
//! The API layer builds a [`Filter`] from client input; storage adapters
//! either translate it to SQL or evaluate it against rows with
//! [`Filter::matches`]. Column names are static strings chosen by the API
//! layer, never client input.

use crate::models::{FieldValue, Record};

/// Predicate over the columns of one entity type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every row.
    #[default]
    All,
    Eq(&'static str, FieldValue),
    Neq(&'static str, FieldValue),
    In(&'static str, Vec<FieldValue>),
    Gt(&'static str, FieldValue),
    Gte(&'static str, FieldValue),
    Lt(&'static str, FieldValue),
    Lte(&'static str, FieldValue),
    /// Substring match on a text column.
    Contains(&'static str, String),
    /// Prefix match on a text column.
    HasPrefix(&'static str, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Conjunction of `filters`, collapsing trivial cases.
    pub fn all_of(filters: Vec<Filter>) -> Filter {
        let mut filters: Vec<Filter> = filters.into_iter().filter(|f| *f != Filter::All).collect();
        match filters.len() {
            0 => Filter::All,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        }
    }

    /// Evaluate against a row.
    ///
    /// Comparisons between values of different kinds never match.
    pub fn matches<R: Record>(&self, row: &R) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(col, v) => row.field(col).is_some_and(|f| &f == v),
            Filter::Neq(col, v) => row.field(col).is_some_and(|f| f.kind() == v.kind() && &f != v),
            Filter::In(col, vs) => row.field(col).is_some_and(|f| vs.contains(&f)),
            Filter::Gt(col, v) => compare(row, col, v, |f, v| f > v),
            Filter::Gte(col, v) => compare(row, col, v, |f, v| f >= v),
            Filter::Lt(col, v) => compare(row, col, v, |f, v| f < v),
            Filter::Lte(col, v) => compare(row, col, v, |f, v| f <= v),
            Filter::Contains(col, needle) => row
                .field(col)
                .is_some_and(|f| f.as_text().is_some_and(|s| s.contains(needle.as_str()))),
            Filter::HasPrefix(col, prefix) => row
                .field(col)
                .is_some_and(|f| f.as_text().is_some_and(|s| s.starts_with(prefix.as_str()))),
            Filter::And(fs) => fs.iter().all(|f| f.matches(row)),
            Filter::Or(fs) => fs.iter().any(|f| f.matches(row)),
            Filter::Not(f) => !f.matches(row),
        }
    }

    /// Every column referenced by this predicate.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<&'static str>) {
        match self {
            Filter::All => {}
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::In(c, _)
            | Filter::Gt(c, _)
            | Filter::Gte(c, _)
            | Filter::Lt(c, _)
            | Filter::Lte(c, _)
            | Filter::Contains(c, _)
            | Filter::HasPrefix(c, _) => out.push(*c),
            Filter::And(fs) | Filter::Or(fs) => fs.iter().for_each(|f| f.collect_columns(out)),
            Filter::Not(f) => f.collect_columns(out),
        }
    }
}

fn compare<R: Record>(
    row: &R,
    col: &str,
    v: &FieldValue,
    op: impl Fn(&FieldValue, &FieldValue) -> bool,
) -> bool {
    row.field(col)
        .is_some_and(|f| f.kind() == v.kind() && op(&f, v))
}
