//! Purpose: Linear-scan predicate matching over rows.
//! Exports: `Predicate`.
//! Role: Shared by find/count/exists and the by-id and by-condition mutation paths.
//! Invariants: Matching is a conjunction of canonical-text equalities; no ranges, no OR.
//! Invariants: Pure: never touches files; callers hold whatever lock they need.
//! Invariants: Id predicates never match an empty or absent cell, whatever the id value.
//! Notes: A term naming a column the table lacks compares against `Null`, so it narrows the
//! result instead of being skipped; `{"x": "v"}` on a table without `x` matches nothing.

use super::record::Record;
use super::table::{Row, Table};
use super::value::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, Value)>,
    skip_empty_cells: bool,
}

impl Predicate {
    /// Matches every row.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::any().and(column, value)
    }

    /// Identity lookup: like `eq`, but rows whose `column` is empty or null never match,
    /// so an empty id cannot select id-less rows.
    pub fn id(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            skip_empty_cells: true,
            ..Self::eq(column, value)
        }
    }

    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches<R: Row + ?Sized>(&self, row: &R) -> bool {
        self.terms
            .iter()
            .all(|(column, value)| {
                let cell = row.cell(column);
                !(self.skip_empty_cells && cell.to_text().is_empty()) && cell.text_eq(value)
            })
    }

    /// Row positions in `table` that satisfy the predicate, ascending.
    pub fn positions(&self, table: &Table) -> Vec<usize> {
        table
            .rows()
            .filter(|row| self.matches(row))
            .map(|row| row.index())
            .collect()
    }

    pub fn filter(&self, table: &Table) -> Vec<Record> {
        table
            .rows()
            .filter(|row| self.matches(row))
            .map(|row| row.to_record())
            .collect()
    }

    pub fn first(&self, table: &Table) -> Option<Record> {
        table
            .rows()
            .find(|row| self.matches(row))
            .map(|row| row.to_record())
    }

    pub fn count(&self, table: &Table) -> usize {
        table.rows().filter(|row| self.matches(row)).count()
    }
}

impl From<Record> for Predicate {
    fn from(record: Record) -> Self {
        Self {
            terms: record.into_iter().collect(),
            skip_empty_cells: false,
        }
    }
}

impl From<&Record> for Predicate {
    fn from(record: &Record) -> Self {
        Self {
            terms: record
                .iter()
                .map(|(column, value)| (column.to_string(), value.clone()))
                .collect(),
            skip_empty_cells: false,
        }
    }
}
