// In-memory image of a table file: a header plus equally wide rows.
use super::record::Record;
use super::value::Value;

/// Read access to one row's cells by column name.
pub trait Row {
    /// Absent columns read as `Null`.
    fn cell(&self, column: &str) -> &Value;
}

impl Row for Record {
    fn cell(&self, column: &str) -> &Value {
        self.value(column)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

#[derive(Clone, Copy, Debug)]
pub struct RowRef<'a> {
    table: &'a Table,
    index: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows shorter than the header are padded with `Null`; longer rows are truncated.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Returns the column position, appending it (and backfilling `Null`) when new.
    pub fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(index) = self.column_index(column) {
            return index;
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    pub fn push(&mut self, record: &Record) {
        for column in record.columns() {
            self.ensure_column(column);
        }
        let row = self
            .columns
            .iter()
            .map(|column| record.value(column).clone())
            .collect();
        self.rows.push(row);
    }

    pub fn set(&mut self, row: usize, column: &str, value: Value) {
        let index = self.ensure_column(column);
        self.rows[row][index] = value;
    }

    /// Apply every field of `updates` to each listed row.
    pub fn apply(&mut self, rows: &[usize], updates: &Record) {
        for (column, value) in updates.iter() {
            for &row in rows {
                self.set(row, column, value.clone());
            }
        }
    }

    /// Remove the listed rows; `positions` must be ascending.
    pub fn remove(&mut self, positions: &[usize]) -> usize {
        let mut next = positions.iter().peekable();
        let mut index = 0;
        self.rows.retain(|_| {
            let drop = next.peek().is_some_and(|&&pos| pos == index);
            if drop {
                next.next();
            }
            index += 1;
            !drop
        });
        positions.len()
    }

    pub fn row(&self, index: usize) -> RowRef<'_> {
        RowRef { table: self, index }
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.rows.len()).map(move |index| self.row(index))
    }

    pub fn records(&self) -> Vec<Record> {
        self.rows().map(|row| row.to_record()).collect()
    }
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn to_record(&self) -> Record {
        self.table
            .columns
            .iter()
            .zip(&self.table.rows[self.index])
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect()
    }
}

impl Row for RowRef<'_> {
    fn cell(&self, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        match self.table.column_index(column) {
            Some(at) => &self.table.rows[self.index][at],
            None => &NULL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Row, Table};
    use crate::core::record::Record;
    use crate::core::value::Value;

    #[test]
    fn push_widens_schema_and_backfills() {
        let mut table = Table::new();
        table.push(&Record::new().with("id", "A"));
        table.push(&Record::new().with("id", "B").with("extra", "v"));

        assert_eq!(table.columns(), ["id", "extra"]);
        assert_eq!(table.row(0).cell("extra"), &Value::Null);
        assert_eq!(table.row(1).cell("extra"), &Value::from("v"));
    }

    #[test]
    fn remove_drops_listed_rows_in_order() {
        let mut table = Table::new();
        for id in ["U1", "U2", "U3", "U4"] {
            table.push(&Record::new().with("id", id));
        }
        assert_eq!(table.remove(&[1, 3]), 2);
        let ids: Vec<_> = table
            .rows()
            .map(|row| row.cell("id").to_text().into_owned())
            .collect();
        assert_eq!(ids, vec!["U1", "U3"]);
    }

    #[test]
    fn from_parts_pads_short_rows() {
        let table = Table::from_parts(
            vec!["a".into(), "b".into()],
            vec![vec![Value::from("1")]],
        );
        assert_eq!(table.row(0).cell("b"), &Value::Null);
        assert_eq!(table.row(0).cell("nope"), &Value::Null);
    }
}
