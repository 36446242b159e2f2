//! Purpose: Encode and decode the on-disk table text format.
//! Exports: `decode`, `encode`, `scan`.
//! Role: Only place that knows tables are CSV; the store deals in `Table` values.
//! Invariants: First line is the header; `Null` is an empty field; no type metadata is written.
//! Invariants: Short rows decode permissively (trailing `Null`); long rows are `Corrupt`.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::error::{Error, ErrorKind};
use super::table::Table;
use super::value::Value;

/// Raw shape of one decoded line, kept for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineShape {
    pub line: u64,
    pub fields: usize,
}

/// Header plus per-line field counts, without enforcing widths.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scan {
    pub columns: Vec<String>,
    pub lines: Vec<LineShape>,
}

pub fn decode(bytes: &[u8], path: &Path) -> Result<Table, Error> {
    let mut reader = reader(bytes);
    let columns = header(&mut reader, path)?;

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(err) => return Err(csv_error(err, path)),
        }
        if record.len() > columns.len() {
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!(
                    "line {line} has {} fields but the header has {}",
                    record.len(),
                    columns.len()
                ))
                .with_path(path)
                .with_hint("Inspect the file with `flatstore doctor <table>`."));
        }
        rows.push(record.iter().map(Value::from_field).collect());
    }

    Ok(Table::from_parts(columns, rows))
}

pub fn encode(table: &Table) -> Result<Vec<u8>, Error> {
    let mut writer = WriterBuilder::new().flexible(false).from_writer(Vec::new());
    if !table.columns().is_empty() {
        writer
            .write_record(table.columns())
            .map_err(|err| encode_error(err.to_string()))?;
        for row in table.raw_rows() {
            writer
                .write_record(row.iter().map(|value| value.to_text().into_owned()))
                .map_err(|err| encode_error(err.to_string()))?;
        }
    }
    writer
        .into_inner()
        .map_err(|err| encode_error(err.to_string()))
}

/// Lenient pass used by the doctor: never fails on width mismatches.
pub fn scan(bytes: &[u8], path: &Path) -> Result<Scan, Error> {
    let mut reader = reader(bytes);
    let columns = header(&mut reader, path)?;

    let mut lines = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(err) => return Err(csv_error(err, path)),
        }
        lines.push(LineShape {
            line: record.position().map(|pos| pos.line()).unwrap_or_default(),
            fields: record.len(),
        });
    }

    Ok(Scan { columns, lines })
}

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes)
}

fn header(reader: &mut csv::Reader<&[u8]>, path: &Path) -> Result<Vec<String>, Error> {
    let headers = reader.headers().map_err(|err| csv_error(err, path))?;
    Ok(headers.iter().map(str::to_string).collect())
}

fn csv_error(err: csv::Error, path: &Path) -> Error {
    let kind = match err.kind() {
        csv::ErrorKind::Io(_) => ErrorKind::Io,
        _ => ErrorKind::Corrupt,
    };
    Error::new(kind)
        .with_message("failed to decode table")
        .with_path(path)
        .with_source(err)
}

fn encode_error(message: String) -> Error {
    Error::new(ErrorKind::Internal).with_message(format!("failed to encode table: {message}"))
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, scan};
    use crate::core::error::ErrorKind;
    use crate::core::record::Record;
    use crate::core::table::{Row, Table};
    use crate::core::value::Value;
    use std::path::Path;

    fn path() -> &'static Path {
        Path::new("t.csv")
    }

    #[test]
    fn encodes_header_nulls_and_lowercase_bools() {
        let mut table = Table::new();
        table.push(
            &Record::new()
                .with("id", "X1")
                .with("n", 1)
                .with("s", "hi, there")
                .with("b", true),
        );
        table.push(&Record::new().with("id", "X2"));

        let text = String::from_utf8(encode(&table).expect("encode")).expect("utf8");
        assert_eq!(text, "id,n,s,b\nX1,1,\"hi, there\",true\nX2,,,\n");
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_rejected() {
        let table = decode(b"id,a,b\nX1,1\n", path()).expect("decode");
        assert_eq!(table.row(0).cell("a"), &Value::from("1"));
        assert_eq!(table.row(0).cell("b"), &Value::Null);

        let err = decode(b"id,a\nX1,1,2\n", path()).expect_err("long row");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn empty_input_is_an_empty_table() {
        let table = decode(b"", path()).expect("decode");
        assert!(table.columns().is_empty());
        assert!(table.is_empty());
        assert!(encode(&table).expect("encode").is_empty());
    }

    #[test]
    fn quoted_newlines_survive() {
        let mut table = Table::new();
        table.push(&Record::new().with("id", "Q").with("body", "line one\nline two"));
        let bytes = encode(&table).expect("encode");
        let decoded = decode(&bytes, path()).expect("decode");
        assert_eq!(decoded.row(0).cell("body"), &Value::from("line one\nline two"));
    }

    #[test]
    fn scan_reports_widths_without_failing() {
        let shape = scan(b"id,a\nX1,1,2\nX2\n", path()).expect("scan");
        assert_eq!(shape.columns, vec!["id", "a"]);
        let widths: Vec<_> = shape.lines.iter().map(|line| line.fields).collect();
        assert_eq!(widths, vec![3, 1]);
    }
}
