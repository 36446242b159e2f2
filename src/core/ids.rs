//! Purpose: Prefix-based sequential identifier allocation.
//! Exports: `GeneratedId`, `IdSource`, `FallbackReason`, `next_sequential`, `random_fallback`.
//! Role: Computes ids from the current table contents; no counter is persisted.
//! Invariants: Next id = prefix + zero-padded (max numeric suffix + 1); unparseable suffixes are skipped.
//! Invariants: Fallback ids are prefix + 6 uppercase hex digits and always say why they were used.

use getrandom::fill as fill_random;

use super::error::{Error, ErrorKind};
use super::table::{Row, Table};

pub const DEFAULT_ID_WIDTH: usize = 3;
const FALLBACK_BYTES: usize = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FallbackReason {
    /// The table could not be read, so no maximum was known.
    ScanFailed,
    /// The sequential candidate was already present at write time.
    Collision,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdSource {
    Sequential,
    Fallback(FallbackReason),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedId {
    pub id: String,
    pub source: IdSource,
}

impl GeneratedId {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, IdSource::Fallback(_))
    }
}

/// `table` is `None` when the table file does not exist yet.
pub fn next_sequential(table: Option<&Table>, prefix: &str, id_column: &str, width: usize) -> String {
    let max = table
        .filter(|table| table.has_column(id_column))
        .and_then(|table| {
            table
                .rows()
                .filter_map(|row| parse_suffix(&row.cell(id_column).to_text(), prefix))
                .max()
        });
    let next = max.map_or(1, |max| max.saturating_add(1));
    format!("{prefix}{next:0width$}")
}

fn parse_suffix(id: &str, prefix: &str) -> Option<u64> {
    let suffix = id.strip_prefix(prefix)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

pub fn random_fallback(prefix: &str) -> Result<String, Error> {
    let mut bytes = [0u8; FALLBACK_BYTES];
    fill_random(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to generate random id suffix: {err}"))
    })?;
    let mut out = String::with_capacity(prefix.len() + FALLBACK_BYTES * 2);
    out.push_str(prefix);
    for byte in bytes {
        out.push(nibble_hex(byte >> 4));
        out.push(nibble_hex(byte & 0x0f));
    }
    Ok(out)
}

fn nibble_hex(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        _ => (b'A' + (nibble - 10)) as char,
    }
}

#[cfg(test)]
mod tests {
    use super::{next_sequential, parse_suffix, random_fallback};
    use crate::core::record::Record;
    use crate::core::table::Table;

    fn table_with(ids: &[&str]) -> Table {
        let mut table = Table::new();
        for id in ids {
            table.push(&Record::new().with("id", *id));
        }
        table
    }

    #[test]
    fn continues_after_the_highest_suffix() {
        let table = table_with(&["TRN001", "TRN005", "USR009"]);
        assert_eq!(next_sequential(Some(&table), "TRN", "id", 3), "TRN006");
    }

    #[test]
    fn starts_at_one_without_table_or_column() {
        assert_eq!(next_sequential(None, "TRN", "id", 3), "TRN001");
        let table = table_with(&["TRN004"]);
        assert_eq!(next_sequential(Some(&table), "TRN", "other_id", 3), "TRN001");
    }

    #[test]
    fn malformed_suffixes_are_skipped() {
        let table = table_with(&["TRN002", "TRNabc", "TRN", "TRN-9", "TRN+7", "TRN3x"]);
        assert_eq!(next_sequential(Some(&table), "TRN", "id", 3), "TRN003");
        assert_eq!(parse_suffix("TRN 5", "TRN"), None);
    }

    #[test]
    fn width_is_a_minimum() {
        let table = table_with(&["A999"]);
        assert_eq!(next_sequential(Some(&table), "A", "id", 3), "A1000");
        assert_eq!(next_sequential(None, "A", "id", 5), "A00001");
    }

    #[test]
    fn fallback_is_prefixed_uppercase_hex() {
        let id = random_fallback("TRN").expect("random");
        assert_eq!(id.len(), 9);
        assert!(id.starts_with("TRN"));
        assert!(id[3..].chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}
