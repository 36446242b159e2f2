//! Purpose: Read-only diagnostics for a single table file.
//! Exports: `ValidationReport`, `ValidationStatus`, `ValidationIssue`, `Severity`, `validate_table`.
//! Role: Backs `Store::validate` and `flatstore doctor`.
//! Invariants: Never mutates the table or its directory; orphaned staging files are reported only.
//! Invariants: Status is `Corrupt` iff at least one issue has `Severity::Error`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::atomic::{TEMP_SUFFIX, temp_prefix};
use super::codec;
use super::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationStatus {
    Ok,
    Corrupt,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationIssue {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub line: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationReport {
    pub table: String,
    pub path: PathBuf,
    pub exists: bool,
    pub status: ValidationStatus,
    pub column_count: usize,
    pub row_count: usize,
    pub orphaned_temp_files: Vec<PathBuf>,
    pub issues: Vec<ValidationIssue>,
    pub remediation_hints: Vec<String>,
}

impl ValidationReport {
    fn new(table: &str, path: &Path) -> Self {
        Self {
            table: table.to_string(),
            path: path.to_path_buf(),
            exists: false,
            status: ValidationStatus::Ok,
            column_count: 0,
            row_count: 0,
            orphaned_temp_files: Vec::new(),
            issues: Vec::new(),
            remediation_hints: Vec::new(),
        }
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    fn push(&mut self, code: &str, severity: Severity, message: String, line: Option<u64>) {
        self.issues.push(ValidationIssue {
            code: code.to_string(),
            severity,
            message,
            line,
        });
        if severity == Severity::Error {
            self.status = ValidationStatus::Corrupt;
        }
    }

    fn hint(&mut self, hint: &str) {
        if !self.remediation_hints.iter().any(|existing| existing == hint) {
            self.remediation_hints.push(hint.to_string());
        }
    }
}

/// Caller is expected to hold the table lock so the file is not replaced mid-scan.
pub fn validate_table(table: &str, path: &Path) -> Result<ValidationReport, Error> {
    let mut report = ValidationReport::new(table, path);
    report.orphaned_temp_files = orphaned_temp_files(path)?;
    if !report.orphaned_temp_files.is_empty() {
        report.push(
            "orphaned_temp_file",
            Severity::Warning,
            format!(
                "{} staging file(s) left behind by interrupted writes",
                report.orphaned_temp_files.len()
            ),
            None,
        );
        report.hint("Staging files are ignored by readers; delete them once no writer is running.");
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(report),
        Err(err) => {
            return Err(Error::io(err)
                .with_message("failed to read table")
                .with_path(path));
        }
    };
    report.exists = true;

    let scan = match codec::scan(&bytes, path) {
        Ok(scan) => scan,
        Err(err) if err.kind() == ErrorKind::Corrupt => {
            report.push("undecodable", Severity::Error, err.to_string(), None);
            report.hint("The file is not valid CSV; restore it from a backup.");
            return Ok(report);
        }
        Err(err) => return Err(err),
    };

    report.column_count = scan.columns.len();
    report.row_count = scan.lines.len();

    for (at, column) in scan.columns.iter().enumerate() {
        if column.is_empty() {
            report.push(
                "empty_column_name",
                Severity::Error,
                format!("header column {} has no name", at + 1),
                Some(1),
            );
        } else if scan.columns[..at].contains(column) {
            report.push(
                "duplicate_column",
                Severity::Error,
                format!("column `{column}` appears more than once in the header"),
                Some(1),
            );
        }
    }

    for shape in &scan.lines {
        if shape.fields > scan.columns.len() {
            report.push(
                "long_row",
                Severity::Error,
                format!(
                    "row has {} fields but the header has {}",
                    shape.fields,
                    scan.columns.len()
                ),
                Some(shape.line),
            );
            report.hint("Rows wider than the header make the table unreadable; fix or remove them.");
        } else if shape.fields < scan.columns.len() {
            report.push(
                "short_row",
                Severity::Warning,
                format!(
                    "row has {} fields; missing trailing fields read as null",
                    shape.fields
                ),
                Some(shape.line),
            );
        }
    }

    Ok(report)
}

fn orphaned_temp_files(path: &Path) -> Result<Vec<PathBuf>, Error> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(Error::io(err)
                .with_message("failed to list data directory")
                .with_path(dir));
        }
    };
    let prefix = temp_prefix(path);
    let mut orphans: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(&prefix) && name.ends_with(TEMP_SUFFIX)
        })
        .map(|entry| entry.path())
        .collect();
    orphans.sort();
    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use super::{Severity, ValidationStatus, validate_table};
    use std::fs;

    #[test]
    fn missing_table_is_ok_and_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = validate_table("t", &dir.path().join("t.csv")).expect("validate");
        assert!(!report.exists);
        assert_eq!(report.status, ValidationStatus::Ok);
    }

    #[test]
    fn long_rows_and_duplicate_columns_are_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t.csv");
        fs::write(&path, "id,a,a\nX1,1,2,3\nX2\n").expect("write");

        let report = validate_table("t", &path).expect("validate");
        assert_eq!(report.status, ValidationStatus::Corrupt);
        assert_eq!(report.row_count, 2);
        let codes: Vec<_> = report.issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["duplicate_column", "long_row", "short_row"]);
        assert_eq!(report.issues[2].severity, Severity::Warning);
    }

    #[test]
    fn orphaned_staging_files_are_reported_not_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t.csv");
        fs::write(&path, "id\nX1\n").expect("write");
        let orphan = dir.path().join(".t.csv.abc123.tmp");
        fs::write(&orphan, "id\nX1\nX2").expect("write orphan");
        fs::write(dir.path().join(".other.csv.zzz.tmp"), "").expect("write other");

        let report = validate_table("t", &path).expect("validate");
        assert_eq!(report.status, ValidationStatus::Ok);
        assert_eq!(report.orphaned_temp_files, vec![orphan.clone()]);
        assert_eq!(report.issue_count(), 1);
        assert!(orphan.exists());
    }
}
