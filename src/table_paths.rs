//! Purpose: Data-directory and table-name path resolution helpers.
//! Exports: `default_data_dir`, `normalize_table_name`, `table_file_path`.
//! Role: Keep CLI and library table naming aligned from one source.
//! Invariants: Default data directory is `$FLATSTORE_DIR`, else `data/csv`.
//! Invariants: Table names never contain path separators and never start with `.`.

use std::path::{Path, PathBuf};

pub const TABLE_EXTENSION: &str = "csv";
pub const DATA_DIR_ENV: &str = "FLATSTORE_DIR";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TableNameError {
    Empty,
    ContainsPathSeparator,
    /// Leading `.` is reserved for staging files.
    Hidden,
}

impl TableNameError {
    pub fn describe(self) -> &'static str {
        match self {
            TableNameError::Empty => "table name is empty",
            TableNameError::ContainsPathSeparator => "table name contains a path separator",
            TableNameError::Hidden => "table name starts with '.'",
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("data").join("csv"),
    }
}

/// Accepts `users` or `users.csv`; returns `users`.
pub fn normalize_table_name(name: &str) -> Result<&str, TableNameError> {
    let name = name
        .strip_suffix(".csv")
        .filter(|stem| !stem.is_empty())
        .unwrap_or(name);
    if name.is_empty() {
        return Err(TableNameError::Empty);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(TableNameError::ContainsPathSeparator);
    }
    if name.starts_with('.') {
        return Err(TableNameError::Hidden);
    }
    Ok(name)
}

/// File for an already normalized table name.
pub fn table_file_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{name}.{TABLE_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::{TableNameError, normalize_table_name, table_file_path};
    use std::path::Path;

    #[test]
    fn names_map_to_csv_files() {
        let dir = Path::new("/data");
        for name in ["users", "users.csv"] {
            let name = normalize_table_name(name).expect("valid name");
            assert_eq!(table_file_path(dir, name), Path::new("/data/users.csv"));
        }
    }

    #[test]
    fn rejects_unsafe_names() {
        assert_eq!(normalize_table_name(""), Err(TableNameError::Empty));
        assert_eq!(
            normalize_table_name("../etc"),
            Err(TableNameError::ContainsPathSeparator)
        );
        assert_eq!(normalize_table_name(".hidden"), Err(TableNameError::Hidden));
        assert_eq!(normalize_table_name(".csv"), Err(TableNameError::Hidden));
    }
}
