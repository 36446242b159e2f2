//! Purpose: CRUD, query and id operations over file-backed tables.
//! Exports: `Store`.
//! Role: The one owner of the lock registry; every table access goes through it.
//! Invariants: Every operation, reads included, runs entirely under its table's lock.
//! Invariants: Mutations read the whole table, apply in memory, then atomically replace the file.
//! Invariants: A missing table file reads as empty; it is created by the first insert.
//! Invariants: "Nothing matched" is `ErrorKind::NotFound`, distinct from I/O and corrupt data.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use super::atomic;
use super::codec;
use super::error::{Error, ErrorKind};
use super::ids::{self, FallbackReason, GeneratedId, IdSource};
use super::locks::{LockRegistry, TableGuard};
use super::query::Predicate;
use super::record::Record;
use super::table::{Row, Table};
use super::validate::{self, ValidationReport};
use super::value::Value;
use crate::config::StoreConfig;
use crate::table_paths::{TABLE_EXTENSION, normalize_table_name, table_file_path};

const MAX_FALLBACK_ATTEMPTS: usize = 8;

#[derive(Clone, Debug)]
pub struct Store {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: StoreConfig,
    locks: LockRegistry,
}

/// A table name resolved against the data directory.
struct TableFile<'a> {
    name: &'a str,
    path: PathBuf,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                locks: LockRegistry::new(),
            }),
        }
    }

    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::new(data_dir))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.inner.locks
    }

    pub fn table_path(&self, table: &str) -> Result<PathBuf, Error> {
        Ok(self.resolve(table)?.path)
    }

    /// Names of the tables present in the data directory, sorted.
    pub fn tables(&self) -> Result<Vec<String>, Error> {
        let dir = self.inner.config.data_dir();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::io(err)
                    .with_message("failed to list data directory")
                    .with_path(dir));
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| Error::io(err).with_path(dir))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(TABLE_EXTENSION)
            {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if normalize_table_name(stem).is_ok() {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn create(&self, table: &str, record: &Record) -> Result<(), Error> {
        check_record(record)?;
        self.locked(table, |file| {
            let mut contents = self.load(file)?.unwrap_or_default();
            contents.push(record);
            self.save(file, &contents)
        })
    }

    pub fn read_all(&self, table: &str) -> Result<Vec<Record>, Error> {
        self.locked(table, |file| {
            Ok(self
                .load(file)?
                .map(|contents| contents.records())
                .unwrap_or_default())
        })
    }

    pub fn read_by_id(
        &self,
        table: &str,
        id_value: impl Into<Value>,
        id_column: &str,
    ) -> Result<Option<Record>, Error> {
        let predicate = Predicate::id(id_column, id_value);
        self.locked(table, |file| {
            Ok(self
                .load(file)?
                .filter(|contents| contents.has_column(id_column))
                .and_then(|contents| predicate.first(&contents)))
        })
    }

    /// Updates every row whose `id_column` matches; returns how many.
    pub fn update_by_id(
        &self,
        table: &str,
        id_value: impl Into<Value>,
        updates: &Record,
        id_column: &str,
    ) -> Result<usize, Error> {
        let predicate = Predicate::id(id_column, id_value);
        self.locked(table, |file| {
            self.update_matching(file, Some(id_column), &predicate, updates)
        })
    }

    pub fn update_by_condition(
        &self,
        table: &str,
        condition: &Predicate,
        updates: &Record,
    ) -> Result<usize, Error> {
        self.locked(table, |file| {
            self.update_matching(file, None, condition, updates)
        })
    }

    /// Deletes every row whose `id_column` matches; returns how many.
    pub fn delete_by_id(
        &self,
        table: &str,
        id_value: impl Into<Value>,
        id_column: &str,
    ) -> Result<usize, Error> {
        let predicate = Predicate::id(id_column, id_value);
        self.locked(table, |file| {
            self.delete_matching(file, Some(id_column), &predicate)
        })
    }

    pub fn delete_by_condition(&self, table: &str, condition: &Predicate) -> Result<usize, Error> {
        self.locked(table, |file| self.delete_matching(file, None, condition))
    }

    pub fn find_all(&self, table: &str, condition: &Predicate) -> Result<Vec<Record>, Error> {
        self.locked(table, |file| {
            Ok(self
                .load(file)?
                .map(|contents| condition.filter(&contents))
                .unwrap_or_default())
        })
    }

    pub fn find_one(&self, table: &str, condition: &Predicate) -> Result<Option<Record>, Error> {
        self.locked(table, |file| {
            Ok(self
                .load(file)?
                .and_then(|contents| condition.first(&contents)))
        })
    }

    /// `None` returns every row.
    pub fn find(&self, table: &str, condition: Option<&Predicate>) -> Result<Vec<Record>, Error> {
        match condition {
            Some(condition) => self.find_all(table, condition),
            None => self.read_all(table),
        }
    }

    pub fn count(&self, table: &str, condition: &Predicate) -> Result<usize, Error> {
        self.locked(table, |file| {
            Ok(self
                .load(file)?
                .map_or(0, |contents| condition.count(&contents)))
        })
    }

    pub fn exists(&self, table: &str, condition: &Predicate) -> Result<bool, Error> {
        Ok(self.count(table, condition)? > 0)
    }

    /// Next sequential id for `prefix`; falls back to a random suffix if the table is unreadable.
    pub fn generate_id(&self, table: &str, prefix: &str, id_column: &str) -> Result<GeneratedId, Error> {
        let width = self.inner.config.id_width();
        self.locked(table, |file| match self.load(file) {
            Ok(contents) => Ok(GeneratedId {
                id: ids::next_sequential(contents.as_ref(), prefix, id_column, width),
                source: IdSource::Sequential,
            }),
            Err(err) => {
                let id = ids::random_fallback(prefix)?;
                warn!(table = file.name, %id, error = %err, "id scan failed; using random fallback");
                Ok(GeneratedId {
                    id,
                    source: IdSource::Fallback(FallbackReason::ScanFailed),
                })
            }
        })
    }

    /// Allocates an id and inserts `record` with it in one critical section.
    ///
    /// The id column is placed first and overrides any value already in `record`. If the
    /// sequential candidate is already taken, a random fallback id is used instead and the
    /// returned `GeneratedId` says so.
    pub fn create_with_generated_id(
        &self,
        table: &str,
        prefix: &str,
        id_column: &str,
        record: &Record,
    ) -> Result<GeneratedId, Error> {
        self.locked(table, |file| {
            // Re-enters this table's lock.
            let mut generated = self.generate_id(file.name, prefix, id_column)?;
            let mut contents = self.load(file)?.unwrap_or_default();

            let mut attempts = 0;
            while Predicate::eq(id_column, generated.id.as_str()).count(&contents) > 0 {
                if attempts == MAX_FALLBACK_ATTEMPTS {
                    return Err(Error::new(ErrorKind::Internal)
                        .with_message("could not allocate an unused id")
                        .with_hint("Check the id column for unexpected values."));
                }
                attempts += 1;
                let id = ids::random_fallback(prefix)?;
                warn!(table = file.name, taken = %generated.id, %id, "id collision; using random fallback");
                generated = GeneratedId {
                    id,
                    source: IdSource::Fallback(FallbackReason::Collision),
                };
            }

            let mut row = Record::new().with(id_column, generated.id.as_str());
            for (column, value) in record.iter().filter(|(column, _)| *column != id_column) {
                row.set(column, value.clone());
            }
            check_record(&row)?;
            contents.push(&row);
            self.save(file, &contents)?;
            Ok(generated)
        })
    }

    /// Adds `amount` to `field` of the matching rows and returns the new value.
    ///
    /// The base is read from the first matching row; a missing or null field counts as zero.
    pub fn increment_field(
        &self,
        table: &str,
        id_value: impl Into<Value>,
        id_column: &str,
        field: &str,
        amount: i64,
    ) -> Result<i64, Error> {
        let predicate = Predicate::id(id_column, id_value);
        self.locked(table, |file| {
            let mut contents = self.load(file)?.ok_or_else(|| no_match(file))?;
            let positions = predicate.positions(&contents);
            let Some(&first) = positions.first() else {
                return Err(no_match(file));
            };
            let current = contents.row(first).cell(field).clone();
            let base = if current.is_null() {
                0
            } else {
                current.as_i64().ok_or_else(|| {
                    Error::new(ErrorKind::Corrupt)
                        .with_message(format!("field `{field}` holds non-integer `{current}`"))
                        .with_path(&file.path)
                })?
            };
            let next = base.checked_add(amount).ok_or_else(|| {
                Error::new(ErrorKind::Usage).with_message(format!("incrementing `{field}` overflows"))
            })?;
            for &at in &positions {
                contents.set(at, field, Value::Int(next));
            }
            self.save(file, &contents)?;
            Ok(next)
        })
    }

    pub fn validate(&self, table: &str) -> Result<ValidationReport, Error> {
        self.locked(table, |file| validate::validate_table(file.name, &file.path))
    }

    fn update_matching(
        &self,
        file: &TableFile<'_>,
        id_column: Option<&str>,
        predicate: &Predicate,
        updates: &Record,
    ) -> Result<usize, Error> {
        check_columns(updates)?;
        let mut contents = self.matchable(file, id_column)?;
        let positions = predicate.positions(&contents);
        if positions.is_empty() {
            return Err(no_match(file));
        }
        if !updates.is_empty() {
            contents.apply(&positions, updates);
            self.save(file, &contents)?;
        }
        Ok(positions.len())
    }

    fn delete_matching(
        &self,
        file: &TableFile<'_>,
        id_column: Option<&str>,
        predicate: &Predicate,
    ) -> Result<usize, Error> {
        let mut contents = self.matchable(file, id_column)?;
        let positions = predicate.positions(&contents);
        if positions.is_empty() {
            return Err(no_match(file));
        }
        let removed = contents.remove(&positions);
        self.save(file, &contents)?;
        Ok(removed)
    }

    /// Loads a table that must exist (and, for by-id paths, must have the id column).
    fn matchable(&self, file: &TableFile<'_>, id_column: Option<&str>) -> Result<Table, Error> {
        let contents = self.load(file)?.ok_or_else(|| no_match(file))?;
        match id_column {
            Some(column) if !contents.has_column(column) => Err(no_match(file)
                .with_message(format!("table has no column `{column}`"))),
            _ => Ok(contents),
        }
    }

    fn resolve<'a>(&self, table: &'a str) -> Result<TableFile<'a>, Error> {
        let name = normalize_table_name(table).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(err.describe())
                .with_table(table)
                .with_hint("Use a plain name such as `users`; `users.csv` is also accepted.")
        })?;
        let path = table_file_path(self.inner.config.data_dir(), name);
        Ok(TableFile { name, path })
    }

    fn locked<T>(
        &self,
        table: &str,
        body: impl FnOnce(&TableFile<'_>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let file = self.resolve(table)?;
        let lock = self.inner.locks.get_lock(file.name);
        let _guard: TableGuard<'_> = lock.lock();
        body(&file).map_err(|err| match err.table() {
            Some(_) => err,
            None => err.with_table(file.name),
        })
    }

    fn load(&self, file: &TableFile<'_>) -> Result<Option<Table>, Error> {
        match fs::read(&file.path) {
            Ok(bytes) => codec::decode(&bytes, &file.path).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(err)
                .with_message("failed to read table")
                .with_path(&file.path)),
        }
    }

    fn save(&self, file: &TableFile<'_>, contents: &Table) -> Result<(), Error> {
        let bytes = codec::encode(contents)?;
        atomic::replace(&file.path, &bytes, self.inner.config.durability())?;
        debug!(
            table = file.name,
            rows = contents.len(),
            columns = contents.columns().len(),
            "table written"
        );
        Ok(())
    }
}

fn no_match(file: &TableFile<'_>) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("no matching rows")
        .with_table(file.name)
}

fn check_record(record: &Record) -> Result<(), Error> {
    if record.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("record has no fields"));
    }
    check_columns(record)
}

fn check_columns(record: &Record) -> Result<(), Error> {
    if record.columns().any(str::is_empty) {
        return Err(Error::new(ErrorKind::Usage).with_message("column names must be non-empty"));
    }
    Ok(())
}
