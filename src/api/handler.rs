//! Purpose: Flag-and-empty-result facade over `Store` for simple call sites.
//! Exports: `Handler`.
//! Role: Keeps the route-facing contract: mutations return `bool`, reads return empty/`None`.
//! Invariants: Never panics and never returns an error; every failure is logged and collapsed.
//! Invariants: `NotFound` is logged at debug level, every other failure at error level.
//! Notes: Operations taking `table: Option<&str>` fall back to the handler's default table.

use tracing::{debug, error};

use crate::core::error::{Error, ErrorKind};
use crate::core::ids;
use crate::core::query::Predicate;
use crate::core::record::Record;
use crate::core::store::Store;
use crate::core::value::Value;

#[derive(Clone, Debug)]
pub struct Handler {
    store: Store,
    default_table: Option<String>,
}

impl Handler {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            default_table: None,
        }
    }

    /// Handler bound to one table, used when `table` arguments are omitted.
    pub fn for_table(store: Store, table: impl Into<String>) -> Self {
        Self {
            store,
            default_table: Some(table.into()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn create(&self, table: &str, record: &Record) -> bool {
        collapse("create", self.store.create(table, record)).is_some()
    }

    pub fn read_all(&self, table: &str) -> Vec<Record> {
        collapse("read_all", self.store.read_all(table)).unwrap_or_default()
    }

    pub fn read_by_id(
        &self,
        table: &str,
        id_value: impl Into<Value>,
        id_column: &str,
    ) -> Option<Record> {
        collapse("read_by_id", self.store.read_by_id(table, id_value, id_column)).flatten()
    }

    pub fn update_by_id(
        &self,
        table: &str,
        id_value: impl Into<Value>,
        updates: &Record,
        id_column: &str,
    ) -> bool {
        collapse(
            "update_by_id",
            self.store.update_by_id(table, id_value, updates, id_column),
        )
        .is_some()
    }

    pub fn delete_by_id(&self, table: &str, id_value: impl Into<Value>, id_column: &str) -> bool {
        collapse(
            "delete_by_id",
            self.store.delete_by_id(table, id_value, id_column),
        )
        .is_some()
    }

    pub fn find_all(&self, condition: &Record, table: Option<&str>) -> Vec<Record> {
        self.with_table("find_all", table, |store, table| {
            store.find_all(table, &Predicate::from(condition))
        })
        .unwrap_or_default()
    }

    pub fn find_one(&self, condition: &Record, table: Option<&str>) -> Option<Record> {
        self.with_table("find_one", table, |store, table| {
            store.find_one(table, &Predicate::from(condition))
        })
        .flatten()
    }

    /// `None` lists every row.
    pub fn find(&self, condition: Option<&Record>, table: Option<&str>) -> Vec<Record> {
        self.with_table("find", table, |store, table| {
            let predicate = condition.map(Predicate::from);
            store.find(table, predicate.as_ref())
        })
        .unwrap_or_default()
    }

    pub fn count(&self, condition: Option<&Record>, table: Option<&str>) -> usize {
        self.find(condition, table).len()
    }

    pub fn exists(&self, condition: &Record, table: Option<&str>) -> bool {
        self.count(Some(condition), table) > 0
    }

    /// Always yields an id: sequential when possible, otherwise a random fallback.
    pub fn generate_id(&self, prefix: &str, id_column: &str, table: Option<&str>) -> String {
        let generated = self.with_table("generate_id", table, |store, table| {
            store.generate_id(table, prefix, id_column)
        });
        match generated {
            Some(generated) => generated.id,
            None => ids::random_fallback(prefix).unwrap_or_else(|_| {
                ids::next_sequential(None, prefix, id_column, self.store.config().id_width())
            }),
        }
    }

    pub fn increment_field(
        &self,
        table: &str,
        id_value: impl Into<Value>,
        id_column: &str,
        field: &str,
        amount: i64,
    ) -> bool {
        collapse(
            "increment_field",
            self.store
                .increment_field(table, id_value, id_column, field, amount),
        )
        .is_some()
    }

    pub fn update_by_condition(
        &self,
        condition: &Record,
        updates: &Record,
        table: Option<&str>,
    ) -> bool {
        self.with_table("update_by_condition", table, |store, table| {
            store.update_by_condition(table, &Predicate::from(condition), updates)
        })
        .is_some()
    }

    pub fn delete_by_condition(&self, condition: &Record, table: Option<&str>) -> bool {
        self.with_table("delete_by_condition", table, |store, table| {
            store.delete_by_condition(table, &Predicate::from(condition))
        })
        .is_some()
    }

    fn with_table<T>(
        &self,
        op: &str,
        table: Option<&str>,
        body: impl FnOnce(&Store, &str) -> Result<T, Error>,
    ) -> Option<T> {
        let result = match table.or(self.default_table.as_deref()) {
            Some(table) => body(&self.store, table),
            None => Err(Error::new(ErrorKind::Usage)
                .with_message("no table given and the handler has no default table")),
        };
        collapse(op, result)
    }
}

fn collapse<T>(op: &str, result: Result<T, Error>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) if err.is_not_found() => {
            debug!(op, error = %err, "no matching rows");
            None
        }
        Err(err) => {
            error!(op, error = %err, "table operation failed");
            None
        }
    }
}
