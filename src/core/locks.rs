//! Purpose: Hand out one reentrant mutex per table.
//! Exports: `LockRegistry`, `TableLock`, `TableGuard`.
//! Role: Sole mutual-exclusion mechanism for table files inside one process.
//! Invariants: At most one lock ever exists per table key; creation is race-free.
//! Invariants: Locks are never removed, so the registry only grows.
//! Invariants: The owning thread may re-acquire a held lock without deadlocking.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

pub type TableLock = Arc<ReentrantMutex<()>>;
pub type TableGuard<'a> = ReentrantMutexGuard<'a, ()>;

#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<String, TableLock>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_lock(&self, table: &str) -> TableLock {
        if let Some(lock) = self.locks.get(table) {
            return Arc::clone(lock.value());
        }
        // `entry` holds the shard write lock, so two first-time callers agree on one mutex.
        Arc::clone(
            self.locks
                .entry(table.to_string())
                .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
                .value(),
        )
    }

    /// Number of distinct tables locked so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
