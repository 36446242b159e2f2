//! Purpose: Thread-safe flat-file table store used by the `flatstore` CLI and embedding apps.
//! Exports: `api` (store, records, predicates, errors), `config`, `core`.
//! Role: Library crate backing the binary; `api` is the stable surface.
//! Invariants: One `Store` instance owns the lock registry for its data directory.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod config;
pub mod core;
pub mod table_paths;
