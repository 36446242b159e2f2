//! Purpose: Define the public Rust API boundary for flatstore.
//! Exports: Store, value model, predicates, id allocation and error types.
//! Role: Public, additive-only surface; embedders should not need `core` paths.
//! Invariants: `Store` returns typed results; `Handler` collapses them to flags and empties.

mod handler;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::config::StoreConfig;
pub use crate::core::atomic::Durability;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::ids::{FallbackReason, GeneratedId, IdSource};
pub use crate::core::query::Predicate;
pub use crate::core::record::Record;
pub use crate::core::store::Store;
pub use crate::core::validate::{Severity, ValidationIssue, ValidationReport, ValidationStatus};
pub use crate::core::value::Value;
pub use handler::Handler;
