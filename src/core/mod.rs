// Core modules implementing the table store, its file format and error modeling.
pub mod atomic;
pub mod codec;
pub mod error;
pub mod ids;
pub mod locks;
pub mod query;
pub mod record;
pub mod store;
pub mod table;
pub mod validate;
pub mod value;
