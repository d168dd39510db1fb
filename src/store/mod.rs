//! Persistence layer — snapshot storage for suspended and in-flight runs.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlRunStore;
pub use memory::InMemoryRunStore;
pub use traits::{RunStore, SuspendedRun};
