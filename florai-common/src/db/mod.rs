//! Document store: schema initialization, persisted document models, and
//! the `DocumentStore` access trait with its SQLite implementation

pub mod init;
pub mod models;
pub mod store;

pub use init::{init_database, init_memory_database};
pub use models::*;
pub use store::{DocumentStore, SqliteDocumentStore};
