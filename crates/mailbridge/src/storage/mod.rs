//! Credential storage
//!
//! The trait-based design allows swapping between in-memory and persistent
//! storage implementations.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;
pub use traits::CredentialStore;
