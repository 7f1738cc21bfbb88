//! Secret store contract and bundled implementations.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use memory::InMemorySecretStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSecretStore;
pub use traits::{child_names, join_path, SecretStore, StoreError};
