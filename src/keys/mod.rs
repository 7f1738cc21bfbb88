pub mod cache;
pub mod manager;
pub mod options;
pub mod records;

pub use cache::KeyCache;
pub use manager::KeyManager;
pub use options::KeyManagerOptions;
pub use records::{PrimaryKeyRecord, StoredKeyRecord};
