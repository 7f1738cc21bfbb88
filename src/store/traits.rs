//! The secret store contract consumed by the key manager.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SecretStore: user-provided (or bundled) secret storage
// ============================================================================

/// Path-addressed storage for structured secrets.
///
/// Paths are `/`-separated without a leading slash. Implementations handle
/// transport, authentication and retries; the key manager calls each
/// operation once and surfaces any error to its caller.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the secret at `path`. A missing path is `Ok(None)`, not an error.
    async fn read_secret(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Create or replace the secret at `path`.
    async fn write_secret(&self, path: &str, data: &Value) -> Result<(), StoreError>;

    /// Names of the immediate children of `path`, relative to it. Children
    /// that have children of their own are reported with a trailing `/`.
    /// Empty when nothing lives under `path`.
    async fn list_secrets(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Remove the secret at `path`. Deleting a missing path succeeds.
    async fn delete_secret(&self, path: &str) -> Result<(), StoreError>;
}

/// Errors raised by a [`SecretStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("secret store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupted secret at '{path}': {reason}")]
    Corrupted { path: String, reason: String },

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Path helpers
// ============================================================================

/// Join a base path and a child name with exactly one `/` between them.
pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

/// Compute the immediate children of `prefix` among `paths`, sorted and
/// deduplicated. Nested entries collapse to `"<child>/"`.
pub fn child_names<'a, I>(prefix: &str, paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let trimmed = prefix.trim_end_matches('/');
    let full_prefix = if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    };

    let mut names = BTreeSet::new();
    for path in paths {
        let Some(relative) = path.strip_prefix(full_prefix.as_str()) else {
            continue;
        };
        if relative.is_empty() {
            continue;
        }
        match relative.find('/') {
            Some(slash) => {
                names.insert(format!("{}/", &relative[..slash]));
            }
            None => {
                names.insert(relative.to_string());
            }
        }
    }
    names.into_iter().collect()
}
