//! Key manager configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VaultError};

/// Default location of key entries in the secret store.
pub const DEFAULT_KEYS_PATH: &str = "envelope-vault/keys";

/// Default cache staleness window (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Options for [`KeyManager`](super::KeyManager).
///
/// Deserializes from camelCase JSON, e.g.
/// `{"keysPath": "app/keys", "cacheTtlMs": 60000}`; omitted fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyManagerOptions {
    /// Secret store path under which key entries and the primary pointer live.
    pub keys_path: String,
    /// How long a refreshed cache is trusted before the next read refreshes it.
    #[serde(rename = "cacheTtlMs", with = "duration_ms")]
    pub cache_ttl: Duration,
}

impl Default for KeyManagerOptions {
    fn default() -> Self {
        Self {
            keys_path: DEFAULT_KEYS_PATH.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl KeyManagerOptions {
    pub fn new(keys_path: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            keys_path: keys_path.into(),
            cache_ttl,
        }
    }

    /// Parse options from a JSON document and validate them.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| VaultError::Config(e.to_string()))?;
        options.validate()
    }

    /// Check the options and normalise `keys_path` (trailing slashes removed).
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.keys_path.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(VaultError::Config("keysPath must not be empty".into()));
        }
        if trimmed.split('/').any(|segment| segment.is_empty()) {
            return Err(VaultError::Config(format!(
                "keysPath '{}' contains an empty segment",
                self.keys_path
            )));
        }
        self.keys_path = trimmed.to_string();
        Ok(self)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
