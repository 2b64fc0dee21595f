use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::StoredRecord;

pub mod gcs;

pub use gcs::GcsStore;

/// Naming convention for per-city blobs.
const KEY_PREFIX: &str = "weather_";
const KEY_SUFFIX: &str = ".json";

/// Errors from the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Storage {operation} request failed with status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to obtain an access token: {0}")]
    Auth(anyhow::Error),
}

/// Bucket-oriented blob store holding one JSON record per city.
///
/// Writes overwrite in place; the store's own per-blob semantics
/// (last-writer-wins) are the only consistency guarantee.
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Names of all blobs matching the `weather_*.json` convention.
    async fn list_keys(&self) -> Result<Vec<String>, StoreError>;

    /// Download and strictly parse one record. Fails if the blob is absent
    /// or not valid JSON.
    async fn read(&self, key: &str) -> Result<StoredRecord, StoreError>;

    /// Serialize with human-readable indentation and upload as
    /// `application/json`, replacing any existing blob at `key`.
    async fn write(&self, key: &str, record: &StoredRecord) -> Result<(), StoreError>;
}

/// Blob name for a city: spaces become underscores.
pub fn city_key(city: &str) -> String {
    format!("{KEY_PREFIX}{}{KEY_SUFFIX}", city.replace(' ', "_"))
}

/// Display name derived from a blob name: underscores become spaces.
///
/// Lossy inverse of [`city_key`]: a city whose original name contains an
/// underscore comes back with spaces instead.
pub fn city_from_key(key: &str) -> String {
    let name = key.strip_prefix(KEY_PREFIX).unwrap_or(key);
    let name = name.strip_suffix(KEY_SUFFIX).unwrap_or(name);
    name.replace('_', " ")
}
