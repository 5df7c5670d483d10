//! Stored object records as returned by the storage platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between key segments.
pub const SEPARATOR: char = '/';

/// A stored object in the bucket.
///
/// The platform owns these records; the client only ever holds a snapshot.
/// Field names on the wire follow the platform's file document format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Platform-assigned unique identifier.
    #[serde(rename = "$id")]
    pub id: String,
    /// Full slash-delimited key, acting as the virtual path.
    #[serde(rename = "name")]
    pub key: String,
    /// Size of the original upload in bytes.
    #[serde(rename = "sizeOriginal", default)]
    pub size_bytes: u64,
    /// Creation time.
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
}

impl StoredObject {
    /// Create a new object record.
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        size_bytes: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            size_bytes,
            created_at,
        }
    }

    /// The last segment of the key, shown as the file's name.
    pub fn display_name(&self) -> &str {
        display_name(&self.key)
    }
}

/// Returns the last segment of a key.
pub fn display_name(key: &str) -> &str {
    key.rsplit(SEPARATOR).next().unwrap_or(key)
}
