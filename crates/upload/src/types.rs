//! Data types exchanged with the remote document store.

use serde::{Deserialize, Deserializer, Serialize};

/// Metadata of a file in the remote store, as returned by create and finish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub server_relative_url: String,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_last_modified: Option<String>,
    #[serde(rename = "ETag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Handle to the destination file targeted by session calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationFile {
    server_relative_url: String,
}

impl DestinationFile {
    pub fn new(server_relative_url: impl Into<String>) -> Self {
        Self {
            server_relative_url: server_relative_url.into(),
        }
    }

    /// Derives the handle from a create response; `None` when the response
    /// carries no server-relative URL.
    pub fn from_metadata(metadata: &FileMetadata) -> Option<Self> {
        if metadata.server_relative_url.is_empty() {
            None
        } else {
            Some(Self::new(metadata.server_relative_url.clone()))
        }
    }

    pub fn server_relative_url(&self) -> &str {
        &self.server_relative_url
    }
}

/// Reads an unsigned integer from a JSON number or a numeric string.
///
/// The store reports 64-bit values as strings in some metadata modes.
pub fn value_as_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_u64))
}
