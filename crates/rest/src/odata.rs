//! Response normalization.
//!
//! The store shapes bodies differently depending on the requested metadata
//! verbosity: verbose wraps everything in `{"d": ...}` and keys scalar
//! results by operation name, while minimal/no-metadata modes put them
//! under `value`. Some deployments answer with a bare number.

use chunkup_upload::{FileMetadata, RemoteError, value_as_u64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata verbosity requested through the `Accept` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataMode {
    #[default]
    Verbose,
    Minimal,
    None,
}

impl MetadataMode {
    pub fn accept_header(&self) -> &'static str {
        match self {
            Self::Verbose => "application/json;odata=verbose",
            Self::Minimal => "application/json;odata=minimalmetadata",
            Self::None => "application/json;odata=nometadata",
        }
    }
}

/// Strips the verbose `d` envelope and a `results` wrapper beneath it.
pub fn normalize_item(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    let Some(inner) = map.remove("d") else {
        return Value::Object(map);
    };
    match inner {
        Value::Object(mut inner) if inner.contains_key("results") => {
            inner.remove("results").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Extracts the server write offset from a start/continue response.
///
/// `key` is the operation name used in verbose mode (`StartUpload`,
/// `ContinueUpload`).
pub fn parse_offset(body: &[u8], key: &str) -> Result<u64, RemoteError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| RemoteError::InvalidResponse("offset body is not UTF-8".into()))?
        .trim();

    let value = match serde_json::from_str::<Value>(text) {
        Ok(v) => normalize_item(v),
        Err(_) => Value::String(text.to_string()),
    };

    let found = match &value {
        Value::Object(map) => map
            .get(key)
            .and_then(value_as_u64)
            .or_else(|| map.get("value").and_then(value_as_u64)),
        scalar => value_as_u64(scalar),
    };

    found.ok_or_else(|| RemoteError::InvalidResponse(format!("no {key} offset in response: {text}")))
}

/// Parses file metadata from a create/finish response.
pub fn parse_metadata(body: &[u8]) -> Result<FileMetadata, RemoteError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RemoteError::InvalidResponse(format!("file metadata: {e}")))?;
    serde_json::from_value(normalize_item(value))
        .map_err(|e| RemoteError::InvalidResponse(format!("file metadata: {e}")))
}
