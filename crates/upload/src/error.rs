//! Upload error types.

use std::fmt;

use chunkup_transfer::{TransferError, UploadPhase};

/// Remote operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    Create,
    Start,
    Continue,
    Finish,
    Cancel,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create file",
            Self::Start => "start upload",
            Self::Continue => "continue upload",
            Self::Finish => "finish upload",
            Self::Cancel => "cancel upload",
        })
    }
}

/// Failure reported by a [`RemoteSession`](crate::RemoteSession) implementation.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors returned by [`upload_chunked`](crate::upload_chunked).
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The progress gate asked to stop. `source` holds the error of the
    /// remote cancel call when that call failed.
    #[error("upload was cancelled")]
    Cancelled {
        #[source]
        source: Option<RemoteError>,
    },

    #[error("{operation} failed: {source}")]
    Remote {
        operation: RemoteOperation,
        #[source]
        source: RemoteError,
    },

    #[error("no destination file during {phase}")]
    MissingDestination { phase: UploadPhase },

    #[error("reading source failed: {0}")]
    Read(#[from] TransferError),
}

impl UploadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Remote operation that failed, if this is a remote error.
    pub fn operation(&self) -> Option<RemoteOperation> {
        match self {
            Self::Remote { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}
