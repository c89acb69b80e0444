use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// A bounded slice of the source stream, sent as one remote call's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    index: u64,
    offset: u64,
    data: Vec<u8>,
    last: bool,
}

impl Chunk {
    pub(crate) fn new(index: u64, offset: u64, data: Vec<u8>, last: bool) -> Self {
        Self {
            index,
            offset,
            data,
            last,
        }
    }

    /// Zero-based position of this chunk in the stream.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Byte offset of the first byte of this chunk within the source stream.
    ///
    /// Informational only; the remote write offset comes from the server.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` for the terminal chunk (short or empty).
    pub fn is_last(&self) -> bool {
        self.last
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Opaque identifier correlating start/continue/finish/cancel calls.
///
/// Generated fresh for every upload call and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Phase of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadPhase {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "starting")]
    Starting,
    #[serde(rename = "continue")]
    Transferring,
    #[serde(rename = "finishing")]
    Finishing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "failed")]
    Failed,
}

impl UploadPhase {
    /// Name reported to progress callbacks.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Transferring => "continue",
            Self::Finishing => "finishing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for Completed, Cancelled and Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the transfer state handed to the progress gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub session_token: String,
    pub phase: UploadPhase,
    pub chunk_size: usize,
    pub block_index: u64,
    pub offset: u64,
}

/// State of one upload call.
///
/// Owned exclusively by the controller for the duration of the call, so it
/// carries no locking. `D` is the destination object handle, attached once
/// the first chunk is known.
#[derive(Debug)]
pub struct UploadSession<D> {
    token: SessionToken,
    chunk_size: usize,
    phase: UploadPhase,
    block_index: u64,
    offset: u64,
    opened: bool,
    destination: Option<D>,
}

impl<D> UploadSession<D> {
    /// Creates an idle session with a fresh token.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            token: SessionToken::generate(),
            chunk_size: crate::effective_chunk_size(chunk_size),
            phase: UploadPhase::Idle,
            block_index: 0,
            offset: 0,
            opened: false,
            destination: None,
        }
    }

    /// Moves to a non-terminal phase.
    pub fn enter(&mut self, phase: UploadPhase) {
        debug_assert!(!self.phase.is_terminal(), "session already {}", self.phase);
        self.phase = phase;
    }

    /// Records the destination object created for this upload.
    pub fn attach_destination(&mut self, destination: D) {
        self.destination = Some(destination);
    }

    pub fn destination(&self) -> Option<&D> {
        self.destination.as_ref()
    }

    /// Marks the remote session as started and stores the server offset.
    pub fn mark_opened(&mut self, offset: u64) {
        self.opened = true;
        self.offset = offset;
    }

    /// Stores the offset most recently reported by the server.
    pub fn record_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Moves on to the next block after a chunk was accepted.
    pub fn advance_block(&mut self) {
        self.block_index += 1;
    }

    pub fn complete(&mut self) {
        self.phase = UploadPhase::Completed;
    }

    pub fn fail(&mut self) {
        self.phase = UploadPhase::Failed;
    }

    pub fn cancel(&mut self) {
        self.phase = UploadPhase::Cancelled;
    }

    /// Captures the current state for the progress gate.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            session_token: self.token.to_string(),
            phase: self.phase,
            chunk_size: self.chunk_size,
            block_index: self.block_index,
            offset: self.offset,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn block_index(&self) -> u64 {
        self.block_index
    }

    /// Server-reported write offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns `true` once the remote start call has succeeded.
    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Returns `true` while the session has not reached a terminal phase.
    pub fn is_active(&self) -> bool {
        !self.phase.is_terminal()
    }
}
