//! Streaming side of a chunked upload: chunk reading, per-call session
//! state and the progress/cancellation gate.
//!
//! Nothing here talks to the network. The upload controller in
//! `chunkup-upload` drives these pieces against a remote session.

mod chunked;
mod progress;
mod types;

pub use chunked::ChunkReader;
pub use progress::{AlwaysContinue, ProgressGate, ThroughputMeter};
pub use types::{Chunk, ProgressSnapshot, SessionToken, UploadPhase, UploadSession};

/// Default chunk size: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Resolves a configured chunk size, mapping 0 to [`DEFAULT_CHUNK_SIZE`].
pub fn effective_chunk_size(chunk_size: usize) -> usize {
    if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    }
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
