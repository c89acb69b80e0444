//! Resumable chunked upload to a remote document store.
//!
//! This crate implements the **upload session controller**. It has no
//! transport dependencies: callers provide a [`RemoteSession`]
//! implementation (see `chunkup-rest` for the HTTP one) that issues the
//! remote create/start/continue/finish/cancel calls.
//!
//! # Flow
//!
//! 1. **Read**: pull the first chunk from the source stream
//! 2. **Single-shot**: content shorter than one chunk is created in one call
//! 3. **Start**: otherwise create an empty file and open a remote session
//! 4. **Continue**: send each further full chunk at the server's offset
//! 5. **Finish**: send the terminal (short or empty) chunk and return metadata
//!
//! The progress gate is consulted before start, every continue and finish;
//! refusing there cancels the remote session.

pub mod error;
pub mod options;
pub mod remote;
pub mod types;
pub mod uploader;

pub use chunkup_transfer::{
    AlwaysContinue, DEFAULT_CHUNK_SIZE, ProgressGate, ProgressSnapshot, SessionToken, UploadPhase,
};
pub use error::{RemoteError, RemoteOperation, UploadError};
pub use options::UploadOptions;
pub use remote::{RemoteFuture, RemoteSession};
pub use types::{DestinationFile, FileMetadata, value_as_u64};
pub use uploader::{ChunkedUpload, upload_chunked};
