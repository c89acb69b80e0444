//! Remote session protocol contract.
//!
//! `RemoteSession` is implemented by the transport layer (the REST client
//! in `chunkup-rest`, or a mock in tests). Keeping it a trait leaves the
//! controller free of HTTP concerns. Implementations are expected to be
//! stateless between calls; timeouts and HTTP-level retries are theirs.

use std::future::Future;
use std::pin::Pin;

use chunkup_transfer::SessionToken;

use crate::error::RemoteError;
use crate::types::{DestinationFile, FileMetadata};

/// Boxed future returned by [`RemoteSession`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// The five remote operations of the chunked upload protocol.
pub trait RemoteSession: Send + Sync {
    /// Creates `name` with `content` (empty for a zero-byte placeholder).
    fn create_file<'a>(
        &'a self,
        name: &'a str,
        content: &'a [u8],
        overwrite: bool,
    ) -> RemoteFuture<'a, FileMetadata>;

    /// Opens the session with the first chunk; returns the server write offset.
    fn start_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
        chunk: &'a [u8],
    ) -> RemoteFuture<'a, u64>;

    /// Appends a chunk at `offset`; returns the new server write offset.
    fn continue_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
        offset: u64,
        chunk: &'a [u8],
    ) -> RemoteFuture<'a, u64>;

    /// Appends the last chunk at `offset` and commits the file.
    fn finish_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
        offset: u64,
        chunk: &'a [u8],
    ) -> RemoteFuture<'a, FileMetadata>;

    /// Aborts the session and discards uploaded data.
    fn cancel_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
    ) -> RemoteFuture<'a, ()>;
}
