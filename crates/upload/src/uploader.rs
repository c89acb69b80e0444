//! Upload session controller.
//!
//! Drives one upload call through Idle → Starting → Transferring →
//! Finishing → Completed, or short-circuits to a single create call when
//! the content fits in one chunk. Reads, gate checks and remote calls are
//! strictly sequential.

use std::io;

use chunkup_transfer::{Chunk, ChunkReader, TransferError, UploadPhase, UploadSession};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::error::{RemoteError, RemoteOperation, UploadError};
use crate::options::UploadOptions;
use crate::remote::RemoteSession;
use crate::types::{DestinationFile, FileMetadata};

type Session = UploadSession<DestinationFile>;

/// Uploads `stream` as `name`, choosing between a single-shot create and a
/// chunked session.
pub async fn upload_chunked<R>(
    remote: &dyn RemoteSession,
    name: &str,
    stream: R,
    options: &UploadOptions,
) -> Result<FileMetadata, UploadError>
where
    R: AsyncRead + Unpin,
{
    ChunkedUpload::new(remote, options).run(name, stream).await
}

/// Controller for chunked uploads against one remote.
///
/// Holds no per-upload state; each [`run`](Self::run) owns its own session,
/// so one instance can serve any number of calls.
pub struct ChunkedUpload<'a> {
    remote: &'a dyn RemoteSession,
    options: &'a UploadOptions,
}

impl<'a> ChunkedUpload<'a> {
    pub fn new(remote: &'a dyn RemoteSession, options: &'a UploadOptions) -> Self {
        Self { remote, options }
    }

    /// Runs one upload to completion, cancellation or the first error.
    pub async fn run<R>(&self, name: &str, stream: R) -> Result<FileMetadata, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let mut session = Session::new(self.options.chunk_size);
        let mut reader = ChunkReader::new(stream, session.chunk_size());

        debug!(
            session = %session.token(),
            name,
            chunk_size = session.chunk_size(),
            "upload requested"
        );

        loop {
            let chunk = match reader.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                // The reader always yields a terminal chunk before running dry.
                Ok(None) => {
                    let eof = TransferError::Io(io::ErrorKind::UnexpectedEof.into());
                    return Err(read_failed(&mut session, eof));
                }
                Err(e) => return Err(read_failed(&mut session, e)),
            };

            if chunk.is_last() {
                return if session.block_index() == 0 {
                    self.upload_whole(&mut session, name, &chunk).await
                } else {
                    self.finish(&mut session, &chunk).await
                };
            }

            if session.block_index() == 0 {
                self.start(&mut session, name, &chunk).await?;
            } else {
                self.continue_with(&mut session, &chunk).await?;
            }
            session.advance_block();
        }
    }

    /// Content shorter than one chunk: create the file with it directly.
    async fn upload_whole(
        &self,
        session: &mut Session,
        name: &str,
        chunk: &Chunk,
    ) -> Result<FileMetadata, UploadError> {
        debug!(
            session = %session.token(),
            bytes = chunk.len(),
            "content fits in one chunk, uploading directly"
        );

        let metadata = self
            .remote
            .create_file(name, chunk.data(), self.options.overwrite)
            .await
            .map_err(|e| remote_failed(session, RemoteOperation::Create, e))?;

        session.complete();
        info!(
            file = %metadata.server_relative_url,
            bytes = chunk.len(),
            "upload completed"
        );
        Ok(metadata)
    }

    async fn start(
        &self,
        session: &mut Session,
        name: &str,
        chunk: &Chunk,
    ) -> Result<(), UploadError> {
        self.checkpoint(session, UploadPhase::Starting).await?;

        let created = self
            .remote
            .create_file(name, &[], self.options.overwrite)
            .await
            .map_err(|e| remote_failed(session, RemoteOperation::Create, e))?;

        let Some(file) = DestinationFile::from_metadata(&created) else {
            let err = RemoteError::InvalidResponse("created file has no server-relative URL".into());
            return Err(remote_failed(session, RemoteOperation::Create, err));
        };
        session.attach_destination(file.clone());

        let offset = self
            .remote
            .start_upload(&file, session.token(), chunk.data())
            .await
            .map_err(|e| remote_failed(session, RemoteOperation::Start, e))?;

        session.mark_opened(offset);
        debug!(
            session = %session.token(),
            file = %file.server_relative_url(),
            offset,
            "upload session started"
        );
        Ok(())
    }

    async fn continue_with(&self, session: &mut Session, chunk: &Chunk) -> Result<(), UploadError> {
        self.checkpoint(session, UploadPhase::Transferring).await?;
        let file = require_destination(session)?;

        let offset = self
            .remote
            .continue_upload(&file, session.token(), session.offset(), chunk.data())
            .await
            .map_err(|e| remote_failed(session, RemoteOperation::Continue, e))?;

        session.record_offset(offset);
        debug!(
            session = %session.token(),
            block = session.block_index(),
            offset,
            "chunk accepted"
        );
        Ok(())
    }

    async fn finish(
        &self,
        session: &mut Session,
        chunk: &Chunk,
    ) -> Result<FileMetadata, UploadError> {
        self.checkpoint(session, UploadPhase::Finishing).await?;
        let file = require_destination(session)?;

        let metadata = self
            .remote
            .finish_upload(&file, session.token(), session.offset(), chunk.data())
            .await
            .map_err(|e| remote_failed(session, RemoteOperation::Finish, e))?;

        session.complete();
        info!(
            session = %session.token(),
            file = %file.server_relative_url(),
            blocks = session.block_index() + 1,
            "chunked upload completed"
        );
        Ok(metadata)
    }

    /// Enters `phase` and asks the gate whether to go on.
    async fn checkpoint(&self, session: &mut Session, phase: UploadPhase) -> Result<(), UploadError> {
        session.enter(phase);
        debug!(
            session = %session.token(),
            %phase,
            block = session.block_index(),
            offset = session.offset(),
            "checkpoint"
        );

        if self.options.progress.on_progress(&session.snapshot()) {
            return Ok(());
        }
        Err(self.abort(session).await)
    }

    /// Cancels the session after the gate refused to continue.
    async fn abort(&self, session: &mut Session) -> UploadError {
        let phase = session.phase();
        session.cancel();

        let file = match session.destination() {
            Some(file) if session.is_opened() => file.clone(),
            _ => {
                info!(session = %session.token(), %phase, "upload cancelled before opening a session");
                return UploadError::Cancelled { source: None };
            }
        };

        match self.remote.cancel_upload(&file, session.token()).await {
            Ok(()) => {
                info!(session = %session.token(), %phase, "upload cancelled");
                UploadError::Cancelled { source: None }
            }
            Err(e) => {
                warn!(session = %session.token(), error = %e, "failed to cancel remote upload session");
                UploadError::Cancelled { source: Some(e) }
            }
        }
    }
}

fn require_destination(session: &mut Session) -> Result<DestinationFile, UploadError> {
    if let Some(file) = session.destination().cloned() {
        return Ok(file);
    }
    let phase = session.phase();
    session.fail();
    Err(UploadError::MissingDestination { phase })
}

fn remote_failed(session: &mut Session, operation: RemoteOperation, source: RemoteError) -> UploadError {
    session.fail();
    debug!(
        session = %session.token(),
        %operation,
        error = %source,
        "remote call failed"
    );
    UploadError::Remote { operation, source }
}

fn read_failed(session: &mut Session, source: TransferError) -> UploadError {
    session.fail();
    debug!(session = %session.token(), error = %source, "reading source failed");
    UploadError::Read(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use chunkup_transfer::{ProgressSnapshot, SessionToken};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadBuf};
    use tokio_util::sync::CancellationToken;

    use crate::remote::RemoteFuture;

    const MIB: usize = 1024 * 1024;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create { name: String, len: usize, overwrite: bool },
        Start { token: String, len: usize },
        Continue { token: String, offset: u64, len: usize },
        Finish { token: String, offset: u64, len: usize },
        Cancel { token: String },
    }

    /// Records calls. Offsets are `received + skew`, so they never match a
    /// client-side running total when `skew > 0`.
    #[derive(Default)]
    struct MockRemote {
        calls: Mutex<Vec<Call>>,
        received: Mutex<u64>,
        returned: Mutex<Vec<u64>>,
        skew: u64,
        fail_on: Option<RemoteOperation>,
        cancel_fails: bool,
        blank_url: bool,
    }

    impl MockRemote {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn failure(&self, op: RemoteOperation) -> Option<RemoteError> {
            (self.fail_on == Some(op)).then(|| RemoteError::Status {
                status: 500,
                body: format!("{op} exploded"),
            })
        }

        fn advance(&self, len: usize) -> u64 {
            let mut received = self.received.lock().unwrap();
            *received += len as u64;
            let offset = *received + self.skew;
            self.returned.lock().unwrap().push(offset);
            offset
        }

        fn metadata(&self, name: &str, len: u64) -> FileMetadata {
            FileMetadata {
                name: name.into(),
                server_relative_url: if self.blank_url {
                    String::new()
                } else {
                    format!("/docs/{name}")
                },
                length: Some(len),
                ..Default::default()
            }
        }
    }

    impl RemoteSession for MockRemote {
        fn create_file<'a>(
            &'a self,
            name: &'a str,
            content: &'a [u8],
            overwrite: bool,
        ) -> RemoteFuture<'a, FileMetadata> {
            self.record(Call::Create {
                name: name.into(),
                len: content.len(),
                overwrite,
            });
            let result = match self.failure(RemoteOperation::Create) {
                Some(e) => Err(e),
                None => Ok(self.metadata(name, content.len() as u64)),
            };
            Box::pin(std::future::ready(result))
        }

        fn start_upload<'a>(
            &'a self,
            _file: &'a DestinationFile,
            token: SessionToken,
            chunk: &'a [u8],
        ) -> RemoteFuture<'a, u64> {
            self.record(Call::Start {
                token: token.to_string(),
                len: chunk.len(),
            });
            let result = match self.failure(RemoteOperation::Start) {
                Some(e) => Err(e),
                None => Ok(self.advance(chunk.len())),
            };
            Box::pin(std::future::ready(result))
        }

        fn continue_upload<'a>(
            &'a self,
            _file: &'a DestinationFile,
            token: SessionToken,
            offset: u64,
            chunk: &'a [u8],
        ) -> RemoteFuture<'a, u64> {
            self.record(Call::Continue {
                token: token.to_string(),
                offset,
                len: chunk.len(),
            });
            let result = match self.failure(RemoteOperation::Continue) {
                Some(e) => Err(e),
                None => Ok(self.advance(chunk.len())),
            };
            Box::pin(std::future::ready(result))
        }

        fn finish_upload<'a>(
            &'a self,
            file: &'a DestinationFile,
            token: SessionToken,
            offset: u64,
            chunk: &'a [u8],
        ) -> RemoteFuture<'a, FileMetadata> {
            self.record(Call::Finish {
                token: token.to_string(),
                offset,
                len: chunk.len(),
            });
            let result = match self.failure(RemoteOperation::Finish) {
                Some(e) => Err(e),
                None => {
                    let total = *self.received.lock().unwrap() + chunk.len() as u64;
                    let name = file.server_relative_url().trim_start_matches("/docs/");
                    Ok(self.metadata(name, total))
                }
            };
            Box::pin(std::future::ready(result))
        }

        fn cancel_upload<'a>(
            &'a self,
            _file: &'a DestinationFile,
            token: SessionToken,
        ) -> RemoteFuture<'a, ()> {
            self.record(Call::Cancel {
                token: token.to_string(),
            });
            let result = if self.cancel_fails {
                Err(RemoteError::Transport("connection reset".into()))
            } else {
                Ok(())
            };
            Box::pin(std::future::ready(result))
        }
    }

    /// Gate that records every snapshot and refuses in `stop_at`.
    fn recording_gate(
        stop_at: Option<UploadPhase>,
    ) -> (
        impl Fn(&ProgressSnapshot) -> bool + Send + Sync + 'static,
        Arc<Mutex<Vec<ProgressSnapshot>>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let gate = move |snap: &ProgressSnapshot| {
            s.lock().unwrap().push(snap.clone());
            Some(snap.phase) != stop_at
        };
        (gate, seen)
    }

    fn options(chunk_size: usize) -> UploadOptions {
        UploadOptions::default().with_chunk_size(chunk_size)
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn small_content_uses_single_create() {
        let mock = MockRemote::default();
        let (gate, seen) = recording_gate(None);
        let opts = options(8).with_progress(gate);

        let meta = upload_chunked(&mock, "a.txt", &b"hello"[..], &opts)
            .await
            .unwrap();

        assert_eq!(meta.length, Some(5));
        assert_eq!(
            mock.calls(),
            vec![Call::Create {
                name: "a.txt".into(),
                len: 5,
                overwrite: true
            }]
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_content_uses_single_create() {
        let mock = MockRemote::default();
        let (gate, seen) = recording_gate(None);
        let opts = options(0).with_progress(gate).with_overwrite(false);

        upload_chunked(&mock, "empty.bin", &b""[..], &opts)
            .await
            .unwrap();

        assert_eq!(
            mock.calls(),
            vec![Call::Create {
                name: "empty.bin".into(),
                len: 0,
                overwrite: false
            }]
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_multiple_finishes_with_empty_chunk() {
        let mock = MockRemote::default();
        let data = payload(24);

        upload_chunked(&mock, "x.bin", data.as_slice(), &options(8))
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 5);
        assert!(matches!(calls[0], Call::Create { len: 0, .. }));
        assert!(matches!(calls[1], Call::Start { len: 8, .. }));
        assert!(matches!(calls[2], Call::Continue { len: 8, .. }));
        assert!(matches!(calls[3], Call::Continue { len: 8, .. }));
        assert!(matches!(calls[4], Call::Finish { len: 0, .. }));
    }

    #[tokio::test]
    async fn single_full_chunk_goes_through_session() {
        let mock = MockRemote::default();
        let data = payload(8);

        upload_chunked(&mock, "x.bin", data.as_slice(), &options(8))
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[1], Call::Start { len: 8, .. }));
        assert!(matches!(calls[2], Call::Finish { len: 0, offset: 8, .. }));
    }

    #[tokio::test]
    async fn remainder_is_sent_with_finish() {
        let mock = MockRemote::default();
        let data = payload(8 * 3 + 3);

        let meta = upload_chunked(&mock, "x.bin", data.as_slice(), &options(8))
            .await
            .unwrap();

        let calls = mock.calls();
        let continues = calls
            .iter()
            .filter(|c| matches!(c, Call::Continue { .. }))
            .count();
        assert_eq!(continues, 2);
        assert!(matches!(calls.last(), Some(Call::Finish { len: 3, .. })));
        assert_eq!(meta.length, Some(27));
        assert_eq!(meta.server_relative_url, "/docs/x.bin");
    }

    #[tokio::test]
    async fn offsets_come_from_the_server() {
        let mock = MockRemote {
            skew: 1000,
            ..Default::default()
        };
        let data = payload(8 * 3 + 1);

        upload_chunked(&mock, "x.bin", data.as_slice(), &options(8))
            .await
            .unwrap();

        let returned = mock.returned.lock().unwrap().clone();
        let sent: Vec<u64> = mock
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Continue { offset, .. } | Call::Finish { offset, .. } => Some(*offset),
                _ => None,
            })
            .collect();

        assert_eq!(returned, vec![1008, 1016, 1024]);
        assert_eq!(sent, returned);
    }

    #[tokio::test]
    async fn twenty_five_mib_with_default_chunk_size() {
        let mock = MockRemote::default();
        let (gate, seen) = recording_gate(None);
        let opts = UploadOptions::default().with_progress(gate);
        let data = payload(25 * MIB);

        upload_chunked(&mock, "big.iso", data.as_slice(), &opts)
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 4);
        assert!(matches!(calls[1], Call::Start { len, .. } if len == 10 * MIB));
        assert!(matches!(calls[2], Call::Continue { len, .. } if len == 10 * MIB));
        assert!(matches!(calls[3], Call::Finish { len, .. } if len == 5 * MIB));

        let seen = seen.lock().unwrap();
        let phases: Vec<&str> = seen.iter().map(|s| s.phase.as_str()).collect();
        assert_eq!(phases, vec!["starting", "continue", "finishing"]);
        let blocks: Vec<u64> = seen.iter().map(|s| s.block_index).collect();
        assert_eq!(blocks, vec![0, 1, 2]);
        assert!(seen.iter().all(|s| s.chunk_size == 10 * MIB));
        assert_eq!(seen[0].offset, 0);
        assert_eq!(seen[1].offset, (10 * MIB) as u64);
        assert_eq!(seen[2].offset, (20 * MIB) as u64);
    }

    #[tokio::test]
    async fn same_token_for_all_calls_of_one_upload() {
        let mock = MockRemote::default();
        let (gate, seen) = recording_gate(None);
        let opts = options(4).with_progress(gate);
        let data = payload(10);

        upload_chunked(&mock, "x.bin", data.as_slice(), &opts)
            .await
            .unwrap();

        let tokens: Vec<String> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start { token, .. }
                | Call::Continue { token, .. }
                | Call::Finish { token, .. } => Some(token),
                _ => None,
            })
            .collect();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| t == &tokens[0]));
        assert!(seen.lock().unwrap().iter().all(|s| s.session_token == tokens[0]));
    }

    #[tokio::test]
    async fn each_upload_gets_a_fresh_token() {
        let mock = MockRemote::default();
        let data = payload(10);
        let opts = options(4);

        upload_chunked(&mock, "a", data.as_slice(), &opts).await.unwrap();
        upload_chunked(&mock, "b", data.as_slice(), &opts).await.unwrap();

        let starts: Vec<String> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start { token, .. } => Some(token),
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 2);
        assert_ne!(starts[0], starts[1]);
    }

    #[tokio::test]
    async fn cancel_before_start_makes_no_remote_calls() {
        let mock = MockRemote::default();
        let (gate, seen) = recording_gate(Some(UploadPhase::Starting));
        let opts = options(4).with_progress(gate);
        let data = payload(10);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &opts)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Cancelled { source: None }));
        assert!(mock.calls().is_empty());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_mid_transfer_cancels_remote_session() {
        let mock = MockRemote::default();
        let (gate, _) = recording_gate(Some(UploadPhase::Transferring));
        let opts = options(4).with_progress(gate);
        let data = payload(20);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &opts)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Cancelled { source: None }));
        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        let Call::Start { token, .. } = &calls[1] else {
            panic!("expected start, got {:?}", calls[1]);
        };
        assert_eq!(
            calls[2],
            Call::Cancel {
                token: token.clone()
            }
        );
    }

    #[tokio::test]
    async fn cancel_at_finish_never_sends_finish() {
        let mock = MockRemote::default();
        let (gate, _) = recording_gate(Some(UploadPhase::Finishing));
        let opts = options(4).with_progress(gate);
        let data = payload(6);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &opts)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        let calls = mock.calls();
        assert!(matches!(calls.last(), Some(Call::Cancel { .. })));
        assert!(!calls.iter().any(|c| matches!(c, Call::Finish { .. })));
    }

    #[tokio::test]
    async fn failed_cancel_still_reports_cancellation() {
        let mock = MockRemote {
            cancel_fails: true,
            ..Default::default()
        };
        let (gate, _) = recording_gate(Some(UploadPhase::Transferring));
        let opts = options(4).with_progress(gate);
        let data = payload(20);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &opts)
            .await
            .unwrap_err();

        match err {
            UploadError::Cancelled {
                source: Some(RemoteError::Transport(msg)),
            } => assert_eq!(msg, "connection reset"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_token_stops_before_any_call() {
        let mock = MockRemote::default();
        let token = CancellationToken::new();
        token.cancel();
        let opts = options(4).with_progress(token);
        let data = payload(20);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &opts)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn continue_failure_is_returned_without_cancel() {
        let mock = MockRemote {
            fail_on: Some(RemoteOperation::Continue),
            ..Default::default()
        };
        let data = payload(20);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &options(4))
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(RemoteOperation::Continue));
        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[2], Call::Continue { .. }));
    }

    #[tokio::test]
    async fn create_failure_stops_before_start() {
        let mock = MockRemote {
            fail_on: Some(RemoteOperation::Create),
            ..Default::default()
        };
        let data = payload(20);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &options(4))
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(RemoteOperation::Create));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn finish_failure_is_returned() {
        let mock = MockRemote {
            fail_on: Some(RemoteOperation::Finish),
            ..Default::default()
        };
        let data = payload(6);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &options(4))
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(RemoteOperation::Finish));
        assert!(!mock.calls().iter().any(|c| matches!(c, Call::Cancel { .. })));
    }

    #[tokio::test]
    async fn create_without_url_is_invalid_response() {
        let mock = MockRemote {
            blank_url: true,
            ..Default::default()
        };
        let data = payload(20);

        let err = upload_chunked(&mock, "x.bin", data.as_slice(), &options(4))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Remote {
                operation: RemoteOperation::Create,
                source: RemoteError::InvalidResponse(_)
            }
        ));
        assert_eq!(mock.calls().len(), 1);
    }

    /// Fails every read.
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("disk on fire")))
        }
    }

    #[tokio::test]
    async fn read_error_stops_upload() {
        let mock = MockRemote::default();
        let stream = (&b"01234567"[..]).chain(Broken);

        let err = upload_chunked(&mock, "x.bin", stream, &options(4))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Read(_)));
        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[2], Call::Continue { .. }));
    }

    #[tokio::test]
    async fn pipe_source_sends_full_chunks() {
        let mock = MockRemote::default();
        let (mut tx, rx) = tokio::io::duplex(3);
        let writer = tokio::spawn(async move {
            for _ in 0..11 {
                tx.write_all(b"abc").await.unwrap();
            }
        });

        upload_chunked(&mock, "pipe.bin", rx, &options(8))
            .await
            .unwrap();
        writer.await.unwrap();

        let lens: Vec<usize> = mock
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Start { len, .. } | Call::Continue { len, .. } | Call::Finish { len, .. } => {
                    Some(*len)
                }
                _ => None,
            })
            .collect();
        assert_eq!(lens, vec![8, 8, 8, 8, 1]);
    }

    #[test]
    fn missing_destination_is_an_internal_error() {
        let mut session = Session::new(4);
        session.enter(UploadPhase::Transferring);

        let err = require_destination(&mut session).unwrap_err();

        assert!(matches!(
            err,
            UploadError::MissingDestination {
                phase: UploadPhase::Transferring
            }
        ));
        assert_eq!(session.phase(), UploadPhase::Failed);
    }
}
