use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::types::Chunk;
use crate::{TransferError, effective_chunk_size};

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads an arbitrary byte stream in fixed-size chunks.
///
/// Every chunk is exactly `chunk_size` bytes except the terminal one, which
/// is shorter and may be empty when the stream length is an exact multiple
/// of the chunk size. Short reads from the underlying stream are absorbed:
/// a chunk is only cut short when the stream reports end-of-file.
pub struct ChunkReader<R> {
    stream: R,
    chunk_size: usize,
    next_index: u64,
    position: u64,
    finished: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wraps `stream` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`](crate::DEFAULT_CHUNK_SIZE) is used.
    pub fn new(stream: R, chunk_size: usize) -> Self {
        Self {
            stream,
            chunk_size: effective_chunk_size(chunk_size),
            next_index: 0,
            position: 0,
            finished: false,
        }
    }

    /// Reads the next chunk.
    ///
    /// Returns `None` once the terminal chunk has been handed out.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            let n = match self.stream.read(&mut buf[filled..]).await {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        let last = filled < self.chunk_size;
        if last {
            self.finished = true;
        }

        let chunk = Chunk::new(self.next_index, self.position, buf, last);
        trace!(
            index = chunk.index(),
            bytes = chunk.len(),
            last,
            "read chunk"
        );

        self.next_index += 1;
        self.position += filled as u64;
        Ok(Some(chunk))
    }

    /// Configured chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total bytes consumed from the stream so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns `true` once the terminal chunk has been read.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
