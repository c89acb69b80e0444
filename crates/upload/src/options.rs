//! Per-call upload options.

use std::fmt;
use std::sync::Arc;

use chunkup_transfer::{AlwaysContinue, DEFAULT_CHUNK_SIZE, ProgressGate};

/// Options for one upload call. Fixed once the call starts.
#[derive(Clone)]
pub struct UploadOptions {
    /// Replace an existing file with the same name.
    pub overwrite: bool,
    /// Chunk size in bytes; 0 means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Consulted before start, each continue and finish.
    pub progress: Arc<dyn ProgressGate>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress: Arc::new(AlwaysContinue),
        }
    }
}

impl UploadOptions {
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_progress<G: ProgressGate + 'static>(mut self, gate: G) -> Self {
        self.progress = Arc::new(gate);
        self
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("overwrite", &self.overwrite)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}
