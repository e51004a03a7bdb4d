// src/llm/chunk.rs
// Re-buffers raw upstream deltas into flush-ready text chunks.

use async_stream::try_stream;
use futures::{Stream, StreamExt};

use crate::error::ChatError;

use super::DeltaStream;

/// Buffered length (in characters) beyond which a chunk is flushed even
/// without a sentence boundary.
pub const FLUSH_THRESHOLD: usize = 100;

fn is_boundary(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

/// Deterministic reducer from deltas to chunks.
///
/// Each delta is appended to an internal buffer; the buffer is flushed when
/// the delta carries a sentence boundary or the buffer outgrows
/// [`FLUSH_THRESHOLD`]. Whatever remains at end of input is flushed by
/// [`finish`](Self::finish), which also rejects a stream that never carried
/// any content.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    buffer: String,
    buffered_chars: usize,
    emitted: bool,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one delta; returns the flushed chunk if it triggered one.
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.buffer.push_str(delta);
        self.buffered_chars += delta.chars().count();

        if delta.chars().any(is_boundary) || self.buffered_chars > FLUSH_THRESHOLD {
            Some(self.flush())
        } else {
            None
        }
    }

    /// End of input: emit the trailing buffer, or fail if the whole stream
    /// produced nothing - an empty bot message must never be persisted.
    pub fn finish(mut self) -> Result<Option<String>, ChatError> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.flush()));
        }
        if self.emitted {
            Ok(None)
        } else {
            Err(ChatError::EmptyStream)
        }
    }

    fn flush(&mut self) -> String {
        self.emitted = true;
        self.buffered_chars = 0;
        std::mem::take(&mut self.buffer)
    }
}

/// Adapt a raw delta stream into a chunk stream. Upstream errors pass
/// through verbatim and terminate the sequence.
pub fn chunk_stream(deltas: DeltaStream) -> impl Stream<Item = Result<String, ChatError>> {
    try_stream! {
        let mut deltas = deltas;
        let mut assembler = ChunkAssembler::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            if let Some(chunk) = assembler.push(&delta) {
                yield chunk;
            }
        }
        if let Some(tail) = assembler.finish()? {
            yield tail;
        }
    }
}
