// src/llm/sse.rs
// Incremental SSE decoding for the upstream byte stream.

/// Buffers partial network chunks and yields complete `data:` payloads.
///
/// The upstream delivers `text/event-stream` lines; a single network chunk
/// can hold several lines or cut one in half, so completed lines are drained
/// eagerly and the unterminated tail stays buffered.
#[derive(Debug, Default)]
pub(crate) struct DataLineDecoder {
    pending: String,
}

/// Ceiling on buffered bytes; a stream that never produces a newline is
/// malformed and gets its tail discarded rather than growing without bound.
const MAX_PENDING_BYTES: usize = 256 * 1024;

impl DataLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns the `data:` payloads completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        if self.pending.len() > MAX_PENDING_BYTES {
            tracing::warn!(
                buffered = self.pending.len(),
                "SSE line exceeded buffer limit, dropping tail"
            );
            self.pending.clear();
            return Vec::new();
        }

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
            // event:, id:, retry: and comment lines carry nothing we use
        }
        payloads
    }
}
