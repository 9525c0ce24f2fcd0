//! Server-sent event decoding for vendor streaming endpoints.
//!
//! All supported vendors stream `text/event-stream` bodies. This module turns
//! the raw byte stream into the `data` payload of each event; the vendor
//! clients parse those payloads into [`crate::types::Fragment`]s.

use crate::error::LlmError;
use futures_util::{Stream, StreamExt};
use tracing::debug;

/// Incremental SSE decoder.
///
/// Bytes may be split anywhere, including inside a UTF-8 sequence, so the
/// decoder buffers until it sees a full line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the payloads of every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0usize;
        for i in 0..self.buf.len() {
            if self.buf[i] != b'\n' {
                continue;
            }
            let line = String::from_utf8_lossy(&self.buf[start..i])
                .trim_end_matches('\r')
                .to_string();
            start = i + 1;
            if let Some(event) = self.line(&line) {
                events.push(event);
            }
        }
        if start > 0 {
            self.buf.drain(0..start);
        }
        events
    }

    /// Flush whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        if !self.buf.is_empty() {
            let line = String::from_utf8_lossy(&self.buf)
                .trim_end_matches('\r')
                .to_string();
            self.buf.clear();
            if let Some(event) = self.line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // event:, id: and retry: carry nothing the vendors put outside `data`
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

/// Turn a successful streaming HTTP response into a stream of event payloads
pub fn data_payloads(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, LlmError>> + Send {
    let mut bytes = response.bytes_stream();

    async_stream::stream! {
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for payload in decoder.push(&chunk) {
                        debug!(payload = %payload, "sse payload");
                        yield Ok(payload);
                    }
                }
                Err(e) => {
                    yield Err(LlmError::Network { source: e });
                    return;
                }
            }
        }
        if let Some(payload) = decoder.finish() {
            yield Ok(payload);
        }
    }
}
