//! SSE decoding for streamed completions.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tracing::debug;

use super::response::ChatChunk;
use crate::core::error::LlmError;

/// Lazy, forward-only sequence of text fragments from a streaming completion.
/// Dropping it mid-stream abandons the rest of the response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

const DONE_MARKER: &str = "[DONE]";

/// Buffered decoder for `data:` lines of an SSE response.
///
/// Network chunks can split an event anywhere, including inside a multi-byte
/// character, so bytes are buffered and only drained at line boundaries.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, get back the complete `data:` payloads they finish.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
        payloads
    }
}

struct FragmentState {
    source: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Adapt a raw SSE byte stream into a stream of text fragments.
///
/// Chunks without text content (role-only deltas, keep-alives) are skipped;
/// the `[DONE]` marker ends the stream.
pub(crate) fn text_fragments(
    source: BoxStream<'static, Result<Bytes, reqwest::Error>>,
) -> TextStream {
    let state = FragmentState {
        source,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            while let Some(payload) = state.pending.pop_front() {
                if payload == DONE_MARKER {
                    state.finished = true;
                    return None;
                }
                match serde_json::from_str::<ChatChunk>(&payload) {
                    Ok(chunk) => match chunk.into_content() {
                        Some(text) => return Some((Ok(text), state)),
                        None => debug!("skipping chunk without text content"),
                    },
                    Err(error) => debug!(%error, "skipping unparseable stream chunk"),
                }
            }

            match state.source.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.feed(&bytes);
                    state.pending.extend(payloads);
                }
                Some(Err(error)) => {
                    state.finished = true;
                    return Some((
                        Err(LlmError::Network {
                            message: "Stream interrupted".to_string(),
                            source: Box::new(error),
                        }),
                        state,
                    ));
                }
                None => return None,
            }
        }
    }))
}
