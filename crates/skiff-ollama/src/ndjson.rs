// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NDJSON stream parser for Ollama chat responses.
//!
//! Converts a byte stream into [`ChatChunk`]s. Lines may be split across
//! network reads, so bytes are buffered until a newline arrives. Lines that
//! do not parse are skipped. The stream ends after the first `done` line.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use skiff_core::{ChatChunk, ChunkStream, SkiffError, TokenUsage, ToolCall};
use tracing::{debug, warn};

use crate::types::ChatStreamLine;

/// Parses an HTTP response body as a chunk stream.
pub fn parse_ndjson_stream(response: reqwest::Response) -> ChunkStream {
    ndjson_chunks(response.bytes_stream())
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

struct LineReader {
    bytes: ByteStream,
    buffer: Vec<u8>,
    exhausted: bool,
    finished: bool,
}

impl LineReader {
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        Some(line)
    }
}

/// Builds a chunk stream from any stream of byte buffers.
pub fn ndjson_chunks<S>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let reader = LineReader {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        exhausted: false,
        finished: false,
    };

    Box::pin(stream::unfold(reader, |mut reader| async move {
        if reader.finished {
            return None;
        }
        loop {
            let line = match reader.next_line() {
                Some(line) => Some(line),
                None if reader.exhausted && !reader.buffer.is_empty() => {
                    Some(std::mem::take(&mut reader.buffer))
                }
                None if reader.exhausted => return None,
                None => None,
            };

            if let Some(line) = line {
                match parse_line(&line) {
                    Some(Ok(chunk)) => {
                        reader.finished = chunk.done;
                        return Some((Ok(chunk), reader));
                    }
                    Some(Err(e)) => {
                        reader.finished = true;
                        return Some((Err(e), reader));
                    }
                    None => continue,
                }
            }

            match reader.bytes.next().await {
                Some(Ok(bytes)) => reader.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    reader.finished = true;
                    return Some((
                        Err(SkiffError::Provider {
                            message: format!("stream read error: {e}"),
                            source: Some(Box::new(e)),
                        }),
                        reader,
                    ));
                }
                None => reader.exhausted = true,
            }
        }
    }))
}

/// Parses one line. `None` means the line carries nothing and is skipped.
fn parse_line(line: &[u8]) -> Option<Result<ChatChunk, SkiffError>> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    let parsed: ChatStreamLine = match serde_json::from_str(text) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "skipping malformed NDJSON line");
            return None;
        }
    };

    if let Some(error) = parsed.error {
        return Some(Err(SkiffError::provider(format!(
            "Ollama returned an error during streaming: {error}"
        ))));
    }

    let (text, tool_calls) = match parsed.message {
        Some(msg) => (
            msg.content,
            msg.tool_calls.into_iter().map(ToolCall::from).collect(),
        ),
        None => (String::new(), Vec::new()),
    };

    let usage = parsed.done.then_some(TokenUsage {
        prompt_tokens: parsed.prompt_eval_count,
        completion_tokens: parsed.eval_count,
    });
    if parsed.done {
        debug!(
            model = %parsed.model,
            prompt_tokens = parsed.prompt_eval_count,
            completion_tokens = parsed.eval_count,
            "stream complete"
        );
    }

    Some(Ok(ChatChunk {
        text,
        tool_calls,
        done: parsed.done,
        usage,
        done_reason: parsed.done_reason,
    }))
}
