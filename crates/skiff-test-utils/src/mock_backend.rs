// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat backend for deterministic testing.
//!
//! `MockBackend` implements `ChatBackend` with pre-configured replies and
//! can answer either as a single `Dispatch::Complete` (cloud shape) or as a
//! `Dispatch::Streaming` chunk sequence (local shape).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use skiff_core::{
    ChatBackend, ChatChunk, ChatRequest, ChatResponse, Dispatch, HealthStatus, PluginAdapter,
    SkiffError, TokenUsage, ToolCall,
};

/// Usage reported for every scripted reply.
pub const MOCK_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 20,
};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain assistant text.
    Text(String),
    /// Assistant text plus native tool calls.
    ToolCalls { content: String, calls: Vec<ToolCall> },
    /// `dispatch` itself fails.
    Error(String),
    /// Streams `partial`, then fails mid-stream. Complete-shape backends fail outright.
    StreamError { partial: String, message: String },
    /// Emits `partial` (streaming only), then never finishes.
    Hang { partial: String },
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }

    /// A reply with a single native tool call.
    pub fn tool_call(name: &str, arguments: serde_json::Value) -> Self {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        MockReply::ToolCalls {
            content: String::new(),
            calls: vec![ToolCall::new(name, arguments)],
        }
    }
}

/// A mock backend that pops replies from a FIFO queue.
///
/// When the queue is empty, the text "mock response" is returned.
pub struct MockBackend {
    model: String,
    cloud: bool,
    streaming: bool,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Streaming, non-billed backend.
    pub fn local() -> Self {
        Self::build("mock-local:7b", false, true)
    }

    /// Complete-shape, billed backend.
    pub fn cloud() -> Self {
        Self::build("mock/cloud", true, false)
    }

    fn build(model: &str, cloud: bool, streaming: bool) -> Self {
        Self {
            model: model.to_string(),
            cloud,
            streaming,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_replies(self, replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            ..self
        }
    }

    /// Add a reply to the end of the queue.
    pub async fn push(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Number of `dispatch` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::text("mock response"))
    }

    fn complete(&self, content: String, calls: Vec<ToolCall>) -> Dispatch {
        Dispatch::Complete(ChatResponse {
            content,
            tool_calls: calls,
            usage: MOCK_USAGE,
            model: self.model.clone(),
            done_reason: Some("stop".to_string()),
        })
    }

    fn stream(content: String, calls: Vec<ToolCall>) -> Dispatch {
        let mut chunks: Vec<Result<ChatChunk, SkiffError>> = split_words(&content)
            .into_iter()
            .map(|text| {
                Ok(ChatChunk {
                    text,
                    ..Default::default()
                })
            })
            .collect();
        chunks.push(Ok(ChatChunk {
            tool_calls: calls,
            done: true,
            usage: Some(MOCK_USAGE),
            done_reason: Some("stop".to_string()),
            ..Default::default()
        }));
        Dispatch::Streaming(Box::pin(stream::iter(chunks)))
    }
}

/// Split text into word-sized pieces that concatenate back to the input.
fn split_words(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        if self.cloud { "mock-cloud" } else { "mock-local" }
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SkiffError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn model(&self) -> &str {
        &self.model
    }

    fn is_cloud(&self) -> bool {
        self.cloud
    }

    async fn dispatch(&self, request: ChatRequest) -> Result<Dispatch, SkiffError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        let (content, calls) = match self.next_reply().await {
            MockReply::Text(text) => (text, Vec::new()),
            MockReply::ToolCalls { content, calls } => (content, calls),
            MockReply::Error(message) => return Err(SkiffError::provider(message)),
            MockReply::StreamError { partial, message } => {
                if !self.streaming {
                    return Err(SkiffError::provider(message));
                }
                let chunks = vec![
                    Ok(ChatChunk {
                        text: partial,
                        ..Default::default()
                    }),
                    Err(SkiffError::provider(message)),
                ];
                return Ok(Dispatch::Streaming(Box::pin(stream::iter(chunks))));
            }
            MockReply::Hang { partial } => {
                if !self.streaming {
                    std::future::pending::<()>().await;
                }
                let head = stream::iter(vec![Ok(ChatChunk {
                    text: partial,
                    ..Default::default()
                })]);
                return Ok(Dispatch::Streaming(Box::pin(head.chain(stream::pending()))));
            }
        };

        if self.streaming {
            Ok(Self::stream(content, calls))
        } else {
            Ok(self.complete(content, calls))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_reply_when_queue_empty() {
        let backend = MockBackend::cloud();
        let resp = backend
            .dispatch(ChatRequest::default())
            .await
            .unwrap()
            .into_response()
            .await
            .unwrap();
        assert_eq!(resp.content, "mock response");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn streaming_reassembles_text_and_usage() {
        let backend =
            MockBackend::local().with_replies(vec![MockReply::text("three little words")]);
        let dispatch = backend.dispatch(ChatRequest::default()).await.unwrap();
        assert!(matches!(dispatch, Dispatch::Streaming(_)));

        let mut tokens = Vec::new();
        let mut acc = ChatResponse::default();
        dispatch
            .drain_into(&mut acc, &mut |t: &str| tokens.push(t.to_string()))
            .await
            .unwrap();
        assert_eq!(acc.content, "three little words");
        assert_eq!(tokens.len(), 3);
        assert_eq!(acc.usage, MOCK_USAGE);
    }

    #[tokio::test]
    async fn tool_call_reply_carries_native_calls() {
        let backend = MockBackend::cloud().with_replies(vec![MockReply::tool_call(
            "Glob",
            serde_json::json!({"pattern": "*.rs"}),
        )]);
        let resp = backend
            .dispatch(ChatRequest::default())
            .await
            .unwrap()
            .into_response()
            .await
            .unwrap();
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "Glob");
    }

    #[tokio::test]
    async fn stream_error_keeps_partial() {
        let backend = MockBackend::local().with_replies(vec![MockReply::StreamError {
            partial: "half".into(),
            message: "connection reset".into(),
        }]);
        let dispatch = backend.dispatch(ChatRequest::default()).await.unwrap();
        let mut acc = ChatResponse::default();
        let err = dispatch
            .drain_into(&mut acc, &mut |_: &str| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(acc.content, "half");
    }

    #[tokio::test]
    async fn records_requests() {
        let backend = MockBackend::cloud().with_replies(vec![MockReply::Error("down".into())]);
        let request = ChatRequest {
            messages: vec![skiff_core::Message::user("hi")],
            tools: Vec::new(),
        };
        assert!(backend.dispatch(request).await.is_err());
        let seen = backend.requests().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].content, "hi");
    }
}
