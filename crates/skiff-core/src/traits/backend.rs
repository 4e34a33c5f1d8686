// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference backend contract.
//!
//! Local backends stream partial results while cloud backends answer in one
//! shot. Both come back through [`ChatBackend::dispatch`] as a [`Dispatch`],
//! so callers never need to know which shape produced the final text.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::StreamExt;
use futures_core::Stream;

use crate::error::SkiffError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatChunk, ChatRequest, ChatResponse};

/// Boxed stream of response chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, SkiffError>> + Send>>;

/// Result of a single dispatch: one complete answer or a chunk sequence.
pub enum Dispatch {
    Complete(ChatResponse),
    Streaming(ChunkStream),
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Complete(resp) => f.debug_tuple("Complete").field(resp).finish(),
            Dispatch::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

impl Dispatch {
    /// Drains the dispatch into `acc`, forwarding text to `on_token` as it arrives.
    ///
    /// On a stream error, whatever arrived before the failure stays in `acc`.
    /// A complete response is forwarded to `on_token` in one piece.
    pub async fn drain_into(
        self,
        acc: &mut ChatResponse,
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> Result<(), SkiffError> {
        match self {
            Dispatch::Complete(resp) => {
                if !resp.content.is_empty() {
                    on_token(&resp.content);
                }
                acc.content.push_str(&resp.content);
                acc.tool_calls.extend(resp.tool_calls);
                acc.usage = resp.usage;
                acc.model = resp.model;
                acc.done_reason = resp.done_reason;
                Ok(())
            }
            Dispatch::Streaming(mut stream) => {
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    if !chunk.text.is_empty() {
                        on_token(&chunk.text);
                        acc.content.push_str(&chunk.text);
                    }
                    acc.tool_calls.extend(chunk.tool_calls);
                    if chunk.done {
                        if let Some(usage) = chunk.usage {
                            acc.usage = usage;
                        }
                        acc.done_reason = chunk.done_reason;
                        break;
                    }
                }
                Ok(())
            }
        }
    }

    /// Drains the dispatch without forwarding tokens.
    pub async fn into_response(self) -> Result<ChatResponse, SkiffError> {
        let mut acc = ChatResponse::default();
        self.drain_into(&mut acc, &mut |_: &str| {}).await?;
        Ok(acc)
    }
}

/// An inference backend the router and agent loop can dispatch to.
#[async_trait]
pub trait ChatBackend: PluginAdapter {
    /// Model identifier this backend sends requests to.
    fn model(&self) -> &str;

    /// Whether requests leave the machine (and are billed).
    fn is_cloud(&self) -> bool;

    /// Sends the conversation and returns either a full answer or a chunk stream.
    async fn dispatch(&self, request: ChatRequest) -> Result<Dispatch, SkiffError>;
}

/// A model installed on a local inference server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
    pub family: Option<String>,
    pub parameter_size: Option<String>,
}

/// Model inventory of a local inference server.
#[async_trait]
pub trait LocalModels: Send + Sync {
    /// Lists installed models.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, SkiffError>;

    /// Whether `name` is installed. A bare name matches its `:latest` tag.
    async fn model_exists(&self, name: &str) -> Result<bool, SkiffError> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| model_name_matches(&m.name, name)))
    }
}

/// Compares model names, treating a missing tag as `:latest`.
pub fn model_name_matches(installed: &str, wanted: &str) -> bool {
    fn with_tag(name: &str) -> String {
        if name.contains(':') {
            name.to_string()
        } else {
            format!("{name}:latest")
        }
    }
    with_tag(installed) == with_tag(wanted)
}
