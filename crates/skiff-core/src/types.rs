// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation, tool-call, and policy types shared by every Skiff crate.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is reachable but something is off (e.g. model not pulled).
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// Data classification level attached to a query.
///
/// Levels are ordered; anything at or above [`ClassificationLevel::Cui`]
/// must never leave the machine.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationLevel {
    #[default]
    #[strum(serialize = "unclassified", to_string = "UNCLASSIFIED")]
    Unclassified,
    #[strum(serialize = "cui", to_string = "CUI")]
    Cui,
    #[strum(serialize = "confidential", to_string = "CONFIDENTIAL")]
    Confidential,
    #[strum(serialize = "secret", to_string = "SECRET")]
    Secret,
    #[strum(
        serialize = "top-secret",
        serialize = "topsecret",
        serialize = "top_secret",
        to_string = "TOP SECRET"
    )]
    TopSecret,
}

impl ClassificationLevel {
    /// Whether data at this level is forbidden from cloud dispatch.
    pub fn blocks_cloud(self) -> bool {
        self >= ClassificationLevel::Cui
    }
}

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A structured request from the model to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as registered in the tool registry.
    pub name: String,
    /// Argument object. Always a JSON object, possibly empty.
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool calls requested by the assistant (assistant messages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Name of the tool that produced this result (tool messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant turn that carries tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: calls,
            tool_name: None,
        }
    }

    /// Tool result message. `content` is stored verbatim.
    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: Some(tool_name.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }
}

/// Token usage reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Tool description advertised to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object.
    pub parameters: serde_json::Value,
}

/// A chat request sent to a backend.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Full conversation history, oldest first.
    pub messages: Vec<Message>,
    /// Tools the backend may call natively. Empty disables native tool calling.
    pub tools: Vec<ToolDefinition>,
}

/// A complete response from a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    /// Native tool calls, if the backend emitted any.
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub model: String,
    pub done_reason: Option<String>,
}

/// One incremental piece of a streamed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// Terminal chunk marker.
    pub done: bool,
    /// Present on the terminal chunk.
    pub usage: Option<TokenUsage>,
    pub done_reason: Option<String>,
}

/// Hit/lookup counters reported by a cache tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub lookups: u64,
}

impl CacheStats {
    /// Hit rate as a percentage in `0.0..=100.0`.
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / self.lookups as f64 * 100.0
    }
}

/// Events delivered to the audit collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    RoutingDecision {
        tier: String,
        classification: ClassificationLevel,
        estimated_cost_cents: f64,
        reason: String,
    },
    BackendSelected {
        backend: String,
        model: String,
    },
    ToolExecution {
        tool: String,
        success: bool,
        duration_ms: u64,
    },
}
