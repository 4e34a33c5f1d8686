// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenRouter cloud backend adapter for Skiff.
//!
//! This crate implements [`ChatBackend`] for the OpenRouter chat completions
//! API. Requests are non-streaming: every dispatch yields a single
//! [`Dispatch::Complete`] answer.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use skiff_config::model::CloudConfig;
use skiff_core::{
    ChatBackend, ChatRequest, ChatResponse, Dispatch, HealthStatus, PluginAdapter, SkiffError,
    TokenUsage,
};
use tracing::{debug, info};

pub use crate::client::{ClientSettings, DEFAULT_BASE_URL, MAX_RESPONSE_BYTES, OpenRouterClient};
use crate::types::{ApiMessage, CompletionRequest};

/// Cloud inference backend talking to OpenRouter.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    client: OpenRouterClient,
    model: String,
}

impl OpenRouterBackend {
    pub fn new(settings: ClientSettings, model: impl Into<String>) -> Result<Self, SkiffError> {
        if settings.api_key.trim().is_empty() {
            return Err(SkiffError::Config(
                "OpenRouter API key is not set (cloud.api_key or OPENROUTER_API_KEY)".into(),
            ));
        }
        let client = OpenRouterClient::new(settings)?;
        let model = model.into();
        info!(model = %model, "OpenRouter backend initialized");
        Ok(Self { client, model })
    }

    /// Creates a backend from the `[cloud]` config section and a resolved key.
    pub fn from_config(config: &CloudConfig, api_key: String) -> Result<Self, SkiffError> {
        Self::new(
            ClientSettings {
                api_key,
                base_url: config.base_url.clone(),
                timeout: Duration::from_secs(config.timeout_secs),
                max_retries: config.max_retries,
                site_url: config.site_url.clone(),
                app_name: config.app_name.clone(),
            },
            config.model.clone(),
        )
    }

    /// Returns a copy targeting a different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    /// A configured client is assumed healthy; probing would cost money.
    async fn health_check(&self) -> Result<HealthStatus, SkiffError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    fn model(&self) -> &str {
        &self.model
    }

    fn is_cloud(&self) -> bool {
        true
    }

    async fn dispatch(&self, request: ChatRequest) -> Result<Dispatch, SkiffError> {
        let body = CompletionRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            stream: false,
        };
        debug!(model = %body.model, messages = body.messages.len(), "dispatching to OpenRouter");

        let resp = self.client.complete(&body).await?;
        let usage = resp.usage.unwrap_or_default();
        let (content, done_reason) = match resp.choices.into_iter().next() {
            Some(choice) => (
                choice.message.content.unwrap_or_default(),
                choice.finish_reason,
            ),
            None => return Err(SkiffError::provider("OpenRouter returned no choices")),
        };

        Ok(Dispatch::Complete(ChatResponse {
            content,
            tool_calls: Vec::new(),
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
            model: resp.model.unwrap_or_else(|| self.model.clone()),
            done_reason,
        }))
    }
}

/// Checks the shape of an OpenRouter key: `sk-or-` prefix, at least 38
/// characters, and at least 10 distinct characters after the prefix.
pub fn validate_api_key(key: &str) -> bool {
    let key = key.trim();
    let Some(rest) = key.strip_prefix("sk-or-") else {
        return false;
    };
    if key.len() < 38 {
        return false;
    }
    let mut distinct: Vec<char> = rest.chars().collect();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len() >= 10
}

/// First 8 characters followed by `...`, for display.
pub fn mask_api_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}...")
}
