// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama local backend adapter for Skiff.
//!
//! This crate implements [`ChatBackend`] for the Ollama `/api/chat` endpoint
//! with streamed NDJSON responses, and [`LocalModels`] over `/api/tags`.

pub mod client;
pub mod ndjson;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use skiff_config::model::LocalConfig;
use skiff_core::{
    ChatBackend, ChatRequest, Dispatch, HealthStatus, LocalModels, ModelInfo, PluginAdapter,
    SkiffError,
};
use tracing::{debug, info};

pub use crate::client::{DEFAULT_BASE_URL, DEFAULT_MODEL, OllamaClient};
use crate::types::{ChatOptions, ChatRequestBody, OllamaMessage, OllamaTool};

/// Local inference backend talking to an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: OllamaClient,
    model: String,
    options: Option<ChatOptions>,
}

impl OllamaBackend {
    /// Creates a backend for `model` on the server at `base_url`.
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> Result<Self, SkiffError> {
        let client = OllamaClient::new(base_url, timeout)?;
        let model = model.into();
        info!(model = %model, base_url = client.base_url(), "Ollama backend initialized");
        Ok(Self {
            client,
            model,
            options: None,
        })
    }

    /// Creates a backend from the `[local]` config section.
    pub fn from_config(config: &LocalConfig) -> Result<Self, SkiffError> {
        Self::new(
            &config.base_url,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Returns a copy targeting a different model on the same server.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            model: model.into(),
            options: self.options.clone(),
        }
    }

    /// Sets generation options sent with every request.
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = Some(options);
        self
    }

    fn to_body(&self, request: &ChatRequest) -> ChatRequestBody {
        ChatRequestBody {
            model: self.model.clone(),
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            stream: true,
            tools: request.tools.iter().map(OllamaTool::from).collect(),
            options: self.options.clone(),
        }
    }
}

#[async_trait]
impl PluginAdapter for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SkiffError> {
        match self.model_exists(&self.model).await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded(format!(
                "model {} is not installed; run `ollama pull {}`",
                self.model, self.model
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn model(&self) -> &str {
        &self.model
    }

    fn is_cloud(&self) -> bool {
        false
    }

    async fn dispatch(&self, request: ChatRequest) -> Result<Dispatch, SkiffError> {
        let body = self.to_body(&request);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "dispatching to Ollama"
        );
        let stream = self.client.chat_stream(&body).await?;
        Ok(Dispatch::Streaming(stream))
    }
}

#[async_trait]
impl LocalModels for OllamaBackend {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, SkiffError> {
        let tags = self.client.tags().await?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| {
                let details = m.details.unwrap_or_default();
                ModelInfo {
                    name: m.name,
                    size_bytes: m.size,
                    family: details.family,
                    parameter_size: details.parameter_size,
                }
            })
            .collect())
    }
}
