// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Ollama API.
//!
//! Provides [`OllamaClient`] which handles URL validation, the streaming
//! `/api/chat` endpoint, and the `/api/tags` model inventory.

use std::time::Duration;

use reqwest::StatusCode;
use skiff_core::{ChunkStream, SkiffError};
use tracing::debug;
use url::Url;

use crate::ndjson;
use crate::types::{ApiErrorResponse, ChatRequestBody, TagsResponse};

/// Default local server address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default local model.
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:14b";

/// HTTP client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Creates a client for `base_url`. `timeout` bounds the connect and
    /// each read, so a stream may run longer as long as tokens keep coming.
    ///
    /// Plain `http` is only accepted for loopback hosts; remote servers must
    /// use `https`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SkiffError> {
        let base_url = validate_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| SkiffError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a streaming chat request and returns the chunk stream.
    pub async fn chat_stream(&self, body: &ChatRequestBody) -> Result<ChunkStream, SkiffError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| connection_error(&self.base_url, e))?;

        let status = response.status();
        debug!(status = %status, model = %body.model, "chat response received");
        if status.is_success() {
            return Ok(ndjson::parse_ndjson_stream(response));
        }

        let text = response.text().await.unwrap_or_default();
        Err(status_error(status, &text, &body.model))
    }

    /// Fetches the installed model list.
    pub async fn tags(&self) -> Result<TagsResponse, SkiffError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| connection_error(&self.base_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SkiffError::provider(format!(
                "Ollama API returned {status} listing models: {text}"
            )));
        }
        response.json().await.map_err(|e| SkiffError::Provider {
            message: format!("failed to parse model list: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn connection_error(base_url: &str, e: reqwest::Error) -> SkiffError {
    let message = if e.is_connect() {
        format!("cannot connect to Ollama at {base_url}; is `ollama serve` running?")
    } else if e.is_timeout() {
        format!("request to Ollama at {base_url} timed out")
    } else {
        format!("HTTP request to Ollama failed: {e}")
    };
    SkiffError::Provider {
        message,
        source: Some(Box::new(e)),
    }
}

fn status_error(status: StatusCode, body: &str, model: &str) -> SkiffError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string());
    if status == StatusCode::NOT_FOUND || detail.contains("not found") {
        return SkiffError::provider(format!(
            "model not found: {model} (pull it with `ollama pull {model}`)"
        ));
    }
    SkiffError::provider(format!("Ollama API returned {status}: {detail}"))
}

/// Normalizes `raw` and enforces https for non-loopback hosts.
fn validate_base_url(raw: &str) -> Result<String, SkiffError> {
    let raw = if raw.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        raw.trim()
    };
    let url = Url::parse(raw)
        .map_err(|e| SkiffError::Config(format!("invalid Ollama URL '{raw}': {e}")))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let loopback = match url.host() {
                Some(url::Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
                Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
                Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
                None => false,
            };
            if !loopback {
                return Err(SkiffError::Security(format!(
                    "plain HTTP is only allowed for a loopback Ollama server, use https for '{raw}'"
                )));
            }
        }
        other => {
            return Err(SkiffError::Config(format!(
                "unsupported Ollama URL scheme '{other}'"
            )));
        }
    }

    Ok(raw.trim_end_matches('/').to_string())
}
