// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenRouter chat completions API.
//!
//! Provides [`OpenRouterClient`] which handles authentication headers,
//! response size limits, status mapping, and retry with exponential backoff
//! for rate limits and server errors.

use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use skiff_core::SkiffError;
use skiff_security::redact;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, CompletionRequest, CompletionResponse};

/// Default API base.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Responses larger than this are rejected.
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Connection settings for [`OpenRouterClient::new`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub site_url: String,
    pub app_name: String,
}

/// HTTP client for OpenRouter.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_base: Duration,
    /// Values scrubbed from every error message.
    secrets: Vec<String>,
}

impl OpenRouterClient {
    pub fn new(settings: ClientSettings) -> Result<Self, SkiffError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", settings.api_key)).map_err(|e| {
                SkiffError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !settings.site_url.is_empty() {
            headers.insert(
                "HTTP-Referer",
                HeaderValue::from_str(&settings.site_url).map_err(|e| {
                    SkiffError::Config(format!("invalid site_url header value: {e}"))
                })?,
            );
        }
        if !settings.app_name.is_empty() {
            headers.insert(
                "X-Title",
                HeaderValue::from_str(&settings.app_name).map_err(|e| {
                    SkiffError::Config(format!("invalid app_name header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SkiffError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            retry_base: RETRY_BASE_DELAY,
            secrets: vec![settings.api_key],
        })
    }

    /// Shortens the backoff (for testing retries without real delays).
    #[cfg(test)]
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Sends a non-streaming completion request.
    ///
    /// 429 and 5xx responses, timeouts, and connection failures are retried
    /// up to `max_retries` times. Other failures return immediately.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, SkiffError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base, attempt - 1);
                warn!(attempt, ?delay, "retrying completion request after transient error");
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(request).send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    let message = self.scrub(&format!("request to OpenRouter failed: {e}"));
                    warn!(error = %message, attempt, "transient network error");
                    last_error = Some(SkiffError::Provider {
                        message,
                        source: Some(Box::new(e)),
                    });
                    continue;
                }
                Err(e) => {
                    return Err(SkiffError::Provider {
                        message: self.scrub(&format!("HTTP request failed: {e}")),
                        source: Some(Box::new(e)),
                    });
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = self.read_limited(response).await?;
                return serde_json::from_slice(&body).map_err(|e| SkiffError::Provider {
                    message: format!("failed to parse API response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let error = self.status_error(status, &body, &request.model);
            if is_transient_error(status) {
                warn!(status = %status, error = %error, "transient error, will retry");
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| {
            SkiffError::provider("completion request failed after retries")
        }))
    }

    /// Reads the body, failing once it grows past [`MAX_RESPONSE_BYTES`].
    async fn read_limited(&self, response: reqwest::Response) -> Result<Vec<u8>, SkiffError> {
        if response
            .content_length()
            .is_some_and(|len| len > MAX_RESPONSE_BYTES as u64)
        {
            return Err(too_large());
        }
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SkiffError::Provider {
                message: self.scrub(&format!("failed to read response body: {e}")),
                source: Some(Box::new(e)),
            })?;
            if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn status_error(&self, status: StatusCode, body: &str, model: &str) -> SkiffError {
        let detail = serde_json::from_str::<ApiErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());
        let message = match status.as_u16() {
            401 => "authentication failed: invalid or revoked OpenRouter API key".to_string(),
            402 => "insufficient credits: add funds at https://openrouter.ai/credits".to_string(),
            404 => format!("model not found: {model}"),
            429 => format!("rate limited by OpenRouter: {detail}"),
            _ => format!("OpenRouter API error ({status}): {detail}"),
        };
        SkiffError::provider(self.scrub(&message))
    }

    fn scrub(&self, text: &str) -> String {
        redact(text, &self.secrets)
    }
}

fn too_large() -> SkiffError {
    SkiffError::provider(format!(
        "response exceeded maximum size of {MAX_RESPONSE_BYTES} bytes"
    ))
}

/// `base × 2^retry`, capped at 10 s.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry))
        .min(RETRY_MAX_DELAY)
}

/// Statuses worth retrying: rate limits and server errors.
fn is_transient_error(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "sk-or-v1-abcdefghijklmnopqrstuvwxyz0123456789";

    fn client(server: &MockServer, max_retries: u32) -> OpenRouterClient {
        OpenRouterClient::new(ClientSettings {
            api_key: KEY.into(),
            base_url: format!("{}/api/v1", server.uri()),
            timeout: Duration::from_secs(5),
            max_retries,
            site_url: "https://github.com/skiff-cli/skiff".into(),
            app_name: "skiff".into(),
        })
        .unwrap()
        .with_retry_base(Duration::from_millis(5))
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "openrouter/auto".into(),
            messages: vec![ApiMessage {
                role: "user",
                content: "research X".into(),
            }],
            stream: false,
        }
    }

    fn ok_body() -> serde_json::Value {
        serde_json::json!({
            "model": "anthropic/claude-3.5-sonnet",
            "choices": [{"message": {"role": "assistant", "content": "Done."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        })
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(base, 10), Duration::from_secs(10));
    }

    #[test]
    fn transient_statuses() {
        assert!(is_transient_error(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_error(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_error(StatusCode::UNAUTHORIZED));
        assert!(!is_transient_error(StatusCode::PAYMENT_REQUIRED));
    }

    #[tokio::test]
    async fn sends_auth_and_attribution_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", format!("Bearer {KEY}").as_str()))
            .and(header("HTTP-Referer", "https://github.com/skiff-cli/skiff"))
            .and(header("X-Title", "skiff"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server, 0).complete(&request()).await.unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("Done."));
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(
                serde_json::json!({"error": {"code": 429, "message": "slow down"}}),
            ))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .mount(&server)
            .await;

        let resp = client(&server, 3).complete(&request()).await.unwrap();
        assert_eq!(resp.usage.unwrap().prompt_tokens, 10);
    }

    #[tokio::test]
    async fn server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 2).complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("upstream down"));
    }

    #[tokio::test]
    async fn status_codes_map_to_messages_without_retry() {
        for (status, needle) in [
            (401, "authentication failed"),
            (402, "insufficient credits"),
            (404, "model not found: openrouter/auto"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_json(
                    serde_json::json!({"error": {"code": status, "message": "nope"}}),
                ))
                .expect(1)
                .mount(&server)
                .await;

            let err = client(&server, 3).complete(&request()).await.unwrap_err();
            assert!(err.to_string().contains(needle), "{status}: {err}");
        }
    }

    #[tokio::test]
    async fn api_key_never_appears_in_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"error": {"code": 400, "message": format!("bad key {KEY}")}}),
            ))
            .mount(&server)
            .await;

        let err = client(&server, 0).complete(&request()).await.unwrap_err();
        assert!(!err.to_string().contains(KEY), "{err}");
    }

    #[tokio::test]
    async fn oversized_response_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_RESPONSE_BYTES + 1)))
            .mount(&server)
            .await;

        let err = client(&server, 0).complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("maximum size"));
    }
}
