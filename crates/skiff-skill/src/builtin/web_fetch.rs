// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in URL fetch tool.
//!
//! Every request goes through the SSRF guard: the URL is validated up front,
//! the client resolves DNS through a private-address filter, and each
//! redirect hop is re-validated.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use skiff_core::SkiffError;
use skiff_security::{build_fetch_client, redact, validate_fetch_url};
use tracing::{debug, warn};

use super::truncate_at_boundary;
use crate::tool::{Tool, ToolOutput};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_REDIRECTS: usize = 5;
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
/// Characters of converted text returned when the call does not say.
pub const DEFAULT_MAX_LENGTH: usize = 50_000;

/// Column width for HTML-to-text rendering.
const TEXT_WIDTH: usize = 100;

#[derive(Debug, Deserialize)]
struct WebFetchParams {
    url: String,
    max_length: Option<usize>,
}

/// Fetches a URL and returns its content as text.
pub struct WebFetchTool {
    client: reqwest::Client,
    allowed_private_ips: Vec<IpAddr>,
}

impl WebFetchTool {
    /// `allowed_private_ips` lets specific private addresses through the SSRF guard.
    pub fn new(allowed_private_ips: Vec<IpAddr>) -> Result<Self, SkiffError> {
        let client = build_fetch_client(allowed_private_ips.clone(), FETCH_TIMEOUT, MAX_REDIRECTS)?;
        Ok(Self {
            client,
            allowed_private_ips,
        })
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "WebFetch"
    }

    fn description(&self) -> &str {
        "Fetch an http or https URL and return its content as plain text"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The http or https URL to fetch"
                },
                "max_length": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum characters of content to return (default 50000)"
                }
            },
            "required": ["url"]
        })
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"url": "https://docs.rs/tokio"})
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SkiffError> {
        let params: WebFetchParams =
            serde_json::from_value(input).map_err(|e| SkiffError::Tool {
                message: format!("invalid WebFetch arguments: {e}"),
                source: Some(Box::new(e)),
            })?;

        let url = match validate_fetch_url(&params.url, &self.allowed_private_ips) {
            Ok(url) => url,
            Err(e) => return Ok(ToolOutput::error(format!("SSRF prevention: {e}"))),
        };

        debug!(url = %url, "fetching");
        let response = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                let message = redact(&e.to_string(), &[]);
                warn!(url = %url, error = %message, "fetch failed");
                return Ok(ToolOutput::error(format!("fetch failed: {message}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(ToolOutput::error(format!("HTTP {status} from {url}")));
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            return Ok(ToolOutput::error(format!(
                "response too large (max {} MB)",
                MAX_BODY_BYTES / (1024 * 1024)
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut body: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        let mut clipped = false;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => return Ok(ToolOutput::error(format!("fetch failed: {e}"))),
            };
            let room = MAX_BODY_BYTES - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                clipped = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let raw = String::from_utf8_lossy(&body);
        let text = if content_type.contains("html") {
            match html2text::from_read(raw.as_bytes(), TEXT_WIDTH) {
                Ok(text) => text,
                Err(e) => {
                    warn!(url = %url, error = %e, "html conversion failed, returning raw body");
                    raw.into_owned()
                }
            }
        } else {
            raw.into_owned()
        };

        let max_length = params.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        let mut content = truncate_chars(&text, max_length);
        if clipped || content.len() < text.len() {
            content.push_str("\n... (truncated)");
        }

        Ok(ToolOutput::ok(format!(
            "URL: {url}\nContent-Type: {content_type}\n\n--- Content ---\n{content}"
        )))
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => truncate_at_boundary(text, byte_idx).to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn loopback_tool() -> WebFetchTool {
        WebFetchTool::new(vec!["127.0.0.1".parse().unwrap()]).unwrap()
    }

    #[tokio::test]
    async fn html_is_converted_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html><body><h1>Title</h1><p>Hello <b>world</b></p></body></html>"),
            )
            .mount(&server)
            .await;

        let out = loopback_tool()
            .invoke(serde_json::json!({"url": format!("{}/page", server.uri())}))
            .await
            .unwrap();
        assert!(!out.is_error, "{}", out.content);
        assert!(out.content.contains("Content-Type: text/html"));
        assert!(out.content.contains("--- Content ---"));
        assert!(out.content.contains("Hello"));
        assert!(!out.content.contains("<p>"));
    }

    #[tokio::test]
    async fn long_bodies_are_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("ab".repeat(100)),
            )
            .mount(&server)
            .await;

        let out = loopback_tool()
            .invoke(serde_json::json!({"url": server.uri(), "max_length": 10}))
            .await
            .unwrap();
        assert!(out.content.ends_with("ababababab\n... (truncated)"));
    }

    #[tokio::test]
    async fn http_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let out = loopback_tool()
            .invoke(serde_json::json!({"url": server.uri()}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.starts_with("HTTP 404"));
    }

    #[tokio::test]
    async fn private_targets_are_blocked_without_allowlist() {
        let tool = WebFetchTool::new(Vec::new()).unwrap();
        let out = tool
            .invoke(serde_json::json!({"url": "http://169.254.169.254/latest/meta-data"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.starts_with("SSRF prevention:"));
    }

    #[tokio::test]
    async fn non_http_scheme_is_blocked() {
        let tool = WebFetchTool::new(Vec::new()).unwrap();
        let out = tool
            .invoke(serde_json::json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("only http and https"));
    }

    #[test]
    fn truncate_chars_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 5), "hi");
    }
}
