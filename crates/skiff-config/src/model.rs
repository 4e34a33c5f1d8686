// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Skiff.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use skiff_core::ClassificationLevel;

/// Top-level Skiff configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SkiffConfig {
    /// Agent loop behavior and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tier routing policy.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Local inference server (Ollama).
    #[serde(default)]
    pub local: LocalConfig,

    /// Cloud inference API (OpenRouter).
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Paranoid and offline switches.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Built-in tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Response cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Agent loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Maximum dispatch rounds per agentic run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Character budget for a single tool result before truncation.
    #[serde(default = "default_tool_result_max_chars")]
    pub tool_result_max_chars: usize,

    /// Maximum size of a file included with `--file`.
    #[serde(default = "default_file_max_bytes")]
    pub file_max_bytes: u64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional system prompt prepended to non-agentic asks.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_result_max_chars: default_tool_result_max_chars(),
            file_max_bytes: default_file_max_bytes(),
            log_level: default_log_level(),
            system_prompt: None,
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

fn default_tool_result_max_chars() -> usize {
    4000
}

fn default_file_max_bytes() -> u64 {
    50 * 1024
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Requested routing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Let the cloud auto-router pick a model when a credential exists.
    #[default]
    Auto,
    /// Local server only.
    Local,
    /// Cloud tiers chosen by query complexity.
    Cloud,
    /// Alias of `auto`.
    Hybrid,
}

impl RoutingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingMode::Auto => "auto",
            RoutingMode::Local => "local",
            RoutingMode::Cloud => "cloud",
            RoutingMode::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RoutingMode::Auto),
            "local" => Ok(RoutingMode::Local),
            "cloud" => Ok(RoutingMode::Cloud),
            "hybrid" => Ok(RoutingMode::Hybrid),
            other => Err(format!(
                "unknown routing mode `{other}` (expected auto, local, cloud or hybrid)"
            )),
        }
    }
}

/// Tier routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Routing mode: auto, local, cloud, hybrid.
    #[serde(default)]
    pub mode: RoutingMode,

    /// Highest tier a query may be routed to (cache, local, cloud, haiku, sonnet, opus, gpt-4o).
    #[serde(default)]
    pub max_tier: Option<String>,

    /// Keep simple queries local even in auto mode.
    #[serde(default)]
    pub auto_prefer_local: bool,

    /// Per-query cost ceiling in cents. 0 disables the ceiling.
    #[serde(default)]
    pub auto_max_cost: f64,

    /// Fall back to the local server when a cloud call fails.
    #[serde(default = "default_true")]
    pub auto_fallback: bool,

    /// Classification applied to queries that do not specify one.
    #[serde(default)]
    pub default_classification: ClassificationLevel,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: RoutingMode::default(),
            max_tier: None,
            auto_prefer_local: false,
            auto_max_cost: 0.0,
            auto_fallback: true,
            default_classification: ClassificationLevel::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Local inference server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    /// Base URL of the Ollama server.
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    /// Model used for local requests.
    #[serde(default = "default_local_model")]
    pub model: String,

    /// Connect/read timeout for local requests, in seconds.
    #[serde(default = "default_local_timeout_secs")]
    pub timeout_secs: u64,

    /// Models tried, in order, when the configured model is not suited to tool use.
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            model: default_local_model(),
            timeout_secs: default_local_timeout_secs(),
            fallback_models: default_fallback_models(),
        }
    }
}

fn default_local_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_local_model() -> String {
    "qwen2.5-coder:14b".to_string()
}

fn default_local_timeout_secs() -> u64 {
    30
}

fn default_fallback_models() -> Vec<String> {
    ["qwen2.5:32b", "qwen2.5:14b", "mistral:latest", "llama3.2:latest"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Cloud inference API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConfig {
    /// OpenRouter API key. `None` falls back to `OPENROUTER_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_cloud_base_url")]
    pub base_url: String,

    /// Model identifier. `openrouter/auto` lets the service choose.
    #[serde(default = "default_cloud_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_cloud_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for rate-limit and server errors.
    #[serde(default = "default_cloud_max_retries")]
    pub max_retries: u32,

    /// Sent as `HTTP-Referer`.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Sent as `X-Title`.
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_cloud_base_url(),
            model: default_cloud_model(),
            timeout_secs: default_cloud_timeout_secs(),
            max_retries: default_cloud_max_retries(),
            site_url: default_site_url(),
            app_name: default_app_name(),
        }
    }
}

fn default_cloud_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_cloud_model() -> String {
    "openrouter/auto".to_string()
}

fn default_cloud_timeout_secs() -> u64 {
    60
}

fn default_cloud_max_retries() -> u32 {
    3
}

fn default_site_url() -> String {
    "https://github.com/skiff-cli/skiff".to_string()
}

fn default_app_name() -> String {
    "skiff".to_string()
}

/// Local-only switches.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Never route to the cloud.
    #[serde(default)]
    pub paranoid: bool,

    /// No network beyond the local server. Implies `paranoid`.
    #[serde(default)]
    pub offline: bool,
}

/// Built-in tool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Root directory for glob and grep. Defaults to the current directory.
    #[serde(default)]
    pub workspace: Option<String>,

    /// Default timeout for shell commands, in seconds.
    #[serde(default = "default_bash_timeout_secs")]
    pub bash_timeout_secs: u64,

    /// Register the WebFetch tool.
    #[serde(default = "default_true")]
    pub enable_web_fetch: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            bash_timeout_secs: default_bash_timeout_secs(),
            enable_web_fetch: true,
        }
    }
}

fn default_bash_timeout_secs() -> u64 {
    30
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum cached entries before the oldest is evicted.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    1000
}

impl SkiffConfig {
    /// Cloud API key from config, falling back to `OPENROUTER_API_KEY`.
    ///
    /// Empty strings count as absent.
    pub fn cloud_api_key(&self) -> Option<String> {
        self.cloud
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var("OPENROUTER_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    /// Whether any local-only switch is on.
    pub fn is_paranoid(&self) -> bool {
        self.security.paranoid || self.security.offline
    }
}
