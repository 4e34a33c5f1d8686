// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints that serde attributes cannot express and
//! collects every failure instead of stopping at the first.

use crate::diagnostic::{suggest_key, ConfigError};
use crate::model::SkiffConfig;

/// Tier names accepted by `routing.max_tier`.
pub const TIER_NAMES: &[&str] = &["cache", "local", "cloud", "haiku", "sonnet", "opus", "gpt-4o"];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &SkiffConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.agent.max_iterations == 0 {
        errors.push(validation("agent.max_iterations must be at least 1"));
    }

    if config.agent.tool_result_max_chars < 100 {
        errors.push(validation(format!(
            "agent.tool_result_max_chars must be at least 100, got {}",
            config.agent.tool_result_max_chars
        )));
    }

    if !LOG_LEVELS.contains(&config.agent.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::UnknownValue {
            key: "agent.log_level".to_string(),
            value: config.agent.log_level.clone(),
            suggestion: suggest_key(&config.agent.log_level, LOG_LEVELS),
            expected: LOG_LEVELS.join(", "),
        });
    }

    if let Some(tier) = &config.routing.max_tier
        && !TIER_NAMES.contains(&tier.to_ascii_lowercase().as_str())
    {
        errors.push(ConfigError::UnknownValue {
            key: "routing.max_tier".to_string(),
            value: tier.clone(),
            suggestion: suggest_key(tier, TIER_NAMES),
            expected: TIER_NAMES.join(", "),
        });
    }

    if config.routing.auto_max_cost < 0.0 || !config.routing.auto_max_cost.is_finite() {
        errors.push(validation(format!(
            "routing.auto_max_cost must be a non-negative number of cents, got {}",
            config.routing.auto_max_cost
        )));
    }

    check_http_url(&mut errors, "local.base_url", &config.local.base_url);
    check_http_url(&mut errors, "cloud.base_url", &config.cloud.base_url);

    if config.local.model.trim().is_empty() {
        errors.push(validation("local.model must not be empty"));
    }

    if config.cloud.model.trim().is_empty() {
        errors.push(validation("cloud.model must not be empty"));
    }

    if config.local.timeout_secs == 0 || config.cloud.timeout_secs == 0 {
        errors.push(validation("backend timeouts must be at least 1 second"));
    }

    if config.tools.bash_timeout_secs == 0 || config.tools.bash_timeout_secs > 600 {
        errors.push(validation(format!(
            "tools.bash_timeout_secs must be between 1 and 600, got {}",
            config.tools.bash_timeout_secs
        )));
    }

    if config.cache.enabled && config.cache.capacity == 0 {
        errors.push(validation("cache.capacity must be at least 1 when the cache is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn check_http_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    let v = value.trim();
    if !(v.starts_with("http://") || v.starts_with("https://")) {
        errors.push(validation(format!(
            "{key} must be an http:// or https:// URL, got `{value}`"
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SkiffConfig::default()).is_ok());
    }

    #[test]
    fn zero_iterations_fails_validation() {
        let mut config = SkiffConfig::default();
        config.agent.max_iterations = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors)
            .iter()
            .any(|m| m.contains("max_iterations")));
    }

    #[test]
    fn unknown_max_tier_gets_suggestion() {
        let mut config = SkiffConfig::default();
        config.routing.max_tier = Some("sonet".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownValue { suggestion: Some(s), .. } if s == "sonnet"
        )));
    }

    #[test]
    fn max_tier_is_case_insensitive() {
        let mut config = SkiffConfig::default();
        config.routing.max_tier = Some("GPT-4o".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn negative_cost_ceiling_fails() {
        let mut config = SkiffConfig::default();
        config.routing.auto_max_cost = -1.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors).iter().any(|m| m.contains("auto_max_cost")));
    }

    #[test]
    fn non_http_base_url_fails() {
        let mut config = SkiffConfig::default();
        config.local.base_url = "127.0.0.1:11434".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors).iter().any(|m| m.contains("local.base_url")));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = SkiffConfig::default();
        config.agent.max_iterations = 0;
        config.cache.capacity = 0;
        config.tools.bash_timeout_secs = 0;
        assert_eq!(validate_config(&config).unwrap_err().len(), 3);
    }

    #[test]
    fn bad_log_level_fails() {
        let mut config = SkiffConfig::default();
        config.agent.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }
}
