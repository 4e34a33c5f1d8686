// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./skiff.toml` > `~/.config/skiff/skiff.toml` > `/etc/skiff/skiff.toml`
//! with environment variable overrides via `SKIFF_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SkiffConfig;

/// Sections that env var names are split on.
const SECTIONS: &[&str] = &[
    "agent", "routing", "local", "cloud", "security", "tools", "cache",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/skiff/skiff.toml` (system-wide)
/// 3. `~/.config/skiff/skiff.toml` (user XDG config)
/// 4. `./skiff.toml` (local directory)
/// 5. `SKIFF_*` environment variables
pub fn load_config() -> Result<SkiffConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SkiffConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SkiffConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SkiffConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SkiffConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SkiffConfig::default()))
        .merge(Toml::file("/etc/skiff/skiff.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("skiff/skiff.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("skiff.toml"))
        .merge(env_provider())
}

/// Environment variable provider mapping `SKIFF_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` so keys that contain
/// underscores survive: `SKIFF_CLOUD_API_KEY` maps to `cloud.api_key`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("SKIFF_").map(|key| {
        let key_str = key.as_str();
        let mapped = SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
