// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tools for the Skiff agent.

pub mod bash;
pub mod glob;
pub mod grep;
pub mod read;
pub mod web_fetch;

pub use bash::BashTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use read::ReadTool;
pub use web_fetch::WebFetchTool;

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use skiff_core::SkiffError;

use crate::{SandboxPolicy, ToolRegistry};

/// Settings shared by the built-in tools.
#[derive(Debug, Clone)]
pub struct BuiltinOptions {
    /// Directory commands run in and relative paths resolve against.
    pub workspace: PathBuf,
    /// Default timeout for Bash when the call does not give one.
    pub bash_timeout: Duration,
    /// Whether WebFetch is registered at all.
    pub enable_web_fetch: bool,
    /// Private addresses WebFetch may reach anyway.
    pub allowed_private_ips: Vec<IpAddr>,
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            bash_timeout: bash::DEFAULT_TIMEOUT,
            enable_web_fetch: true,
            allowed_private_ips: Vec::new(),
        }
    }
}

/// Registers all built-in tools into the given registry.
pub fn register_builtins(
    registry: &mut ToolRegistry,
    options: &BuiltinOptions,
) -> Result<(), SkiffError> {
    let policy = Arc::new(SandboxPolicy::default());

    registry.register(Arc::new(BashTool::new(
        options.workspace.clone(),
        options.bash_timeout,
        policy.clone(),
    )));
    registry.register(Arc::new(ReadTool::new(options.workspace.clone(), policy.clone())));
    registry.register(Arc::new(GlobTool::new(options.workspace.clone(), policy.clone())));
    registry.register(Arc::new(GrepTool::new(options.workspace.clone(), policy)));
    if options.enable_web_fetch {
        registry.register(Arc::new(WebFetchTool::new(
            options.allowed_private_ips.clone(),
        )?));
    }
    Ok(())
}

/// Resolves `path` against `workspace` unless it is already absolute.
pub(crate) fn resolve(workspace: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        workspace.join(candidate)
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
pub(crate) fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Directories never descended into by Glob and Grep.
pub(crate) const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
    "dist",
    "build",
    ".cache",
];

pub(crate) fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && IGNORED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_builtins_registers_five_tools() {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &BuiltinOptions::default()).unwrap();
        assert_eq!(registry.len(), 5);
        for name in ["Bash", "Read", "Glob", "Grep", "WebFetch"] {
            assert!(registry.get(name).is_some(), "{name}");
        }
    }

    #[test]
    fn web_fetch_can_be_disabled() {
        let mut registry = ToolRegistry::new();
        let options = BuiltinOptions {
            enable_web_fetch: false,
            ..Default::default()
        };
        register_builtins(&mut registry, &options).unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("WebFetch").is_none());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_at_boundary("hello", 10), "hello");
        assert_eq!(truncate_at_boundary("hello", 3), "hel");
        // 'é' is two bytes; cutting at 2 would split it.
        assert_eq!(truncate_at_boundary("aé", 2), "a");
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let ws = Path::new("/work");
        assert_eq!(resolve(ws, "/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(resolve(ws, "src/lib.rs"), PathBuf::from("/work/src/lib.rs"));
    }
}
