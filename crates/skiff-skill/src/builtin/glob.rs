// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in file search by glob pattern.
//!
//! Supports `*` (within one path segment), `?`, and `**` (any number of
//! segments). A pattern without `/` matches file names at any depth.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use skiff_core::SkiffError;
use walkdir::WalkDir;

use super::{is_ignored_dir, resolve};
use crate::policy::SandboxPolicy;
use crate::tool::{Tool, ToolOutput};

pub const MAX_RESULTS: usize = 100;

#[derive(Debug, Deserialize)]
struct GlobParams {
    pattern: String,
    path: Option<String>,
}

/// Finds files whose path matches a glob pattern.
pub struct GlobTool {
    workspace: PathBuf,
    policy: Arc<SandboxPolicy>,
}

impl GlobTool {
    pub fn new(workspace: PathBuf, policy: Arc<SandboxPolicy>) -> Self {
        Self { workspace, policy }
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "Glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern such as `**/*.rs` or `src/*.toml`"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Glob pattern; supports *, ?, and **"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in (default: workspace)"
                }
            },
            "required": ["pattern"]
        })
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"pattern": "**/*.rs"})
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SkiffError> {
        let params: GlobParams = serde_json::from_value(input).map_err(|e| SkiffError::Tool {
            message: format!("invalid Glob arguments: {e}"),
            source: Some(Box::new(e)),
        })?;

        if let Err(denial) = self.policy.check_glob_pattern(&params.pattern) {
            return Ok(ToolOutput::error(denial.message()));
        }
        let base = match &params.path {
            Some(p) if !p.is_empty() => resolve(&self.workspace, p),
            _ => self.workspace.clone(),
        };
        if !base.is_dir() {
            return Ok(ToolOutput::error(format!("path not found: {}", base.display())));
        }

        let matcher = match GlobMatcher::new(&params.pattern) {
            Ok(m) => m,
            Err(e) => return Ok(ToolOutput::error(format!("invalid glob pattern: {e}"))),
        };

        let pattern = params.pattern.clone();
        let mut matches = tokio::task::spawn_blocking(move || find_matches(&base, &matcher))
            .await
            .map_err(|e| SkiffError::Internal(format!("glob task failed: {e}")))?;

        if matches.is_empty() {
            return Ok(ToolOutput::ok(format!(
                "No files found matching pattern: {pattern}"
            )));
        }

        matches.sort();
        let total = matches.len();
        let mut content = matches
            .iter()
            .take(MAX_RESULTS)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        if total > MAX_RESULTS {
            content.push_str(&format!(
                "\n\n[Results limited to {MAX_RESULTS} files. Total matches: {total}]"
            ));
        }
        Ok(ToolOutput::ok(content))
    }
}

fn find_matches(base: &Path, matcher: &GlobMatcher) -> Vec<PathBuf> {
    WalkDir::new(base)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(base)
                .is_ok_and(|rel| matcher.is_match(rel))
        })
        .map(|e| e.into_path())
        .collect()
}

/// A glob compiled to an anchored regex.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    regex: Regex,
    name_only: bool,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = pattern.replace('\\', "/");
        let pattern = pattern.strip_prefix("./").unwrap_or(&pattern);
        Ok(Self {
            regex: Regex::new(&glob_to_regex(pattern))?,
            name_only: !pattern.contains('/'),
        })
    }

    /// Matches a path relative to the search root.
    pub fn is_match(&self, relative: &Path) -> bool {
        if self.name_only {
            return relative
                .file_name()
                .is_some_and(|n| self.regex.is_match(&n.to_string_lossy()));
        }
        let text = relative.to_string_lossy().replace('\\', "/");
        self.regex.is_match(&text)
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    re.push_str("(?:.*/)?");
                } else {
                    re.push_str(".*");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    re
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(workspace: PathBuf) -> GlobTool {
        GlobTool::new(workspace, Arc::new(SandboxPolicy::default()))
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn matcher_semantics() {
        let m = GlobMatcher::new("*.rs").unwrap();
        assert!(m.is_match(Path::new("deep/nested/lib.rs")));
        assert!(!m.is_match(Path::new("lib.rs.bak")));

        let m = GlobMatcher::new("src/*.rs").unwrap();
        assert!(m.is_match(Path::new("src/lib.rs")));
        assert!(!m.is_match(Path::new("src/bin/main.rs")));

        let m = GlobMatcher::new("**/*.rs").unwrap();
        assert!(m.is_match(Path::new("lib.rs")));
        assert!(m.is_match(Path::new("a/b/c.rs")));

        let m = GlobMatcher::new("file?.txt").unwrap();
        assert!(m.is_match(Path::new("file1.txt")));
        assert!(!m.is_match(Path::new("file10.txt")));
    }

    #[tokio::test]
    async fn finds_sorted_matches_and_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/main.rs");
        touch(dir.path(), "src/lib.rs");
        touch(dir.path(), "target/debug/build.rs");
        touch(dir.path(), "node_modules/pkg/index.rs");
        touch(dir.path(), "README.md");

        let out = tool(dir.path().to_path_buf())
            .invoke(serde_json::json!({"pattern": "**/*.rs"}))
            .await
            .unwrap();
        let lines: Vec<&str> = out.content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("src/lib.rs"));
        assert!(lines[1].ends_with("src/main.rs"));
    }

    #[tokio::test]
    async fn parent_escape_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let out = tool(dir.path().to_path_buf())
            .invoke(serde_json::json!({"pattern": "../*"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert_eq!(
            out.content,
            "pattern contains '..' which could escape the workspace"
        );
    }

    #[tokio::test]
    async fn results_are_limited() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..(MAX_RESULTS + 5) {
            touch(dir.path(), &format!("f{i:03}.txt"));
        }
        let out = tool(dir.path().to_path_buf())
            .invoke(serde_json::json!({"pattern": "*.txt"}))
            .await
            .unwrap();
        assert!(out.content.ends_with(&format!(
            "[Results limited to {MAX_RESULTS} files. Total matches: {}]",
            MAX_RESULTS + 5
        )));
    }

    #[tokio::test]
    async fn no_matches_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = tool(dir.path().to_path_buf())
            .invoke(serde_json::json!({"pattern": "*.go"}))
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.content, "No files found matching pattern: *.go");
    }
}
