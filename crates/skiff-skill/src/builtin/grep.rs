// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in regex search over file contents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use skiff_core::SkiffError;
use walkdir::WalkDir;

use super::glob::GlobMatcher;
use super::{is_ignored_dir, resolve};
use crate::policy::SandboxPolicy;
use crate::tool::{Tool, ToolOutput};

pub const MAX_RESULTS: usize = 50;
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LINE_CHARS: usize = 500;

const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "dat", "db", "sqlite", "png", "jpg", "jpeg", "gif", "ico",
    "bmp", "tiff", "webp", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "tar", "gz",
    "rar", "7z", "bz2", "xz", "mp3", "mp4", "avi", "mov", "wav", "flac", "ogg", "ttf", "otf",
    "woff", "woff2", "pyc", "pyo", "class", "o", "a", "lib", "rlib",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OutputMode {
    #[default]
    Content,
    FilesWithMatches,
    Count,
}

#[derive(Debug, Deserialize)]
struct GrepParams {
    pattern: String,
    path: Option<String>,
    glob: Option<String>,
    #[serde(default)]
    output_mode: OutputMode,
    #[serde(default)]
    case_insensitive: bool,
}

/// Searches file contents for a regular expression.
pub struct GrepTool {
    workspace: PathBuf,
    policy: Arc<SandboxPolicy>,
}

impl GrepTool {
    pub fn new(workspace: PathBuf, policy: Arc<SandboxPolicy>) -> Self {
        Self { workspace, policy }
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "Grep"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression, optionally filtered by a file glob"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Regular expression to search for"
                },
                "path": {
                    "type": "string",
                    "description": "File or directory to search (default: workspace)"
                },
                "glob": {
                    "type": "string",
                    "description": "Only search files matching this glob, e.g. *.rs"
                },
                "output_mode": {
                    "type": "string",
                    "enum": ["content", "files_with_matches", "count"],
                    "description": "content (default), files_with_matches, or count"
                },
                "case_insensitive": { "type": "boolean" }
            },
            "required": ["pattern"]
        })
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"pattern": "fn main", "glob": "*.rs"})
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SkiffError> {
        let params: GrepParams = serde_json::from_value(input).map_err(|e| SkiffError::Tool {
            message: format!("invalid Grep arguments: {e}"),
            source: Some(Box::new(e)),
        })?;

        let regex = match RegexBuilder::new(&params.pattern)
            .case_insensitive(params.case_insensitive)
            .build()
        {
            Ok(r) => r,
            Err(e) => return Ok(ToolOutput::error(format!("invalid regex pattern: {e}"))),
        };
        let filter = match params.glob.as_deref().filter(|g| !g.is_empty()) {
            Some(g) => match GlobMatcher::new(g) {
                Ok(m) => Some(m),
                Err(e) => return Ok(ToolOutput::error(format!("invalid glob pattern: {e}"))),
            },
            None => None,
        };
        let base = match &params.path {
            Some(p) if !p.is_empty() => resolve(&self.workspace, p),
            _ => self.workspace.clone(),
        };
        if !base.exists() {
            return Ok(ToolOutput::error(format!("path not found: {}", base.display())));
        }
        if base.is_file()
            && let Err(denial) = self.policy.check_read_path(&base)
        {
            return Ok(ToolOutput::error(denial.message()));
        }

        let search = Search {
            base,
            regex,
            filter,
            mode: params.output_mode,
            policy: self.policy.clone(),
        };
        let lines = tokio::task::spawn_blocking(move || search.run())
            .await
            .map_err(|e| SkiffError::Internal(format!("grep task failed: {e}")))?;

        if lines.is_empty() {
            return Ok(ToolOutput::ok(format!(
                "No matches found for pattern: {}",
                params.pattern
            )));
        }
        let limited = lines.len() > MAX_RESULTS;
        let mut content = lines
            .into_iter()
            .take(MAX_RESULTS)
            .collect::<Vec<_>>()
            .join("\n");
        if limited {
            content.push_str(&format!("\n\n[Results limited to {MAX_RESULTS} matches]"));
        }
        Ok(ToolOutput::ok(content))
    }
}

struct Search {
    base: PathBuf,
    regex: Regex,
    filter: Option<GlobMatcher>,
    mode: OutputMode,
    policy: Arc<SandboxPolicy>,
}

impl Search {
    /// Result lines in walk order. Stops one past the limit so callers can
    /// tell the output was cut.
    fn run(&self) -> Vec<String> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.base)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.wanted(p))
            .collect();
        files.sort();

        let mut out = Vec::new();
        for file in files {
            let Ok(text) = std::fs::read_to_string(&file) else {
                continue;
            };
            let display = file.display();
            match self.mode {
                OutputMode::Content => {
                    for (idx, line) in text.lines().enumerate() {
                        if self.regex.is_match(line) {
                            let line: String = line.chars().take(MAX_LINE_CHARS).collect();
                            out.push(format!("{display}:{}:{line}", idx + 1));
                            if out.len() > MAX_RESULTS {
                                return out;
                            }
                        }
                    }
                }
                OutputMode::FilesWithMatches => {
                    if text.lines().any(|l| self.regex.is_match(l)) {
                        out.push(display.to_string());
                    }
                }
                OutputMode::Count => {
                    let count = text.lines().filter(|l| self.regex.is_match(l)).count();
                    if count > 0 {
                        out.push(format!("{display}:{count}"));
                    }
                }
            }
            if out.len() > MAX_RESULTS {
                return out;
            }
        }
        out
    }

    fn wanted(&self, path: &Path) -> bool {
        if self.policy.is_sensitive_path(path) || is_binary_extension(path) {
            return false;
        }
        if !std::fs::metadata(path).is_ok_and(|m| m.len() <= MAX_FILE_BYTES) {
            return false;
        }
        match &self.filter {
            None => true,
            Some(filter) => {
                let rel = path.strip_prefix(&self.base).unwrap_or(path);
                filter.is_match(rel)
                    || path
                        .file_name()
                        .is_some_and(|n| filter.is_match(Path::new(n)))
            }
        }
    }
}

fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| BINARY_EXTENSIONS.contains(&e.as_str()))
}
