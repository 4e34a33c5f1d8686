// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in file read tool with `cat -n` style output.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use skiff_core::SkiffError;
use tracing::warn;

use super::resolve;
use crate::policy::SandboxPolicy;
use crate::tool::{Tool, ToolOutput};

pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_LINE_LIMIT: usize = 2000;
pub const MAX_LINE_CHARS: usize = 2000;

/// Bytes inspected for NUL when sniffing binary content.
const BINARY_SNIFF_BYTES: usize = 8192;

#[derive(Debug, Deserialize)]
struct ReadParams {
    file_path: String,
    /// 1-based first line.
    offset: Option<usize>,
    limit: Option<usize>,
}

/// Reads a text file and returns numbered lines.
pub struct ReadTool {
    workspace: PathBuf,
    policy: Arc<SandboxPolicy>,
}

impl ReadTool {
    pub fn new(workspace: PathBuf, policy: Arc<SandboxPolicy>) -> Self {
        Self { workspace, policy }
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "Read"
    }

    fn description(&self) -> &str {
        "Read a text file and return its lines numbered like `cat -n`"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Path to the file, absolute or relative to the workspace"
                },
                "offset": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "First line to return (1-based)"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of lines to return (default 2000)"
                }
            },
            "required": ["file_path"]
        })
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"file_path": "src/main.rs"})
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SkiffError> {
        let params: ReadParams = serde_json::from_value(input).map_err(|e| SkiffError::Tool {
            message: format!("invalid Read arguments: {e}"),
            source: Some(Box::new(e)),
        })?;

        let requested = resolve(&self.workspace, &params.file_path);
        if let Err(denial) = self.policy.check_read_path(&requested) {
            warn!(path = %requested.display(), "{denial}");
            return Ok(ToolOutput::error(denial.message()));
        }

        // Re-check after symlinks are resolved.
        let path = match tokio::fs::canonicalize(&requested).await {
            Ok(p) => p,
            Err(_) => {
                return Ok(ToolOutput::error(format!(
                    "file not found: {}",
                    requested.display()
                )));
            }
        };
        if let Err(denial) = self.policy.check_read_path(&path) {
            warn!(path = %path.display(), "{denial}");
            return Ok(ToolOutput::error(denial.message()));
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => return Ok(ToolOutput::error(format!("cannot access file: {e}"))),
        };
        if metadata.is_dir() {
            return Ok(ToolOutput::error(
                "cannot read directory, use Glob or Bash 'ls' instead",
            ));
        }
        if metadata.len() > MAX_FILE_BYTES {
            return Ok(ToolOutput::error(
                "file too large (max 10MB). Use offset and limit parameters to read portions.",
            ));
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| SkiffError::Tool {
            message: format!("failed to read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        if bytes.iter().take(BINARY_SNIFF_BYTES).any(|b| *b == 0) {
            return Ok(ToolOutput::error("cannot read binary file"));
        }

        let text = String::from_utf8_lossy(&bytes);
        let offset = params.offset.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_LINE_LIMIT);
        Ok(ToolOutput::ok(number_lines(&text, offset, limit)))
    }
}

fn number_lines(text: &str, offset: usize, limit: usize) -> String {
    if text.is_empty() {
        return "(empty file)".to_string();
    }

    let total = text.lines().count();
    let mut out = String::new();
    let mut shown = 0;
    for (idx, line) in text.lines().enumerate().skip(offset - 1).take(limit) {
        let line = if line.chars().count() > MAX_LINE_CHARS {
            let cut: String = line.chars().take(MAX_LINE_CHARS).collect();
            format!("{cut}...")
        } else {
            line.to_string()
        };
        let _ = writeln!(out, "{:>6}\t{line}", idx + 1);
        shown += 1;
    }

    if shown == 0 {
        return format!("(no lines at offset {offset}; file has {total} lines)");
    }
    let last = offset - 1 + shown;
    if last < total {
        let _ = write!(
            out,
            "\n[Showing lines {offset}-{last} of {total}. Use offset to read more.]"
        );
    }
    out
}
