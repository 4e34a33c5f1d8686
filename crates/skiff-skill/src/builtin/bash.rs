// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in shell command tool.
//!
//! Commands run via `bash -c` in the workspace after passing the sandbox
//! policy. The child is killed when the invocation future is dropped, which
//! is how registry cancellation reaches the process.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use skiff_core::SkiffError;
use tracing::{debug, warn};

use super::truncate_at_boundary;
use crate::policy::SandboxPolicy;
use crate::tool::{Tool, ToolOutput};

/// Timeout used when the call does not specify one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on any requested timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(600);
/// Combined stdout and stderr budget.
pub const MAX_OUTPUT_BYTES: usize = 100_000;

/// Environment variables never passed to commands.
const SCRUBBED_ENV: &[&str] = &["OPENROUTER_API_KEY", "SKIFF_CLOUD_API_KEY"];

#[derive(Debug, Deserialize)]
struct BashParams {
    command: String,
    /// Seconds.
    timeout: Option<u64>,
}

/// Executes shell commands and returns exit code, stdout, and stderr.
pub struct BashTool {
    workspace: PathBuf,
    default_timeout: Duration,
    policy: Arc<SandboxPolicy>,
}

impl BashTool {
    pub fn new(workspace: PathBuf, default_timeout: Duration, policy: Arc<SandboxPolicy>) -> Self {
        Self {
            workspace,
            default_timeout,
            policy,
        }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "Bash"
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace and return its exit code, stdout, and stderr"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Timeout in seconds (default 30, max 600)"
                }
            },
            "required": ["command"]
        })
    }

    fn example(&self) -> serde_json::Value {
        serde_json::json!({"command": "ls -la"})
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SkiffError> {
        let params: BashParams = serde_json::from_value(input).map_err(|e| SkiffError::Tool {
            message: format!("invalid Bash arguments: {e}"),
            source: Some(Box::new(e)),
        })?;

        if let Err(denial) = self.policy.check_command(&params.command) {
            warn!(command = %params.command, "{denial}");
            return Ok(ToolOutput::error(denial.message()));
        }

        let timeout = params
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .clamp(Duration::from_secs(1), MAX_TIMEOUT);

        let mut command = tokio::process::Command::new("bash");
        command
            .arg("-c")
            .arg(&params.command)
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        for var in SCRUBBED_ENV {
            command.env_remove(var);
        }

        debug!(command = %params.command, ?timeout, "running shell command");
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result.map_err(|e| SkiffError::Tool {
                message: format!("failed to execute bash command: {e}"),
                source: Some(Box::new(e)),
            })?,
            Err(_) => {
                return Ok(ToolOutput::error(format!(
                    "command timed out after {}s",
                    timeout.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        let content = format_output(exit_code, &stdout, &stderr);
        if output.status.success() {
            Ok(ToolOutput::ok(content))
        } else {
            Ok(ToolOutput::error(content))
        }
    }
}

/// `Exit code: N` followed by the stdout and stderr sections, capped at
/// [`MAX_OUTPUT_BYTES`] with stdout taking priority.
fn format_output(exit_code: i32, stdout: &str, stderr: &str) -> String {
    let out = truncate_at_boundary(stdout, MAX_OUTPUT_BYTES);
    let err = truncate_at_boundary(stderr, MAX_OUTPUT_BYTES - out.len());
    let truncated = out.len() < stdout.len() || err.len() < stderr.len();

    let mut content = format!("Exit code: {exit_code}\nstdout:\n{out}");
    if !err.is_empty() {
        content.push_str("\nstderr:\n");
        content.push_str(err);
    }
    if truncated {
        content.push_str(&format!("\n[Output truncated at {MAX_OUTPUT_BYTES} bytes]"));
    }
    content
}
