// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry.
//!
//! The [`Tool`] trait is the interface every built-in tool implements. The
//! [`ToolRegistry`] owns lookup by name, validates arguments against each
//! tool's JSON Schema, and exports definitions both as structured
//! [`ToolDefinition`]s (native tool calling) and as a prompt block
//! (text-based tool calling).
//!
//! [`ToolRegistry::execute`] never fails: unknown tools, invalid arguments,
//! executor errors, and cancellation all come back as an error [`ToolOutput`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skiff_core::{AuditEvent, AuditSink, NullAuditSink, SkiffError, ToolDefinition};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Output from a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text returned by the tool, or the error explanation.
    pub content: String,
    /// Whether the invocation failed or was denied.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Text shown to the model for this result.
    pub fn render(&self) -> String {
        if self.is_error {
            format!("Tool error: {}", self.content)
        } else {
            self.content.clone()
        }
    }
}

/// Unified trait for built-in tools.
///
/// `invoke` receives the argument object after it has passed schema
/// validation, so implementations only need to handle semantic errors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for lookup and in tool calls.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing the argument object.
    fn parameters_schema(&self) -> Value;

    /// Example argument object shown in the prompt block.
    fn example(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Runs the tool. Policy denials are `Ok` with `is_error` set.
    async fn invoke(&self, input: Value) -> Result<ToolOutput, SkiffError>;
}

struct Entry {
    definition: ToolDefinition,
    example: Value,
    executor: Option<Arc<dyn Tool>>,
    validator: Option<jsonschema::Validator>,
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Entry>,
    audit: Arc<dyn AuditSink>,
}

impl ToolRegistry {
    /// Creates an empty registry that discards audit events.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            audit: Arc::new(NullAuditSink),
        }
    }

    /// Sends a `tool_execution` event to `audit` for every call.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Registers a tool with an executor. The tool is indexed by its `name()`.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let definition = ToolDefinition {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        };
        let validator = compile_schema(&definition);
        self.tools.insert(
            definition.name.clone(),
            Entry {
                example: tool.example(),
                definition,
                executor: Some(tool),
                validator,
            },
        );
    }

    /// Advertises a tool without an executor. Calls to it fail with
    /// "has no executor".
    pub fn declare(&mut self, definition: ToolDefinition) {
        let validator = compile_schema(&definition);
        self.tools.insert(
            definition.name.clone(),
            Entry {
                definition,
                example: Value::Object(Map::new()),
                executor: None,
                validator,
            },
        );
    }

    /// Looks up an executable tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).and_then(|e| e.executor.clone())
    }

    /// Returns (name, description) pairs, sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .tools
            .values()
            .map(|e| (e.definition.name.as_str(), e.definition.description.as_str()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Tool definitions for native tool calling, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|e| e.definition.clone()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// System prompt section describing each tool with a JSON call example,
    /// for models that call tools through plain text.
    pub fn prompt_block(&self) -> String {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();

        let mut block = String::from(
            "## Available Tools\n\n\
             To use a tool, reply with only a JSON object of the form \
             {\"name\": \"<tool>\", \"parameters\": {...}}. \
             Tool results are sent back to you as messages. \
             When you have everything you need, answer in plain text.\n",
        );
        for name in names {
            let Some(entry) = self.tools.get(name) else {
                continue;
            };
            let example = serde_json::json!({
                "name": entry.definition.name,
                "parameters": entry.example,
            });
            let _ = write!(
                block,
                "\n### {}\n{}\nExample: {}\n",
                entry.definition.name, entry.definition.description, example
            );
        }
        block
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validates and runs a tool call.
    ///
    /// Never fails: every problem is reported as an error [`ToolOutput`].
    /// If `cancel` fires before the executor resolves, the executor future is
    /// dropped and the result is "tool <name> cancelled".
    pub async fn execute(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> ToolOutput {
        let start = Instant::now();
        let output = self.run(name, arguments, cancel).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(tool = name, success = !output.is_error, duration_ms, "tool executed");
        self.audit.record(AuditEvent::ToolExecution {
            tool: name.to_string(),
            success: !output.is_error,
            duration_ms,
        });
        output
    }

    async fn run(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> ToolOutput {
        let Some(entry) = self.tools.get(name) else {
            return ToolOutput::error(format!("unknown tool: {name}"));
        };
        let Some(executor) = entry.executor.clone() else {
            return ToolOutput::error(format!("tool {name} has no executor"));
        };

        let input = Value::Object(arguments);
        if let Some(validator) = &entry.validator {
            let problems: Vec<String> = validator.iter_errors(&input).map(|e| e.to_string()).collect();
            if !problems.is_empty() {
                return ToolOutput::error(format!(
                    "invalid arguments for {name}: {}",
                    problems.join("; ")
                ));
            }
        }

        if cancel.is_cancelled() {
            return ToolOutput::error(format!("tool {name} cancelled"));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => ToolOutput::error(format!("tool {name} cancelled")),
            result = executor.invoke(input) => match result {
                Ok(output) => output,
                Err(e) => ToolOutput::error(e.to_string()),
            },
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_schema(definition: &ToolDefinition) -> Option<jsonschema::Validator> {
    match jsonschema::validator_for(&definition.parameters) {
        Ok(validator) => Some(validator),
        Err(e) => {
            warn!(tool = %definition.name, error = %e, "tool schema does not compile, arguments will not be validated");
            None
        }
    }
}
