// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompt for agentic runs.

use std::fmt::Write as _;
use std::path::Path;

use skiff_skill::ToolRegistry;

const AGENTIC_PREAMBLE: &str = "\
You are a coding assistant that completes tasks by calling tools. \
Stay focused on the user's question.

## Workflow
1. Work out what the user is asking.
2. Call one tool to gather the information you need.
3. Read the result carefully.
4. Call another tool only if you still need more.
5. Once you can answer, reply in plain text without any JSON.

## Rules
- Only gather what the question needs.
- Prefer Glob to find files, then Read to inspect them.
- Count items by counting lines in the tool output.
- Your final reply must be plain text, never a tool call.
";

/// Builds the system prompt for an agentic run.
///
/// `workspace` is mentioned so relative paths resolve as the tools expect.
/// `extra` is appended verbatim, for user-supplied instructions.
pub fn agentic_system_prompt(
    registry: &ToolRegistry,
    workspace: Option<&Path>,
    extra: Option<&str>,
) -> String {
    let mut prompt = String::from(AGENTIC_PREAMBLE);
    if let Some(dir) = workspace {
        let _ = write!(prompt, "\nWorking directory: {}\n", dir.display());
    }
    if !registry.is_empty() {
        prompt.push('\n');
        prompt.push_str(&registry.prompt_block());
    }
    if let Some(extra) = extra.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push('\n');
        prompt.push_str(extra);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_core::ToolDefinition;

    #[test]
    fn prompt_lists_tools_and_workspace() {
        let mut registry = ToolRegistry::new();
        registry.declare(ToolDefinition {
            name: "Glob".into(),
            description: "Find files by pattern".into(),
            parameters: serde_json::json!({"type": "object"}),
        });
        let prompt = agentic_system_prompt(&registry, Some(Path::new("/work")), Some("  Be terse. "));
        assert!(prompt.contains("### Glob"));
        assert!(prompt.contains("Working directory: /work"));
        assert!(prompt.ends_with("Be terse.\n"));
    }

    #[test]
    fn empty_registry_omits_tool_section() {
        let prompt = agentic_system_prompt(&ToolRegistry::new(), None, None);
        assert!(!prompt.contains("Available Tools"));
        assert!(prompt.starts_with("You are a coding assistant"));
    }
}
