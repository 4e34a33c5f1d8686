// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-call extraction from backend responses.
//!
//! Models with native function calling put tool calls in a structured field.
//! Everything else writes them as JSON in the reply text, either inline, in a
//! fenced code block, or as the whole reply. Each of these shapes is one
//! [`ToolCallExtractor`]; [`extract_tool_calls`] tries them in order and stops
//! at the first one that finds anything.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use skiff_core::{ChatResponse, ToolCall};
use tracing::debug;

static INLINE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)\{[^{}]*"name"\s*:\s*"[^"]+"\s*,\s*"(?:parameters|arguments)"\s*:\s*\{[^{}]*\}[^{}]*\}"#,
    )
    .unwrap()
});

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.+?\})\s*```").unwrap());

/// One strategy for finding tool calls in a response.
///
/// `None` means the strategy found nothing and the next one should run.
pub trait ToolCallExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, response: &ChatResponse) -> Option<Vec<ToolCall>>;
}

/// Structured tool calls reported by the backend.
pub struct NativeExtractor;

impl ToolCallExtractor for NativeExtractor {
    fn name(&self) -> &'static str {
        "native"
    }

    fn extract(&self, response: &ChatResponse) -> Option<Vec<ToolCall>> {
        let calls: Vec<ToolCall> = response
            .tool_calls
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .cloned()
            .collect();
        non_empty(calls)
    }
}

/// Flat `{"name": .., "parameters": {..}}` objects anywhere in the text.
pub struct InlineJsonExtractor;

impl ToolCallExtractor for InlineJsonExtractor {
    fn name(&self) -> &'static str {
        "inline_json"
    }

    fn extract(&self, response: &ChatResponse) -> Option<Vec<ToolCall>> {
        let calls = INLINE_CALL
            .find_iter(&response.content)
            .filter_map(|m| parse_call(m.as_str()))
            .collect();
        non_empty(calls)
    }
}

/// Objects inside triple-backtick blocks, labelled `json` or unlabelled.
pub struct FencedBlockExtractor;

impl ToolCallExtractor for FencedBlockExtractor {
    fn name(&self) -> &'static str {
        "fenced_block"
    }

    fn extract(&self, response: &ChatResponse) -> Option<Vec<ToolCall>> {
        let calls = FENCED_BLOCK
            .captures_iter(&response.content)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| parse_call(m.as_str()))
            .collect();
        non_empty(calls)
    }
}

/// The whole reply, trimmed, as a single JSON object.
pub struct WholeTextExtractor;

impl ToolCallExtractor for WholeTextExtractor {
    fn name(&self) -> &'static str {
        "whole_text"
    }

    fn extract(&self, response: &ChatResponse) -> Option<Vec<ToolCall>> {
        let text = response.content.trim();
        if !text.starts_with('{') {
            return None;
        }
        parse_call(text).map(|call| vec![call])
    }
}

/// Native, inline, fenced, then whole-text.
pub fn default_extractors() -> Vec<Box<dyn ToolCallExtractor>> {
    vec![
        Box::new(NativeExtractor),
        Box::new(InlineJsonExtractor),
        Box::new(FencedBlockExtractor),
        Box::new(WholeTextExtractor),
    ]
}

/// Runs `extractors` in order and returns the first non-empty result.
///
/// An empty vector means the response is a final answer.
pub fn extract_tool_calls(
    extractors: &[Box<dyn ToolCallExtractor>],
    response: &ChatResponse,
) -> Vec<ToolCall> {
    for extractor in extractors {
        if let Some(calls) = extractor.extract(response) {
            debug!(
                strategy = extractor.name(),
                count = calls.len(),
                "tool calls extracted"
            );
            return calls;
        }
    }
    Vec::new()
}

fn non_empty(calls: Vec<ToolCall>) -> Option<Vec<ToolCall>> {
    if calls.is_empty() { None } else { Some(calls) }
}

fn parse_call(text: &str) -> Option<ToolCall> {
    let Ok(Value::Object(mut obj)) = serde_json::from_str::<Value>(text) else {
        return None;
    };
    let name = match obj.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => return None,
    };
    let arguments = take_arguments(&mut obj, "parameters")
        .or_else(|| take_arguments(&mut obj, "arguments"))
        .unwrap_or_default();
    Some(ToolCall::new(name, arguments))
}

/// Accepts an object, or a string holding a JSON-encoded object.
fn take_arguments(obj: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match obj.remove(key)? {
        Value::Object(map) => Some(map),
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}
