// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for log output and error messages.
//!
//! Two complementary mechanisms:
//! 1. **Regex-based**: known credential formats (OpenRouter keys, Bearer tokens).
//! 2. **Exact-match**: values known at runtime, such as the configured API key.

use std::io::Write;
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;

/// Known secret patterns, most specific first.
static REDACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // OpenRouter keys: sk-or-v1-<hex>
        r"sk-or-[a-zA-Z0-9_\-]{10,}",
        // Anthropic-style keys
        r"sk-ant-[a-zA-Z0-9_\-]{20,}",
        // Generic sk- keys (OpenAI style)
        r"sk-[a-zA-Z0-9]{20,}",
        // Bearer tokens in headers or echoed requests
        r"Bearer\s+[a-zA-Z0-9._\-]{10,}",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// The redaction placeholder.
pub const REDACTED: &str = "[REDACTED]";

/// Redact secrets from `input` using the built-in patterns and exact `known_values`.
pub fn redact(input: &str, known_values: &[String]) -> String {
    let mut result = input.to_string();

    for pattern in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).into_owned();
    }

    // Longest first so a value is never partially replaced by its own prefix.
    let mut sorted: Vec<&String> = known_values.iter().collect();
    sorted.sort_by_key(|v| std::cmp::Reverse(v.len()));
    for value in sorted {
        if !value.is_empty() {
            result = result.replace(value.as_str(), REDACTED);
        }
    }

    result
}

/// A writer that redacts secrets before forwarding to `inner`.
///
/// Used as the log writer so credentials never reach stderr.
pub struct RedactingWriter<W> {
    inner: W,
    known_values: Arc<RwLock<Vec<String>>>,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, known_values: Arc<RwLock<Vec<String>>>) -> Self {
        Self {
            inner,
            known_values,
        }
    }

    /// Register a value that must never appear in output.
    pub fn add_known_value(known_values: &Arc<RwLock<Vec<String>>>, value: String) {
        if value.is_empty() {
            return;
        }
        if let Ok(mut values) = known_values.write()
            && !values.contains(&value)
        {
            values.push(value);
        }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let known = self
            .known_values
            .read()
            .map(|v| v.clone())
            .unwrap_or_default();
        self.inner.write_all(redact(&input, &known).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
