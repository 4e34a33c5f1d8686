// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent loop and backend selection for Skiff.
//!
//! The [`AgentLoop`] drives a bounded dispatch/execute cycle:
//! - Sends the session history to a [`ChatBackend`]
//! - Drains streamed or complete answers into one response
//! - Extracts tool calls, natively or from text
//! - Runs each call through the [`ToolRegistry`] and feeds results back
//! - Stops on a plain-text answer, the iteration cap, or cancellation

pub mod backend;
pub mod capability;
pub mod extract;
pub mod prompt;
pub mod session;
pub mod shutdown;

use std::sync::Arc;

use serde::Serialize;
use skiff_config::model::AgentConfig;
use skiff_core::{ChatBackend, ChatRequest, ChatResponse, Message, SkiffError, ToolCall};
use skiff_router::cloud_cost_usd;
use skiff_skill::{ToolOutput, ToolRegistry};
use strum::Display;
use tracing::{debug, error, info, warn};

pub use crate::backend::{
    BackendChoice, BackendKind, SelectionOptions, cloud_model_for_tier, select_backend,
};
pub use crate::capability::{CapabilityCheck, CapabilityReport, FamilyHeuristic};
pub use crate::extract::{ToolCallExtractor, default_extractors, extract_tool_calls};
pub use crate::session::AgentSession;
pub use crate::shutdown::install_signal_handler;

/// Appended to a tool result cut at the character budget.
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Receives streamed answer text as it arrives.
pub type TokenSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Notified after each tool call finishes.
pub type ToolObserver = Arc<dyn Fn(&ToolCall, &ToolOutput) + Send + Sync>;

/// Loop limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    pub max_iterations: usize,
    pub tool_result_max_chars: usize,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_result_max_chars: 4000,
        }
    }
}

impl LoopOptions {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tool_result_max_chars: config.tool_result_max_chars,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    MaxIterations,
    Cancelled,
}

/// Result of one [`AgentLoop::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOutcome {
    pub final_text: String,
    pub iterations: usize,
    pub stop: StopReason,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

/// Bounded dispatch/execute loop over one backend and a tool registry.
pub struct AgentLoop {
    registry: Arc<ToolRegistry>,
    extractors: Vec<Box<dyn ToolCallExtractor>>,
    options: LoopOptions,
    token_sink: Option<TokenSink>,
    tool_observer: Option<ToolObserver>,
}

impl AgentLoop {
    pub fn new(registry: Arc<ToolRegistry>, options: LoopOptions) -> Self {
        Self {
            registry,
            extractors: default_extractors(),
            options,
            token_sink: None,
            tool_observer: None,
        }
    }

    pub fn with_token_sink(mut self, sink: TokenSink) -> Self {
        self.token_sink = Some(sink);
        self
    }

    pub fn with_tool_observer(mut self, observer: ToolObserver) -> Self {
        self.tool_observer = Some(observer);
        self
    }

    /// Replaces the extraction strategies, tried in the given order.
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn ToolCallExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    /// Runs until the model answers in plain text, the iteration cap is
    /// reached, or the session's token is cancelled.
    ///
    /// A backend failure aborts the run. If nothing was streamed before the
    /// failure, the triggering user turn is removed from the history.
    /// Tool failures never abort: they are fed back to the model as text.
    pub async fn run(
        &self,
        session: &mut AgentSession,
        backend: &dyn ChatBackend,
    ) -> Result<AgentOutcome, SkiffError> {
        // Cloud models call tools through text; only local ones get native definitions.
        let tools = if backend.is_cloud() {
            Vec::new()
        } else {
            self.registry.definitions()
        };
        let cancel = session.cancel_token().clone();
        let mut last_text = String::new();

        info!(
            model = backend.model(),
            cloud = backend.is_cloud(),
            max_iterations = self.options.max_iterations,
            "agent loop starting"
        );

        while session.iterations() < self.options.max_iterations {
            if cancel.is_cancelled() {
                return Ok(outcome(session, last_text, StopReason::Cancelled));
            }

            let request = ChatRequest {
                messages: session.history().to_vec(),
                tools: tools.clone(),
            };
            let mut response = ChatResponse::default();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = self.dispatch_into(backend, request, &mut response) => Some(r),
            };

            match result {
                None => {
                    info!("dispatch cancelled");
                    let text = if response.content.is_empty() {
                        last_text
                    } else {
                        response.content
                    };
                    return Ok(outcome(session, text, StopReason::Cancelled));
                }
                Some(Err(e)) => {
                    error!(error = %e, model = backend.model(), "backend dispatch failed");
                    if response.content.trim().is_empty() {
                        session.rollback_user_turn();
                    }
                    return Err(e);
                }
                Some(Ok(())) => {}
            }

            let cost = if backend.is_cloud() {
                let model = if response.model.is_empty() {
                    backend.model()
                } else {
                    response.model.as_str()
                };
                cloud_cost_usd(
                    model,
                    response.usage.prompt_tokens,
                    response.usage.completion_tokens,
                )
            } else {
                0.0
            };
            session.record_dispatch(response.usage, cost);

            let calls = extract_tool_calls(&self.extractors, &response);
            last_text = response.content.clone();
            debug!(
                iteration = session.iterations(),
                tool_calls = calls.len(),
                "dispatch complete"
            );

            if calls.is_empty() {
                session.push(Message::assistant(response.content));
                info!(iterations = session.iterations(), "agent loop completed");
                return Ok(outcome(session, last_text, StopReason::Completed));
            }

            session.push(Message::assistant_with_calls(
                response.content,
                calls.clone(),
            ));
            for call in calls {
                let output = self
                    .registry
                    .execute(&call.name, call.arguments.clone(), &cancel)
                    .await;
                if let Some(observer) = &self.tool_observer {
                    observer(&call, &output);
                }
                let bounded = truncate_result(&output.render(), self.options.tool_result_max_chars);
                session.push(Message::tool(
                    call.name.clone(),
                    format!("[{} result]\n{}", call.name, bounded),
                ));
            }
        }

        warn!(
            iterations = session.iterations(),
            "agent loop reached the iteration limit"
        );
        Ok(outcome(session, last_text, StopReason::MaxIterations))
    }

    async fn dispatch_into(
        &self,
        backend: &dyn ChatBackend,
        request: ChatRequest,
        acc: &mut ChatResponse,
    ) -> Result<(), SkiffError> {
        let dispatch = backend.dispatch(request).await?;
        let sink = self.token_sink.clone();
        let mut forward = move |token: &str| {
            if let Some(sink) = &sink {
                sink(token);
            }
        };
        dispatch.drain_into(acc, &mut forward).await
    }
}

fn outcome(session: &AgentSession, final_text: String, stop: StopReason) -> AgentOutcome {
    AgentOutcome {
        final_text,
        iterations: session.iterations(),
        stop,
        prompt_tokens: session.prompt_tokens(),
        completion_tokens: session.completion_tokens(),
        cost_usd: session.cost_usd(),
    }
}

/// Cuts `text` to `max_chars` characters and appends [`TRUNCATION_MARKER`].
///
/// Text within the budget is returned unchanged.
pub fn truncate_result(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_results_are_untouched() {
        assert_eq!(truncate_result("abc", 3), "abc");
        assert_eq!(truncate_result("", 0), "");
    }

    #[test]
    fn long_results_get_marker() {
        assert_eq!(truncate_result("abcdef", 3), "abc\n... (truncated)");
    }

    #[test]
    fn multibyte_is_not_split() {
        assert_eq!(truncate_result("héllo wörld", 2), "hé\n... (truncated)");
        assert_eq!(truncate_result("日本語テキスト", 3), "日本語\n... (truncated)");
    }

    #[test]
    fn defaults_match_config() {
        let opts = LoopOptions::from_config(&AgentConfig::default());
        assert_eq!(opts, LoopOptions::default());
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::MaxIterations.to_string(), "max_iterations");
    }

    proptest! {
        #[test]
        fn truncation_keeps_budget_and_char_boundaries(text in "\\PC{0,200}", max in 0usize..100) {
            let bounded = truncate_result(&text, max);
            let len = text.chars().count();
            if len <= max {
                prop_assert_eq!(bounded, text);
            } else {
                let body = bounded.strip_suffix(TRUNCATION_MARKER).expect("marker present");
                prop_assert_eq!(body.chars().count(), max);
                prop_assert!(text.starts_with(body));
            }
        }
    }
}
