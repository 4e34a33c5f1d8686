// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutable state of one agent run.
//!
//! An [`AgentSession`] is owned by the caller and lent to the loop as
//! `&mut`. History only grows, except that a failed dispatch may pop the
//! user turn that triggered it. Nothing is persisted.

use skiff_core::{Message, Role, TokenUsage};
use tokio_util::sync::CancellationToken;

/// Conversation history and running totals for a single loop run.
#[derive(Debug)]
pub struct AgentSession {
    history: Vec<Message>,
    iterations: usize,
    prompt_tokens: u64,
    completion_tokens: u64,
    cost_usd: f64,
    cancel: CancellationToken,
}

impl AgentSession {
    /// Seeds the history with `initial`, usually a system prompt and the user question.
    pub fn new(initial: Vec<Message>, cancel: CancellationToken) -> Self {
        Self {
            history: initial,
            iterations: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            cost_usd: 0.0,
            cancel,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Pops the last message if it is a user turn.
    pub fn rollback_user_turn(&mut self) -> Option<Message> {
        match self.history.last() {
            Some(last) if last.role == Role::User => self.history.pop(),
            _ => None,
        }
    }

    /// Counts a completed dispatch and adds its usage and cost.
    pub fn record_dispatch(&mut self, usage: TokenUsage, cost_usd: f64) {
        self.iterations += 1;
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.cost_usd += cost_usd;
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn prompt_tokens(&self) -> u64 {
        self.prompt_tokens
    }

    pub fn completion_tokens(&self) -> u64 {
        self.completion_tokens
    }

    pub fn cost_usd(&self) -> f64 {
        self.cost_usd
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_only_pops_user_turns() {
        let mut session = AgentSession::new(
            vec![Message::system("sys"), Message::user("hi")],
            CancellationToken::new(),
        );
        assert_eq!(session.rollback_user_turn().map(|m| m.content), Some("hi".into()));
        assert!(session.rollback_user_turn().is_none());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn totals_accumulate() {
        let mut session = AgentSession::new(Vec::new(), CancellationToken::new());
        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        session.record_dispatch(usage, 0.25);
        session.record_dispatch(usage, 0.25);
        assert_eq!(session.iterations(), 2);
        assert_eq!(session.prompt_tokens(), 20);
        assert_eq!(session.completion_tokens(), 10);
        assert!((session.cost_usd() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cancellation_is_shared_and_idempotent() {
        let token = CancellationToken::new();
        let session = AgentSession::new(Vec::new(), token.clone());
        assert!(!session.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(session.is_cancelled());
    }
}
