// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `skiff ask`: answer one question, directly or through the tool-using agent.
//!
//! Direct asks are routed, served from the cache or streamed from the chosen
//! backend, then remembered. Agentic asks pick a backend that can drive tools
//! and hand the question to the [`AgentLoop`].

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use colored::Colorize;
use serde::Serialize;
use skiff_agent::prompt::agentic_system_prompt;
use skiff_agent::{
    AgentLoop, AgentSession, BackendKind, FamilyHeuristic, LoopOptions, SelectionOptions,
    StopReason, cloud_model_for_tier, install_signal_handler, select_backend,
};
use skiff_config::{RoutingMode, SkiffConfig};
use skiff_core::{
    AuditSink, ChatBackend, ChatRequest, ChatResponse, ClassificationLevel, Message, SkiffError,
    TokenUsage, ToolCall, TracingAuditSink,
};
use skiff_ollama::OllamaBackend;
use skiff_openrouter::OpenRouterBackend;
use skiff_router::{ComplexityClass, Tier, cloud_cost_usd, estimate_tokens};
use skiff_skill::{BuiltinOptions, ToolOutput, ToolRegistry, register_builtins};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::display::{self, CostSummary};
use crate::route::{RoutingFlags, build_router};

const DIRECT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer concisely and accurately.";

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to ask.
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Let the model call tools (Bash, Read, Glob, Grep, WebFetch) to answer.
    #[arg(short, long)]
    pub agentic: bool,

    /// Maximum agent dispatch rounds.
    #[arg(long, value_name = "N")]
    pub max_iter: Option<usize>,

    /// Attach a file to the question. May be repeated.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Model to use instead of the configured one.
    #[arg(short, long)]
    pub model: Option<String>,

    #[command(flatten)]
    pub routing: RoutingFlags,

    /// Print the answer and its accounting as JSON.
    #[arg(long)]
    pub json: bool,

    /// Suppress routing and cost output.
    #[arg(short, long)]
    pub quiet: bool,
}

impl AskArgs {
    fn chatty(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Machine-readable result of `ask --json`.
#[derive(Debug, Serialize)]
struct AskReport {
    response: String,
    tier: String,
    model: String,
    input_tokens: u32,
    output_tokens: u32,
    total_tokens: u64,
    cost_cents: f64,
    duration_ms: u64,
    complexity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<StopReason>,
}

/// Appends each file to the question between `--- File:` markers.
///
/// A file larger than `max_bytes` is an error, not a truncation.
pub fn attach_files(question: &str, files: &[PathBuf], max_bytes: u64) -> Result<String, SkiffError> {
    let mut out = question.to_string();
    for path in files {
        let meta = std::fs::metadata(path)
            .map_err(|e| SkiffError::Config(format!("cannot read {}: {e}", path.display())))?;
        if meta.len() > max_bytes {
            return Err(SkiffError::Config(format!(
                "{} is {} bytes; files are limited to {max_bytes} bytes",
                path.display(),
                meta.len()
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| SkiffError::Config(format!("cannot read {}: {e}", path.display())))?;
        let _ = write!(
            out,
            "\n--- File: {} ---\n{content}\n--- End of file ---\n",
            path.display()
        );
    }
    Ok(out)
}

pub async fn run_ask(mut config: SkiffConfig, args: AskArgs) -> Result<(), SkiffError> {
    args.routing.apply(&mut config);
    if let Some(n) = args.max_iter {
        config.agent.max_iterations = n;
    }

    let question = attach_files(
        &args.question.join(" "),
        &args.files,
        config.agent.file_max_bytes,
    )?;
    let classification = args.routing.classification(&config, &question);
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let cancel = install_signal_handler();

    if args.agentic {
        run_agentic(&config, &args, &question, classification, audit, cancel).await
    } else {
        run_direct(&config, &args, &question, classification, audit, cancel).await
    }
}

async fn run_direct(
    config: &SkiffConfig,
    args: &AskArgs,
    question: &str,
    classification: ClassificationLevel,
    audit: Arc<dyn AuditSink>,
    cancel: CancellationToken,
) -> Result<(), SkiffError> {
    let opts = args.routing.router_options(config);
    let router = build_router(config, audit);
    let decision = router.route(question, classification, &opts);
    if args.chatty() {
        display::print_routing_decision(&decision);
    }
    let start = Instant::now();

    if let Some(answer) = &decision.cached_response {
        if !args.json {
            println!("{answer}");
        }
        let summary = CostSummary::at_tier_rates(Tier::Cache, 0, 0);
        return report(args, answer, "cache", decision.complexity, summary, start, None);
    }

    let system = config
        .agent
        .system_prompt
        .as_deref()
        .unwrap_or(DIRECT_SYSTEM_PROMPT);
    let messages = vec![Message::system(system), Message::user(question)];
    let echo = !args.json;

    let backend = direct_backend(config, decision.tier, args.model.as_deref())?;
    let mut tier = decision.tier;
    let first = stream_answer(backend.as_ref(), messages.clone(), &cancel, echo).await;
    let (response, backend) = match first {
        Ok(response) => (response, backend),
        Err(SkiffError::Cancelled) => {
            eprintln!("\n{}", "(cancelled)".dimmed());
            return Ok(());
        }
        Err(e) if backend.is_cloud() && opts.auto_fallback => {
            warn!(error = %e, "cloud request failed, falling back to the local model");
            if args.chatty() {
                eprintln!(
                    "{} cloud request failed ({e}); using the local model",
                    "warning:".yellow()
                );
            }
            tier = Tier::Local;
            let local: Box<dyn ChatBackend> = Box::new(local_backend(config, None)?);
            let retry = stream_answer(local.as_ref(), messages, &cancel, echo).await;
            match retry {
                Ok(response) => (response, local),
                Err(SkiffError::Cancelled) => {
                    eprintln!("\n{}", "(cancelled)".dimmed());
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        Err(e) => return Err(e),
    };

    if echo && !response.content.ends_with('\n') {
        println!();
    }
    router.remember(question, &response.content);

    let usage = effective_usage(&response, question);
    let model = if response.model.is_empty() {
        backend.model().to_string()
    } else {
        response.model.clone()
    };
    let summary = CostSummary {
        tier,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        cost_cents: answer_cost_cents(tier, &model, backend.is_cloud(), usage),
    };
    info!(tier = %tier, model = %model, tokens = usage.total(), "answer served");
    report(args, &response.content, &model, decision.complexity, summary, start, None)
}

async fn run_agentic(
    config: &SkiffConfig,
    args: &AskArgs,
    question: &str,
    classification: ClassificationLevel,
    audit: Arc<dyn AuditSink>,
    cancel: CancellationToken,
) -> Result<(), SkiffError> {
    let mut opts = args.routing.router_options(config);
    // Tool use needs a capable model, so let the cloud router choose when it can.
    if opts.has_cloud_key && !opts.paranoid && !opts.offline {
        opts.mode = RoutingMode::Auto;
        opts.auto_prefer_local = false;
    }
    let router = build_router(config, audit.clone());
    let decision = router.route(question, classification, &opts);
    if args.chatty() {
        display::print_routing_decision(&decision);
    }

    let mut selection = SelectionOptions::from_config(config);
    if let Some(model) = &args.model {
        selection.local_model = model.clone();
    }
    let local = local_backend(config, None)?;
    let choice = select_backend(&decision, &selection, &FamilyHeuristic, &local, audit.as_ref()).await;
    if let Some(warning) = &choice.warning
        && !args.json
    {
        eprintln!("{} {warning}", "warning:".yellow());
    }

    let (backend, tier): (Box<dyn ChatBackend>, Tier) = match choice.kind {
        BackendKind::Local => (
            Box::new(local.with_model(&choice.model)) as Box<dyn ChatBackend>,
            Tier::Local,
        ),
        BackendKind::Cloud => {
            let model = args.model.clone().unwrap_or_else(|| choice.model.clone());
            (
                Box::new(cloud_backend(config, model)?) as Box<dyn ChatBackend>,
                decision.tier,
            )
        }
    };

    let workspace = workspace_dir(config)?;
    let mut registry = ToolRegistry::new().with_audit(audit);
    register_builtins(
        &mut registry,
        &BuiltinOptions {
            workspace: workspace.clone(),
            bash_timeout: Duration::from_secs(config.tools.bash_timeout_secs),
            enable_web_fetch: config.tools.enable_web_fetch && !config.security.offline,
            allowed_private_ips: Vec::new(),
        },
    )?;
    let registry = Arc::new(registry);

    let system = agentic_system_prompt(&registry, Some(&workspace), config.agent.system_prompt.as_deref());
    let mut session = AgentSession::new(vec![Message::system(system), Message::user(question)], cancel);

    let echo = !args.json;
    let verbose_tools = args.chatty();
    let agent = AgentLoop::new(registry, LoopOptions::from_config(&config.agent))
        .with_token_sink(Arc::new(move |token: &str| {
            if echo {
                print!("{token}");
                std::io::stdout().flush().ok();
            }
        }))
        .with_tool_observer(Arc::new(move |call: &ToolCall, output: &ToolOutput| {
            if verbose_tools {
                let status = if output.is_error { "failed" } else { "done" };
                eprintln!("\n{}", format!("[tool: {}] {status}", call.name).dimmed());
            }
        }));

    let start = Instant::now();
    let outcome = agent.run(&mut session, backend.as_ref()).await?;
    if echo {
        println!();
    }
    match outcome.stop {
        StopReason::Completed => {}
        StopReason::MaxIterations if !args.json => eprintln!(
            "{} stopped after {} iterations without a final answer",
            "warning:".yellow(),
            outcome.iterations
        ),
        StopReason::Cancelled if !args.json => eprintln!("{}", "(cancelled)".dimmed()),
        _ => {}
    }

    let summary = CostSummary {
        tier,
        input_tokens: saturate(outcome.prompt_tokens),
        output_tokens: saturate(outcome.completion_tokens),
        cost_cents: outcome.cost_usd * 100.0,
    };
    report(
        args,
        &outcome.final_text,
        backend.model(),
        decision.complexity,
        summary,
        start,
        Some((outcome.iterations, outcome.stop)),
    )
}

fn report(
    args: &AskArgs,
    response: &str,
    model: &str,
    complexity: ComplexityClass,
    summary: CostSummary,
    start: Instant,
    agent: Option<(usize, StopReason)>,
) -> Result<(), SkiffError> {
    if args.json {
        let report = AskReport {
            response: response.to_string(),
            tier: summary.tier.to_string(),
            model: model.to_string(),
            input_tokens: summary.input_tokens,
            output_tokens: summary.output_tokens,
            total_tokens: summary.total_tokens(),
            cost_cents: summary.cost_cents,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            complexity: complexity.to_string(),
            iterations: agent.map(|(n, _)| n),
            stop: agent.map(|(_, stop)| stop),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| SkiffError::Internal(format!("failed to encode answer: {e}")))?;
        println!("{json}");
    } else if !args.quiet {
        summary.print();
    }
    Ok(())
}

/// Streams one answer, echoing tokens to stdout when `echo` is set.
async fn stream_answer(
    backend: &dyn ChatBackend,
    messages: Vec<Message>,
    cancel: &CancellationToken,
    echo: bool,
) -> Result<ChatResponse, SkiffError> {
    let request = ChatRequest {
        messages,
        tools: Vec::new(),
    };
    let mut response = ChatResponse::default();
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SkiffError::Cancelled),
        r = drain_answer(backend, request, &mut response, echo) => r,
    };
    result.map(|()| response)
}

async fn drain_answer(
    backend: &dyn ChatBackend,
    request: ChatRequest,
    acc: &mut ChatResponse,
    echo: bool,
) -> Result<(), SkiffError> {
    let mut on_token = move |token: &str| {
        if echo {
            print!("{token}");
            std::io::stdout().flush().ok();
        }
    };
    backend
        .dispatch(request)
        .await?
        .drain_into(acc, &mut on_token)
        .await
}

fn direct_backend(
    config: &SkiffConfig,
    tier: Tier,
    model: Option<&str>,
) -> Result<Box<dyn ChatBackend>, SkiffError> {
    if tier.is_local() {
        return Ok(Box::new(local_backend(config, model)?));
    }
    let model = model
        .map(str::to_string)
        .unwrap_or_else(|| cloud_model_for_tier(tier, &config.cloud.model));
    Ok(Box::new(cloud_backend(config, model)?))
}

fn local_backend(config: &SkiffConfig, model: Option<&str>) -> Result<OllamaBackend, SkiffError> {
    let backend = OllamaBackend::from_config(&config.local)?;
    Ok(match model {
        Some(model) => backend.with_model(model),
        None => backend,
    })
}

fn cloud_backend(config: &SkiffConfig, model: String) -> Result<OpenRouterBackend, SkiffError> {
    let key = config.cloud_api_key().ok_or_else(|| {
        SkiffError::Config(
            "no OpenRouter API key: set cloud.api_key or OPENROUTER_API_KEY".to_string(),
        )
    })?;
    Ok(OpenRouterBackend::from_config(&config.cloud, key)?.with_model(model))
}

fn workspace_dir(config: &SkiffConfig) -> Result<PathBuf, SkiffError> {
    match &config.tools.workspace {
        Some(dir) => Ok(Path::new(dir).to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| SkiffError::Internal(format!("cannot determine working directory: {e}"))),
    }
}

/// Reported usage, or an estimate when the backend reported none.
fn effective_usage(response: &ChatResponse, question: &str) -> TokenUsage {
    if response.usage.total() > 0 {
        return response.usage;
    }
    TokenUsage {
        prompt_tokens: estimate_tokens(question),
        completion_tokens: estimate_tokens(&response.content),
    }
}

/// Auto-routed answers are priced from the model's reported usage; named
/// tiers use their own rates.
fn answer_cost_cents(tier: Tier, model: &str, is_cloud: bool, usage: TokenUsage) -> f64 {
    if !is_cloud {
        return 0.0;
    }
    match tier {
        Tier::Auto | Tier::Cloud => {
            cloud_cost_usd(model, usage.prompt_tokens, usage.completion_tokens) * 100.0
        }
        other => other.cost_cents(usage.prompt_tokens, usage.completion_tokens),
    }
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attached_files_are_fenced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.go");
        std::fs::write(&path, "package main").unwrap();

        let question = attach_files("what does this do?", &[path.clone()], 1024).unwrap();
        assert_eq!(
            question,
            format!(
                "what does this do?\n--- File: {} ---\npackage main\n--- End of file ---\n",
                path.display()
            )
        );
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, "x".repeat(64)).unwrap();

        let err = attach_files("q", &[path], 32).unwrap_err();
        assert!(err.to_string().contains("limited to 32 bytes"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = attach_files("q", &[PathBuf::from("/nonexistent/skiff.txt")], 1024).unwrap_err();
        assert!(matches!(err, SkiffError::Config(_)));
    }

    #[test]
    fn usage_is_estimated_when_unreported() {
        let response = ChatResponse {
            content: "four words of answer".into(),
            ..Default::default()
        };
        let usage = effective_usage(&response, "what is two plus two");
        assert!(usage.prompt_tokens > 0);
        assert!(usage.completion_tokens > 0);
    }

    #[test]
    fn local_answers_are_free() {
        let usage = TokenUsage {
            prompt_tokens: 1000,
            completion_tokens: 1000,
        };
        assert_eq!(answer_cost_cents(Tier::Local, "qwen2.5-coder:14b", false, usage), 0.0);
        assert_eq!(
            answer_cost_cents(Tier::Auto, "meta-llama/llama-3.1-8b-instruct:free", true, usage),
            0.0
        );
        assert!(answer_cost_cents(Tier::Auto, "openrouter/auto", true, usage) > 0.0);
        assert_eq!(
            answer_cost_cents(Tier::Opus, "anthropic/claude-3-opus", true, usage),
            Tier::Opus.cost_cents(1000, 1000)
        );
    }

    #[test]
    fn configured_workspace_is_used() {
        let mut config = SkiffConfig::default();
        config.tools.workspace = Some("/srv/project".into());
        assert_eq!(workspace_dir(&config).unwrap(), PathBuf::from("/srv/project"));
    }
}
