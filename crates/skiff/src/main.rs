// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Skiff - route questions between a local model and the cloud.
//!
//! This is the binary entry point for the `skiff` CLI.

mod ask;
mod display;
mod models;
mod route;

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use clap::{Parser, Subcommand};
use colored::Colorize;
use skiff_config::{ConfigError, SkiffConfig};
use skiff_core::SkiffError;
use skiff_security::{RedactingWriter, redact};

use crate::ask::AskArgs;
use crate::route::RouteArgs;

/// Skiff - route questions between a local model and the cloud.
#[derive(Parser, Debug)]
#[command(name = "skiff", version, about, long_about = None)]
struct Cli {
    /// Show debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of the usual locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question. Add --agentic to let the model use tools.
    Ask(AskArgs),
    /// Show where a question would be routed, without sending it.
    Route(RouteArgs),
    /// List models installed on the local server.
    Models {
        /// Print the list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate and print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            skiff_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let secrets = Arc::new(RwLock::new(Vec::new()));
    if let Some(key) = config.cloud_api_key() {
        RedactingWriter::<std::io::Stderr>::add_known_value(&secrets, key);
    }
    init_tracing(&config.agent.log_level, cli.verbose, Arc::clone(&secrets));

    let result = match cli.command {
        Commands::Ask(args) => ask::run_ask(config, args).await,
        Commands::Route(args) => route::run_route(config, args),
        Commands::Models { json } => models::run_models(config, json).await,
        Commands::Config => run_config(&config),
    };

    if let Err(e) = result {
        let known = secrets.read().unwrap_or_else(PoisonError::into_inner);
        eprintln!("{}: {}", "error".red().bold(), redact(&e.to_string(), &known));
        std::process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<SkiffConfig, Vec<ConfigError>> {
    match path {
        Some(path) => skiff_config::load_and_validate_path(path),
        None => skiff_config::load_and_validate(),
    }
}

/// Initialize the tracing subscriber. Logs go to stderr with known secrets masked.
///
/// `RUST_LOG` wins over `--verbose`, which wins over the configured level.
fn init_tracing(log_level: &str, verbose: bool, secrets: Arc<RwLock<Vec<String>>>) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("skiff={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_thread_names(false)
        .with_writer(move || RedactingWriter::new(std::io::stderr(), Arc::clone(&secrets)))
        .init();
}

/// Prints the validated configuration as TOML with the API key masked.
fn run_config(config: &SkiffConfig) -> Result<(), SkiffError> {
    let mut shown = config.clone();
    let key = config.cloud_api_key();
    shown.cloud.api_key = key.as_deref().map(skiff_openrouter::mask_api_key);

    let rendered = toml::to_string_pretty(&shown)
        .map_err(|e| SkiffError::Internal(format!("failed to render config: {e}")))?;
    println!("{rendered}");

    eprintln!("{} configuration is valid", "ok:".green().bold());
    match key {
        Some(key) if !skiff_openrouter::validate_api_key(&key) => eprintln!(
            "{} the OpenRouter API key does not look like an `sk-or-` key",
            "warning:".yellow()
        ),
        Some(_) => {}
        None => eprintln!(
            "{}",
            "no cloud API key: every question will be answered locally".dimmed()
        ),
    }
    if config.is_paranoid() {
        eprintln!("{}", "paranoid mode: the cloud is never used".dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use skiff_core::ClassificationLevel;
    use skiff_router::Tier;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_flags_parse() {
        let cli = Cli::try_parse_from([
            "skiff",
            "ask",
            "--agentic",
            "--max-iter",
            "3",
            "--offline",
            "--max-tier",
            "sonnet",
            "--classification",
            "cui",
            "-f",
            "a.rs",
            "--file",
            "b.rs",
            "how",
            "many",
            "files?",
        ])
        .unwrap();
        let Commands::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert!(args.agentic);
        assert_eq!(args.max_iter, Some(3));
        assert!(args.routing.offline);
        assert_eq!(args.routing.max_tier, Some(Tier::Sonnet));
        assert_eq!(args.routing.classification, Some(ClassificationLevel::Cui));
        assert_eq!(args.files, vec![PathBuf::from("a.rs"), PathBuf::from("b.rs")]);
        assert_eq!(args.question.join(" "), "how many files?");
    }

    #[test]
    fn local_is_an_alias_for_paranoid() {
        let cli = Cli::try_parse_from(["skiff", "route", "--local", "hello"]).unwrap();
        let Commands::Route(args) = cli.command else {
            panic!("expected route");
        };
        assert!(args.routing.paranoid);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["skiff", "ask", "--mode", "turbo", "hi"]).is_err());
    }

    #[test]
    fn ask_requires_a_question() {
        assert!(Cli::try_parse_from(["skiff", "ask"]).is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["skiff", "models", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn config_command_masks_key() {
        let mut config = SkiffConfig::default();
        config.cloud.api_key = Some("sk-or-v1-abcdefghijklmnopqrstuvwxyz0123456789".into());
        assert!(run_config(&config).is_ok());
    }
}
