// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `skiff models`: list installed local models and how well each drives tools.

use colored::Colorize;
use serde::Serialize;
use skiff_agent::capability::SUGGESTED_MODEL;
use skiff_agent::{CapabilityCheck, FamilyHeuristic};
use skiff_config::SkiffConfig;
use skiff_core::{LocalModels, ModelInfo, SkiffError};
use skiff_ollama::OllamaBackend;

#[derive(Debug, Serialize)]
struct ModelRow {
    name: String,
    size_bytes: u64,
    parameter_size: Option<String>,
    family: Option<String>,
    agentic: &'static str,
    configured: bool,
}

fn row(model: ModelInfo, configured_model: &str) -> ModelRow {
    let report = FamilyHeuristic.check(&model.name);
    let agentic = match (report.suitable, report.warning.is_some()) {
        (true, false) => "yes",
        (true, true) => "limited",
        (false, _) => "no",
    };
    ModelRow {
        configured: model.name == configured_model
            || model.name.strip_suffix(":latest") == Some(configured_model),
        name: model.name,
        size_bytes: model.size_bytes,
        parameter_size: model.parameter_size,
        family: model.family,
        agentic,
    }
}

fn human_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else {
        format!("{:.0} MB", b / MB)
    }
}

pub async fn run_models(config: SkiffConfig, json: bool) -> Result<(), SkiffError> {
    let backend = OllamaBackend::from_config(&config.local)?;
    let rows: Vec<ModelRow> = backend
        .list_models()
        .await?
        .into_iter()
        .map(|m| row(m, &config.local.model))
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|e| SkiffError::Internal(format!("failed to encode models: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    if rows.is_empty() {
        println!("No local models installed.");
        println!("Try: {}", format!("ollama pull {SUGGESTED_MODEL}").bold());
        return Ok(());
    }

    println!(
        "  {:<36} {:>9} {:>8}  {}",
        "NAME".bold(),
        "SIZE".bold(),
        "PARAMS".bold(),
        "AGENTIC".bold()
    );
    for r in &rows {
        let marker = if r.configured { "*" } else { " " };
        let agentic = match r.agentic {
            "yes" => r.agentic.green(),
            "limited" => r.agentic.yellow(),
            _ => r.agentic.red(),
        };
        println!(
            "{marker} {:<36} {:>9} {:>8}  {agentic}",
            r.name,
            human_size(r.size_bytes),
            r.parameter_size.as_deref().unwrap_or("-"),
        );
    }
    println!();
    println!("{}", "* configured model".dimmed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> ModelInfo {
        ModelInfo {
            name: name.into(),
            size_bytes: 9 * 1024 * 1024 * 1024,
            family: Some("qwen2".into()),
            parameter_size: Some("14.8B".into()),
        }
    }

    #[test]
    fn configured_model_matches_latest_tag() {
        assert!(row(info("mistral:latest"), "mistral").configured);
        assert!(row(info("qwen2.5-coder:14b"), "qwen2.5-coder:14b").configured);
        assert!(!row(info("qwen2.5-coder:7b"), "qwen2.5-coder:14b").configured);
    }

    #[test]
    fn small_models_are_flagged() {
        assert_eq!(row(info("qwen2.5-coder:14b"), "").agentic, "yes");
        assert_ne!(row(info("llama3.2:1b"), "").agentic, "yes");
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(9 * 1024 * 1024 * 1024), "9.0 GB");
        assert_eq!(human_size(512 * 1024 * 1024), "512 MB");
    }
}
