// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Choosing between the cloud and a local model for an agentic run.

use skiff_config::SkiffConfig;
use skiff_core::{AuditEvent, AuditSink, LocalModels};
use skiff_router::{RoutingDecision, Tier};
use strum::Display;
use tracing::{debug, info, warn};

use crate::capability::CapabilityCheck;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    Local,
    Cloud,
}

/// Where an agentic run goes, and what to tell the user about it.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendChoice {
    pub kind: BackendKind,
    pub model: String,
    pub warning: Option<String>,
}

/// Inputs to [`select_backend`] beyond the routing decision.
#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
    pub has_cloud_key: bool,
    pub paranoid: bool,
    pub offline: bool,
    pub local_model: String,
    pub cloud_model: String,
    pub fallback_models: Vec<String>,
}

impl SelectionOptions {
    pub fn from_config(config: &SkiffConfig) -> Self {
        Self {
            has_cloud_key: config.cloud_api_key().is_some(),
            paranoid: config.security.paranoid,
            offline: config.security.offline,
            local_model: config.local.model.clone(),
            cloud_model: config.cloud.model.clone(),
            fallback_models: config.local.fallback_models.clone(),
        }
    }
}

/// Picks the backend for an agentic run.
///
/// The cloud is used only with a key, a non-local decision, and neither
/// paranoid nor offline mode. Otherwise the configured local model is
/// checked for agentic capability; an unsuitable model is swapped for the
/// first installed and suitable fallback. If none is installed the
/// configured model is kept with a warning.
pub async fn select_backend(
    decision: &RoutingDecision,
    opts: &SelectionOptions,
    capability: &dyn CapabilityCheck,
    models: &dyn LocalModels,
    audit: &dyn AuditSink,
) -> BackendChoice {
    let choice = if opts.has_cloud_key
        && !decision.tier.is_local()
        && !opts.paranoid
        && !opts.offline
    {
        BackendChoice {
            kind: BackendKind::Cloud,
            model: cloud_model_for_tier(decision.tier, &opts.cloud_model),
            warning: None,
        }
    } else {
        select_local(opts, capability, models).await
    };

    info!(backend = %choice.kind, model = %choice.model, "backend selected");
    audit.record(AuditEvent::BackendSelected {
        backend: choice.kind.to_string(),
        model: choice.model.clone(),
    });
    choice
}

/// Auto-routed tiers use the configured cloud model; named tiers pin theirs.
pub fn cloud_model_for_tier(tier: Tier, configured: &str) -> String {
    match tier {
        Tier::Auto | Tier::Cloud => configured.to_string(),
        other => other
            .model_id()
            .map(str::to_string)
            .unwrap_or_else(|| configured.to_string()),
    }
}

async fn select_local(
    opts: &SelectionOptions,
    capability: &dyn CapabilityCheck,
    models: &dyn LocalModels,
) -> BackendChoice {
    let report = capability.check(&opts.local_model);
    if report.suitable {
        return BackendChoice {
            kind: BackendKind::Local,
            model: opts.local_model.clone(),
            warning: report.warning,
        };
    }

    let reason = report
        .warning
        .clone()
        .unwrap_or_else(|| format!("model {} is not suited to agentic tasks", opts.local_model));

    for candidate in &opts.fallback_models {
        if candidate == &opts.local_model || !capability.check(candidate).suitable {
            continue;
        }
        match models.model_exists(candidate).await {
            Ok(true) => {
                info!(from = %opts.local_model, to = %candidate, "switching to fallback model");
                return BackendChoice {
                    kind: BackendKind::Local,
                    model: candidate.clone(),
                    warning: Some(format!("{reason}; using {candidate} instead")),
                };
            }
            Ok(false) => debug!(model = %candidate, "fallback model not installed"),
            Err(e) => debug!(model = %candidate, error = %e, "could not check fallback model"),
        }
    }

    let advice = match (&report.recommendation, &report.suggested_model) {
        (Some(rec), Some(model)) => format!("{reason}. {rec} (e.g. `ollama pull {model}`)"),
        (Some(rec), None) => format!("{reason}. {rec}"),
        _ => reason,
    };
    warn!(model = %opts.local_model, "{advice}");
    BackendChoice {
        kind: BackendKind::Local,
        model: opts.local_model.clone(),
        warning: Some(advice),
    }
}
