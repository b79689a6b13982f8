//! Wires config into a ready orchestrator: reasoner, guard, tools, telemetry.

use crate::RunArgs;
use anyhow::{Context, bail};
use genaiops_agent::Orchestrator;
use genaiops_config::AppConfig;
use genaiops_core::{EventBus, Provider, ToolRegistry};
use genaiops_guard::{Guard, PolicyChecker, ProviderSafetyEvaluator, RuleSet};
use genaiops_telemetry::{TelemetryEngine, TelemetryObserver};
use genaiops_tools::{APPROVED_LIBRARIES, DocumentIndex, KeywordIndex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)?,
        None => return AppConfig::load().context("Failed to load config"),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Everything a command needs to answer queries.
pub struct Runtime {
    pub config: AppConfig,
    pub orchestrator: Orchestrator,
    pub guard: Arc<Guard>,
    pub events: Arc<EventBus>,
    pub telemetry: Option<Arc<TelemetryEngine>>,
    export_path: Option<PathBuf>,
}

impl Runtime {
    pub async fn build(mut config: AppConfig, args: &RunArgs) -> anyhow::Result<Self> {
        if let Some(max) = args.max_iterations {
            config.agent.max_iterations = max;
        }
        config.validate()?;

        if !config.has_api_key() {
            print_key_help();
            bail!("No API key found. See above for setup instructions.");
        }
        let provider = genaiops_providers::build_from_config(&config)?;

        let guard = Arc::new(build_guard(&config, provider.clone(), !args.no_primary_guard)?);
        guard.ensure_initialized().await;

        let tools = Arc::new(build_tools(&config));
        let events = Arc::new(EventBus::default());

        let mut orchestrator = Orchestrator::new(provider, config.provider.model.clone(), tools, guard.clone())
            .with_max_iterations(config.agent.max_iterations)
            .with_temperature(config.provider.temperature)
            .with_max_tokens(config.provider.max_tokens)
            .with_observer(events.clone());
        if let Some(prompt) = &config.agent.system_prompt {
            orchestrator = orchestrator.with_system_prompt(prompt.clone());
        }

        let export_path = args
            .save_telemetry
            .clone()
            .or_else(|| config.telemetry.export_path.clone());
        let telemetry = (config.telemetry.enabled || export_path.is_some()).then(|| Arc::new(TelemetryEngine::new()));
        if let Some(engine) = &telemetry {
            orchestrator = orchestrator.with_observer(Arc::new(TelemetryObserver::new(engine.clone())));
        }

        Ok(Self {
            config,
            orchestrator,
            guard,
            events,
            telemetry,
            export_path,
        })
    }

    /// Which evaluator is deciding, for display.
    pub fn guard_label(&self) -> String {
        let status = self.guard.status();
        match (status.primary_enabled, status.primary_name) {
            (true, Some(name)) => format!("{name} + {}", status.fallback),
            _ => format!("{} (fallback)", status.fallback),
        }
    }

    /// Export traces if a path was requested.
    pub fn finish(&self) -> anyhow::Result<()> {
        let (Some(engine), Some(path)) = (&self.telemetry, &self.export_path) else {
            return Ok(());
        };
        let spans = engine
            .export_json(path)
            .with_context(|| format!("Failed to export telemetry to {}", path.display()))?;
        eprintln!("  Telemetry: {spans} spans written to {}", path.display());
        Ok(())
    }
}

/// The guard from config. The primary evaluator is only attached when asked for.
pub fn build_guard(config: &AppConfig, provider: Arc<dyn Provider>, use_primary: bool) -> anyhow::Result<Guard> {
    let rules = match &config.guard.rules_file {
        Some(path) => genaiops_guard::load_rules_file(path)
            .with_context(|| format!("Failed to load policy rules from {}", path.display()))?,
        None => RuleSet::builtin(),
    };
    let mut guard = Guard::new(PolicyChecker::new(rules)?);

    if use_primary && config.guard.primary_enabled {
        let mut evaluator = ProviderSafetyEvaluator::new(provider, config.guard_model());
        if let Some(prompt) = &config.guard.system_prompt {
            evaluator = evaluator.with_system_prompt(prompt.clone());
        }
        guard = guard.with_primary(Arc::new(evaluator));
    } else {
        info!("Primary safety evaluator disabled, using policy rules only");
    }
    Ok(guard)
}

/// The built-in tools, with docs search when a documents directory is configured.
pub fn build_tools(config: &AppConfig) -> ToolRegistry {
    let approved: Vec<String> = if config.tools.approved_libraries.is_empty() {
        APPROVED_LIBRARIES.iter().map(|s| s.to_string()).collect()
    } else {
        config.tools.approved_libraries.clone()
    };

    let docs = config.tools.documents_path.as_deref().and_then(|dir| {
        match KeywordIndex::from_dir(dir) {
            Ok(index) => Some(Arc::new(index) as Arc<dyn DocumentIndex>),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Documentation index unavailable, docs search disabled");
                None
            }
        }
    });

    genaiops_tools::default_registry(&approved, docs)
}

fn print_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    export NVIDIA_API_KEY='nvapi-...'");
    eprintln!("    export GENAIOPS_API_KEY='...'");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    eprintln!("  Get an NVIDIA key at: https://build.nvidia.com");
    eprintln!();
}
