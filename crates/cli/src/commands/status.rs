//! `genaiops status`: Show configuration, guard and tool status.

use crate::runtime::{build_guard, build_tools};
use genaiops_config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("genaiops Status");
    println!("===============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.provider.name);
    println!("  Endpoint:     {}", config.provider.base_url);
    println!("  Model:        {}", config.provider.model);
    println!("  Temperature:  {}", config.provider.temperature);
    println!("  Max tokens:   {}", config.provider.max_tokens);
    println!("  Iterations:   {}", config.agent.max_iterations);
    println!("  API key:      {}", if config.has_api_key() { "configured" } else { "missing" });
    println!(
        "  Telemetry:    {}",
        match (config.telemetry.enabled, &config.telemetry.export_path) {
            (true, Some(path)) => format!("enabled, exported to {}", path.display()),
            (true, None) => "enabled".to_string(),
            (false, _) => "disabled".to_string(),
        }
    );

    println!();
    println!("Guard");
    match genaiops_providers::build_from_config(&config) {
        Ok(provider) => {
            let guard = build_guard(&config, provider, true)?;
            guard.ensure_initialized().await;
            let status = guard.status();
            println!("  Primary:      {}", match (&status.primary_name, status.primary_enabled) {
                (Some(name), true) => format!("{name} (active)"),
                (Some(name), false) => format!("{name} (unavailable)"),
                (None, _) => "disabled".to_string(),
            });
            println!("  Fallback:     {} ({} rules)", status.fallback, status.fallback_rules);
            println!("  Rules:        {}", guard.fallback().rule_names().join(", "));
        }
        Err(e) => {
            println!("  Primary:      unavailable ({e})");
            println!("  Fallback:     {}", genaiops_guard::FALLBACK_NAME);
        }
    }

    println!();
    println!("Tools");
    for name in build_tools(&config).names() {
        println!("  - {name}");
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, using defaults");
        println!("     Example:\n");
        for line in AppConfig::default_toml().lines() {
            println!("     {line}");
        }
    }

    Ok(())
}
