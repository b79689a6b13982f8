//! `genaiops tools`: List the tool contracts offered to the reasoner.

use crate::runtime::build_tools;
use genaiops_config::AppConfig;

pub fn run(config: AppConfig, schema: bool) -> anyhow::Result<()> {
    let registry = build_tools(&config);
    println!("Available tools ({})", registry.len());
    for definition in registry.definitions() {
        println!();
        println!("  {}", definition.name);
        println!("    {}", definition.description);
        if schema {
            let pretty = serde_json::to_string_pretty(&definition.parameters)?;
            for line in pretty.lines() {
                println!("    {line}");
            }
        }
    }
    Ok(())
}
