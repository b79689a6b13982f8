//! `genaiops ask`: Answer one query.

use crate::RunArgs;
use crate::runtime::Runtime;
use genaiops_config::AppConfig;

pub async fn run(config: AppConfig, query: &str, json: bool, args: &RunArgs) -> anyhow::Result<()> {
    let runtime = Runtime::build(config, args).await?;

    if !json {
        eprint!("  Thinking...");
    }
    let result = runtime.orchestrator.run(query).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        eprint!("\r              \r");
        super::print_result(&result, &runtime.guard_label());
    }

    runtime.finish()?;

    if !result.success {
        anyhow::bail!("run failed: {}", result.error.unwrap_or_default());
    }
    Ok(())
}
