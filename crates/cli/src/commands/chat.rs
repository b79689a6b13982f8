//! `genaiops chat`: Interactive question loop.

use crate::RunArgs;
use crate::runtime::Runtime;
use genaiops_config::AppConfig;
use genaiops_core::RunEvent;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: &[&str] = &["exit", "quit", "q"];

pub async fn run(config: AppConfig, args: &RunArgs) -> anyhow::Result<()> {
    let runtime = Runtime::build(config, args).await?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        genaiops Agent — Interactive Mode      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", runtime.config.provider.name);
    println!("  Model:     {}", runtime.orchestrator.model());
    println!("  Tools:     {}", runtime.orchestrator.tools().names().join(", "));
    println!("  Guard:     {}", runtime.guard_label());
    println!("  Budget:    {} iterations", runtime.orchestrator.max_iterations());
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    // Show tool activity while a run is in progress
    let mut events = runtime.events.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.as_ref() {
                RunEvent::ToolStarted { tool_name, .. } => eprintln!("    … {tool_name}"),
                RunEvent::ToolExecuted { tool_name, success, duration_ms, .. } => {
                    let mark = if *success { "✓" } else { "✗" };
                    eprintln!("    {mark} {tool_name} ({duration_ms} ms)");
                }
                _ => {}
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break;
        }

        let result = runtime.orchestrator.run(query).await;
        super::print_result(&result, &runtime.guard_label());
    }

    progress.abort();
    runtime.finish()?;

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
