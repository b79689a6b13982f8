//! genaiops CLI, the main entry point.
//!
//! Commands:
//! - `ask`    : Answer a single query and print run metadata
//! - `chat`   : Interactive question loop
//! - `status` : Show configuration, guard and tool status
//! - `tools`  : List the tool contracts offered to the reasoner

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "genaiops",
    about = "genaiops — guarded ReAct assistant for DevOps questions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (defaults to ~/.genaiops/config.toml)
    #[arg(long, global = true, env = "GENAIOPS_CONFIG")]
    config: Option<PathBuf>,
}

/// Options shared by the commands that run the agent.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Override agent.max_iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Skip the model-backed safety evaluator and use the policy rules only
    #[arg(long)]
    pub no_primary_guard: bool,

    /// Write collected traces to this JSON file on exit
    #[arg(long, value_name = "PATH")]
    pub save_telemetry: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single query
    Ask {
        /// The question to answer
        query: String,

        /// Print the full run result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Ask questions interactively
    Chat {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Show configuration and guard status
    Status,

    /// List available tools
    Tools {
        /// Include each tool's parameter schema
        #[arg(long)]
        schema: bool,
    },
}

fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter(cli.verbose, cli.quiet))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = runtime::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask { query, json, run } => commands::ask::run(config, &query, json, &run).await?,
        Commands::Chat { run } => commands::chat::run(config, &run).await?,
        Commands::Status => commands::status::run(config).await?,
        Commands::Tools { schema } => commands::tools::run(config, schema)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_filter() {
        assert_eq!(log_filter(0, false), "info");
        assert_eq!(log_filter(1, false), "debug");
        assert_eq!(log_filter(2, false), "trace");
        assert_eq!(log_filter(0, true), "error");
    }

    #[test]
    fn parses_ask_with_run_flags() {
        let cli = Cli::try_parse_from([
            "genaiops",
            "-vv",
            "ask",
            "Is pandas approved?",
            "--max-iterations",
            "3",
            "--no-primary-guard",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { query, json, run } => {
                assert_eq!(query, "Is pandas approved?");
                assert!(!json);
                assert_eq!(run.max_iterations, Some(3));
                assert!(run.no_primary_guard);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["genaiops", "-q", "-v", "status"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
