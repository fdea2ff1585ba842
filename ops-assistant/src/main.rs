//! Command-line front end for the operations assistant.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ops_adapters::http_client::HttpsClient;
use ops_assistant::runtime;
use ops_config::AssistantConfig;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "ops-assistant", version, about = "Plan, execute, and verify operational tasks")]
struct Cli {
    /// JSON settings file; the environment overrides it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = ops_telemetry::DEFAULT_DIRECTIVE)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a natural-language task through the pipeline.
    Run {
        /// The task, e.g. "What's the weather in Paris?".
        task: String,
    },
    /// List the registered tools.
    Tools,
    /// Report stages, tools, and model.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = ops_telemetry::init_tracing(&cli.log) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = AssistantConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run { task } => {
            let pipeline = runtime::build_pipeline(&config)?;
            let response = pipeline.run(&task).await?;
            print_json(&serde_json::to_value(&response).context("serialising response")?)
        }
        Command::Tools => {
            let tools = runtime::build_tools(&config.tools, &HttpsClient::new())?;
            print_json(&runtime::tools_report(&tools))
        }
        Command::Health => {
            let pipeline = runtime::build_pipeline(&config)?;
            print_json(&runtime::health_report(pipeline.tools(), &config.model.model))
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
