use anyhow::{Context, Result};
use clap::Parser;
use common::settings::{Cli, Settings};
use serde_json::{Map, Value};
use std::time::Duration;
use worker::bootstrap::build_worker_context;
use worker::engine::{temporal, WorkflowEngine};
use worker::runtime::WorkflowConfig;
use worker::workflows;

/// Starts one workflow run on Temporal.
#[derive(Debug, Parser)]
#[command(name = "starter")]
struct Args {
    /// Registered workflow type; defaults to `app.default_workflow`.
    #[arg(long)]
    workflow: Option<String>,

    /// JSON object stored as the run's configuration.
    #[arg(long, default_value = "{}")]
    config: String,

    /// Reuse an existing workflow id instead of generating one.
    #[arg(long)]
    workflow_id: Option<String>,

    /// Poll the run until it closes.
    #[arg(long)]
    wait: bool,

    /// Print the registered workflows and exit.
    #[arg(long)]
    list: bool,

    /// Settings TOML layered over the default sources.
    #[arg(long, env = "APPFLOW_CONFIG_PATH")]
    settings: Option<String>,
}

fn parse_config(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--config is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--config must be a JSON object, got {}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.list {
        for entry in workflows::all() {
            println!("{}", entry.definition.describe());
        }
        return Ok(());
    }

    let settings = Settings::load(&Cli {
        port: None,
        config: args.settings.clone(),
    })?;
    let workflow_type = args
        .workflow
        .unwrap_or_else(|| settings.app.default_workflow.clone());
    let entry = workflows::find(&workflow_type)
        .ok_or_else(|| anyhow::anyhow!("workflow type '{}' is not registered", workflow_type))?;
    let mut config = parse_config(&args.config)?;
    entry.prepare_config(&mut config)?;
    let workflow_id = args
        .workflow_id
        .unwrap_or_else(|| format!("{}-{}", workflow_type, uuid::Uuid::new_v4()));

    let engine = temporal::connect(&settings).await?;
    let ctx = build_worker_context(settings).await?;
    ctx.state
        .save_configuration(&workflow_id, Value::Object(config.clone()))
        .await?;

    tracing::info!("Starting workflow {} ({})", workflow_type, workflow_id);
    let handle = engine
        .start(&workflow_type, WorkflowConfig::new(workflow_id, config))
        .await?;
    println!("{}", serde_json::to_string(&handle)?);

    if args.wait {
        loop {
            let status = engine.status(&handle.workflow_id, &handle.run_id).await?;
            if status.state.is_terminal() {
                println!("{}", serde_json::to_string_pretty(&status)?);
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    Ok(())
}
