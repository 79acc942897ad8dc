use api::handler::SqlHandler;
use api::Application;
use clap::Parser;
use common::settings::{Cli, EngineMode, Settings};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Runs the workflow worker and the HTTP server together.
#[derive(Debug, Parser)]
#[command(name = "app")]
struct Args {
    /// Port for the HTTP server.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Settings TOML layered over the default sources.
    #[arg(long, env = "APPFLOW_CONFIG_PATH")]
    config: Option<String>,

    /// Overrides `engine.mode` (`local` or `temporal`).
    #[arg(long)]
    engine: Option<EngineMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load(&Cli {
        port: args.port,
        config: args.config,
    })?;
    if let Some(mode) = args.engine {
        settings.engine.mode = mode;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api=debug,worker=debug,common=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        app = %settings.app.name,
        engine = %settings.engine.mode,
        port = settings.port,
        "Starting application"
    );

    Application::builder(settings)
        .handler(Arc::new(SqlHandler::new()))
        .build()
        .await?
        .run()
        .await
}
