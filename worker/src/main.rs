use common::settings::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worker::bootstrap::{
    build_temporal_worker, build_worker_context, build_worker_services, register_activities,
    register_workflows, shutdown,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "worker=debug,common=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new()?;
    let ctx = build_worker_context(settings).await?;
    let services = build_worker_services(&ctx);

    let mut runtime = build_temporal_worker(&ctx.settings).await?;
    register_activities(&mut runtime.worker, &services);
    register_workflows(&mut runtime.worker);

    tracing::info!(
        "Starting Temporal Worker on queue '{}'...",
        ctx.settings.temporal.task_queue
    );
    let result = runtime.worker.run().await;
    shutdown(&ctx).await;
    result?;

    Ok(())
}
