use anyhow::Result;
use common::settings::Settings;
use std::str::FromStr;
use temporalio_client::ClientOptions;
use temporalio_common::worker::{WorkerConfig, WorkerTaskTypes, WorkerVersioningStrategy};
use temporalio_sdk::Worker;
use temporalio_sdk_core::{init_worker, CoreRuntime, RuntimeOptions, Url};

pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct TemporalWorkerRuntime {
    pub worker: Worker,
    // Keep runtime alive for the lifetime of the worker.
    _runtime: CoreRuntime,
}

fn get_host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "Unknown".to_string())
}

pub(crate) fn get_worker_identity(task_queue: &str) -> String {
    format!("{}@{}@{}", std::process::id(), get_host_name(), task_queue)
}

fn build_id(settings: &Settings) -> String {
    format!("{}-worker-{}", settings.app.name, CLIENT_VERSION)
}

/// Connection options shared by the worker, the engine and the starter.
pub fn client_options(settings: &Settings, client_name: &str) -> Result<ClientOptions> {
    let identity = get_worker_identity(&settings.temporal.task_queue);
    Ok(ClientOptions::builder()
        .target_url(Url::from_str(&settings.temporal.server_url)?)
        .client_name(client_name.to_string())
        .client_version(CLIENT_VERSION.to_string())
        .identity(identity)
        .build())
}

pub async fn build_temporal_worker(settings: &Settings) -> Result<TemporalWorkerRuntime> {
    let namespace = settings.temporal.namespace.as_str();
    let task_queue = settings.temporal.task_queue.as_str();

    let client = client_options(settings, &format!("{}-worker", settings.app.name))?
        .connect(namespace, None)
        .await?;

    let runtime_options = RuntimeOptions::builder()
        .build()
        .map_err(|e| anyhow::anyhow!(e))?;
    let runtime = CoreRuntime::new_assume_tokio(runtime_options).map_err(|e| anyhow::anyhow!(e))?;

    let worker_config = WorkerConfig::builder()
        .namespace(namespace)
        .task_queue(task_queue)
        .task_types(WorkerTaskTypes::all())
        .versioning_strategy(WorkerVersioningStrategy::None {
            build_id: build_id(settings),
        })
        .build()
        .map_err(|e| anyhow::anyhow!(e))?;

    let core_worker = init_worker(&runtime, worker_config, client)?;
    let worker = Worker::new_from_core(std::sync::Arc::new(core_worker), task_queue);
    tracing::info!(
        server_url = %settings.temporal.server_url,
        namespace,
        task_queue,
        "Temporal worker initialized"
    );

    Ok(TemporalWorkerRuntime {
        worker,
        _runtime: runtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_host_name_returns_non_empty_value() {
        let host = get_host_name();
        assert!(!host.trim().is_empty());
    }

    #[test]
    fn get_worker_identity_contains_pid_host_and_task_queue() {
        let identity = get_worker_identity("queue-a");
        let parts: Vec<&str> = identity.split('@').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<u32>().is_ok());
        assert!(!parts[1].is_empty());
        assert_eq!(parts[2], "queue-a");
    }

    #[test]
    fn build_id_carries_app_name() {
        let settings = Settings::default();
        assert!(build_id(&settings).starts_with("appflow-worker-"));
    }

    #[test]
    fn client_options_reject_bad_server_url() {
        let mut settings = Settings::default();
        settings.temporal.server_url = "not a url".to_string();
        assert!(client_options(&settings, "test").is_err());
    }
}
