use crate::activities::{
    CommonActivities, DataProcessingActivities, FreshnessActivities, GiphyActivities,
    HelloActivities, SqlActivities, WeatherActivities,
};
use anyhow::Result;
use common::clients::{
    CatalogClient, ClientAdapter, Credentials, GiphyClient, SlackClient, SqlClient, WeatherClient,
};
use common::object_store::{MemoryObjectStore, ObjectStore, S3ObjectStore};
use common::settings::{Settings, StorageBackend};
use common::state_store::StateStore;
use std::sync::Arc;

pub struct WorkerContext {
    pub settings: Arc<Settings>,
    pub objects: Arc<dyn ObjectStore>,
    pub state: StateStore,
    pub giphy: Arc<GiphyClient>,
    pub slack: Arc<SlackClient>,
    pub weather: Arc<WeatherClient>,
    pub catalog: Arc<CatalogClient>,
    pub sql: Arc<SqlClient>,
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("app", &self.settings.app.name)
            .field("engine", &self.settings.engine.mode)
            .field("storage", &self.settings.storage.backend)
            .field("objects", &"ObjectStore")
            .field("clients", &["giphy", "slack", "weather", "catalog", "sql"])
            .finish()
    }
}

pub struct WorkerServices {
    pub common: Arc<CommonActivities>,
    pub hello: Arc<HelloActivities>,
    pub giphy: Arc<GiphyActivities>,
    pub weather: Arc<WeatherActivities>,
    pub freshness: Arc<FreshnessActivities>,
    pub data_processing: Arc<DataProcessingActivities>,
    pub sql: Arc<SqlActivities>,
}

pub async fn build_object_store(settings: &Settings) -> Arc<dyn ObjectStore> {
    match settings.storage.backend {
        StorageBackend::S3 => Arc::new(S3ObjectStore::new(&settings.s3).await),
        StorageBackend::Memory => {
            if settings.temporal_enabled() {
                tracing::warn!(
                    "Temporal engine with in-memory storage: the state store is not shared with other processes"
                );
            }
            Arc::new(MemoryObjectStore::new())
        }
    }
}

/// Loads an adapter, logging instead of failing when it is not configured.
/// Activities that need it report the `Configuration` error at run time.
async fn load_client(client: &dyn ClientAdapter, credentials: Credentials) {
    match client.load(&credentials).await {
        Ok(()) => tracing::info!(client = client.name(), "Client loaded"),
        Err(e) => tracing::warn!(client = client.name(), error = %e, "Client not loaded"),
    }
}

pub async fn build_worker_context(settings: Settings) -> Result<Arc<WorkerContext>> {
    let objects = build_object_store(&settings).await;
    let state = StateStore::new(objects.clone());

    let giphy = Arc::new(GiphyClient::new());
    let slack = Arc::new(SlackClient::new());
    let weather = Arc::new(WeatherClient::new());
    let catalog = Arc::new(CatalogClient::new());
    let sql = Arc::new(SqlClient::new());

    load_client(giphy.as_ref(), settings.giphy.credentials()).await;
    load_client(slack.as_ref(), settings.slack.credentials()).await;
    load_client(weather.as_ref(), settings.weather.credentials()).await;
    load_client(catalog.as_ref(), settings.catalog.credentials()).await;
    if settings.sql.is_configured() {
        load_client(sql.as_ref(), settings.sql.credentials()).await;
    }

    Ok(Arc::new(WorkerContext {
        settings: Arc::new(settings),
        objects,
        state,
        giphy,
        slack,
        weather,
        catalog,
        sql,
    }))
}

pub fn build_worker_services(ctx: &Arc<WorkerContext>) -> WorkerServices {
    WorkerServices {
        common: Arc::new(CommonActivities::new(ctx.state.clone())),
        hello: Arc::new(HelloActivities::new()),
        giphy: Arc::new(GiphyActivities::new(ctx.giphy.clone(), ctx.slack.clone())),
        weather: Arc::new(WeatherActivities::new(ctx.weather.clone())),
        freshness: Arc::new(FreshnessActivities::new(ctx.catalog.clone())),
        data_processing: Arc::new(DataProcessingActivities::new(ctx.objects.clone())),
        sql: Arc::new(SqlActivities::new(ctx.sql.clone(), ctx.objects.clone())),
    }
}

/// Closes every adapter session. Safe to call more than once.
pub async fn shutdown(ctx: &WorkerContext) {
    let clients: [&dyn ClientAdapter; 5] = [
        ctx.giphy.as_ref(),
        ctx.slack.as_ref(),
        ctx.weather.as_ref(),
        ctx.catalog.as_ref(),
        ctx.sql.as_ref(),
    ];
    for client in clients {
        if let Err(e) = client.close().await {
            tracing::warn!(client = client.name(), error = %e, "Failed to close client");
        }
    }
}
