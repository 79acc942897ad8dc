//! Mock-backed services for running workflow bodies on the local runtime.

use super::WorkflowFn;
use crate::activities::{
    CommonActivities, DataProcessingActivities, FreshnessActivities, GiphyActivities,
    HelloActivities, SqlActivities, WeatherActivities,
};
use crate::bootstrap::{register_activities, WorkerServices};
use crate::ports::{
    MockAssetCatalog, MockChatNotifier, MockGifSearch, MockSqlSource, MockWeatherApi,
};
use crate::runtime::{ActivityRegistry, LocalRuntime, WorkflowConfig};
use common::object_store::{write_json, MemoryObjectStore};
use common::state_store::StateStore;
use common::AppResult;
use serde_json::Value;
use std::sync::Arc;

pub(crate) struct Fixture {
    gifs: MockGifSearch,
    chat: MockChatNotifier,
    weather: MockWeatherApi,
    catalog: MockAssetCatalog,
    sql: MockSqlSource,
}

pub(crate) struct BuiltFixture {
    pub objects: Arc<MemoryObjectStore>,
    pub state: StateStore,
    pub registry: Arc<ActivityRegistry>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            gifs: MockGifSearch::new(),
            chat: MockChatNotifier::new(),
            weather: MockWeatherApi::new(),
            catalog: MockAssetCatalog::new(),
            sql: MockSqlSource::new(),
        }
    }

    pub fn gifs(mut self, gifs: MockGifSearch) -> Self {
        self.gifs = gifs;
        self
    }

    pub fn chat(mut self, chat: MockChatNotifier) -> Self {
        self.chat = chat;
        self
    }

    pub fn weather(mut self, weather: MockWeatherApi) -> Self {
        self.weather = weather;
        self
    }

    pub fn catalog(mut self, catalog: MockAssetCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn sql(mut self, sql: MockSqlSource) -> Self {
        self.sql = sql;
        self
    }

    pub fn build(self) -> BuiltFixture {
        let objects = Arc::new(MemoryObjectStore::new());
        let state = StateStore::new(objects.clone());
        let services = WorkerServices {
            common: Arc::new(CommonActivities::new(state.clone())),
            hello: Arc::new(HelloActivities::new()),
            giphy: Arc::new(GiphyActivities::new(Arc::new(self.gifs), Arc::new(self.chat))),
            weather: Arc::new(WeatherActivities::new(Arc::new(self.weather))),
            freshness: Arc::new(FreshnessActivities::new(Arc::new(self.catalog))),
            data_processing: Arc::new(DataProcessingActivities::new(objects.clone())),
            sql: Arc::new(SqlActivities::new(Arc::new(self.sql), objects.clone())),
        };

        let mut registry = ActivityRegistry::new();
        register_activities(&mut registry, &services);

        BuiltFixture {
            objects,
            state,
            registry: Arc::new(registry),
        }
    }
}

impl BuiltFixture {
    pub async fn store_config(&self, workflow_id: &str, config: Value) {
        self.state
            .save_configuration(workflow_id, config)
            .await
            .unwrap();
    }

    pub async fn seed_object(&self, path: &str, value: Value) {
        write_json(self.objects.as_ref(), path, &value).await.unwrap();
    }

    pub async fn run(&self, workflow: WorkflowFn, workflow_id: &str, trigger: Value) -> AppResult<Value> {
        let runtime = LocalRuntime::new(workflow_id, self.registry.clone());
        let config = WorkflowConfig::new(
            workflow_id,
            trigger.as_object().cloned().unwrap_or_default(),
        );
        workflow(&runtime, config).await
    }
}
