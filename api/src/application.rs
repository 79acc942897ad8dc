use crate::handler::Handler;
use crate::server;
use crate::AppState;
use anyhow::{anyhow, Result};
use axum::Router;
use common::settings::Settings;
use std::sync::Arc;
use worker::bootstrap::temporal::TemporalWorkerRuntime;
use worker::bootstrap::{
    build_temporal_worker, build_worker_context, build_worker_services, register_activities,
    register_workflows, shutdown, WorkerContext,
};
use worker::engine::{temporal, LocalEngine, WorkflowEngine};
use worker::runtime::ActivityRegistry;

pub struct ApplicationBuilder {
    settings: Settings,
    handler: Option<Arc<dyn Handler>>,
    context: Option<Arc<WorkerContext>>,
}

impl ApplicationBuilder {
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Reuses an already built context instead of loading one from settings.
    pub fn context(mut self, context: Arc<WorkerContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub async fn build(self) -> Result<Application> {
        let ctx = match self.context {
            Some(ctx) => ctx,
            None => build_worker_context(self.settings).await?,
        };
        Ok(Application {
            ctx,
            handler: self.handler,
            engine: None,
            worker: None,
        })
    }
}

/// Hosts the workflow worker and the HTTP server in one process.
pub struct Application {
    ctx: Arc<WorkerContext>,
    handler: Option<Arc<dyn Handler>>,
    engine: Option<Arc<dyn WorkflowEngine>>,
    worker: Option<TemporalWorkerRuntime>,
}

impl Application {
    pub fn builder(settings: Settings) -> ApplicationBuilder {
        ApplicationBuilder {
            settings,
            handler: None,
            context: None,
        }
    }

    pub fn context(&self) -> &Arc<WorkerContext> {
        &self.ctx
    }

    pub fn engine(&self) -> Option<Arc<dyn WorkflowEngine>> {
        self.engine.clone()
    }

    /// Registers activities and workflows with the configured engine.
    pub async fn setup_workflow(&mut self) -> Result<()> {
        let services = build_worker_services(&self.ctx);
        let settings = self.ctx.settings.clone();

        if settings.temporal_enabled() {
            let mut runtime = build_temporal_worker(&settings).await?;
            register_activities(&mut runtime.worker, &services);
            register_workflows(&mut runtime.worker);
            let engine = temporal::connect(&settings).await?;
            self.engine = Some(Arc::new(engine));
            self.worker = Some(runtime);
        } else {
            let mut registry = ActivityRegistry::new();
            register_activities(&mut registry, &services);
            self.engine = Some(Arc::new(LocalEngine::new(Arc::new(registry))));
        }

        tracing::info!(
            engine = %settings.engine.mode,
            task_queue = %settings.temporal.task_queue,
            "Workflow engine ready"
        );
        Ok(())
    }

    /// Polls the Temporal task queue until the worker stops. Local runs are
    /// executed on tokio tasks, so there is nothing to poll.
    pub async fn start_worker(&mut self) -> Result<()> {
        match self.worker.as_mut() {
            Some(runtime) => {
                tracing::info!(
                    "Starting Temporal Worker on queue '{}'...",
                    self.ctx.settings.temporal.task_queue
                );
                runtime.worker.run().await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn setup_server(&self) -> Result<Router> {
        let engine = self
            .engine
            .clone()
            .ok_or_else(|| anyhow!("setup_workflow must run before setup_server"))?;
        let state = Arc::new(AppState {
            settings: self.ctx.settings.clone(),
            engine,
            state_store: self.ctx.state.clone(),
            handler: self.handler.clone(),
        });
        Ok(server::router(state))
    }

    pub async fn start_server(router: Router, port: u16) -> Result<()> {
        server::serve(router, port).await
    }

    pub async fn run(mut self) -> Result<()> {
        self.setup_workflow().await?;
        let router = self.setup_server()?;
        let port = self.ctx.settings.port;
        let ctx = self.ctx.clone();

        let result = tokio::try_join!(self.start_worker(), Self::start_server(router, port));
        shutdown(&ctx).await;
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::SqlHandler;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_app(handler: Option<Arc<dyn Handler>>) -> Router {
        let mut builder = Application::builder(Settings::default());
        if let Some(handler) = handler {
            builder = builder.handler(handler);
        }
        let mut app = builder.build().await.unwrap();
        app.setup_workflow().await.unwrap();
        app.setup_server().unwrap()
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn setup_server_requires_workflow_setup() {
        let ctx = build_worker_context(Settings::default()).await.unwrap();
        let mut app = Application::builder(Settings::default())
            .context(ctx.clone())
            .build()
            .await
            .unwrap();
        assert!(Arc::ptr_eq(app.context(), &ctx));
        assert!(app.setup_server().is_err());
        assert!(app.engine().is_none());

        app.setup_workflow().await.unwrap();
        assert_eq!(app.engine().unwrap().name(), "local");
        // local runs need no polling loop
        app.start_worker().await.unwrap();
    }

    #[tokio::test]
    async fn health_and_workflow_listing() {
        let router = test_app(None).await;

        let (status, body) = send(&router, Method::GET, "/server/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"], json!({"status": "ok"}));

        let (status, body) = send(&router, Method::GET, "/workflows/v1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["engine"], json!("local"));
        assert_eq!(body["data"]["default_workflow"], json!("hello_world_workflow"));
        let names: Vec<&str> = body["data"]["workflows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"sql_metadata_workflow"));
    }

    #[tokio::test]
    async fn started_run_completes_and_reports_result() {
        let router = test_app(None).await;

        let (status, body) = send(
            &router,
            Method::POST,
            "/workflows/v1/start",
            Some(r#"{"workflow_id": "greet-1", "name": "Ada"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["workflow_id"], json!("greet-1"));
        let run_id = body["data"]["run_id"].as_str().unwrap().to_string();

        let uri = format!("/workflows/v1/status/greet-1/{}", run_id);
        let mut last = Value::Null;
        for _ in 0..200 {
            let (status, body) = send(&router, Method::GET, &uri, None).await;
            assert_eq!(status, StatusCode::OK);
            last = body["data"].clone();
            if last["state"] != json!("running") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(last["state"], json!("completed"));
        assert_eq!(last["result"], json!({"greeting": "Hello, Ada!"}));

        let (status, body) =
            send(&router, Method::GET, "/workflows/v1/config/greet-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], json!("Ada"));
    }

    #[tokio::test]
    async fn named_start_generates_workflow_id() {
        let router = test_app(None).await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/workflows/v1/hello_world_workflow/start",
            Some("{}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["data"]["workflow_id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn freshness_trigger_stores_a_fixed_cutoff() {
        let router = test_app(None).await;

        let (status, _) = send(
            &router,
            Method::POST,
            "/workflows/v1/freshness_monitor_workflow/start",
            Some(r#"{"workflow_id": "fresh-1", "stale_days": 7}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&router, Method::GET, "/workflows/v1/config/fresh-1", None).await;
        assert_eq!(status, StatusCode::OK);
        let stored: chrono::DateTime<chrono::Utc> =
            serde_json::from_value(body["data"]["updated_before"].clone()).unwrap();
        let expected = chrono::Utc::now() - chrono::Duration::days(7);
        assert!((expected - stored).num_seconds().abs() < 60);

        let (status, _) = send(
            &router,
            Method::POST,
            "/workflows/v1/freshness_monitor_workflow/start",
            Some(r#"{"workflow_id": "fresh-2", "stale_days": -1}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&router, Method::GET, "/workflows/v1/config/fresh-2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn request_errors_map_to_statuses() {
        let router = test_app(None).await;

        let (status, body) =
            send(&router, Method::POST, "/workflows/v1/nope/start", Some("{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], json!(false));

        let (status, _) = send(&router, Method::GET, "/workflows/v1/config/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, Method::POST, "/workflows/v1/start", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, Method::POST, "/workflows/v1/start", Some("[1, 2]")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, Method::GET, "/workflows/v1/status/wf/run", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, Method::POST, "/workflows/v1/auth", Some("{}")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn config_updates_merge_shallowly() {
        let router = test_app(None).await;

        let (status, _) = send(
            &router,
            Method::POST,
            "/workflows/v1/config/wf-merge",
            Some(r#"{"name": "Ada", "limit": 5}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &router,
            Method::POST,
            "/workflows/v1/config/wf-merge",
            Some(r#"{"limit": 10}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"name": "Ada", "limit": 10}));
    }

    #[tokio::test]
    async fn handler_endpoints_use_sql_sessions() {
        let router = test_app(Some(Arc::new(SqlHandler::new()))).await;
        let payload = r#"{"credentials": {"url": "sqlite::memory:"}}"#;

        let (status, body) = send(&router, Method::POST, "/workflows/v1/auth", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"authenticated": true}));

        let (status, body) =
            send(&router, Method::POST, "/workflows/v1/check", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["success"], json!(true));

        let (status, _) = send(&router, Method::POST, "/workflows/v1/check", Some("{}")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
