use crate::handlers;
use crate::AppState;
use axum::{
    http::{header, request::Parts, HeaderValue},
    routing::{get, post},
    Router,
};
use common::settings::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

/// Browser origins accepted by CORS, compared in their serialized
/// `scheme://host[:port]` form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllowedOrigins(Vec<String>);

fn serialize_origin(raw: &str) -> Option<String> {
    let origin = Url::parse(raw.trim()).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

impl AllowedOrigins {
    /// Reads the comma-separated `app.cors_origins` value. Entries that are
    /// not absolute http(s)-style urls are logged and skipped.
    pub fn from_setting(raw: Option<&str>) -> Self {
        let mut origins: Vec<String> = Vec::new();
        for entry in raw.unwrap_or_default().split(',').map(str::trim) {
            if entry.is_empty() {
                continue;
            }
            match serialize_origin(entry) {
                Some(origin) if !origins.contains(&origin) => origins.push(origin),
                Some(_) => {}
                None => tracing::warn!(origin = entry, "Ignoring invalid CORS origin"),
            }
        }
        Self(origins)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn allows(&self, request_origin: &str) -> bool {
        serialize_origin(request_origin).is_some_and(|origin| self.0.contains(&origin))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state.settings);

    Router::new()
        .route("/server/health", get(handlers::health))
        .route("/workflows/v1", get(handlers::list_workflows))
        .route("/workflows/v1/start", post(handlers::start_default_workflow))
        .route(
            "/workflows/v1/:workflow_type/start",
            post(handlers::start_workflow),
        )
        .route(
            "/workflows/v1/config/:workflow_id",
            get(handlers::get_workflow_config).post(handlers::update_workflow_config),
        )
        .route(
            "/workflows/v1/status/:workflow_id/:run_id",
            get(handlers::workflow_status),
        )
        .route("/workflows/v1/auth", post(handlers::test_auth))
        .route("/workflows/v1/check", post(handlers::preflight_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_cors(settings: &Settings) -> CorsLayer {
    let allowed = AllowedOrigins::from_setting(settings.app.cors_origins.as_deref());
    if settings.debug || allowed.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| allowed.allows(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods(Any)
}

pub async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
