use crate::handler::Handler;
use crate::models::{ApiError, ApiResponse, ApiResult};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use common::AppError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use worker::engine::RunStatus;
use worker::runtime::WorkflowConfig;
use worker::workflows;

#[derive(Debug, Serialize)]
pub struct StartedRun {
    pub workflow_id: String,
    pub run_id: String,
}

fn json_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    match body? {
        Json(Value::Object(map)) => Ok(map),
        Json(other) => Err(AppError::Validation(format!(
            "request body must be a JSON object, got {}",
            other
        ))
        .into()),
    }
}

fn handler(state: &AppState) -> Result<Arc<dyn Handler>, ApiError> {
    state.handler.clone().ok_or_else(|| {
        AppError::Configuration("no request handler is configured".to_string()).into()
    })
}

pub async fn health() -> ApiResponse<Value> {
    ApiResponse::success("ok", json!({ "status": "ok" }))
}

pub async fn list_workflows(State(state): State<Arc<AppState>>) -> ApiResponse<Value> {
    let described: Vec<Value> = workflows::all()
        .iter()
        .map(|entry| entry.definition.describe())
        .collect();
    ApiResponse::success(
        "Registered workflows",
        json!({
            "engine": state.engine.name(),
            "default_workflow": state.settings.app.default_workflow,
            "workflows": described,
        }),
    )
}

async fn trigger(
    state: &AppState,
    workflow_type: &str,
    mut config: Map<String, Value>,
) -> ApiResult<StartedRun> {
    let entry = workflows::find(workflow_type).ok_or_else(|| {
        AppError::NotFound(format!(
            "workflow type '{}' is not registered",
            workflow_type
        ))
    })?;
    entry.prepare_config(&mut config)?;

    let workflow_id = match config.get("workflow_id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    };

    state
        .state_store
        .save_configuration(&workflow_id, Value::Object(config.clone()))
        .await?;
    let handle = state
        .engine
        .start(workflow_type, WorkflowConfig::new(workflow_id, config))
        .await?;

    Ok(ApiResponse::success(
        "Workflow started successfully",
        StartedRun {
            workflow_id: handle.workflow_id,
            run_id: handle.run_id,
        },
    ))
}

pub async fn start_default_workflow(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<StartedRun> {
    let config = json_object(body)?;
    let workflow_type = state.settings.app.default_workflow.clone();
    trigger(&state, &workflow_type, config).await
}

pub async fn start_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_type): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<StartedRun> {
    let config = json_object(body)?;
    trigger(&state, &workflow_type, config).await
}

pub async fn get_workflow_config(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> ApiResult<Map<String, Value>> {
    let config = state.state_store.extract_configuration(&workflow_id).await?;
    Ok(ApiResponse::success("Workflow configuration fetched", config))
}

pub async fn update_workflow_config(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Map<String, Value>> {
    let patch = json_object(body)?;
    let merged = state
        .state_store
        .update_configuration(&workflow_id, Value::Object(patch))
        .await?;
    Ok(ApiResponse::success("Workflow configuration updated", merged))
}

pub async fn workflow_status(
    State(state): State<Arc<AppState>>,
    Path((workflow_id, run_id)): Path<(String, String)>,
) -> ApiResult<RunStatus> {
    let status = state.engine.status(&workflow_id, &run_id).await?;
    Ok(ApiResponse::success("Workflow status fetched", status))
}

pub async fn test_auth(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let payload = json_object(body)?;
    let result = handler(&state)?.test_auth(payload).await?;
    Ok(ApiResponse::success("Authentication successful", result))
}

pub async fn preflight_check(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let payload = json_object(body)?;
    let result = handler(&state)?.preflight_check(payload).await?;
    Ok(ApiResponse::success("Preflight check completed", result))
}
