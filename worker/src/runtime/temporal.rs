use super::{
    ActivityHandler, ActivityRegistrar, RetrySpec, StepSpec, WorkflowConfig, WorkflowRuntime,
};
use crate::workflows::WorkflowFn;
use async_trait::async_trait;
use common::{AppError, AppResult};
use serde_json::Value;
use std::sync::Arc;
use temporalio_common::protos::coresdk::activity_result::activity_resolution::Status;
use temporalio_common::protos::temporal::api::common::v1::{Payload, RetryPolicy};
use temporalio_sdk::{
    ActContext, ActivityError, ActivityOptions, WfContext, WfExitValue, Worker, WorkflowResult,
};

pub fn create_json_payload(data: &impl serde::Serialize) -> AppResult<Payload> {
    Ok(Payload {
        metadata: std::collections::HashMap::from([(
            "encoding".to_string(),
            "json/plain".as_bytes().to_vec(),
        )]),
        data: serde_json::to_vec(data)?,
        ..Default::default()
    })
}

pub fn decode_json_payload(payload: &Payload) -> AppResult<Value> {
    if payload.data.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&payload.data)?)
}

fn retry_policy(retry: &RetrySpec) -> RetryPolicy {
    RetryPolicy {
        maximum_attempts: retry.maximum_attempts as i32,
        backoff_coefficient: retry.backoff_coefficient,
        ..Default::default()
    }
}

pub(crate) fn build_activity_options(
    step: &StepSpec,
    input: &Value,
) -> AppResult<ActivityOptions> {
    Ok(ActivityOptions {
        activity_type: step.activity.to_string(),
        input: create_json_payload(input)?,
        start_to_close_timeout: Some(step.start_to_close_timeout),
        retry_policy: Some(retry_policy(&step.retry)),
        ..Default::default()
    })
}

fn decode_activity_result(activity: &str, status: Option<Status>) -> AppResult<Value> {
    match status {
        Some(Status::Completed(success)) => match success.result {
            Some(payload) => decode_json_payload(&payload),
            None => Ok(Value::Null),
        },
        Some(Status::Failed(f)) => {
            let message = f
                .failure
                .map(|failure| match failure.cause {
                    Some(cause) if !cause.message.is_empty() => cause.message,
                    _ => failure.message,
                })
                .unwrap_or_default();
            Err(AppError::remote(
                None,
                format!("activity '{}' failed: {}", activity, message),
            ))
        }
        Some(Status::Cancelled(_)) => Err(AppError::remote(
            None,
            format!("activity '{}' was cancelled", activity),
        )),
        Some(Status::Backoff(_)) => Err(AppError::remote(
            None,
            format!("activity '{}' returned an unexpected backoff", activity),
        )),
        None => Err(AppError::remote(
            None,
            format!("activity '{}' returned no status", activity),
        )),
    }
}

/// Schedules each step as a Temporal activity task. Timeout and retries are
/// enforced by the Temporal server.
pub struct TemporalRuntime<'a> {
    ctx: &'a WfContext,
    workflow_id: String,
}

impl<'a> TemporalRuntime<'a> {
    pub fn new(ctx: &'a WfContext, workflow_id: impl Into<String>) -> Self {
        Self {
            ctx,
            workflow_id: workflow_id.into(),
        }
    }
}

#[async_trait]
impl WorkflowRuntime for TemporalRuntime<'_> {
    fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    async fn run_activity(&self, step: &StepSpec, input: Value) -> AppResult<Value> {
        let opts = build_activity_options(step, &input)?;
        let res = self.ctx.activity(opts).await;
        decode_activity_result(step.activity, res.status)
    }
}

pub(crate) fn parse_workflow_config(payloads: &[Payload]) -> AppResult<WorkflowConfig> {
    let payload = payloads
        .first()
        .ok_or_else(|| AppError::Validation("missing workflow input".to_string()))?;
    let config: WorkflowConfig = serde_json::from_slice(&payload.data)?;
    if config.workflow_id.trim().is_empty() {
        return Err(AppError::Validation(
            "workflow input has an empty workflow_id".to_string(),
        ));
    }
    Ok(config)
}

/// Entry point registered with the Temporal worker for every workflow type.
pub async fn run_temporal_workflow(ctx: WfContext, run: WorkflowFn) -> WorkflowResult<Value> {
    let config = parse_workflow_config(ctx.get_args())?;
    let runtime = TemporalRuntime::new(&ctx, config.workflow_id.clone());
    let result = run(&runtime, config).await?;
    Ok(WfExitValue::Normal(result))
}

pub(crate) fn to_activity_error(err: AppError) -> ActivityError {
    if err.is_retryable() {
        ActivityError::from(anyhow::Error::new(err))
    } else {
        ActivityError::NonRetryable(anyhow::Error::new(err))
    }
}

impl ActivityRegistrar for Worker {
    fn register_handler(&mut self, name: &'static str, handler: ActivityHandler) {
        self.register_activity(name, move |_ctx: ActContext, input: Value| {
            let handler = Arc::clone(&handler);
            async move { handler(input).await.map_err(to_activity_error) }
        });
    }
}
