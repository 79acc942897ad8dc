use super::{RunHandle, RunState, RunStatus, WorkflowEngine};
use crate::bootstrap::client_options;
use crate::runtime::temporal::{create_json_payload, decode_json_payload};
use crate::runtime::WorkflowConfig;
use crate::workflows;
use async_trait::async_trait;
use common::settings::Settings;
use common::{AppError, AppResult};
use serde_json::Value;
use temporalio_client::{WorkflowClientTrait, WorkflowOptions};
use temporalio_common::protos::temporal::api::enums::v1::{EventType, WorkflowIdReusePolicy};
use temporalio_common::protos::temporal::api::history::v1::{history_event::Attributes, HistoryEvent};

/// Starts runs on a Temporal server and reads their status from the
/// execution history.
pub struct TemporalEngine<C> {
    client: C,
    task_queue: String,
}

impl<C> TemporalEngine<C> {
    pub fn new(client: C, task_queue: impl Into<String>) -> Self {
        Self {
            client,
            task_queue: task_queue.into(),
        }
    }
}

pub async fn connect(
    settings: &Settings,
) -> anyhow::Result<TemporalEngine<impl WorkflowClientTrait + Send + Sync + 'static>> {
    let client = client_options(settings, &format!("{}-engine", settings.app.name))?
        .connect(settings.temporal.namespace.as_str(), None)
        .await?;
    tracing::info!(
        server_url = %settings.temporal.server_url,
        namespace = %settings.temporal.namespace,
        "Connected to Temporal"
    );
    Ok(TemporalEngine::new(client, settings.temporal.task_queue.clone()))
}

/// Reads the run state from history events, scanning from the newest one.
pub fn classify_history(events: &[HistoryEvent]) -> (RunState, Option<Value>, Option<String>) {
    for event in events.iter().rev() {
        let kind = event.event_type;
        if kind == EventType::WorkflowExecutionCompleted as i32 {
            let result = match &event.attributes {
                Some(Attributes::WorkflowExecutionCompletedEventAttributes(attrs)) => attrs
                    .result
                    .as_ref()
                    .and_then(|r| r.payloads.first())
                    .and_then(|p| decode_json_payload(p).ok()),
                _ => None,
            };
            return (RunState::Completed, result, None);
        }
        if kind == EventType::WorkflowExecutionFailed as i32 {
            let error = match &event.attributes {
                Some(Attributes::WorkflowExecutionFailedEventAttributes(attrs)) => {
                    attrs.failure.as_ref().map(|f| f.message.clone())
                }
                _ => None,
            };
            return (RunState::Failed, None, error);
        }
        if kind == EventType::WorkflowExecutionCanceled as i32 {
            return (RunState::Cancelled, None, None);
        }
        if kind == EventType::WorkflowExecutionTerminated as i32 {
            return (RunState::Terminated, None, None);
        }
        if kind == EventType::WorkflowExecutionTimedOut as i32 {
            return (RunState::TimedOut, None, None);
        }
    }

    if events.is_empty() {
        (RunState::Unknown, None, None)
    } else {
        (RunState::Running, None, None)
    }
}

#[async_trait]
impl<C> WorkflowEngine for TemporalEngine<C>
where
    C: WorkflowClientTrait + Send + Sync,
{
    fn name(&self) -> &'static str {
        "temporal"
    }

    async fn start(&self, workflow_type: &str, config: WorkflowConfig) -> AppResult<RunHandle> {
        if workflows::find(workflow_type).is_none() {
            return Err(AppError::NotFound(format!(
                "workflow type '{}' is not registered",
                workflow_type
            )));
        }
        let payload = create_json_payload(&config)?;
        let options = WorkflowOptions {
            id_reuse_policy: WorkflowIdReusePolicy::AllowDuplicate,
            ..Default::default()
        };

        let response = self
            .client
            .start_workflow(
                vec![payload],
                self.task_queue.clone(),
                config.workflow_id.clone(),
                workflow_type.to_string(),
                None,
                options,
            )
            .await
            .map_err(|e| {
                AppError::remote(None, format!("failed to start '{}': {}", workflow_type, e))
            })?;

        tracing::info!(
            workflow_type,
            workflow_id = %config.workflow_id,
            run_id = %response.run_id,
            "Workflow started on Temporal"
        );
        Ok(RunHandle {
            workflow_id: config.workflow_id,
            run_id: response.run_id,
            workflow_type: workflow_type.to_string(),
        })
    }

    async fn status(&self, workflow_id: &str, run_id: &str) -> AppResult<RunStatus> {
        let response = self
            .client
            .get_workflow_execution_history(
                workflow_id.to_string(),
                Some(run_id.to_string()),
                vec![],
            )
            .await
            .map_err(|e| {
                AppError::remote(
                    None,
                    format!("failed to read history of '{}': {}", workflow_id, e),
                )
            })?;

        let events = response.history.map(|h| h.events).unwrap_or_default();
        let (state, result, error) = classify_history(&events);
        Ok(RunStatus {
            workflow_id: workflow_id.to_string(),
            run_id: run_id.to_string(),
            state,
            result,
            error,
        })
    }
}
