use super::{RunHandle, RunState, RunStatus, WorkflowEngine};
use crate::runtime::{ActivityRegistry, LocalRuntime, WorkflowConfig};
use crate::workflows;
use async_trait::async_trait;
use common::{AppError, AppResult};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct RunRecord {
    state: RunState,
    result: Option<Value>,
    error: Option<String>,
}

type RunKey = (String, String);

/// Runs workflow bodies in-process, one tokio task per run.
#[derive(Clone)]
pub struct LocalEngine {
    registry: Arc<ActivityRegistry>,
    runs: Arc<RwLock<HashMap<RunKey, RunRecord>>>,
}

impl LocalEngine {
    pub fn new(registry: Arc<ActivityRegistry>) -> Self {
        Self {
            registry,
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Polls until the run reaches a terminal state or `timeout` elapses.
    pub async fn wait_for(
        &self,
        workflow_id: &str,
        run_id: &str,
        timeout: Duration,
    ) -> AppResult<RunStatus> {
        let poll = async {
            loop {
                match self.status(workflow_id, run_id).await {
                    Ok(status) if !status.state.is_terminal() => {
                        tokio::time::sleep(Duration::from_millis(10)).await
                    }
                    other => return other,
                }
            }
        };
        tokio::time::timeout(timeout, poll).await.map_err(|_| {
            AppError::remote(
                None,
                format!("run '{}' did not finish within {:?}", run_id, timeout),
            )
        })?
    }
}

#[async_trait]
impl WorkflowEngine for LocalEngine {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn start(&self, workflow_type: &str, config: WorkflowConfig) -> AppResult<RunHandle> {
        let entry = workflows::find(workflow_type).ok_or_else(|| {
            AppError::NotFound(format!("workflow type '{}' is not registered", workflow_type))
        })?;
        if config.workflow_id.trim().is_empty() {
            return Err(AppError::Validation("workflow_id must not be empty".to_string()));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let key = (config.workflow_id.clone(), run_id.clone());
        self.runs.write().await.insert(
            key.clone(),
            RunRecord {
                state: RunState::Running,
                result: None,
                error: None,
            },
        );

        let handle = RunHandle {
            workflow_id: config.workflow_id.clone(),
            run_id,
            workflow_type: workflow_type.to_string(),
        };
        tracing::info!(
            workflow_type,
            workflow_id = %handle.workflow_id,
            run_id = %handle.run_id,
            "Starting local workflow run"
        );

        let registry = self.registry.clone();
        let runs = self.runs.clone();
        let run = entry.run;
        tokio::spawn(async move {
            let runtime = LocalRuntime::new(config.workflow_id.clone(), registry);
            let outcome = AssertUnwindSafe(run(&runtime, config)).catch_unwind().await;
            let record = match outcome {
                Ok(Ok(result)) => RunRecord {
                    state: RunState::Completed,
                    result: Some(result),
                    error: None,
                },
                Ok(Err(e)) => {
                    tracing::warn!(workflow_id = %key.0, run_id = %key.1, error = %e, "Workflow run failed");
                    RunRecord {
                        state: RunState::Failed,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(workflow_id = %key.0, run_id = %key.1, reason = %reason, "Workflow run panicked");
                    RunRecord {
                        state: RunState::Failed,
                        result: None,
                        error: Some(format!("workflow panicked: {}", reason)),
                    }
                }
            };
            runs.write().await.insert(key, record);
        });

        Ok(handle)
    }

    async fn status(&self, workflow_id: &str, run_id: &str) -> AppResult<RunStatus> {
        let runs = self.runs.read().await;
        let record = runs
            .get(&(workflow_id.to_string(), run_id.to_string()))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no run '{}' for workflow '{}'",
                    run_id, workflow_id
                ))
            })?;
        Ok(RunStatus {
            workflow_id: workflow_id.to_string(),
            run_id: run_id.to_string(),
            state: record.state,
            result: record.result.clone(),
            error: record.error.clone(),
        })
    }
}
