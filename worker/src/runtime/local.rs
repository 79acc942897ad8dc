use super::{ActivityHandler, ActivityRegistrar, StepSpec, WorkflowRuntime};
use async_trait::async_trait;
use common::{AppError, AppResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// In-process activity table used by the local engine.
#[derive(Default, Clone)]
pub struct ActivityRegistry {
    handlers: HashMap<&'static str, ActivityHandler>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ActivityHandler> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl ActivityRegistrar for ActivityRegistry {
    fn register_handler(&mut self, name: &'static str, handler: ActivityHandler) {
        if self.handlers.insert(name, handler).is_some() {
            tracing::warn!(activity = name, "Activity registered twice, keeping the latest");
        }
    }
}

pub struct LocalRuntime {
    workflow_id: String,
    registry: Arc<ActivityRegistry>,
}

impl LocalRuntime {
    pub fn new(workflow_id: impl Into<String>, registry: Arc<ActivityRegistry>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            registry,
        }
    }
}

#[async_trait]
impl WorkflowRuntime for LocalRuntime {
    fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    async fn run_activity(&self, step: &StepSpec, input: Value) -> AppResult<Value> {
        let handler = self.registry.get(step.activity).ok_or_else(|| {
            AppError::Configuration(format!("activity '{}' is not registered", step.activity))
        })?;

        let mut attempt = 1;
        loop {
            let err = match tokio::time::timeout(step.start_to_close_timeout, handler(input.clone()))
                .await
            {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(e)) => e,
                Err(_) => AppError::remote(
                    None,
                    format!(
                        "activity '{}' timed out after {:?}",
                        step.activity, step.start_to_close_timeout
                    ),
                ),
            };

            if !err.is_retryable() || !step.retry.allows_attempt(attempt + 1) {
                tracing::warn!(
                    workflow_id = %self.workflow_id,
                    activity = step.activity,
                    attempt,
                    error = %err,
                    "Activity failed"
                );
                return Err(err);
            }

            let delay = step.retry.backoff(attempt);
            tracing::info!(
                workflow_id = %self.workflow_id,
                activity = step.activity,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Activity failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
