//! Starting workflow runs and reading their status.

pub mod local;
pub mod temporal;

use crate::runtime::WorkflowConfig;
use async_trait::async_trait;
use common::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use local::LocalEngine;
pub use temporal::TemporalEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    Failed,
    Cancelled,
    Terminated,
    TimedOut,
    Unknown,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running | RunState::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHandle {
    pub workflow_id: String,
    pub run_id: String,
    pub workflow_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub workflow_id: String,
    pub run_id: String,
    pub state: RunState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Starts `workflow_type` without waiting for it. Unknown types are
    /// reported as `NotFound`.
    async fn start(&self, workflow_type: &str, config: WorkflowConfig) -> AppResult<RunHandle>;

    async fn status(&self, workflow_id: &str, run_id: &str) -> AppResult<RunStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_state_serializes_snake_case() {
        assert_eq!(serde_json::to_value(RunState::TimedOut).unwrap(), json!("timed_out"));
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(!RunState::Unknown.is_terminal());
    }

    #[test]
    fn run_status_omits_empty_fields() {
        let status = RunStatus {
            workflow_id: "wf".into(),
            run_id: "r".into(),
            state: RunState::Running,
            result: None,
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"workflow_id": "wf", "run_id": "r", "state": "running"})
        );
    }
}
