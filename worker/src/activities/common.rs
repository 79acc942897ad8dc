use common::state_store::StateStore;
use common::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetArgsInput {
    pub workflow_id: String,
    /// Trigger-time values layered over the stored configuration.
    #[serde(default)]
    pub config: Map<String, Value>,
    pub keys: Vec<String>,
}

/// Normalized arguments every later step reads from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowArgs {
    pub workflow_id: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl WorkflowArgs {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn require_str(&self, key: &str) -> AppResult<&str> {
        self.get_str(key).ok_or_else(|| missing_argument(key))
    }

    pub fn require<T: DeserializeOwned>(&self, key: &str) -> AppResult<T> {
        let value = self.get(key).ok_or_else(|| missing_argument(key))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            AppError::Configuration(format!("workflow argument '{}' is malformed: {}", key, e))
        })
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> AppResult<T> {
        match self.get(key) {
            Some(_) => self.require(key),
            None => Ok(default),
        }
    }
}

fn missing_argument(key: &str) -> AppError {
    AppError::Configuration(format!("missing required workflow argument '{}'", key))
}

pub struct CommonActivities {
    state: StateStore,
}

impl CommonActivities {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    pub async fn get_workflow_args(&self, input: GetArgsInput) -> AppResult<WorkflowArgs> {
        let mut merged = match self.state.extract_configuration(&input.workflow_id).await {
            Ok(stored) => stored,
            Err(AppError::NotFound(msg)) => return Err(AppError::Configuration(msg)),
            Err(e) => return Err(e),
        };
        merged.extend(input.config);

        let values = input
            .keys
            .iter()
            .filter(|key| key.as_str() != "workflow_id")
            .filter_map(|key| merged.get(key).map(|v| (key.clone(), v.clone())))
            .collect();

        tracing::debug!(workflow_id = %input.workflow_id, keys = ?input.keys, "Resolved workflow args");
        Ok(WorkflowArgs {
            workflow_id: input.workflow_id,
            values,
        })
    }
}
