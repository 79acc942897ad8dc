use crate::error::{AppError, AppResult};
use crate::object_store::{read_json, write_json, ObjectStore};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Trigger configuration persisted per workflow id.
#[derive(Clone)]
pub struct StateStore {
    objects: Arc<dyn ObjectStore>,
}

pub fn config_path(workflow_id: &str) -> AppResult<String> {
    let id = workflow_id.trim();
    if id.is_empty() || id.contains('/') || id == "." || id == ".." {
        return Err(AppError::Validation(format!(
            "invalid workflow id '{}'",
            workflow_id
        )));
    }
    Ok(format!("state/workflows/{}/config.json", id))
}

fn as_object(config: Value) -> AppResult<Map<String, Value>> {
    match config {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(AppError::Validation(format!(
            "workflow config must be a JSON object, got {}",
            other
        ))),
    }
}

impl StateStore {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    pub fn objects(&self) -> Arc<dyn ObjectStore> {
        self.objects.clone()
    }

    pub async fn extract_configuration(&self, workflow_id: &str) -> AppResult<Map<String, Value>> {
        let path = config_path(workflow_id)?;
        match read_json::<Value>(self.objects.as_ref(), &path).await {
            Ok(value) => as_object(value),
            Err(AppError::NotFound(_)) => Err(AppError::NotFound(format!(
                "no stored configuration for workflow '{}'",
                workflow_id
            ))),
            Err(e) => Err(e),
        }
    }

    /// Replaces the stored configuration.
    pub async fn save_configuration(&self, workflow_id: &str, config: Value) -> AppResult<()> {
        let path = config_path(workflow_id)?;
        let config = as_object(config)?;
        write_json(self.objects.as_ref(), &path, &config).await?;
        tracing::debug!(workflow_id, keys = config.len(), "Saved workflow configuration");
        Ok(())
    }

    /// Shallow merge of `patch` into the stored configuration. A missing entry
    /// is treated as empty.
    pub async fn update_configuration(
        &self,
        workflow_id: &str,
        patch: Value,
    ) -> AppResult<Map<String, Value>> {
        let patch = as_object(patch)?;
        let mut current = match self.extract_configuration(workflow_id).await {
            Ok(map) => map,
            Err(AppError::NotFound(_)) => Map::new(),
            Err(e) => return Err(e),
        };
        current.extend(patch);

        let path = config_path(workflow_id)?;
        write_json(self.objects.as_ref(), &path, &current).await?;
        Ok(current)
    }
}
