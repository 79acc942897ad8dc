use crate::ports::SqlSource;
use common::object_store::{write_json, ObjectStore};
use common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightResult {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableList {
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistTablesInput {
    pub path: String,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTables {
    pub path: String,
    pub count: usize,
}

pub struct SqlActivities {
    sql: Arc<dyn SqlSource>,
    objects: Arc<dyn ObjectStore>,
}

impl SqlActivities {
    pub fn new(sql: Arc<dyn SqlSource>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { sql, objects }
    }

    pub async fn preflight_check(&self, _input: ()) -> AppResult<PreflightResult> {
        let result = self.sql.preflight().await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn fetch_tables(&self, schema: Option<String>) -> AppResult<TableList> {
        let schema = schema.filter(|s| !s.trim().is_empty());
        let tables = self.sql.list_tables(schema).await?;
        tracing::info!(count = tables.len(), "Fetched table metadata");
        Ok(TableList { tables })
    }

    pub async fn persist_tables(&self, input: PersistTablesInput) -> AppResult<PersistedTables> {
        if input.path.trim().is_empty() {
            return Err(AppError::Validation("output path must not be empty".to_string()));
        }
        write_json(
            self.objects.as_ref(),
            &input.path,
            &TableList {
                tables: input.tables.clone(),
            },
        )
        .await?;
        Ok(PersistedTables {
            path: input.path,
            count: input.tables.len(),
        })
    }
}
