use common::object_store::{read_json, write_json, ObjectStore};
use common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub status: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub counts: BTreeMap<String, u64>,
    pub total_records: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteSummaryInput {
    pub path: String,
    pub summary: StatusSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrittenSummary {
    pub path: String,
    pub total_records: u64,
}

pub fn summarize(records: &[Record]) -> StatusSummary {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.status.clone()).or_insert(0) += 1;
    }
    StatusSummary {
        counts,
        total_records: records.len() as u64,
    }
}

pub struct DataProcessingActivities {
    objects: Arc<dyn ObjectStore>,
}

impl DataProcessingActivities {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    pub async fn load_records(&self, path: String) -> AppResult<Vec<Record>> {
        if path.trim().is_empty() {
            return Err(AppError::Validation("input path must not be empty".to_string()));
        }
        let records: Vec<Record> = read_json(self.objects.as_ref(), &path).await?;
        tracing::info!(path = %path, count = records.len(), "Loaded records");
        Ok(records)
    }

    pub async fn summarize_records(&self, records: Vec<Record>) -> AppResult<StatusSummary> {
        Ok(summarize(&records))
    }

    pub async fn write_summary(&self, input: WriteSummaryInput) -> AppResult<WrittenSummary> {
        if input.path.trim().is_empty() {
            return Err(AppError::Validation("output path must not be empty".to_string()));
        }
        write_json(self.objects.as_ref(), &input.path, &input.summary).await?;
        tracing::info!(path = %input.path, "Summary written");
        Ok(WrittenSummary {
            path: input.path,
            total_records: input.summary.total_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::object_store::MemoryObjectStore;
    use serde_json::json;

    fn activities() -> (DataProcessingActivities, Arc<MemoryObjectStore>) {
        let store = Arc::new(MemoryObjectStore::new());
        (DataProcessingActivities::new(store.clone()), store)
    }

    async fn seed(store: &MemoryObjectStore, path: &str, value: Value) {
        store
            .set(path, serde_json::to_vec(&value).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn summarizes_status_list() {
        let (activities, store) = activities();
        seed(
            &store,
            "in/records.json",
            json!([
                {"id": 1, "status": "completed"},
                {"id": 2, "status": "pending"},
                {"id": 3, "status": "completed"},
                {"id": 4, "status": "failed"},
                {"id": 5, "status": "pending"}
            ]),
        )
        .await;

        let records = activities.load_records("in/records.json".into()).await.unwrap();
        assert_eq!(records[0].fields.get("id"), Some(&json!(1)));

        let summary = activities.summarize_records(records).await.unwrap();
        assert_eq!(summary.total_records, 5);
        assert_eq!(
            serde_json::to_value(&summary.counts).unwrap(),
            json!({"completed": 2, "pending": 2, "failed": 1})
        );
    }

    #[tokio::test]
    async fn unparsable_input_is_validation_error() {
        let (activities, store) = activities();
        store.set("in/bad.json", b"{oops".to_vec()).await.unwrap();
        let err = activities.load_records("in/bad.json".into()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = activities.load_records("in/none.json".into()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn write_summary_overwrites_previous_output() {
        let (activities, store) = activities();
        let first = summarize(&[Record {
            status: "pending".into(),
            fields: Map::new(),
        }]);
        activities
            .write_summary(WriteSummaryInput {
                path: "out/summary.json".into(),
                summary: first,
            })
            .await
            .unwrap();

        let written = activities
            .write_summary(WriteSummaryInput {
                path: "out/summary.json".into(),
                summary: StatusSummary::default(),
            })
            .await
            .unwrap();
        assert_eq!(written.total_records, 0);

        let stored: StatusSummary = read_json(store.as_ref(), "out/summary.json").await.unwrap();
        assert_eq!(stored, StatusSummary::default());
        assert_eq!(store.len().await, 1);
    }
}
