use super::{load_args, GET_ARGS_STEP};
use crate::activities::freshness::{StaleAssets, StaleQuery, TagOutcome, TagRequest};
use crate::contracts;
use crate::runtime::{
    execute_step, StepOutcome, StepSpec, WorkflowConfig, WorkflowDefinition, WorkflowRuntime,
};
use chrono::{DateTime, Duration, Utc};
use common::{AppError, AppResult};
use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

pub const DEFAULT_PAGE_SIZE: u64 = 100;
pub const DEFAULT_TAG: &str = "stale";
pub const DEFAULT_STALE_DAYS: i64 = 30;

pub const FETCH_STALE_ASSETS_STEP: StepSpec =
    StepSpec::new(contracts::activities::FETCH_STALE_ASSETS, 300);
pub const TAG_ASSETS_STEP: StepSpec = StepSpec::new(contracts::activities::TAG_ASSETS, 60);

pub static DEFINITION: WorkflowDefinition = WorkflowDefinition {
    name: contracts::workflows::FRESHNESS_MONITOR,
    arguments: &["updated_before", "stale_days", "page_size", "tag"],
    steps: &[GET_ARGS_STEP, FETCH_STALE_ASSETS_STEP, TAG_ASSETS_STEP],
};

/// Pins `updated_before` in a trigger config to `now - stale_days` unless the
/// caller already supplied one.
pub fn resolve_cutoff(config: &mut Map<String, Value>, now: DateTime<Utc>) -> AppResult<()> {
    if config.get("updated_before").is_some_and(|v| !v.is_null()) {
        return Ok(());
    }
    let days = match config.get("stale_days") {
        None | Some(Value::Null) => DEFAULT_STALE_DAYS,
        Some(value) => value.as_i64().filter(|d| *d >= 0).ok_or_else(|| {
            AppError::Validation(format!(
                "stale_days must be a non-negative integer, got {}",
                value
            ))
        })?,
    };
    let cutoff = Duration::try_days(days)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| AppError::Validation(format!("stale_days {} is out of range", days)))?;
    config.insert("updated_before".to_string(), json!(cutoff));
    Ok(())
}

pub fn freshness_monitor_workflow(
    runtime: &dyn WorkflowRuntime,
    config: WorkflowConfig,
) -> BoxFuture<'_, AppResult<Value>> {
    Box::pin(run(runtime, config))
}

async fn run(runtime: &dyn WorkflowRuntime, config: WorkflowConfig) -> AppResult<Value> {
    let args = load_args(runtime, &DEFINITION, &config).await?;
    let updated_before = args
        .get_or::<Option<DateTime<Utc>>>("updated_before", None)?
        .ok_or_else(|| {
            AppError::Configuration(
                "updated_before must be resolved when the run is triggered".to_string(),
            )
        })?;
    let query = StaleQuery {
        updated_before,
        page_size: args.get_or("page_size", DEFAULT_PAGE_SIZE)?,
    };
    let tag = args.get_or("tag", DEFAULT_TAG.to_string())?;

    let fetched = execute_step::<_, StaleAssets>(runtime, &FETCH_STALE_ASSETS_STEP, &query).await;
    let stale = match StepOutcome::classify(fetched, |s| s.assets.is_empty()) {
        StepOutcome::Success(stale) => stale,
        StepOutcome::Empty => {
            tracing::info!(workflow_id = runtime.workflow_id(), "No stale assets, skipping tagging");
            return Ok(json!({ "stale": 0, "tagged": 0, "skipped": true }));
        }
        StepOutcome::Failed(e) => return Err(e),
    };

    let outcome: TagOutcome = execute_step(
        runtime,
        &TAG_ASSETS_STEP,
        &TagRequest {
            guids: stale.guids(),
            tag,
        },
    )
    .await?;

    Ok(json!({
        "stale": stale.assets.len(),
        "tagged": outcome.tagged,
        "skipped": false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockAssetCatalog;
    use crate::workflows::testing::Fixture;
    use chrono::TimeZone;
    use common::clients::catalog::{Asset, AssetPage};
    use std::sync::{Arc, Mutex};

    fn asset(guid: &str) -> Asset {
        Asset {
            guid: guid.to_string(),
            name: guid.to_uppercase(),
            updated_at: "2023-01-01T00:00:00Z".parse().unwrap(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn tags_every_stale_asset() {
        let mut catalog = MockAssetCatalog::new();
        catalog.expect_search_assets().times(1).returning(|_| {
            Ok(AssetPage {
                total: 2,
                assets: vec![asset("a"), asset("b")],
            })
        });
        catalog
            .expect_add_tag()
            .withf(|guids, tag| guids.len() == 2 && guids[0] == "a" && tag == "old")
            .times(1)
            .returning(|guids, _| Ok(guids.len() as u64));

        let fixture = Fixture::new().catalog(catalog).build();
        fixture
            .store_config("wf-fresh", json!({"page_size": 10, "tag": "old", "updated_before": "2024-06-01T00:00:00Z"}))
            .await;

        let result = fixture
            .run(freshness_monitor_workflow, "wf-fresh", json!({}))
            .await
            .unwrap();
        assert_eq!(result, json!({"stale": 2, "tagged": 2, "skipped": false}));
    }

    #[tokio::test]
    async fn empty_result_skips_tagging() {
        let mut catalog = MockAssetCatalog::new();
        catalog.expect_search_assets().returning(|_| {
            Ok(AssetPage {
                total: 0,
                assets: vec![],
            })
        });
        catalog.expect_add_tag().never();

        let fixture = Fixture::new().catalog(catalog).build();
        fixture
            .store_config("wf-fresh", json!({"updated_before": "2024-06-01T00:00:00Z"}))
            .await;

        let result = fixture
            .run(freshness_monitor_workflow, "wf-fresh", json!({}))
            .await
            .unwrap();
        assert_eq!(result["skipped"], true);
    }

    #[tokio::test]
    async fn retried_search_reuses_the_stored_cutoff() {
        let cutoffs = Arc::new(Mutex::new(Vec::new()));
        let seen = cutoffs.clone();
        let mut catalog = MockAssetCatalog::new();
        catalog.expect_search_assets().times(2).returning(move |req| {
            let mut seen = seen.lock().unwrap();
            seen.push(req.updated_before);
            if seen.len() == 1 {
                return Err(AppError::remote(Some(503), "catalog unavailable"));
            }
            Ok(AssetPage {
                total: 0,
                assets: vec![],
            })
        });

        let mut config = Map::new();
        config.insert("stale_days".to_string(), json!(7));
        resolve_cutoff(&mut config, Utc::now()).unwrap();
        let stored: DateTime<Utc> =
            serde_json::from_value(config["updated_before"].clone()).unwrap();

        let fixture = Fixture::new().catalog(catalog).build();
        fixture
            .store_config("wf-retry", Value::Object(config))
            .await;
        let result = fixture
            .run(freshness_monitor_workflow, "wf-retry", json!({}))
            .await
            .unwrap();

        assert_eq!(result["skipped"], true);
        assert_eq!(*cutoffs.lock().unwrap(), vec![stored, stored]);
    }

    #[tokio::test]
    async fn unresolved_cutoff_fails_before_searching() {
        let mut catalog = MockAssetCatalog::new();
        catalog.expect_search_assets().never();

        let fixture = Fixture::new().catalog(catalog).build();
        fixture.store_config("wf-bare", json!({"stale_days": 3})).await;
        let err = fixture
            .run(freshness_monitor_workflow, "wf-bare", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn cutoff_defaults_to_thirty_days_before_trigger() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let mut config = Map::new();
        resolve_cutoff(&mut config, now).unwrap();
        assert_eq!(config["updated_before"], json!("2024-05-02T12:00:00Z"));

        let mut config = Map::new();
        config.insert("stale_days".to_string(), json!(7));
        resolve_cutoff(&mut config, now).unwrap();
        assert_eq!(config["updated_before"], json!("2024-05-25T12:00:00Z"));
    }

    #[test]
    fn explicit_cutoff_is_kept_and_bad_days_are_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let mut config = Map::new();
        config.insert("updated_before".to_string(), json!("2020-01-01T00:00:00Z"));
        config.insert("stale_days".to_string(), json!(7));
        resolve_cutoff(&mut config, now).unwrap();
        assert_eq!(config["updated_before"], json!("2020-01-01T00:00:00Z"));

        for bad in [json!(-1), json!("7"), json!(i64::MAX)] {
            let mut config = Map::new();
            config.insert("stale_days".to_string(), bad);
            let err = resolve_cutoff(&mut config, now).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
