use super::{load_args, GET_ARGS_STEP};
use crate::activities::sql::{PersistTablesInput, PersistedTables, PreflightResult, TableList};
use crate::contracts;
use crate::runtime::{
    execute_step, StepSpec, WorkflowConfig, WorkflowDefinition, WorkflowRuntime, NO_RETRY,
};
use common::AppResult;
use futures::future::BoxFuture;
use serde_json::{json, Value};

pub const PREFLIGHT_CHECK_STEP: StepSpec =
    StepSpec::new(contracts::activities::PREFLIGHT_CHECK, 30).with_retry(NO_RETRY);
pub const FETCH_TABLES_STEP: StepSpec = StepSpec::new(contracts::activities::FETCH_TABLES, 120);
pub const PERSIST_TABLES_STEP: StepSpec = StepSpec::new(contracts::activities::PERSIST_TABLES, 60);

pub static DEFINITION: WorkflowDefinition = WorkflowDefinition {
    name: contracts::workflows::SQL_METADATA,
    arguments: &["schema", "output_path"],
    steps: &[
        GET_ARGS_STEP,
        PREFLIGHT_CHECK_STEP,
        FETCH_TABLES_STEP,
        PERSIST_TABLES_STEP,
    ],
};

pub fn sql_metadata_workflow(
    runtime: &dyn WorkflowRuntime,
    config: WorkflowConfig,
) -> BoxFuture<'_, AppResult<Value>> {
    Box::pin(run(runtime, config))
}

async fn run(runtime: &dyn WorkflowRuntime, config: WorkflowConfig) -> AppResult<Value> {
    let args = load_args(runtime, &DEFINITION, &config).await?;
    let output_path = args.require_str("output_path")?.to_string();
    let schema = args.get_str("schema").map(str::to_string);

    let preflight: PreflightResult = execute_step(runtime, &PREFLIGHT_CHECK_STEP, &()).await?;
    if !preflight.success {
        tracing::warn!(workflow_id = runtime.workflow_id(), "Preflight check failed, stopping");
        return Ok(json!({ "success": false }));
    }

    let tables: TableList = execute_step(runtime, &FETCH_TABLES_STEP, &schema).await?;
    let persisted: PersistedTables = execute_step(
        runtime,
        &PERSIST_TABLES_STEP,
        &PersistTablesInput {
            path: output_path,
            tables: tables.tables,
        },
    )
    .await?;

    Ok(json!({
        "success": true,
        "path": persisted.path,
        "count": persisted.count,
    }))
}
