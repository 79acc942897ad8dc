use super::{load_args, GET_ARGS_STEP};
use crate::activities::data_processing::{Record, StatusSummary, WriteSummaryInput, WrittenSummary};
use crate::contracts;
use crate::runtime::{execute_step, StepSpec, WorkflowConfig, WorkflowDefinition, WorkflowRuntime};
use common::AppResult;
use futures::future::BoxFuture;
use serde_json::{json, Value};

pub const LOAD_RECORDS_STEP: StepSpec = StepSpec::new(contracts::activities::LOAD_RECORDS, 60);
pub const SUMMARIZE_RECORDS_STEP: StepSpec =
    StepSpec::new(contracts::activities::SUMMARIZE_RECORDS, 30);
pub const WRITE_SUMMARY_STEP: StepSpec = StepSpec::new(contracts::activities::WRITE_SUMMARY, 60);

pub static DEFINITION: WorkflowDefinition = WorkflowDefinition {
    name: contracts::workflows::DATA_PROCESSING,
    arguments: &["input_path", "output_path"],
    steps: &[
        GET_ARGS_STEP,
        LOAD_RECORDS_STEP,
        SUMMARIZE_RECORDS_STEP,
        WRITE_SUMMARY_STEP,
    ],
};

pub fn data_processing_workflow(
    runtime: &dyn WorkflowRuntime,
    config: WorkflowConfig,
) -> BoxFuture<'_, AppResult<Value>> {
    Box::pin(run(runtime, config))
}

async fn run(runtime: &dyn WorkflowRuntime, config: WorkflowConfig) -> AppResult<Value> {
    let args = load_args(runtime, &DEFINITION, &config).await?;
    let input_path = args.require_str("input_path")?.to_string();
    let output_path = args.require_str("output_path")?.to_string();

    let records: Vec<Record> = execute_step(runtime, &LOAD_RECORDS_STEP, &input_path).await?;
    let summary: StatusSummary =
        execute_step(runtime, &SUMMARIZE_RECORDS_STEP, &records).await?;
    let written: WrittenSummary = execute_step(
        runtime,
        &WRITE_SUMMARY_STEP,
        &WriteSummaryInput {
            path: output_path,
            summary: summary.clone(),
        },
    )
    .await?;

    Ok(json!({
        "path": written.path,
        "total_records": written.total_records,
        "counts": summary.counts,
    }))
}
