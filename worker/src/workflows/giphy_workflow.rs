use super::{load_args, GET_ARGS_STEP};
use crate::activities::giphy::{Delivery, SendGifInput};
use crate::contracts;
use crate::runtime::{
    execute_fan_out, execute_step, StepSpec, WorkflowConfig, WorkflowDefinition, WorkflowRuntime,
    NO_RETRY,
};
use common::AppResult;
use futures::future::BoxFuture;
use serde_json::{json, Value};

pub const RESOLVE_RECIPIENTS_STEP: StepSpec =
    StepSpec::new(contracts::activities::RESOLVE_RECIPIENTS, 10).with_retry(NO_RETRY);
pub const FETCH_GIF_STEP: StepSpec = StepSpec::new(contracts::activities::FETCH_GIF, 30);
pub const SEND_GIF_STEP: StepSpec = StepSpec::new(contracts::activities::SEND_GIF, 30);

pub static DEFINITION: WorkflowDefinition = WorkflowDefinition {
    name: contracts::workflows::GIPHY,
    arguments: &["query", "recipients", "message"],
    steps: &[
        GET_ARGS_STEP,
        RESOLVE_RECIPIENTS_STEP,
        FETCH_GIF_STEP,
        SEND_GIF_STEP,
    ],
};

pub fn giphy_workflow(
    runtime: &dyn WorkflowRuntime,
    config: WorkflowConfig,
) -> BoxFuture<'_, AppResult<Value>> {
    Box::pin(run(runtime, config))
}

async fn run(runtime: &dyn WorkflowRuntime, config: WorkflowConfig) -> AppResult<Value> {
    let args = load_args(runtime, &DEFINITION, &config).await?;
    let query = args.require_str("query")?.to_string();
    let raw_recipients = args.require_str("recipients")?.to_string();
    let message = args.get_str("message").map(str::to_string);

    let recipients: Vec<String> =
        execute_step(runtime, &RESOLVE_RECIPIENTS_STEP, &raw_recipients).await?;
    let gif_url: String = execute_step(runtime, &FETCH_GIF_STEP, &query).await?;

    // one activity per recipient: a retry only repeats its own delivery
    let sends: Vec<SendGifInput> = recipients
        .into_iter()
        .map(|recipient| SendGifInput {
            recipient,
            gif_url: gif_url.clone(),
            message: message.clone(),
        })
        .collect();
    let deliveries: Vec<Delivery> = execute_fan_out(runtime, &SEND_GIF_STEP, &sends).await?;
    let sent: Vec<String> = deliveries.into_iter().map(|d| d.recipient).collect();

    Ok(json!({ "gif_url": gif_url, "sent": sent }))
}
