use super::{load_args, GET_ARGS_STEP};
use crate::contracts;
use crate::runtime::{execute_step, StepSpec, WorkflowConfig, WorkflowDefinition, WorkflowRuntime};
use common::AppResult;
use futures::future::BoxFuture;
use serde_json::{json, Value};

pub const DEFAULT_NAME: &str = "World";

pub const SAY_HELLO_STEP: StepSpec = StepSpec::new(contracts::activities::SAY_HELLO, 10);

pub static DEFINITION: WorkflowDefinition = WorkflowDefinition {
    name: contracts::workflows::HELLO_WORLD,
    arguments: &["name"],
    steps: &[GET_ARGS_STEP, SAY_HELLO_STEP],
};

pub fn hello_world_workflow(
    runtime: &dyn WorkflowRuntime,
    config: WorkflowConfig,
) -> BoxFuture<'_, AppResult<Value>> {
    Box::pin(run(runtime, config))
}

async fn run(runtime: &dyn WorkflowRuntime, config: WorkflowConfig) -> AppResult<Value> {
    let args = load_args(runtime, &DEFINITION, &config).await?;
    let name = args.get_str("name").unwrap_or(DEFAULT_NAME).to_string();

    let greeting: String = execute_step(runtime, &SAY_HELLO_STEP, &name).await?;
    tracing::info!(workflow_id = runtime.workflow_id(), greeting = %greeting, "Hello world finished");
    Ok(json!({ "greeting": greeting }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::testing::Fixture;
    use serde_json::json;

    #[tokio::test]
    async fn greets_stored_name() {
        let fixture = Fixture::new().build();
        fixture.store_config("wf-hello", json!({"name": "Ada"})).await;

        let result = fixture
            .run(hello_world_workflow, "wf-hello", json!({}))
            .await
            .unwrap();
        assert_eq!(result, json!({"greeting": "Hello, Ada!"}));
    }

    #[tokio::test]
    async fn falls_back_to_default_name() {
        let fixture = Fixture::new().build();
        fixture.store_config("wf-hello", json!({})).await;

        let result = fixture
            .run(hello_world_workflow, "wf-hello", json!({"name": "  "}))
            .await
            .unwrap();
        assert_eq!(result["greeting"], "Hello, World!");
    }
}
