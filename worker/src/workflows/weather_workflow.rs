use super::{load_args, GET_ARGS_STEP};
use crate::activities::weather::{City, CityWeather, WeatherReport};
use crate::contracts;
use crate::runtime::{
    execute_fan_out, execute_step, StepSpec, WorkflowConfig, WorkflowDefinition, WorkflowRuntime,
};
use common::AppResult;
use futures::future::BoxFuture;
use serde_json::Value;

pub const FETCH_CURRENT_WEATHER_STEP: StepSpec =
    StepSpec::new(contracts::activities::FETCH_CURRENT_WEATHER, 30);
pub const SUMMARIZE_WEATHER_STEP: StepSpec =
    StepSpec::new(contracts::activities::SUMMARIZE_WEATHER, 10);

pub static DEFINITION: WorkflowDefinition = WorkflowDefinition {
    name: contracts::workflows::WEATHER,
    arguments: &["cities"],
    steps: &[GET_ARGS_STEP, FETCH_CURRENT_WEATHER_STEP, SUMMARIZE_WEATHER_STEP],
};

pub fn weather_workflow(
    runtime: &dyn WorkflowRuntime,
    config: WorkflowConfig,
) -> BoxFuture<'_, AppResult<Value>> {
    Box::pin(run(runtime, config))
}

async fn run(runtime: &dyn WorkflowRuntime, config: WorkflowConfig) -> AppResult<Value> {
    let args = load_args(runtime, &DEFINITION, &config).await?;
    let cities: Vec<City> = args.require("cities")?;

    let readings: Vec<CityWeather> =
        execute_fan_out(runtime, &FETCH_CURRENT_WEATHER_STEP, &cities).await?;
    let report: WeatherReport = execute_step(runtime, &SUMMARIZE_WEATHER_STEP, &readings).await?;

    Ok(serde_json::to_value(report)?)
}
