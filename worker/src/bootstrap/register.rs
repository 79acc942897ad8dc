use super::context::WorkerServices;
use crate::activities::data_processing::{Record, WriteSummaryInput};
use crate::activities::freshness::{StaleQuery, TagRequest};
use crate::activities::giphy::SendGifInput;
use crate::activities::sql::PersistTablesInput;
use crate::activities::weather::{City, CityWeather};
use crate::activities::GetArgsInput;
use crate::contracts;
use crate::runtime::temporal::run_temporal_workflow;
use crate::runtime::ActivityRegistrar;
use crate::workflows;
use std::sync::Arc;
use temporalio_sdk::{WfContext, Worker};

pub fn register_activities<R: ActivityRegistrar>(registrar: &mut R, services: &WorkerServices) {
    let common = Arc::clone(&services.common);
    registrar.register_json(
        contracts::activities::GET_WORKFLOW_ARGS,
        move |input: GetArgsInput| {
            let common = Arc::clone(&common);
            async move { common.get_workflow_args(input).await }
        },
    );

    let hello = Arc::clone(&services.hello);
    registrar.register_json(contracts::activities::SAY_HELLO, move |name: String| {
        let hello = Arc::clone(&hello);
        async move { hello.say_hello(name).await }
    });

    let giphy = Arc::clone(&services.giphy);
    registrar.register_json(
        contracts::activities::RESOLVE_RECIPIENTS,
        move |raw: String| {
            let giphy = Arc::clone(&giphy);
            async move { giphy.resolve_recipients(raw).await }
        },
    );

    let giphy = Arc::clone(&services.giphy);
    registrar.register_json(contracts::activities::FETCH_GIF, move |query: String| {
        let giphy = Arc::clone(&giphy);
        async move { giphy.fetch_gif(query).await }
    });

    let giphy = Arc::clone(&services.giphy);
    registrar.register_json(contracts::activities::SEND_GIF, move |input: SendGifInput| {
        let giphy = Arc::clone(&giphy);
        async move { giphy.send_gif(input).await }
    });

    let weather = Arc::clone(&services.weather);
    registrar.register_json(
        contracts::activities::FETCH_CURRENT_WEATHER,
        move |city: City| {
            let weather = Arc::clone(&weather);
            async move { weather.fetch_current_weather(city).await }
        },
    );

    let weather = Arc::clone(&services.weather);
    registrar.register_json(
        contracts::activities::SUMMARIZE_WEATHER,
        move |readings: Vec<CityWeather>| {
            let weather = Arc::clone(&weather);
            async move { weather.summarize_weather(readings).await }
        },
    );

    let freshness = Arc::clone(&services.freshness);
    registrar.register_json(
        contracts::activities::FETCH_STALE_ASSETS,
        move |query: StaleQuery| {
            let freshness = Arc::clone(&freshness);
            async move { freshness.fetch_stale_assets(query).await }
        },
    );

    let freshness = Arc::clone(&services.freshness);
    registrar.register_json(contracts::activities::TAG_ASSETS, move |request: TagRequest| {
        let freshness = Arc::clone(&freshness);
        async move { freshness.tag_assets(request).await }
    });

    let data = Arc::clone(&services.data_processing);
    registrar.register_json(contracts::activities::LOAD_RECORDS, move |path: String| {
        let data = Arc::clone(&data);
        async move { data.load_records(path).await }
    });

    let data = Arc::clone(&services.data_processing);
    registrar.register_json(
        contracts::activities::SUMMARIZE_RECORDS,
        move |records: Vec<Record>| {
            let data = Arc::clone(&data);
            async move { data.summarize_records(records).await }
        },
    );

    let data = Arc::clone(&services.data_processing);
    registrar.register_json(
        contracts::activities::WRITE_SUMMARY,
        move |input: WriteSummaryInput| {
            let data = Arc::clone(&data);
            async move { data.write_summary(input).await }
        },
    );

    let sql = Arc::clone(&services.sql);
    registrar.register_json(contracts::activities::PREFLIGHT_CHECK, move |input: ()| {
        let sql = Arc::clone(&sql);
        async move { sql.preflight_check(input).await }
    });

    let sql = Arc::clone(&services.sql);
    registrar.register_json(
        contracts::activities::FETCH_TABLES,
        move |schema: Option<String>| {
            let sql = Arc::clone(&sql);
            async move { sql.fetch_tables(schema).await }
        },
    );

    let sql = Arc::clone(&services.sql);
    registrar.register_json(
        contracts::activities::PERSIST_TABLES,
        move |input: PersistTablesInput| {
            let sql = Arc::clone(&sql);
            async move { sql.persist_tables(input).await }
        },
    );
}

pub fn register_workflows(worker: &mut Worker) {
    for entry in workflows::all() {
        let run = entry.run;
        worker.register_wf(entry.name(), move |ctx: WfContext| run_temporal_workflow(ctx, run));
        tracing::debug!(workflow = entry.name(), "Registered workflow");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ActivityRegistry;
    use crate::workflows::testing::Fixture;

    #[test]
    fn every_declared_step_has_a_registered_activity() {
        let fixture = Fixture::new().build();
        let registry: &ActivityRegistry = &fixture.registry;
        for entry in workflows::all() {
            for step in entry.definition.steps {
                assert!(
                    registry.contains(step.activity),
                    "{} -> {}",
                    entry.name(),
                    step.activity
                );
            }
        }
        assert_eq!(registry.names().len(), 15);
    }
}
