pub mod data_processing_workflow;
pub mod freshness_monitor_workflow;
pub mod giphy_workflow;
pub mod hello_world_workflow;
pub mod sql_metadata_workflow;
pub mod weather_workflow;

#[cfg(test)]
pub(crate) mod testing;

use crate::activities::{GetArgsInput, WorkflowArgs};
use crate::contracts;
use crate::runtime::{execute_step, StepSpec, WorkflowConfig, WorkflowDefinition, WorkflowRuntime};
use chrono::{DateTime, Utc};
use common::AppResult;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// A workflow body, runnable on any [`WorkflowRuntime`].
pub type WorkflowFn =
    for<'a> fn(&'a dyn WorkflowRuntime, WorkflowConfig) -> BoxFuture<'a, AppResult<Value>>;

/// Fills trigger-time values into a config before it is stored.
pub type PrepareFn = fn(&mut Map<String, Value>, DateTime<Utc>) -> AppResult<()>;

#[derive(Clone, Copy)]
pub struct WorkflowEntry {
    pub definition: &'static WorkflowDefinition,
    pub run: WorkflowFn,
    pub prepare: Option<PrepareFn>,
}

impl WorkflowEntry {
    pub fn name(&self) -> &'static str {
        self.definition.name
    }

    /// Runs the entry's prepare hook against the current time. Callers apply
    /// it once per trigger so every attempt of the run sees the same config.
    pub fn prepare_config(&self, config: &mut Map<String, Value>) -> AppResult<()> {
        self.prepare_config_at(config, Utc::now())
    }

    pub fn prepare_config_at(
        &self,
        config: &mut Map<String, Value>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        match self.prepare {
            Some(prepare) => prepare(config, now),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for WorkflowEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEntry")
            .field("name", &self.definition.name)
            .finish()
    }
}

/// First step of every workflow.
pub const GET_ARGS_STEP: StepSpec = StepSpec::new(contracts::activities::GET_WORKFLOW_ARGS, 30);

static ENTRIES: [WorkflowEntry; 6] = [
    WorkflowEntry {
        definition: &hello_world_workflow::DEFINITION,
        run: hello_world_workflow::hello_world_workflow,
        prepare: None,
    },
    WorkflowEntry {
        definition: &giphy_workflow::DEFINITION,
        run: giphy_workflow::giphy_workflow,
        prepare: None,
    },
    WorkflowEntry {
        definition: &weather_workflow::DEFINITION,
        run: weather_workflow::weather_workflow,
        prepare: None,
    },
    WorkflowEntry {
        definition: &freshness_monitor_workflow::DEFINITION,
        run: freshness_monitor_workflow::freshness_monitor_workflow,
        prepare: Some(freshness_monitor_workflow::resolve_cutoff),
    },
    WorkflowEntry {
        definition: &data_processing_workflow::DEFINITION,
        run: data_processing_workflow::data_processing_workflow,
        prepare: None,
    },
    WorkflowEntry {
        definition: &sql_metadata_workflow::DEFINITION,
        run: sql_metadata_workflow::sql_metadata_workflow,
        prepare: None,
    },
];

pub fn all() -> &'static [WorkflowEntry] {
    &ENTRIES
}

pub fn find(name: &str) -> Option<&'static WorkflowEntry> {
    ENTRIES.iter().find(|entry| entry.name() == name)
}

/// Runs [`GET_ARGS_STEP`] for `definition`, projecting its declared arguments.
pub async fn load_args(
    runtime: &dyn WorkflowRuntime,
    definition: &WorkflowDefinition,
    config: &WorkflowConfig,
) -> AppResult<WorkflowArgs> {
    let input = GetArgsInput {
        workflow_id: config.workflow_id.clone(),
        config: config.config.clone(),
        keys: definition.arguments.iter().map(|k| k.to_string()).collect(),
    };
    execute_step(runtime, &GET_ARGS_STEP, &input).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_names_are_unique_and_match_contracts() {
        let names: HashSet<_> = all().iter().map(WorkflowEntry::name).collect();
        assert_eq!(names.len(), all().len());
        assert!(names.contains(contracts::workflows::HELLO_WORLD));
        assert!(names.contains(contracts::workflows::SQL_METADATA));
        assert!(find("no_such_workflow").is_none());
    }

    #[test]
    fn only_freshness_monitor_rewrites_trigger_config() {
        let now = "2024-06-01T00:00:00Z".parse().unwrap();
        for entry in all() {
            let mut config = Map::new();
            entry.prepare_config_at(&mut config, now).unwrap();
            if entry.name() == contracts::workflows::FRESHNESS_MONITOR {
                assert_eq!(config["updated_before"], "2024-05-02T00:00:00Z");
            } else {
                assert!(config.is_empty(), "{}", entry.name());
            }
        }
    }

    #[test]
    fn every_workflow_starts_with_get_args() {
        for entry in all() {
            assert_eq!(
                entry.definition.steps.first().map(|s| s.activity),
                Some(contracts::activities::GET_WORKFLOW_ARGS),
                "{}",
                entry.name()
            );
        }
    }
}
