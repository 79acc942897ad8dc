//! Engine-neutral execution of declared workflow steps.
//!
//! Workflow bodies are written once against [`WorkflowRuntime`]. The Temporal
//! runtime schedules each step as an activity task; the local runtime calls
//! the registered handler in-process and applies the same timeout and retry
//! policy itself.

pub mod local;
pub mod temporal;

use async_trait::async_trait;
use common::{AppError, AppResult};
use futures::future::{join_all, BoxFuture};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use local::{ActivityRegistry, LocalRuntime};
pub use temporal::TemporalRuntime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrySpec {
    /// Total attempts including the first one. `0` means unlimited.
    pub maximum_attempts: u32,
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
}

impl RetrySpec {
    pub const fn new(maximum_attempts: u32) -> Self {
        Self {
            maximum_attempts,
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(60),
        }
    }

    pub const fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub const fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    /// Delay before the attempt that follows failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let millis =
            self.initial_interval.as_millis() as f64 * self.backoff_coefficient.powi(exponent);
        let capped = millis.min(self.maximum_interval.as_millis() as f64);
        Duration::from_millis(capped.max(0.0).round() as u64)
    }

    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.maximum_attempts == 0 || attempt <= self.maximum_attempts
    }
}

pub const DEFAULT_RETRY: RetrySpec = RetrySpec::new(3);
pub const NO_RETRY: RetrySpec = RetrySpec::new(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSpec {
    pub activity: &'static str,
    pub start_to_close_timeout: Duration,
    pub retry: RetrySpec,
}

impl StepSpec {
    pub const fn new(activity: &'static str, timeout_secs: u64) -> Self {
        Self {
            activity,
            start_to_close_timeout: Duration::from_secs(timeout_secs),
            retry: DEFAULT_RETRY,
        }
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = timeout;
        self
    }

    pub const fn with_retry(mut self, retry: RetrySpec) -> Self {
        self.retry = retry;
        self
    }

    pub fn describe(&self) -> Value {
        json!({
            "activity": self.activity,
            "start_to_close_timeout_secs": self.start_to_close_timeout.as_secs_f64(),
            "maximum_attempts": self.retry.maximum_attempts,
            "backoff_coefficient": self.retry.backoff_coefficient,
        })
    }
}

#[derive(Debug)]
pub struct WorkflowDefinition {
    pub name: &'static str,
    /// Keys projected from the stored configuration into `WorkflowArgs`.
    pub arguments: &'static [&'static str],
    pub steps: &'static [StepSpec],
}

impl WorkflowDefinition {
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "arguments": self.arguments,
            "steps": self.steps.iter().map(StepSpec::describe).collect::<Vec<_>>(),
        })
    }
}

/// Input every workflow run receives from its trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub workflow_id: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl WorkflowConfig {
    pub fn new(workflow_id: impl Into<String>, config: Map<String, Value>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            config,
        }
    }
}

#[async_trait]
pub trait WorkflowRuntime: Send + Sync {
    fn workflow_id(&self) -> &str;

    /// Runs one activity under the step's timeout and retry policy.
    async fn run_activity(&self, step: &StepSpec, input: Value) -> AppResult<Value>;
}

pub async fn execute_step<I, O>(
    runtime: &dyn WorkflowRuntime,
    step: &StepSpec,
    input: &I,
) -> AppResult<O>
where
    I: Serialize + Sync + ?Sized,
    O: DeserializeOwned,
{
    let input = serde_json::to_value(input)?;
    tracing::debug!(
        workflow_id = runtime.workflow_id(),
        activity = step.activity,
        "Executing step"
    );
    let output = runtime.run_activity(step, input).await?;
    serde_json::from_value(output).map_err(|e| {
        AppError::Validation(format!(
            "activity '{}' returned an unexpected payload: {}",
            step.activity, e
        ))
    })
}

/// Starts one activity per input and waits for all of them. Any failure fails
/// the whole fan-out.
pub async fn execute_fan_out<I, O>(
    runtime: &dyn WorkflowRuntime,
    step: &StepSpec,
    inputs: &[I],
) -> AppResult<Vec<O>>
where
    I: Serialize + Sync,
    O: DeserializeOwned,
{
    let futures = inputs
        .iter()
        .map(|input| execute_step::<I, O>(runtime, step, input));
    join_all(futures).await.into_iter().collect()
}

/// Result of a step whose emptiness decides whether the next step runs.
#[derive(Debug)]
pub enum StepOutcome<T> {
    Success(T),
    Empty,
    Failed(AppError),
}

impl<T> StepOutcome<T> {
    pub fn classify(result: AppResult<T>, is_empty: impl FnOnce(&T) -> bool) -> Self {
        match result {
            Ok(value) if is_empty(&value) => StepOutcome::Empty,
            Ok(value) => StepOutcome::Success(value),
            Err(e) => StepOutcome::Failed(e),
        }
    }
}

pub type ActivityHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, AppResult<Value>> + Send + Sync>;

/// Wraps a typed activity into a JSON-in / JSON-out handler.
pub fn json_handler<I, O, F, Fut>(f: F) -> ActivityHandler
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<O>> + Send + 'static,
{
    Arc::new(move |input: Value| -> BoxFuture<'static, AppResult<Value>> {
        let call = serde_json::from_value::<I>(input).map(&f);
        Box::pin(async move {
            let output = call?.await?;
            Ok(serde_json::to_value(output)?)
        })
    })
}

/// Anything activities can be registered with: a Temporal worker or the
/// in-process registry.
pub trait ActivityRegistrar {
    fn register_handler(&mut self, name: &'static str, handler: ActivityHandler);

    fn register_json<I, O, F, Fut>(&mut self, name: &'static str, f: F)
    where
        Self: Sized,
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<O>> + Send + 'static,
    {
        self.register_handler(name, json_handler(f));
    }
}
