pub mod application;
pub mod handler;
pub mod handlers;
pub mod models;
pub mod server;

use common::settings::Settings;
use common::state_store::StateStore;
use handler::Handler;
use std::sync::Arc;
use worker::engine::WorkflowEngine;

pub use application::{Application, ApplicationBuilder};

pub struct AppState {
    pub settings: Arc<Settings>,
    pub engine: Arc<dyn WorkflowEngine>,
    pub state_store: StateStore,
    pub handler: Option<Arc<dyn Handler>>,
}
