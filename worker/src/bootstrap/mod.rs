pub mod context;
pub mod register;
pub mod temporal;

pub use context::{build_worker_context, build_worker_services, shutdown, WorkerContext, WorkerServices};
pub use register::{register_activities, register_workflows};
pub use temporal::{build_temporal_worker, client_options};
