pub mod clients;
pub mod error;
pub mod object_store;
pub mod settings;
pub mod state_store;

pub use error::{AppError, AppResult};
