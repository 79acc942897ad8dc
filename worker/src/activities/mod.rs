pub mod common;
pub mod data_processing;
pub mod freshness;
pub mod giphy;
pub mod hello;
pub mod sql;
pub mod weather;

pub use self::common::{CommonActivities, GetArgsInput, WorkflowArgs};
pub use data_processing::DataProcessingActivities;
pub use freshness::FreshnessActivities;
pub use giphy::GiphyActivities;
pub use hello::HelloActivities;
pub use sql::SqlActivities;
pub use weather::WeatherActivities;
