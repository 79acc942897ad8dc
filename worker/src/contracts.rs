pub mod activities {
    pub const GET_WORKFLOW_ARGS: &str = "get_workflow_args";
    pub const SAY_HELLO: &str = "say_hello";
    pub const RESOLVE_RECIPIENTS: &str = "resolve_recipients";
    pub const FETCH_GIF: &str = "fetch_gif";
    pub const SEND_GIF: &str = "send_gif";
    pub const FETCH_CURRENT_WEATHER: &str = "fetch_current_weather";
    pub const SUMMARIZE_WEATHER: &str = "summarize_weather";
    pub const FETCH_STALE_ASSETS: &str = "fetch_stale_assets";
    pub const TAG_ASSETS: &str = "tag_assets";
    pub const LOAD_RECORDS: &str = "load_records";
    pub const SUMMARIZE_RECORDS: &str = "summarize_records";
    pub const WRITE_SUMMARY: &str = "write_summary";
    pub const PREFLIGHT_CHECK: &str = "preflight_check";
    pub const FETCH_TABLES: &str = "fetch_tables";
    pub const PERSIST_TABLES: &str = "persist_tables";
}

pub mod workflows {
    pub const HELLO_WORLD: &str = "hello_world_workflow";
    pub const GIPHY: &str = "giphy_workflow";
    pub const WEATHER: &str = "weather_workflow";
    pub const FRESHNESS_MONITOR: &str = "freshness_monitor_workflow";
    pub const DATA_PROCESSING: &str = "data_processing_workflow";
    pub const SQL_METADATA: &str = "sql_metadata_workflow";
}
