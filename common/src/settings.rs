use crate::clients::Credentials;
use dotenvy::dotenv;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Default, PartialEq)]
pub struct Cli {
    pub port: Option<u16>,
    pub config: Option<String>,
}

/// Picks `--port` and `--config` out of the process arguments and ignores
/// everything else, so binaries can layer their own flags on top.
pub fn parse_cli_from_args<I, S>(args: I) -> Cli
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut cli = Cli::default();
    let mut iter = args.into_iter().map(Into::into);

    // Skip binary name
    let _ = iter.next();

    while let Some(arg) = iter.next() {
        if let Some(raw_port) = arg.strip_prefix("--port=") {
            if let Ok(port) = raw_port.parse::<u16>() {
                cli.port = Some(port);
            }
            continue;
        }

        if arg == "--port" {
            if let Some(raw_port) = iter.next() {
                if let Ok(port) = raw_port.parse::<u16>() {
                    cli.port = Some(port);
                }
            }
            continue;
        }

        if let Some(raw_config) = arg.strip_prefix("--config=") {
            if !raw_config.is_empty() {
                cli.config = Some(raw_config.to_string());
            }
            continue;
        }

        if arg == "--config" {
            if let Some(config) = iter.next() {
                if !config.is_empty() {
                    cli.config = Some(config);
                }
            }
        }
    }

    cli
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub port: u16,
    pub app: AppSettings,
    pub engine: EngineSettings,
    pub temporal: TemporalSettings,
    pub storage: StorageSettings,
    pub s3: S3Settings,
    #[serde(default)]
    pub giphy: GiphySettings,
    #[serde(default)]
    pub slack: SlackSettings,
    #[serde(default)]
    pub weather: WeatherSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub sql: SqlSettings,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppSettings {
    pub name: String,
    pub default_workflow: String,
    /// Comma-separated browser origins allowed by CORS. Permissive when unset.
    #[serde(default)]
    pub cors_origins: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    #[default]
    Local,
    Temporal,
}

impl FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "inmemory" | "in-memory" => Ok(EngineMode::Local),
            "temporal" => Ok(EngineMode::Temporal),
            other => Err(format!(
                "unknown engine mode '{}', expected 'local' or 'temporal'",
                other
            )),
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMode::Local => write!(f, "local"),
            EngineMode::Temporal => write!(f, "temporal"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub mode: EngineMode,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TemporalSettings {
    pub server_url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub task_queue: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    S3,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GiphySettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SlackSettings {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WeatherSettings {
    pub base_url: String,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            base_url: crate::clients::weather::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CatalogSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SqlSettings {
    pub url: Option<String>,
    pub driver: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl GiphySettings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new()
            .with_optional("api_key", self.api_key.clone())
            .with_optional("base_url", self.base_url.clone())
    }
}

impl SlackSettings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new()
            .with_optional("token", self.token.clone())
            .with_optional("base_url", self.base_url.clone())
    }
}

impl WeatherSettings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new().with("base_url", self.base_url.clone())
    }
}

impl CatalogSettings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new()
            .with_optional("base_url", self.base_url.clone())
            .with_optional("api_key", self.api_key.clone())
    }
}

impl SqlSettings {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.host.is_some() || self.database.is_some()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new()
            .with_optional("url", self.url.clone())
            .with_optional("driver", self.driver.clone())
            .with_optional("host", self.host.clone())
            .with_optional("port", self.port.map(|p| p.to_string()))
            .with_optional("username", self.username.clone())
            .with_optional("password", self.password.clone())
            .with_optional("database", self.database.clone())
    }
}

const RAW_ENV: &[(&str, &str)] = &[
    ("AWS_ACCESS_KEY_ID", "s3.access_key_id"),
    ("AWS_SECRET_ACCESS_KEY", "s3.secret_access_key"),
    ("AWS_REGION", "s3.region"),
    ("S3_FORCE_PATH_STYLE", "s3.force_path_style"),
    ("GIPHY_API_KEY", "giphy.api_key"),
    ("SLACK_BOT_TOKEN", "slack.token"),
    ("WEATHER_API_URL", "weather.base_url"),
    ("CATALOG_BASE_URL", "catalog.base_url"),
    ("CATALOG_API_KEY", "catalog.api_key"),
    ("DATABASE_URL", "sql.url"),
];

impl Settings {
    #[allow(clippy::result_large_err)]
    pub fn new() -> Result<Self, figment::Error> {
        Self::load(&parse_cli_from_args(std::env::args()))
    }

    #[allow(clippy::result_large_err)]
    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        dotenv().ok();
        Self::figment(cli).extract()
    }

    pub fn figment(cli: &Cli) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        figment = figment.merge(Toml::file("/etc/appflow/config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            figment = figment.merge(Toml::file(config_dir.join("appflow/config.toml")));
        }

        figment = figment.merge(Toml::file("appflow.toml"));

        let config_path = cli
            .config
            .clone()
            .or_else(|| std::env::var("APPFLOW_CONFIG_PATH").ok());
        if let Some(config_path) = config_path {
            figment = figment.merge(Toml::file(config_path));
        }

        // APPFLOW_TEMPORAL__TASK_QUEUE=... style overrides
        figment = figment.merge(Env::prefixed("APPFLOW_").split("__"));

        for (var, key) in RAW_ENV {
            let key = *key;
            figment = figment.merge(Env::raw().only(&[*var]).map(move |_| key.into()));
        }

        if let Some(port) = cli.port {
            figment = figment.merge(("port", port));
        }

        figment
    }

    pub fn temporal_enabled(&self) -> bool {
        self.engine.mode == EngineMode::Temporal
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            port: 3000,
            debug: false,
            app: AppSettings {
                name: "appflow".to_string(),
                default_workflow: "hello_world_workflow".to_string(),
                cors_origins: None,
            },
            engine: EngineSettings::default(),
            temporal: TemporalSettings {
                server_url: "http://localhost:7233".to_string(),
                namespace: default_namespace(),
                task_queue: "appflow-queue".to_string(),
            },
            storage: StorageSettings::default(),
            s3: S3Settings {
                bucket: "appflow-state".to_string(),
                region: "us-east-1".to_string(),
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                force_path_style: false,
            },
            giphy: GiphySettings::default(),
            slack: SlackSettings::default(),
            weather: WeatherSettings::default(),
            catalog: CatalogSettings::default(),
            sql: SqlSettings::default(),
        }
    }
}
