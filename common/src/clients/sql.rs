use super::{not_loaded, param_str, unknown_operation, ClientAdapter, Credentials};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, Database, DatabaseBackend, DatabaseConnection, FromQueryResult, JsonValue,
    Statement,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use url::Url;

const SUPPORTED_SCHEMES: &[&str] = &["sqlite", "postgres", "postgresql", "mysql", "mariadb"];

/// Relational source reached through sea-orm.
///
/// Credentials either carry a full `url` or the discrete
/// `driver/host/port/username/password/database` fields. When the database
/// cannot be reached at `load` time the url is kept, and the next `call`
/// connects again.
pub struct SqlClient {
    db: RwLock<Option<DatabaseConnection>>,
    pending: RwLock<Option<String>>,
}

impl Default for SqlClient {
    fn default() -> Self {
        Self::new()
    }
}

pub fn connection_url(credentials: &Credentials) -> AppResult<String> {
    if let Some(url) = credentials.get("url") {
        return Ok(url.to_string());
    }

    let driver = credentials.get("driver").unwrap_or("postgres");
    match driver {
        "sqlite" => Ok(format!("sqlite://{}", credentials.require("database")?)),
        "postgres" | "postgresql" | "mysql" => {
            let host = credentials.require("host")?;
            let database = credentials.require("database")?;
            let username = credentials.require("username")?;
            let port = credentials.get("port").unwrap_or(if driver == "mysql" {
                "3306"
            } else {
                "5432"
            });

            let invalid = |field: &str| {
                AppError::Configuration(format!("sql credential '{}' is not usable in a url", field))
            };
            let mut url = Url::parse(&format!("{}://{}:{}", driver, host, port))
                .map_err(|_| invalid("host"))?;
            // userinfo setters percent-encode reserved characters
            url.set_username(username).map_err(|_| invalid("username"))?;
            url.set_password(credentials.get("password"))
                .map_err(|_| invalid("password"))?;
            url.path_segments_mut()
                .map_err(|_| invalid("host"))?
                .push(database);
            Ok(url.to_string())
        }
        other => Err(AppError::Configuration(format!(
            "unsupported sql driver '{}'",
            other
        ))),
    }
}

/// Rejects urls that no driver could ever accept. Reachability is not checked.
fn validate_url(raw: &str) -> AppResult<()> {
    let url = Url::parse(raw)
        .map_err(|e| AppError::Configuration(format!("invalid database url: {}", e)))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(AppError::Configuration(format!(
            "unsupported database scheme '{}'",
            url.scheme()
        )));
    }
    Ok(())
}

async fn connect(url: &str) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_string());
    // Every pooled connection to an in-memory sqlite url is its own database.
    if url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }
    options.sqlx_logging(false);

    Database::connect(options)
        .await
        .map_err(|e| AppError::remote(None, format!("failed to connect to database: {}", e)))
}

fn list_tables_statement(backend: DatabaseBackend, schema: Option<&str>) -> Statement {
    match (backend, schema) {
        (DatabaseBackend::Sqlite, _) => Statement::from_string(
            backend,
            "SELECT name AS table_name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        ),
        (DatabaseBackend::Postgres, schema) => Statement::from_sql_and_values(
            backend,
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = $1 ORDER BY table_name",
            [sea_orm::Value::from(schema.unwrap_or("public"))],
        ),
        (_, Some(schema)) => Statement::from_sql_and_values(
            backend,
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? ORDER BY table_name",
            [sea_orm::Value::from(schema)],
        ),
        (_, None) => Statement::from_string(
            backend,
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() ORDER BY table_name",
        ),
    }
}

impl SqlClient {
    pub fn new() -> Self {
        Self {
            db: RwLock::new(None),
            pending: RwLock::new(None),
        }
    }

    /// Retries a connection whose `load` failed on reachability.
    async fn reconnect(&self) -> AppResult<()> {
        let Some(url) = self.pending.read().await.clone() else {
            return Err(not_loaded(self.name()));
        };

        let mut guard = self.db.write().await;
        if guard.is_none() {
            *guard = Some(connect(&url).await?);
            tracing::info!("SQL client reconnected");
        }
        *self.pending.write().await = None;
        Ok(())
    }

    pub async fn preflight(&self) -> AppResult<Value> {
        self.call("preflight", json!({})).await
    }

    pub async fn query(&self, sql: &str) -> AppResult<Vec<Value>> {
        let result = self.call("query", json!({ "sql": sql })).await?;
        Ok(serde_json::from_value(result["rows"].clone())?)
    }
}

#[async_trait]
impl ClientAdapter for SqlClient {
    fn name(&self) -> &'static str {
        "sql"
    }

    async fn load(&self, credentials: &Credentials) -> AppResult<()> {
        let mut guard = self.db.write().await;
        if guard.is_some() {
            tracing::debug!("SQL client already loaded");
            return Ok(());
        }

        let url = connection_url(credentials)?;
        validate_url(&url)?;

        match connect(&url).await {
            Ok(db) => {
                tracing::info!(backend = ?db.get_database_backend(), "SQL client loaded");
                *guard = Some(db);
                *self.pending.write().await = None;
                Ok(())
            }
            Err(e) => {
                *self.pending.write().await = Some(url);
                Err(e)
            }
        }
    }

    async fn call(&self, operation: &str, params: Value) -> AppResult<Value> {
        if self.db.read().await.is_none() {
            self.reconnect().await?;
        }
        let guard = self.db.read().await;
        let db = guard.as_ref().ok_or_else(|| not_loaded(self.name()))?;
        let backend = db.get_database_backend();

        match operation {
            "preflight" => {
                JsonValue::find_by_statement(Statement::from_string(backend, "SELECT 1 AS ok"))
                    .one(db)
                    .await?;
                Ok(json!({ "success": true }))
            }
            "query" => {
                let sql = param_str(&params, "sql")?;
                if sql.trim().is_empty() {
                    return Err(AppError::Validation("sql must not be empty".to_string()));
                }
                let rows = JsonValue::find_by_statement(Statement::from_string(backend, sql))
                    .all(db)
                    .await?;
                Ok(json!({ "rows": rows }))
            }
            "list_tables" => {
                let schema = params.get("schema").and_then(Value::as_str);
                let rows =
                    JsonValue::find_by_statement(list_tables_statement(backend, schema))
                        .all(db)
                        .await?;
                let tables: Vec<Value> = rows
                    .into_iter()
                    .filter_map(|row| row.get("table_name").cloned())
                    .collect();
                Ok(json!({ "tables": tables }))
            }
            other => Err(unknown_operation(self.name(), other)),
        }
    }

    async fn close(&self) -> AppResult<()> {
        *self.pending.write().await = None;
        if let Some(db) = self.db.write().await.take() {
            db.close().await?;
            tracing::info!("SQL client closed");
        }
        Ok(())
    }

    async fn is_loaded(&self) -> bool {
        self.db.read().await.is_some()
    }
}
