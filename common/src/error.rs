use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Error taxonomy shared by adapters, activities and workflows.
///
/// Only [`AppError::Remote`] is worth retrying; everything else describes a
/// problem that a second attempt with the same input cannot fix.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("remote error{}: {message}", format_status(.status))]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl AppError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Remote { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "ConfigurationError",
            AppError::Remote { .. } => "RemoteError",
            AppError::Validation(_) => "ValidationError",
            AppError::NotFound(_) => "NotFoundError",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        // Strip the URL: query strings may carry API keys.
        AppError::remote(status, err.without_url().to_string())
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::remote(None, err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}
