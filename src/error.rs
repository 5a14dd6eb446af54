use thiserror::Error;
use tracing::{error, warn};

/// Error kinds shared by every operation of the bot.
///
/// Callers pick the user-facing text from the kind, so keep these distinct:
/// a malformed date must never look like an unknown event.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or unparsable input, missing required field.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unknown event id, or no upcoming event where one was implied.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Role check failed or could not be performed.
    #[error("Not authorized: {0}")]
    AuthorizationError(String),

    /// Store, agent, chat platform or provisioner call failed.
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// A wizard step received input it cannot use.
    #[error("Unexpected input: {0}")]
    StateError(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AuthorizationError(_) => "AUTHORIZATION_ERROR",
            AppError::UpstreamError(_) => "UPSTREAM_ERROR",
            AppError::StateError(_) => "STATE_ERROR",
        }
    }

    /// Text shown to the chat user. Upstream details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) => format!("⚠️ {msg}"),
            AppError::StateError(msg) => format!("⚠️ {msg}"),
            AppError::NotFound(msg) => format!("🤷 Nothing to act on: {msg}"),
            AppError::AuthorizationError(_) => "⛔ Only admins may do that here.".to_string(),
            AppError::UpstreamError(_) => "⚠️ Something went wrong, please try again later.".to_string(),
        }
    }

    pub fn log(&self, context: &str) {
        match self {
            AppError::UpstreamError(msg) => {
                error!(code = self.code(), context, message = %msg, "Operation failed");
            }
            _ => {
                warn!(code = self.code(), context, error = %self, "Operation rejected");
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("no such event".to_string()),
            // 23503: foreign_key_violation, i.e. the referenced event does not exist
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                AppError::NotFound("no such event".to_string())
            }
            _ => AppError::UpstreamError(format!("database: {err}")),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamError(format!("http: {err}"))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::UpstreamError(format!("redis: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::UpstreamError(format!("json: {err}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;
