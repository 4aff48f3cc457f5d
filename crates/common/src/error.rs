//! Error types for noticekit.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Caller Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Notice type not found: {0}")]
    NoticeTypeNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Bad signature")]
    BadSignature,

    // === Recoverable ===
    #[error("No notification language available for user {0}")]
    LanguageUnavailable(String),

    // === Process Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Mail transport error: {0}")]
    Mail(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code used in logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoticeTypeNotFound(_) => "NOTICE_TYPE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::LanguageUnavailable(_) => "LANGUAGE_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::Mail(_) => "MAIL_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error indicates a fault in the process rather than the call.
    #[must_use]
    pub const fn is_process_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Config(_)
                | Self::Template(_)
                | Self::Mail(_)
                | Self::Queue(_)
                | Self::Internal(_)
        )
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Queue(err.to_string())
    }
}
