use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Who handed us the data that failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The request itself; the caller can fix it.
    Caller,
    /// An upstream service answered with something we can't use.
    Upstream,
}

/// Everything a repository, the summarize workflow, or an external client
/// can fail with. The first error encountered goes straight back to the
/// caller; nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Forbidden: you can only access your own notes")]
    Forbidden,

    #[error("Note not found")]
    NotFound,

    #[error("{0}")]
    Validation(String, Origin),

    /// The identity service, the database, or the completion service failed.
    #[error("{0}")]
    Upstream(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into(), Origin::Caller)
    }

    pub fn upstream_validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into(), Origin::Upstream)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_, Origin::Caller) => StatusCode::BAD_REQUEST,
            Self::Validation(_, Origin::Upstream) | Self::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Upstream(format!("Database error: {err}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(format!("Upstream request failed: {err}"))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
