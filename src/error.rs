use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("member already voted on this poll")]
    DuplicateVote,
    #[error("an active poll with this name already exists")]
    NameInUse,
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classifies a failed insert: the vote uniqueness constraint becomes
    /// `DuplicateVote`, any other constraint becomes `Constraint`.
    pub fn from_insert(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateVote
            }
            sqlx::Error::Database(db_err)
                if db_err.is_check_violation() || db_err.is_foreign_key_violation() =>
            {
                StoreError::Constraint(db_err.message().to_string())
            }
            _ => StoreError::Database(error),
        }
    }

    /// Same as [`StoreError::from_insert`], except the unique constraint hit by
    /// a poll insert is the one-active-poll-per-name index.
    pub fn from_poll_insert(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::NameInUse
            }
            _ => Self::from_insert(error),
        }
    }
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("user already voted on this poll")]
    DuplicateVote,
    #[error("{choice} is not one of {allowed:?}")]
    InvalidOption { choice: String, allowed: Vec<String> },
    #[error("only the creator can stop this poll")]
    PermissionDenied,
    #[error("no active poll")]
    NoActivePoll,
    #[error("poll not found")]
    PollNotFound,
    #[error("store operation timed out")]
    Timeout,
    #[error("command task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PollError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateVote => PollError::DuplicateVote,
            other => PollError::Store(other),
        }
    }
}

impl From<sqlx::Error> for PollError {
    fn from(error: sqlx::Error) -> Self {
        PollError::Store(StoreError::Database(error))
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            PollError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            PollError::DuplicateVote => (StatusCode::CONFLICT, "User already voted on this poll"),
            PollError::InvalidOption { .. } => (StatusCode::BAD_REQUEST, "Poll option not found"),
            PollError::PermissionDenied => (StatusCode::FORBIDDEN, "Permission denied"),
            PollError::NoActivePoll => (StatusCode::NOT_FOUND, "No active poll"),
            PollError::PollNotFound => (StatusCode::NOT_FOUND, "Poll not found"),
            PollError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Store timed out"),
            PollError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Command failed"),
            PollError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}
