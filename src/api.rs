use crate::commands::Author;
use crate::db::Poll;
use crate::error::PollError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub author_id: String,
    pub author_mention: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub reply: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub name: Option<String>,
    pub id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub id: i64,
    pub name: String,
    pub question: String,
    pub options: Vec<String>,
    pub creator_id: String,
    pub created_at: String,
    pub ends_at: String,
}

impl From<Poll> for PollResponse {
    fn from(poll: Poll) -> Self {
        PollResponse {
            id: poll.id,
            created_at: to_rfc3339(poll.created_at),
            ends_at: to_rfc3339(poll.ended_at),
            name: poll.name,
            question: poll.question,
            options: poll.options,
            creator_id: poll.creator_id,
        }
    }
}

fn to_rfc3339(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

/// Runs one chat command forwarded by the chat bridge. Domain failures are
/// part of the reply text, so this always answers 200.
pub async fn post_command(
    Extension(app_state): Extension<AppState>,
    Json(payload): Json<CommandRequest>,
) -> impl IntoResponse {
    let author = Author {
        mention: payload
            .author_mention
            .unwrap_or_else(|| format!("<@{}>", payload.author_id)),
        id: payload.author_id,
    };

    let reply = app_state
        .dispatcher
        .handle(&author, &payload.content)
        .await;

    (StatusCode::OK, Json(CommandResponse { reply }))
}

/// Active polls, optionally narrowed by name or id
pub async fn list_polls(
    Extension(app_state): Extension<AppState>,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse, PollError> {
    let polls = app_state
        .engine
        .list(query.name.as_deref(), query.id)
        .await?;

    let response: Vec<PollResponse> = polls.into_iter().map(PollResponse::from).collect();
    Ok((StatusCode::OK, Json(response)))
}

/// Ranked results for a poll; the latest one with this name unless `id` is given
pub async fn poll_results(
    Extension(app_state): Extension<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse, PollError> {
    let tally = app_state.engine.tally(&name, query.id).await?;
    Ok((StatusCode::OK, Json(tally)))
}
