use crate::api::{list_polls, poll_results, post_command};
use crate::sse::{announcements_sse, poll_announcements_sse};
use crate::startup::AppState;
use axum::{
    Router,
    extract::Extension,
    http::{
        StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_routes(app_state: AppState) -> Router {
    let events = app_state.events.clone();

    Router::new()
        .route("/commands", post(post_command))
        .route("/polls", get(list_polls))
        .route("/polls/:name/results", get(poll_results))
        .route("/announcements", get(announcements_sse))
        .route("/announcements/:name", get(poll_announcements_sse))
        .layer(Extension(app_state))
        .layer(Extension(events))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods([axum::http::Method::POST, axum::http::Method::GET])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .layer(TraceLayer::new_for_http())
        .fallback(handler_404)
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
