use crate::sse::models::EventSender;
use axum::{
    extract::{Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

fn event_stream(
    events: EventSender,
    poll_name: Option<String>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut rx = events.subscribe();

    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let announcement = event.announcement();
                    if poll_name.as_deref().is_some_and(|name| name != announcement.poll_name) {
                        continue;
                    }
                    yield Ok(Event::default()
                        .event(event.name())
                        .data(json!(announcement).to_string()));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Announcement stream lagged, skipped {} events", skipped);
                    yield Ok(Event::default()
                        .event("error")
                        .data(json!({"error": "missed announcements", "skipped": skipped}).to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

fn with_keep_alive<S>(stream: S) -> Sse<S>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

pub async fn announcements_sse(
    Extension(events): Extension<EventSender>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    with_keep_alive(event_stream(events, None))
}

pub async fn poll_announcements_sse(
    Extension(events): Extension<EventSender>,
    Path(poll_name): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    with_keep_alive(event_stream(events, Some(poll_name)))
}
