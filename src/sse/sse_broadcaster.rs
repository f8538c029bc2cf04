use crate::sse::models::{EventSender, PollEvent};
use tokio::sync::broadcast;
use tracing::debug;

pub fn create_event_broadcaster() -> EventSender {
    let (tx, _rx) = broadcast::channel(100);
    tx
}

/// Publishes an event to whoever is listening. Having no subscribers is not
/// an error; the reply to the issuing command has already been sent.
pub fn publish(tx: &EventSender, event: PollEvent) {
    let poll_id = event.announcement().poll_id;
    match tx.send(event) {
        Ok(receivers) => debug!("Published event for poll {} to {} listeners", poll_id, receivers),
        Err(_) => debug!("No listeners for poll {} event", poll_id),
    }
}
