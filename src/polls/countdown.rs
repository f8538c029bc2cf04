use super::PollEngine;
use crate::db::Poll;
use crate::messages;
use crate::sse::{self, Announcement, EventSender, PollEvent};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Waits in-process until `poll` is due and then publishes its results.
///
/// This is best effort: a restart loses the pending wait, and if the poll
/// was stopped early the wake-up finds the announcement already claimed and
/// stays silent.
pub fn schedule(engine: PollEngine, poll: Poll, events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let wait = u64::try_from(poll.ended_at - engine.now()).unwrap_or(0);
        info!("Poll {} (id {}) closes in {}s", poll.name, poll.id, wait);
        tokio::time::sleep(Duration::from_secs(wait)).await;

        match engine.announce_due(poll.id).await {
            Ok(Some(tally)) => {
                info!("Announcing results for poll {} (id {})", poll.name, poll.id);
                sse::publish(
                    &events,
                    PollEvent::PollEnded(Announcement {
                        poll_id: poll.id,
                        poll_name: poll.name.clone(),
                        text: messages::results(&tally),
                    }),
                );
            }
            Ok(None) => {}
            Err(e) => error!("Failed to announce poll {} (id {}): {}", poll.name, poll.id, e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polls::test_support::*;
    use crate::polls::StopRequest;
    use crate::sse::create_event_broadcaster;

    #[tokio::test]
    async fn test_countdown_publishes_results() {
        let h = harness().await;
        let poll = started(&h, "lunch", "alice", &["pizza", "tacos"]).await;
        h.engine.vote(vote_request("lunch", "bob", "pizza")).await.unwrap();

        let events = create_event_broadcaster();
        let mut rx = events.subscribe();
        h.clock.advance(300);
        schedule(h.engine.clone(), poll.clone(), events).await.unwrap();

        let PollEvent::PollEnded(announcement) = rx.recv().await.unwrap() else {
            panic!("expected an end-of-poll announcement");
        };
        assert_eq!(announcement.poll_id, poll.id);
        assert!(announcement.text.contains("Poll `lunch` has ended!"));
        assert!(announcement.text.contains("1. pizza"));
    }

    #[tokio::test]
    async fn test_countdown_after_stop_is_silent() {
        let h = harness().await;
        let poll = started(&h, "lunch", "alice", &["pizza"]).await;
        h.engine
            .stop(StopRequest {
                name: "lunch".into(),
                requester_id: "alice".into(),
                poll_id: None,
            })
            .await
            .unwrap();

        let events = create_event_broadcaster();
        let mut rx = events.subscribe();
        h.clock.advance(300);
        schedule(h.engine.clone(), poll, events).await.unwrap();

        assert!(rx.try_recv().is_err());
    }
}
