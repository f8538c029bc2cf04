use serde::Serialize;

/// A ready-to-post chat message about one poll.
#[derive(Debug, Clone, Serialize)]
pub struct Announcement {
    pub poll_id: i64,
    pub poll_name: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub enum PollEvent {
    PollStarted(Announcement),
    PollEnded(Announcement),
}

impl PollEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PollEvent::PollStarted(_) => "poll_started",
            PollEvent::PollEnded(_) => "poll_ended",
        }
    }

    pub fn announcement(&self) -> &Announcement {
        match self {
            PollEvent::PollStarted(a) | PollEvent::PollEnded(a) => a,
        }
    }
}

pub type EventSender = tokio::sync::broadcast::Sender<PollEvent>;
