use super::{PollEngine, Tally, parse_duration};
use crate::db::{self, NewPoll, Poll};
use crate::error::{PollError, StoreError};
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct StartRequest {
    pub name: String,
    pub question: String,
    pub options: Vec<String>,
    pub creator_id: String,
    /// Duration text such as `"5m"`; `None` or unparseable means five minutes.
    pub duration: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StartOutcome {
    Created(Poll),
    /// A poll with this name was already active. Nothing was created; any
    /// overdue rows found along the way were closed.
    AlreadyActive { live: Vec<Poll>, swept: Vec<Poll> },
}

#[derive(Debug, Clone)]
pub struct StopRequest {
    pub name: String,
    pub requester_id: String,
    pub poll_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct StopOutcome {
    pub poll: Poll,
    pub tally: Tally,
}

impl StartRequest {
    fn validate(&self) -> Result<(), PollError> {
        if self.name.trim().is_empty() {
            return Err(PollError::Validation("a poll name is required".into()));
        }
        if self.question.trim().is_empty() {
            return Err(PollError::Validation("a question is required".into()));
        }
        if self.options.is_empty() {
            return Err(PollError::Validation("at least one option is required".into()));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if option.trim().is_empty() {
                return Err(PollError::Validation("options cannot be empty".into()));
            }
            if option.contains(',') {
                return Err(PollError::Validation(format!(
                    "option {option:?} cannot contain a comma"
                )));
            }
            if !seen.insert(option.as_str()) {
                return Err(PollError::Validation(format!(
                    "option {option:?} is listed twice"
                )));
            }
        }
        Ok(())
    }
}

impl PollEngine {
    /// Creates a poll unless one with the same name is still active.
    pub async fn start(&self, request: StartRequest) -> Result<StartOutcome, PollError> {
        request.validate()?;

        let now = self.now();
        let existing = db::query_active(self.db(), Some(request.name.as_str()), None, None).await?;

        if !existing.is_empty() {
            let sweep = self.sweep(existing, now).await?;
            info!(
                "Poll {} already active ({} running, {} closed as overdue)",
                request.name,
                sweep.live.len(),
                sweep.swept.len()
            );
            return Ok(StartOutcome::AlreadyActive {
                live: sweep.live,
                swept: sweep.swept,
            });
        }

        let duration = parse_duration(request.duration.as_deref());
        let ended_at = now.saturating_add(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX));

        let inserted = db::insert_poll(
            self.db(),
            &NewPoll {
                name: request.name.clone(),
                creator_id: request.creator_id,
                question: request.question,
                options: request.options,
                created_at: now,
                ended_at,
            },
        )
        .await;

        let poll = match inserted {
            Ok(poll) => poll,
            Err(StoreError::NameInUse) => {
                info!("Poll {} was started concurrently", request.name);
                let live =
                    db::query_active(self.db(), Some(request.name.as_str()), None, None).await?;
                return Ok(StartOutcome::AlreadyActive {
                    live,
                    swept: Vec::new(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!("Started poll {} (id {}) closing at {}", poll.name, poll.id, poll.ended_at);
        Ok(StartOutcome::Created(poll))
    }

    /// Ends a poll early. Only its creator may do this.
    pub async fn stop(&self, request: StopRequest) -> Result<StopOutcome, PollError> {
        let now = self.now();
        let active =
            db::query_active(self.db(), Some(request.name.as_str()), request.poll_id, None).await?;
        let sweep = self.sweep(active, now).await?;

        if sweep.live.is_empty() {
            info!("No active poll named {} to stop", request.name);
            return Err(PollError::NoActivePoll);
        }

        let Some(poll) = sweep
            .live
            .into_iter()
            .find(|p| p.creator_id == request.requester_id)
        else {
            warn!(
                "User {} is not the creator of active poll {}",
                request.requester_id, request.name
            );
            return Err(PollError::PermissionDenied);
        };

        if !db::close_and_claim(self.db(), poll.id, now).await? {
            info!("Poll {} (id {}) was closed before the stop landed", poll.name, poll.id);
            return Err(PollError::NoActivePoll);
        }

        let tally = self.tally(&poll.name, Some(poll.id)).await?;
        info!("Stopped poll {} (id {})", poll.name, poll.id);

        Ok(StopOutcome {
            poll: tally.poll.clone(),
            tally,
        })
    }

    /// Closes a poll whose time is up and returns its results, unless the
    /// results were already announced (for example by an explicit stop).
    pub async fn announce_due(&self, poll_id: i64) -> Result<Option<Tally>, PollError> {
        let now = self.now();
        let Some(poll) = db::get_poll(self.db(), poll_id).await? else {
            warn!("Poll {} vanished before its announcement", poll_id);
            return Ok(None);
        };

        if poll.is_active() && poll.ended_at > now {
            warn!("Poll {} is not due until {}", poll.id, poll.ended_at);
            return Ok(None);
        }

        db::deactivate(self.db(), &poll.name, Some(&[poll.id][..]), None).await?;
        if !db::mark_announced(self.db(), poll.id).await? {
            info!("Results for poll {} were already announced", poll.id);
            return Ok(None);
        }

        Ok(Some(self.tally(&poll.name, Some(poll.id)).await?))
    }
}
