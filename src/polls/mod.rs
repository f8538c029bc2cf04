//! Poll lifecycle, vote admission and tallying.
//!
//! Every operation re-reads the store; nothing about a poll is cached between
//! calls. Expired polls that are still marked active ("zombies") are closed
//! as a side effect of whichever read finds them first.

pub mod admission;
pub mod countdown;
pub mod duration;
pub mod lifecycle;
pub mod tally;

pub use admission::{VoteReceipt, VoteRequest};
pub use duration::{DEFAULT_POLL_DURATION, parse_duration};
pub use lifecycle::{StartOutcome, StartRequest, StopOutcome, StopRequest};
pub use tally::{Tally, TallyRow, rank_counts};

use crate::clock::SharedClock;
use crate::db::{self, DbPool, Poll};
use crate::error::PollError;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Clone)]
pub struct PollEngine {
    db: DbPool,
    clock: SharedClock,
}

/// Result of closing the overdue rows in a batch of active polls.
#[derive(Debug, Default)]
pub(crate) struct Sweep {
    pub live: Vec<Poll>,
    pub swept: Vec<Poll>,
}

impl PollEngine {
    pub fn new(db: DbPool, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Deactivates the polls whose `ended_at` has passed, keeping their
    /// scheduled end time, and hands back the ones still running.
    pub(crate) async fn sweep(&self, polls: Vec<Poll>, now: i64) -> Result<Sweep, PollError> {
        let (swept, live): (Vec<Poll>, Vec<Poll>) =
            polls.into_iter().partition(|p| p.is_zombie(now));

        let mut by_name: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
        for poll in &swept {
            by_name.entry(poll.name.as_str()).or_default().push(poll.id);
        }
        for (name, ids) in &by_name {
            info!("Closing overdue polls {:?} named {}", ids, name);
            db::deactivate(&self.db, name, Some(ids.as_slice()), None).await?;
        }

        Ok(Sweep { live, swept })
    }

    /// Active polls, optionally narrowed to a name and id, after closing
    /// overdue ones.
    pub async fn list(&self, name: Option<&str>, poll_id: Option<i64>) -> Result<Vec<Poll>, PollError> {
        let now = self.now();
        let active = db::query_active(&self.db, name, poll_id, None).await?;
        Ok(self.sweep(active, now).await?.live)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    pub const T0: i64 = 1_700_000_000;

    pub struct Harness {
        pub engine: PollEngine,
        pub clock: Arc<ManualClock>,
        _dir: tempfile::TempDir,
    }

    pub async fn harness() -> Harness {
        let (dir, pool) = crate::db::connection::test_pool().await;
        let clock = Arc::new(ManualClock::starting_at(T0));
        Harness {
            engine: PollEngine::new(pool, clock.clone()),
            clock,
            _dir: dir,
        }
    }

    pub fn start_request(name: &str, creator: &str, options: &[&str]) -> StartRequest {
        StartRequest {
            name: name.to_string(),
            question: "What should we pick?".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            creator_id: creator.to_string(),
            duration: Some("5m".to_string()),
        }
    }

    pub fn vote_request(name: &str, voter: &str, choice: &str) -> VoteRequest {
        VoteRequest {
            name: name.to_string(),
            choice: choice.to_string(),
            voter_id: voter.to_string(),
            poll_id: None,
        }
    }

    pub async fn started(h: &Harness, name: &str, creator: &str, options: &[&str]) -> Poll {
        match h
            .engine
            .start(start_request(name, creator, options))
            .await
            .unwrap()
        {
            StartOutcome::Created(poll) => poll,
            other => panic!("expected a new poll, got {other:?}"),
        }
    }
}
