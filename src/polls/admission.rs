use super::PollEngine;
use crate::db::{self, NewVote, Poll, Vote};
use crate::error::PollError;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct VoteRequest {
    pub name: String,
    /// Either a 1-based option number or an exact option label.
    pub choice: String,
    pub voter_id: String,
    pub poll_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct VoteReceipt {
    pub poll: Poll,
    pub vote: Vote,
}

/// Maps a raw vote onto an option label. Numeric input always means a
/// position in `options`; a position outside the list yields `None`.
pub fn resolve_choice(options: &[String], raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        return raw
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| options.get(idx))
            .cloned();
    }
    options.iter().find(|o| o.as_str() == raw).cloned()
}

impl PollEngine {
    pub async fn vote(&self, request: VoteRequest) -> Result<VoteReceipt, PollError> {
        let now = self.now();
        let active =
            db::query_active(self.db(), Some(request.name.as_str()), request.poll_id, None).await?;

        let sweep = self.sweep(active, now).await?;
        let Some(target) = sweep
            .live
            .into_iter()
            .min_by_key(|p| (p.ended_at, p.id))
        else {
            info!("No active poll named {} to vote on", request.name);
            return Err(PollError::NoActivePoll);
        };

        let Some(answer) = resolve_choice(&target.options, &request.choice) else {
            warn!(
                "Rejected vote {:?} from {} on poll {}",
                request.choice, request.voter_id, request.name
            );
            return Err(PollError::InvalidOption {
                choice: request.choice,
                allowed: target.options,
            });
        };

        let vote = db::insert_vote(
            self.db(),
            &NewVote {
                poll_id: target.id,
                member_id: request.voter_id,
                vote_answer: answer,
                voted_at: now,
            },
        )
        .await
        .inspect_err(|err| warn!("Vote on poll {} not recorded: {}", target.id, err))?;

        info!(
            "User {} voted for {} in poll {} (id {})",
            vote.member_id, vote.vote_answer, target.name, target.id
        );
        Ok(VoteReceipt { poll: target, vote })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PollStatus;
    use crate::polls::test_support::*;
    use crate::polls::{StartOutcome, StartRequest};

    fn labels(options: &[&str]) -> Vec<String> {
        options.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn test_resolve_numeric_and_label_choices() {
        let options = labels(&["red", "blue", "green"]);
        assert_eq!(resolve_choice(&options, "2").as_deref(), Some("blue"));
        assert_eq!(resolve_choice(&options, "green").as_deref(), Some("green"));
        assert_eq!(resolve_choice(&options, " 1 ").as_deref(), Some("red"));
        assert_eq!(resolve_choice(&options, "0"), None);
        assert_eq!(resolve_choice(&options, "4"), None);
        assert_eq!(resolve_choice(&options, "99999999999999999999999"), None);
        assert_eq!(resolve_choice(&options, "purple"), None);
        assert_eq!(resolve_choice(&options, "Red"), None);
    }

    #[tokio::test]
    async fn test_numeric_vote_is_recorded_as_label() {
        let h = harness().await;
        let poll = started(&h, "colors", "alice", &["red", "blue", "green"]).await;

        let receipt = h.engine.vote(vote_request("colors", "bob", "2")).await.unwrap();
        assert_eq!(receipt.poll.id, poll.id);
        assert_eq!(receipt.vote.vote_answer, "blue");
        assert_eq!(receipt.vote.voted_at, T0);
        assert_eq!(receipt.poll.ended_at, poll.ended_at);
    }

    #[tokio::test]
    async fn test_duplicate_vote_rejected() {
        let h = harness().await;
        let poll = started(&h, "colors", "alice", &["red", "blue"]).await;

        h.engine.vote(vote_request("colors", "bob", "red")).await.unwrap();
        let err = h
            .engine
            .vote(vote_request("colors", "bob", "blue"))
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::DuplicateVote));

        let votes = db::list_votes(h.engine.db(), poll.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].vote_answer, "red");
    }

    #[tokio::test]
    async fn test_simultaneous_votes_from_one_user() {
        let h = harness().await;
        let poll = started(&h, "colors", "alice", &["red", "blue"]).await;

        let (a, b) = tokio::join!(
            h.engine.vote(vote_request("colors", "bob", "red")),
            h.engine.vote(vote_request("colors", "bob", "blue")),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(PollError::DuplicateVote)))
        );
        assert_eq!(db::list_votes(h.engine.db(), poll.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_option_lists_allowed_set() {
        let h = harness().await;
        started(&h, "colors", "alice", &["red", "blue"]).await;

        for choice in ["purple", "3", "0"] {
            match h.engine.vote(vote_request("colors", "bob", choice)).await {
                Err(PollError::InvalidOption { choice: c, allowed }) => {
                    assert_eq!(c, choice);
                    assert_eq!(allowed, labels(&["red", "blue"]));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_vote_without_active_poll() {
        let h = harness().await;
        let err = h
            .engine
            .vote(vote_request("nothing", "bob", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::NoActivePoll));
    }

    #[tokio::test]
    async fn test_vote_on_expired_poll_sweeps_it() {
        let h = harness().await;
        let poll = started(&h, "colors", "alice", &["red"]).await;

        h.clock.advance(300);
        let err = h
            .engine
            .vote(vote_request("colors", "bob", "red"))
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::NoActivePoll));

        let stored = db::get_poll(h.engine.db(), poll.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PollStatus::Inactive);
        assert!(db::list_votes(h.engine.db(), poll.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_choice_resolves_against_live_poll_options() {
        let h = harness().await;
        let old = started(&h, "colors", "alice", &["x", "y"]).await;
        h.clock.advance(300);

        let current = StartRequest {
            duration: Some("15m".into()),
            ..start_request("colors", "carol", &["red", "blue"])
        };
        // The first attempt only closes the overdue poll.
        assert!(matches!(
            h.engine.start(current.clone()).await.unwrap(),
            StartOutcome::AlreadyActive { .. }
        ));
        let StartOutcome::Created(live) = h.engine.start(current).await.unwrap() else {
            panic!("expected a new poll");
        };

        match h.engine.vote(vote_request("colors", "bob", "x")).await {
            Err(PollError::InvalidOption { allowed, .. }) => {
                assert_eq!(allowed, labels(&["red", "blue"]));
            }
            other => panic!("unexpected {other:?}"),
        }

        let receipt = h.engine.vote(vote_request("colors", "bob", "1")).await.unwrap();
        assert_eq!(receipt.poll.id, live.id);
        assert_eq!(receipt.vote.vote_answer, "red");
        assert!(db::list_votes(h.engine.db(), old.id).await.unwrap().is_empty());
    }
}
