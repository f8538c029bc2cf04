use super::PollEngine;
use crate::db::{self, AnswerCount, Poll};
use crate::error::PollError;
use serde::Serialize;
use std::fmt::Write;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyRow {
    /// Dense rank: tied counts share a rank and the next count is one lower.
    pub rank: u32,
    pub answer: String,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tally {
    pub poll: Poll,
    pub rows: Vec<TallyRow>,
    /// Labels of every rank-1 row, in row order.
    pub winners: Vec<String>,
}

impl Tally {
    pub fn new(poll: Poll, rows: Vec<TallyRow>) -> Self {
        let winners = rows
            .iter()
            .filter(|row| row.rank == 1)
            .map(|row| row.answer.clone())
            .collect();
        Tally {
            poll,
            rows,
            winners,
        }
    }

    fn winning_rows(&self) -> impl Iterator<Item = &TallyRow> {
        self.rows.iter().filter(|row| row.rank == 1)
    }

    pub fn total_votes(&self) -> i64 {
        self.rows.iter().map(|row| row.votes).sum()
    }

    /// One `rank. label count` line per row, padded to `width`, followed by
    /// the winner announcement.
    pub fn render(&self, width: usize) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let _ = writeln!(out, "{}. {:<width$} {}", row.rank, row.answer, row.votes);
        }

        let plural = if self.winners.len() > 1 { "s" } else { "" };
        let votes = self.winning_rows().next().map(|w| w.votes).unwrap_or(0);
        let _ = writeln!(
            out,
            "\nCongratulations to the winner{plural} with {votes} total votes:"
        );
        out.push_str(&self.winners.join(", "));
        out
    }
}

/// Orders vote counts by descending count and assigns dense ranks. Ties keep
/// the poll's option order. With no votes at all every option is a joint
/// winner at zero.
pub fn rank_counts(options: &[String], counts: Vec<AnswerCount>) -> Vec<TallyRow> {
    if counts.is_empty() {
        return options
            .iter()
            .map(|option| TallyRow {
                rank: 1,
                answer: option.clone(),
                votes: 0,
            })
            .collect();
    }

    let position = |answer: &str| {
        options
            .iter()
            .position(|o| o == answer)
            .unwrap_or(options.len())
    };

    let mut counts = counts;
    counts.sort_by(|a, b| {
        b.vote_count
            .cmp(&a.vote_count)
            .then_with(|| position(&a.vote_answer).cmp(&position(&b.vote_answer)))
            .then_with(|| a.vote_answer.cmp(&b.vote_answer))
    });

    let mut rows = Vec::with_capacity(counts.len());
    let mut rank = 0;
    let mut previous = None;
    for count in counts {
        if previous != Some(count.vote_count) {
            rank += 1;
            previous = Some(count.vote_count);
        }
        rows.push(TallyRow {
            rank,
            answer: count.vote_answer,
            votes: count.vote_count,
        });
    }
    rows
}

impl PollEngine {
    /// Results for `poll_id`, or for the most recently ended poll named
    /// `name` when no id is given.
    pub async fn tally(&self, name: &str, poll_id: Option<i64>) -> Result<Tally, PollError> {
        let poll = match poll_id {
            Some(id) => db::get_poll(self.db(), id)
                .await?
                .filter(|p| p.name == name),
            None => db::query_latest_by_name(self.db(), name).await?,
        }
        .ok_or(PollError::PollNotFound)?;

        let counts = db::count_votes(self.db(), poll.id).await?;
        if counts.is_empty() {
            info!("Poll {} has no votes", poll.name);
        }
        let rows = rank_counts(&poll.options, counts);

        Ok(Tally::new(poll, rows))
    }
}
