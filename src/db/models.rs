use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PollStatus {
    Active,
    Inactive,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Active => "active",
            PollStatus::Inactive => "inactive",
        }
    }
}

/// A snapshot of one `polls` row. The option list is persisted comma-joined
/// and split back into labels here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: i64,
    pub name: String,
    pub creator_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub status: PollStatus,
    pub created_at: i64,
    pub ended_at: i64,
    pub announced: bool,
}

impl Poll {
    pub fn is_active(&self) -> bool {
        self.status == PollStatus::Active
    }

    /// Active in the store but already past its scheduled end.
    pub fn is_zombie(&self, now: i64) -> bool {
        self.is_active() && self.ended_at <= now
    }

    /// Column width used when rendering results: longest label plus four.
    pub fn column_width(&self) -> usize {
        self.options
            .iter()
            .map(|o| o.chars().count())
            .max()
            .unwrap_or(0)
            + 4
    }
}

impl<'r> FromRow<'r, SqliteRow> for Poll {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let choice_list: String = row.try_get("choice_list")?;
        Ok(Poll {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            creator_id: row.try_get("creator_id")?,
            question: row.try_get("question")?,
            options: split_choice_list(&choice_list),
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            ended_at: row.try_get("ended_at")?,
            announced: row.try_get("announced")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub name: String,
    pub creator_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub created_at: i64,
    pub ended_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub poll_id: i64,
    pub member_id: String,
    pub vote_answer: String,
    pub voted_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub poll_id: i64,
    pub member_id: String,
    pub vote_answer: String,
    pub voted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AnswerCount {
    pub vote_answer: String,
    pub vote_count: i64,
}

pub fn join_choice_list(options: &[String]) -> String {
    options.join(",")
}

pub fn split_choice_list(choice_list: &str) -> Vec<String> {
    if choice_list.is_empty() {
        return Vec::new();
    }
    choice_list.split(',').map(str::to_string).collect()
}
