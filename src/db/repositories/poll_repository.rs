use crate::db::connection::DbPool;
use crate::db::filters::{Filters, bind_query, bind_query_as};
use crate::db::models::{NewPoll, Poll, PollStatus, join_choice_list};
use crate::error::StoreError;
use tracing::{debug, info};

const POLL_COLUMNS: &str =
    "id, name, creator_id, question, choice_list, status, created_at, ended_at, announced";

/// Active polls with this name, most recently created first. A non-positive
/// `limit` returns every match.
pub async fn query_active(
    pool: &DbPool,
    name: Option<&str>,
    poll_id: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<Poll>, StoreError> {
    let base = format!("SELECT {POLL_COLUMNS} FROM polls WHERE 1=1");
    let compiled = Filters::new()
        .with("status", PollStatus::Active.as_str())
        .with_opt("name", name)
        .with_opt("id", poll_id)
        .order_by("created_at DESC, id DESC")
        .limit(limit)
        .compile(&base);

    let polls = bind_query_as(sqlx::query_as::<_, Poll>(&compiled.sql), &compiled.params)
        .fetch_all(pool)
        .await?;

    debug!("Retrieved {} active polls with name: {:?}", polls.len(), name);
    Ok(polls)
}

/// The poll with this name that ended most recently, whatever its status.
pub async fn query_latest_by_name(pool: &DbPool, name: &str) -> Result<Option<Poll>, StoreError> {
    let base = format!("SELECT {POLL_COLUMNS} FROM polls WHERE 1=1");
    let compiled = Filters::new()
        .with("name", name)
        .order_by("ended_at DESC, id DESC")
        .limit(Some(1))
        .compile(&base);

    let poll = bind_query_as(sqlx::query_as::<_, Poll>(&compiled.sql), &compiled.params)
        .fetch_optional(pool)
        .await?;

    Ok(poll)
}

pub async fn get_poll(pool: &DbPool, poll_id: i64) -> Result<Option<Poll>, StoreError> {
    let poll = sqlx::query_as::<_, Poll>(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?"))
        .bind(poll_id)
        .fetch_optional(pool)
        .await?;

    Ok(poll)
}

pub async fn insert_poll(pool: &DbPool, new_poll: &NewPoll) -> Result<Poll, StoreError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO polls (name, creator_id, question, choice_list, status, created_at, ended_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new_poll.name)
    .bind(&new_poll.creator_id)
    .bind(&new_poll.question)
    .bind(join_choice_list(&new_poll.options))
    .bind(PollStatus::Active.as_str())
    .bind(new_poll.created_at)
    .bind(new_poll.ended_at)
    .execute(&mut *tx)
    .await;

    let result = match inserted {
        Ok(result) => result,
        Err(err) => {
            tx.rollback().await?;
            return Err(StoreError::from_poll_insert(err));
        }
    };

    let poll = sqlx::query_as::<_, Poll>(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?"))
        .bind(result.last_insert_rowid())
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("Created new poll {} (id {})", poll.name, poll.id);
    Ok(poll)
}

/// Marks the matching still-active polls inactive and returns how many rows
/// changed. `ended_at = None` keeps each row's scheduled end time.
pub async fn deactivate(
    pool: &DbPool,
    name: &str,
    poll_ids: Option<&[i64]>,
    ended_at: Option<i64>,
) -> Result<u64, StoreError> {
    let base = r#"
        UPDATE polls
        SET
            status = 'inactive',
            ended_at = MAX(created_at, COALESCE(?, ended_at))
        WHERE 1=1
        "#;
    let compiled = Filters::new()
        .with("status", PollStatus::Active.as_str())
        .with("name", name)
        .with_opt("id", poll_ids)
        .compile(base);

    let mut tx = pool.begin().await?;
    let query = sqlx::query(&compiled.sql).bind(ended_at);
    let result = bind_query(query, &compiled.params)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let updated = result.rows_affected();
    info!("Deactivated {} polls named {}", updated, name);
    Ok(updated)
}

/// Closes an active, unannounced poll and claims its announcement in one
/// statement. Returns `false` when the poll was already closed or announced.
pub async fn close_and_claim(
    pool: &DbPool,
    poll_id: i64,
    ended_at: i64,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE polls
        SET
            status = 'inactive',
            ended_at = MAX(created_at, ?),
            announced = 1
        WHERE id = ? AND status = 'active' AND announced = 0
        "#,
    )
    .bind(ended_at)
    .bind(poll_id)
    .execute(pool)
    .await?;

    let claimed = result.rows_affected() == 1;
    info!("Close of poll {} claimed: {}", poll_id, claimed);
    Ok(claimed)
}

/// Claims the one-time announcement for a poll. Only the first caller gets
/// `true`.
pub async fn mark_announced(pool: &DbPool, poll_id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("UPDATE polls SET announced = 1 WHERE id = ? AND announced = 0")
        .bind(poll_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
