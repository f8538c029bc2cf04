use crate::db::connection::DbPool;
use crate::db::filters::{Filters, bind_query_as};
use crate::db::models::{AnswerCount, NewVote, Vote};
use crate::error::StoreError;

/// Records a vote. The `(poll_id, member_id)` constraint is the only guard
/// against double voting; there is no prior existence check.
pub async fn insert_vote(pool: &DbPool, new_vote: &NewVote) -> Result<Vote, StoreError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO votes (poll_id, member_id, vote_answer, voted_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(new_vote.poll_id)
    .bind(&new_vote.member_id)
    .bind(&new_vote.vote_answer)
    .bind(new_vote.voted_at)
    .execute(&mut *tx)
    .await;

    if let Err(err) = inserted {
        tx.rollback().await?;
        return Err(StoreError::from_insert(err));
    }

    tx.commit().await?;

    Ok(Vote {
        poll_id: new_vote.poll_id,
        member_id: new_vote.member_id.clone(),
        vote_answer: new_vote.vote_answer.clone(),
        voted_at: new_vote.voted_at,
    })
}

/// Vote counts per answer for one poll, in no particular order.
pub async fn count_votes(pool: &DbPool, poll_id: i64) -> Result<Vec<AnswerCount>, StoreError> {
    let compiled = Filters::new().with("poll_id", poll_id).compile(
        r#"
        SELECT vote_answer, COUNT(*) AS vote_count
        FROM votes
        WHERE 1=1
        "#,
    );
    let sql = format!("{}\nGROUP BY vote_answer", compiled.sql);

    let rows = bind_query_as(sqlx::query_as::<_, AnswerCount>(&sql), &compiled.params)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn list_votes(pool: &DbPool, poll_id: i64) -> Result<Vec<Vote>, StoreError> {
    let rows = sqlx::query_as::<_, Vote>(
        "SELECT poll_id, member_id, vote_answer, voted_at FROM votes WHERE poll_id = ? ORDER BY voted_at, rowid",
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
