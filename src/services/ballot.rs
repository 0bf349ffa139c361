use sqlx::{query_as, query_scalar, Postgres, Transaction};

use crate::error::Error;
use crate::models::poll::Poll;
use crate::models::vote::VoteOutcome;

/// Records one ballot for (poll, voter). Re-voting moves the existing ballot
/// to the new option and keeps its original timestamp; the upsert against
/// UNIQUE (poll_id, user_id) guarantees exactly one row per voter even when
/// two requests race.
pub async fn cast_vote(tx: &mut Transaction<'_, Postgres>, poll_id: i32, user_id: i32, option_id: i32) -> Result<VoteOutcome, Error> {
    let poll: Poll = query_as("SELECT * FROM polls WHERE id = $1")
        .bind(poll_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("poll not found".into()))?;
    if !poll.is_active {
        return Err(Error::PollInactive);
    }
    if poll.is_expired() {
        return Err(Error::PollExpired);
    }
    let belongs: bool = query_scalar("SELECT EXISTS(SELECT id FROM options WHERE id = $1 AND poll_id = $2)")
        .bind(option_id)
        .bind(poll_id)
        .fetch_one(&mut *tx)
        .await?;
    if !belongs {
        return Err(Error::OptionNotInPoll);
    }
    // xmax = 0 only on freshly inserted rows, so it distinguishes a first
    // vote from an overwrite without a second query.
    let (inserted,): (bool,) = query_as(
        "INSERT INTO votes (poll_id, option_id, user_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (poll_id, user_id) DO UPDATE SET option_id = EXCLUDED.option_id
        RETURNING (xmax = 0) AS inserted",
    )
    .bind(poll_id)
    .bind(option_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;
    if inserted {
        Ok(VoteOutcome::Created)
    } else {
        Ok(VoteOutcome::Updated)
    }
}
