use serde::Serialize;
use sqlx::{query_as, query_scalar, FromRow, PgPool};

use crate::error::Error;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Per-option share of the poll total, one decimal place. 0 when nobody has
/// voted yet.
pub fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round_to(count as f64 / total as f64 * 100.0, 1)
}

/// part/whole as a percentage, two decimal places. 0 when whole is 0.
pub fn rate(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 2)
}

pub fn average(total: i64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    round_to(total as f64 / count as f64, 2)
}

/// Dashboard participation gauge: votes per poll scaled by 10, clamped to
/// 100.
pub fn participation_gauge(votes: i64, polls: i64) -> i64 {
    if polls <= 0 || votes <= 0 {
        return 0;
    }
    (votes as f64 / polls as f64 * 10.0).round().min(100.0) as i64
}

#[derive(Debug, Serialize, FromRow)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct SystemStatistics {
    pub total_polls: i64,
    pub total_votes: i64,
    pub active_polls: i64,
    pub completion_rate: f64,
    pub avg_votes_per_poll: f64,
    pub engagement_rate: f64,
    pub category_distribution: Vec<CategoryCount>,
}

// Recomputed on every call; a vote committed before this runs is always
// reflected in the output.
pub async fn system_statistics(db: &PgPool) -> Result<SystemStatistics, Error> {
    let total_polls: i64 = query_scalar("SELECT COUNT(*) FROM polls").fetch_one(db).await?;
    let total_votes: i64 = query_scalar("SELECT COUNT(*) FROM votes").fetch_one(db).await?;
    let active_polls: i64 = query_scalar("SELECT COUNT(*) FROM polls WHERE is_active").fetch_one(db).await?;
    let polls_with_votes: i64 = query_scalar("SELECT COUNT(DISTINCT poll_id) FROM votes").fetch_one(db).await?;
    let total_users: i64 = query_scalar("SELECT COUNT(*) FROM users").fetch_one(db).await?;
    let voting_users: i64 = query_scalar("SELECT COUNT(DISTINCT user_id) FROM votes").fetch_one(db).await?;
    let category_distribution: Vec<CategoryCount> = query_as(
        "SELECT COALESCE(NULLIF(category, ''), 'Uncategorized') AS name, COUNT(*) AS count
        FROM polls
        GROUP BY name
        ORDER BY count DESC, name",
    )
    .fetch_all(db)
    .await?;
    Ok(SystemStatistics {
        total_polls,
        total_votes,
        active_polls,
        completion_rate: rate(polls_with_votes, total_polls),
        avg_votes_per_poll: average(total_votes, total_polls),
        engagement_rate: rate(voting_users, total_users),
        category_distribution,
    })
}

#[derive(Debug, Serialize)]
pub struct TopPoll {
    pub id: i32,
    pub title: String,
    pub vote_count: i64,
    pub participation_rate: f64,
}

// Ties broken by poll id ascending so the ranking is deterministic.
pub async fn top_polls(db: &PgPool, limit: i64) -> Result<Vec<TopPoll>, Error> {
    let total_users: i64 = query_scalar("SELECT COUNT(*) FROM users").fetch_one(db).await?;
    let rows: Vec<(i32, String, i64)> = query_as(
        "SELECT p.id, p.title, COUNT(v.id) AS vote_count
        FROM polls AS p
        JOIN votes AS v ON p.id = v.poll_id
        GROUP BY p.id
        ORDER BY vote_count DESC, p.id ASC
        LIMIT $1",
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, title, vote_count)| TopPoll {
            id,
            title,
            vote_count,
            participation_rate: rate(vote_count, total_users),
        })
        .collect())
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_polls: i64,
    pub total_votes: i64,
    pub active_polls: i64,
    pub avg_participation: i64,
}

impl Dashboard {
    pub fn empty() -> Self {
        Dashboard {
            total_polls: 0,
            total_votes: 0,
            active_polls: 0,
            avg_participation: 0,
        }
    }
}

/// Stats over the caller's own polls: how many they created, how many are
/// taking votes, and how many ballots those polls collected.
pub async fn user_dashboard(db: &PgPool, user_id: i32) -> Result<Dashboard, Error> {
    let total_polls: i64 = query_scalar("SELECT COUNT(*) FROM polls WHERE creator = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    let active_polls: i64 = query_scalar("SELECT COUNT(*) FROM polls WHERE creator = $1 AND is_active")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    let total_votes: i64 = query_scalar(
        "SELECT COUNT(*)
        FROM votes AS v
        JOIN polls AS p ON v.poll_id = p.id
        WHERE p.creator = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(Dashboard {
        total_polls,
        total_votes,
        active_polls,
        avg_participation: participation_gauge(total_votes, total_polls),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_percentage_guards_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(1, 1), 100.0);
        assert_eq!(percentage(0, 7), 0.0);
    }

    #[test]
    fn test_rate_rounds_to_two_decimals() {
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(2, 3), 66.67);
        assert_eq!(rate(0, 10), 0.0);
        assert_eq!(rate(3, 0), 0.0);
    }

    #[test]
    fn test_average_guards_zero_count() {
        assert_eq!(average(10, 0), 0.0);
        assert_eq!(average(10, 4), 2.5);
        assert_eq!(average(1, 3), 0.33);
    }

    #[test]
    fn test_participation_gauge_clamps_at_hundred() {
        assert_eq!(participation_gauge(0, 0), 0);
        assert_eq!(participation_gauge(0, 5), 0);
        assert_eq!(participation_gauge(5, 0), 0);
        assert_eq!(participation_gauge(3, 1), 30);
        assert_eq!(participation_gauge(1000, 1), 100);
    }
}
