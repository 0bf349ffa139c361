use actix_web::web::{Data, Json, Path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar, PgPool};

use crate::context::{MaybeUser, UserInfo};
use crate::error::Error;
use crate::models::option::OptionView;
use crate::models::poll::{Poll, PollDetail, PollView};
use crate::response::Message;
use crate::services::stats;

const MIN_TITLE_LEN: usize = 5;
const MIN_OPTION_LEN: usize = 2;
const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 10;

fn validate_title(title: &str) -> Result<String, Error> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Poll title is required".into()));
    }
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(Error::Validation(format!("Poll title must be at least {} characters", MIN_TITLE_LEN)));
    }
    Ok(title.to_owned())
}

// Blank entries are dropped before the count check, a poll with eight
// options and two blank lines is still a valid eight-option poll.
fn validate_options(options: &[String]) -> Result<Vec<String>, Error> {
    let options: Vec<String> = options.iter().map(|o| o.trim().to_owned()).filter(|o| !o.is_empty()).collect();
    if options.len() < MIN_OPTIONS {
        return Err(Error::Validation(format!("At least {} options are required", MIN_OPTIONS)));
    }
    if options.len() > MAX_OPTIONS {
        return Err(Error::Validation(format!("Maximum {} options allowed", MAX_OPTIONS)));
    }
    for opt in &options {
        if opt.chars().count() < MIN_OPTION_LEN {
            return Err(Error::Validation(format!("Option text must be at least {} characters", MIN_OPTION_LEN)));
        }
    }
    for (i, opt) in options.iter().enumerate() {
        if options[..i].contains(opt) {
            return Err(Error::Validation(format!("Duplicate option: {}", opt)));
        }
    }
    Ok(options)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

const POLL_VIEW_COLUMNS: &str = "
    SELECT
        p.id, p.title, p.description, p.category,
        p.created_at, p.updated_at, p.expires_at,
        COUNT(v.id) AS vote_count, p.is_active, u.username AS created_by
    FROM polls AS p
    JOIN users AS u ON p.creator = u.id
    LEFT JOIN votes AS v ON p.id = v.poll_id";

pub(crate) async fn poll_view(db: &PgPool, poll_id: i32) -> Result<PollView, Error> {
    query_as(&format!("{} WHERE p.id = $1 GROUP BY p.id, u.username", POLL_VIEW_COLUMNS))
        .bind(poll_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound("poll not found".into()))
}

pub(crate) async fn option_views(db: &PgPool, poll_id: i32) -> Result<Vec<OptionView>, Error> {
    let options = query_as(
        "SELECT o.id, o.text, COUNT(v.id) AS vote_count, o.ord, o.created_at
        FROM options AS o
        LEFT JOIN votes AS v ON o.id = v.option_id
        WHERE o.poll_id = $1
        GROUP BY o.id
        ORDER BY o.ord, o.id",
    )
    .bind(poll_id)
    .fetch_all(db)
    .await?;
    Ok(options)
}

pub(crate) async fn poll_with_options(db: &PgPool, poll_id: i32) -> Result<PollDetail, Error> {
    let poll = poll_view(db, poll_id).await?;
    let options = option_views(db, poll_id).await?;
    Ok(PollDetail { poll, options })
}

#[derive(Debug, Serialize)]
pub struct PollsResponse<T> {
    pub success: bool,
    pub polls: Vec<T>,
    pub count: usize,
}

pub async fn list(db: Data<PgPool>) -> Result<Json<PollsResponse<PollView>>, Error> {
    let polls: Vec<PollView> = query_as(&format!("{} GROUP BY p.id, u.username ORDER BY p.created_at DESC", POLL_VIEW_COLUMNS))
        .fetch_all(db.get_ref())
        .await?;
    let count = polls.len();
    Ok(Json(PollsResponse { success: true, polls, count }))
}

pub async fn my_polls(user_info: UserInfo, db: Data<PgPool>) -> Result<Json<PollsResponse<PollDetail>>, Error> {
    let mine: Vec<PollView> = query_as(&format!(
        "{} WHERE p.creator = $1 GROUP BY p.id, u.username ORDER BY p.created_at DESC",
        POLL_VIEW_COLUMNS
    ))
    .bind(user_info.id)
    .fetch_all(db.get_ref())
    .await?;
    let mut polls = Vec::with_capacity(mine.len());
    for poll in mine {
        let options = option_views(db.get_ref(), poll.id).await?;
        polls.push(PollDetail { poll, options });
    }
    let count = polls.len();
    Ok(Json(PollsResponse { success: true, polls, count }))
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub success: bool,
    pub message: String,
    pub poll: PollDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollCreation {
    title: String,
    description: Option<String>,
    category: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    options: Vec<String>,
}

pub async fn create(user_info: UserInfo, Json(body): Json<PollCreation>, db: Data<PgPool>) -> Result<Json<PollResponse>, Error> {
    let title = validate_title(&body.title)?;
    let options = validate_options(&body.options)?;
    let mut tx = db.begin().await?;
    let (poll_id,): (i32,) = query_as(
        "INSERT INTO polls (title, description, category, creator, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id",
    )
    .bind(&title)
    .bind(blank_to_none(body.description))
    .bind(blank_to_none(body.category))
    .bind(user_info.id)
    .bind(body.expires_at)
    .fetch_one(&mut tx)
    .await?;
    for (i, text) in options.iter().enumerate() {
        query("INSERT INTO options (poll_id, text, ord) VALUES ($1, $2, $3)")
            .bind(poll_id)
            .bind(text)
            .bind(i as i32)
            .execute(&mut tx)
            .await?;
    }
    tx.commit().await?;
    log::info!("poll {} created by user {}", poll_id, user_info.id);
    let poll = poll_with_options(db.get_ref(), poll_id).await?;
    Ok(Json(PollResponse {
        success: true,
        message: "Poll created successfully!".into(),
        poll,
    }))
}

#[derive(Debug, Serialize)]
pub struct PollDetailResponse {
    pub success: bool,
    pub poll: PollDetail,
}

pub async fn detail(poll_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<PollDetailResponse>, Error> {
    let poll = poll_with_options(db.get_ref(), poll_id.into_inner().0).await?;
    Ok(Json(PollDetailResponse { success: true, poll }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollUpdate {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    is_active: Option<bool>,
    options: Option<Vec<String>>,
}

pub async fn update(user_info: UserInfo, poll_id: Path<(i32,)>, Json(body): Json<PollUpdate>, db: Data<PgPool>) -> Result<Json<PollResponse>, Error> {
    let poll_id = poll_id.into_inner().0;
    let title = match &body.title {
        Some(t) => Some(validate_title(t)?),
        None => None,
    };
    let options = match &body.options {
        Some(opts) => Some(validate_options(opts)?),
        None => None,
    };
    let mut tx = db.begin().await?;
    let poll: Poll = query_as("SELECT * FROM polls WHERE id = $1 FOR UPDATE")
        .bind(poll_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| Error::NotFound("poll not found".into()))?;
    if !poll.can_edit(user_info.id) {
        return Err(Error::PermissionDenied("only the creator may edit this poll".into()));
    }
    query(
        "UPDATE polls
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            category = COALESCE($3, category),
            expires_at = COALESCE($4, expires_at),
            is_active = COALESCE($5, is_active),
            updated_at = NOW()
        WHERE id = $6",
    )
    .bind(title)
    .bind(blank_to_none(body.description))
    .bind(blank_to_none(body.category))
    .bind(body.expires_at)
    .bind(body.is_active)
    .bind(poll_id)
    .execute(&mut tx)
    .await?;
    if let Some(options) = options {
        // Full replacement. Votes reference the old options and go with them.
        query("DELETE FROM options WHERE poll_id = $1").bind(poll_id).execute(&mut tx).await?;
        for (i, text) in options.iter().enumerate() {
            query("INSERT INTO options (poll_id, text, ord) VALUES ($1, $2, $3)")
                .bind(poll_id)
                .bind(text)
                .bind(i as i32)
                .execute(&mut tx)
                .await?;
        }
    }
    tx.commit().await?;
    let poll = poll_with_options(db.get_ref(), poll_id).await?;
    Ok(Json(PollResponse {
        success: true,
        message: "Poll updated successfully!".into(),
        poll,
    }))
}

pub async fn remove(user_info: UserInfo, poll_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<Message>, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut tx = db.begin().await?;
    let poll: Poll = query_as("SELECT * FROM polls WHERE id = $1 FOR UPDATE")
        .bind(poll_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| Error::NotFound("poll not found".into()))?;
    if !poll.can_delete(user_info.id) {
        return Err(Error::PermissionDenied("only the creator may delete this poll".into()));
    }
    query("DELETE FROM polls WHERE id = $1").bind(poll_id).execute(&mut tx).await?;
    tx.commit().await?;
    log::info!("poll {} deleted by user {}", poll_id, user_info.id);
    Ok(Json(Message::new("Poll deleted successfully!")))
}

pub async fn toggle(user_info: UserInfo, poll_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<Message>, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut tx = db.begin().await?;
    let poll: Poll = query_as("SELECT * FROM polls WHERE id = $1 FOR UPDATE")
        .bind(poll_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| Error::NotFound("poll not found".into()))?;
    if !poll.can_edit(user_info.id) {
        return Err(Error::PermissionDenied("only the creator may toggle this poll".into()));
    }
    let (is_active,): (bool,) = query_as("UPDATE polls SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING is_active")
        .bind(poll_id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    let message = if is_active { "Poll activated" } else { "Poll deactivated" };
    Ok(Json(Message::new(message)))
}

#[derive(Debug, Serialize)]
pub struct OptionResult {
    pub id: i32,
    pub text: String,
    pub vote_count: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ResultsBody {
    pub total_votes: i64,
    pub options: Vec<OptionResult>,
    pub user_vote: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub success: bool,
    pub poll: PollView,
    pub results: ResultsBody,
}

pub async fn results(me: MaybeUser, poll_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<ResultsResponse>, Error> {
    let poll_id = poll_id.into_inner().0;
    let poll = poll_view(db.get_ref(), poll_id).await?;
    let options = option_views(db.get_ref(), poll_id).await?;
    let total_votes: i64 = options.iter().map(|o| o.vote_count).sum();
    let options = options
        .into_iter()
        .map(|o| OptionResult {
            id: o.id,
            text: o.text,
            vote_count: o.vote_count,
            percentage: stats::percentage(o.vote_count, total_votes),
        })
        .collect();
    let user_vote = match me.0 {
        Some(user) => {
            query_scalar("SELECT option_id FROM votes WHERE poll_id = $1 AND user_id = $2")
                .bind(poll_id)
                .bind(user.id)
                .fetch_optional(db.get_ref())
                .await?
        }
        None => None,
    };
    Ok(Json(ResultsResponse {
        success: true,
        poll,
        results: ResultsBody {
            total_votes,
            options,
            user_vote,
        },
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    fn opts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_title_minimum_length() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("Hm?").is_err());
        assert_eq!(validate_title("  Lunch?  ").unwrap(), "Lunch?");
    }

    #[test]
    fn test_option_count_boundaries() {
        assert!(validate_options(&opts(&["Pizza"])).is_err());
        assert!(validate_options(&opts(&["Pizza", "Sushi"])).is_ok());
        let ten: Vec<String> = (0..10).map(|i| format!("option {}", i)).collect();
        assert_eq!(validate_options(&ten).unwrap().len(), 10);
        let eleven: Vec<String> = (0..11).map(|i| format!("option {}", i)).collect();
        assert!(validate_options(&eleven).is_err());
    }

    #[test]
    fn test_blank_options_dropped_before_count() {
        assert!(validate_options(&opts(&["Pizza", "  ", ""])).is_err());
        assert_eq!(validate_options(&opts(&["Pizza", " Sushi ", ""])).unwrap(), opts(&["Pizza", "Sushi"]));
    }

    #[test]
    fn test_duplicate_options_rejected() {
        assert!(validate_options(&opts(&["Pizza", "Pizza"])).is_err());
        assert!(validate_options(&opts(&["Pizza", " Pizza "])).is_err());
    }

    #[test]
    fn test_short_option_text_rejected() {
        assert!(validate_options(&opts(&["Pizza", "x"])).is_err());
    }

    #[test]
    fn test_length_checks_count_characters_not_bytes() {
        // 3 characters but 7 bytes, must still be too short
        assert!(validate_title("日本?").is_err());
        assert!(validate_title("日本語のポール").is_ok());
        assert!(validate_options(&opts(&["日", "か"])).is_err());
        assert!(validate_options(&opts(&["日本", "中国"])).is_ok());
    }

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none(None), None);
        assert_eq!(blank_to_none(Some("  ".into())), None);
        assert_eq!(blank_to_none(Some(" food ".into())), Some("food".into()));
    }
}
