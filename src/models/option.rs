use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

// Options are served in (ord, id) order; ord is the explicit display order
// assigned at creation.
#[derive(Debug, Serialize, FromRow)]
pub struct OptionView {
    pub id: i32,
    pub text: String,
    pub vote_count: i64,
    pub ord: i32,
    pub created_at: DateTime<Utc>,
}
