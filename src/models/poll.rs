use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::option::OptionView;

#[derive(Debug, Clone, FromRow)]
pub struct Poll {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub creator: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Poll {
    // Expiry is derived, never stored. A poll takes votes only when it is
    // both active and unexpired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }

    pub fn can_edit(&self, user_id: i32) -> bool {
        self.creator == user_id
    }

    pub fn can_delete(&self, user_id: i32) -> bool {
        self.creator == user_id
    }
}

// The JSON shape every poll-returning endpoint serves. `created_by` carries
// the creator's username, not the id.
#[derive(Debug, Serialize, FromRow)]
pub struct PollView {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub vote_count: i64,
    pub is_active: bool,
    pub created_by: String,
}

#[derive(Debug, Serialize)]
pub struct PollDetail {
    #[serde(flatten)]
    pub poll: PollView,
    pub options: Vec<OptionView>,
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    fn poll(expires_at: Option<DateTime<Utc>>) -> Poll {
        Poll {
            id: 1,
            title: "Lunch?".into(),
            description: None,
            category: None,
            creator: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at,
            is_active: true,
        }
    }

    #[test]
    fn test_no_expiry_never_expires() {
        assert!(!poll(None).is_expired());
    }

    #[test]
    fn test_future_expiry_not_expired() {
        assert!(!poll(Some(Utc::now() + Duration::hours(1))).is_expired());
    }

    #[test]
    fn test_past_expiry_expired() {
        assert!(poll(Some(Utc::now() - Duration::hours(1))).is_expired());
    }

    #[test]
    fn test_only_creator_may_edit_or_delete() {
        let p = poll(None);
        assert!(p.can_edit(7));
        assert!(p.can_delete(7));
        assert!(!p.can_edit(8));
        assert!(!p.can_delete(8));
    }
}
