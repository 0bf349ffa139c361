use actix_web::web::{Data, Json, Query};
use serde::Serialize;
use sqlx::PgPool;

use crate::context::MaybeUser;
use crate::error::Error;
use crate::request::TopPollsParams;
use crate::services::stats;
use crate::services::stats::{CategoryCount, Dashboard, TopPoll};

const DEFAULT_TOP_LIMIT: i64 = 10;
const MAX_TOP_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub success: bool,
    pub total_polls: i64,
    pub total_votes: i64,
    pub avg_participation: i64,
    pub active_polls_count: i64,
}

impl From<Dashboard> for DashboardResponse {
    fn from(d: Dashboard) -> Self {
        DashboardResponse {
            success: true,
            total_polls: d.total_polls,
            total_votes: d.total_votes,
            avg_participation: d.avg_participation,
            active_polls_count: d.active_polls,
        }
    }
}

// Anonymous callers get an all-zero dashboard rather than a 401, the page
// renders either way.
pub async fn dashboard(me: MaybeUser, db: Data<PgPool>) -> Result<Json<DashboardResponse>, Error> {
    let dashboard = match me.0 {
        Some(user) => stats::user_dashboard(db.get_ref(), user.id).await?,
        None => Dashboard::empty(),
    };
    Ok(Json(dashboard.into()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResponse {
    pub completion_rate: f64,
    pub avg_votes_per_poll: f64,
    pub engagement_rate: f64,
    pub category_distribution: Vec<CategoryCount>,
}

impl From<stats::SystemStatistics> for DetailedResponse {
    fn from(s: stats::SystemStatistics) -> Self {
        DetailedResponse {
            completion_rate: s.completion_rate,
            avg_votes_per_poll: s.avg_votes_per_poll,
            engagement_rate: s.engagement_rate,
            category_distribution: s.category_distribution,
        }
    }
}

pub async fn detailed(db: Data<PgPool>) -> Result<Json<DetailedResponse>, Error> {
    let s = stats::system_statistics(db.get_ref()).await?;
    Ok(Json(s.into()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPollsResponse {
    pub top_polls: Vec<TopPoll>,
}

pub async fn top_polls(Query(TopPollsParams { limit }): Query<TopPollsParams>, db: Data<PgPool>) -> Result<Json<TopPollsResponse>, Error> {
    let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT);
    let top_polls = stats::top_polls(db.get_ref(), limit).await?;
    Ok(Json(TopPollsResponse { top_polls }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::services::stats::SystemStatistics;

    #[test]
    fn test_detailed_response_serves_exactly_the_contract_fields() {
        let resp = DetailedResponse::from(SystemStatistics {
            total_polls: 2,
            total_votes: 3,
            active_polls: 1,
            completion_rate: 50.0,
            avg_votes_per_poll: 1.5,
            engagement_rate: 100.0,
            category_distribution: vec![],
        });
        let value = serde_json::to_value(&resp).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        for key in ["completionRate", "avgVotesPerPoll", "engagementRate", "categoryDistribution"] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
    }
}
