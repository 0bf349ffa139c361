use actix_web::web::{Data, Json, Path};
use serde::Deserialize;
use sqlx::PgPool;

use crate::context::UserInfo;
use crate::error::Error;
use crate::handlers::poll::{poll_with_options, PollResponse};
use crate::services::ballot;

#[derive(Debug, Clone, Deserialize)]
pub struct Ballot {
    option_id: Option<i32>,
}

pub async fn cast(user_info: UserInfo, poll_id: Path<(i32,)>, Json(Ballot { option_id }): Json<Ballot>, db: Data<PgPool>) -> Result<Json<PollResponse>, Error> {
    let poll_id = poll_id.into_inner().0;
    let option_id = option_id.ok_or_else(|| Error::Validation("Option ID is required".into()))?;
    let mut tx = db.begin().await?;
    let outcome = ballot::cast_vote(&mut tx, poll_id, user_info.id, option_id).await?;
    tx.commit().await?;
    log::info!("user {} voted option {} on poll {}", user_info.id, option_id, poll_id);
    let poll = poll_with_options(db.get_ref(), poll_id).await?;
    Ok(Json(PollResponse {
        success: true,
        message: outcome.message().into(),
        poll,
    }))
}
