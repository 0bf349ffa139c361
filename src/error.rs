use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("poll is not accepting votes")]
    PollInactive,

    #[error("poll has expired")]
    PollExpired,

    #[error("option does not belong to this poll")]
    OptionNotInPoll,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("environment error: {0}")]
    Environment(#[from] dotenv::Error),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(e) = err {
        return e.code().as_deref() == Some("23505");
    }
    false
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::PollInactive | Error::PollExpired | Error::OptionNotInPoll => StatusCode::BAD_REQUEST,
            Error::Unauthenticated(_) | Error::Token(_) => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            Error::Database(e) if is_unique_violation(e) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Validation("bad".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::PollInactive.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::PollExpired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::OptionNotInPoll.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::Unauthenticated("authentication required".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::PermissionDenied("no".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::NotFound("poll not found".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Conflict("dup".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::Database(sqlx::Error::RowNotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Database(sqlx::Error::PoolClosed).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_flags_failure() {
        let resp = Error::NotFound("poll not found".into()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
