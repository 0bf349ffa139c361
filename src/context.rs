use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::Error;
use crate::middlewares::jwt::{verify_token, JWT_TOKEN};

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i32,
}

fn identify(req: &HttpRequest) -> Option<UserInfo> {
    if let Some(user) = req.extensions().get::<UserInfo>() {
        return Some(user.clone());
    }
    let cookie = req.cookie(JWT_TOKEN)?;
    verify_token(cookie.value()).ok().map(|id| UserInfo { id })
}

impl FromRequest for UserInfo {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match identify(req) {
            Some(user) => ready(Ok(user)),
            None => ready(Err(Error::Unauthenticated("authentication required".into()).into())),
        }
    }
}

// Optional identity for public endpoints which enrich their output for
// logged-in callers (results user_vote, statistics dashboard).
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserInfo>);

impl FromRequest for MaybeUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(MaybeUser(identify(req))))
    }
}
