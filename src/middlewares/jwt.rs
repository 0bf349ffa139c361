use actix_web::dev::{Service, ServiceRequest, Transform};
use actix_web::{Error as ActixError, HttpMessage};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Future, Ready};
use std::ops::Add;
use std::pin::Pin;

use crate::context::UserInfo;
use crate::error::Error;

pub static JWT_TOKEN: &str = "JWT_TOKEN";
pub static JWT_SECRET: &str = "JWT_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub user: String,
    pub exp: i64,
}

pub fn issue_token(uid: i32) -> Result<String, Error> {
    let secret = dotenv::var(JWT_SECRET)?;
    let claim = Claim {
        user: uid.to_string(),
        exp: Utc::now().add(chrono::Duration::days(30)).timestamp(),
    };
    let token = encode(&Header::new(Algorithm::HS256), &claim, &EncodingKey::from_secret(secret.as_bytes()))?;
    Ok(token)
}

pub fn verify_token(token: &str) -> Result<i32, Error> {
    let secret = dotenv::var(JWT_SECRET)?;
    let payload = decode::<Claim>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::new(Algorithm::HS256))?;
    payload
        .claims
        .user
        .parse::<i32>()
        .map_err(|_| Error::Unauthenticated("authentication required".into()))
}

// Rejections go through crate::error::Error so the 401 body carries the
// same {success, error} envelope as every other error path.
fn unauthorized() -> ActixError {
    Error::Unauthenticated("authentication required".into()).into()
}

// Gate for owner-only routes. Public routes with optional identity rely on
// the extractors in context.rs instead.
pub struct Jwt;

impl<S> Transform<S, ServiceRequest> for Jwt
where
    S: Service<ServiceRequest> + 'static,
    S::Future: 'static,
    S::Error: Into<ActixError>,
{
    type Response = S::Response;
    type Error = ActixError;
    type Transform = JwtService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtService { next_service: service }))
    }
}

pub struct JwtService<S> {
    next_service: S,
}

impl<S> Service<ServiceRequest> for JwtService<S>
where
    S: Service<ServiceRequest>,
    S::Future: 'static,
    S::Error: Into<ActixError>,
{
    type Response = S::Response;
    type Error = ActixError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut core::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.next_service.poll_ready(ctx).map_err(|e| e.into())
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let cookie = match req.cookie(JWT_TOKEN) {
            Some(c) => c,
            None => return Box::pin(async move { Err(unauthorized()) }),
        };
        match verify_token(cookie.value()) {
            Err(_) => return Box::pin(async move { Err(unauthorized()) }),
            Ok(id) => {
                req.extensions_mut().insert(UserInfo { id });
            }
        }
        let res_fut = self.next_service.call(req);
        Box::pin(async move {
            let resp = res_fut.await.map_err(|e| e.into())?;
            Ok(resp)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn set_secret() {
        std::env::set_var(JWT_SECRET, "pollhub-test-secret");
    }

    #[test]
    fn test_issue_and_verify_token() {
        set_secret();
        let token = issue_token(42).unwrap();
        assert_eq!(verify_token(&token).unwrap(), 42);
    }

    #[test]
    fn test_tampered_token_rejected() {
        set_secret();
        let mut token = issue_token(42).unwrap();
        token.push('x');
        assert!(verify_token(&token).is_err());
    }

    #[test]
    fn test_unauthorized_keeps_error_envelope() {
        use actix_web::http::StatusCode;

        let err = unauthorized();
        // Downcasts to the crate error, so the response body is the JSON
        // envelope from its ResponseError impl, not plain text.
        assert!(err.as_error::<Error>().is_some());
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_tokens_carry_distinct_users() {
        set_secret();
        let a = issue_token(1).unwrap();
        let b = issue_token(2).unwrap();
        assert_eq!(verify_token(&a).unwrap(), 1);
        assert_eq!(verify_token(&b).unwrap(), 2);
    }
}
