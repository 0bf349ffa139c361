pub mod poll;
pub mod statistics;
pub mod vote;

use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::{Cookie, CookieBuilder};
use actix_web::web::{Data, Json};
use actix_web::HttpResponse;
use hex::ToHex;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{query_as, query_scalar, PgPool};

use crate::error::Error;
use crate::middlewares::jwt::{issue_token, JWT_TOKEN};
use crate::models::user::{User, UserView};
use crate::response::Message;

fn hash_password(pass: &str, slt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass);
    hasher.update(slt);
    hasher.finalize().encode_hex()
}

fn random_salt() -> String {
    let chars: Vec<char> = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ".chars().collect();
    let mut rng = thread_rng();
    (0..32).map(|_| chars[rng.gen_range(0..chars.len())]).collect()
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

pub async fn register(Json(body): Json<Signup>, db: Data<PgPool>) -> Result<Json<AccountResponse>, Error> {
    let username = body.username.trim().to_owned();
    let email = body.email.trim().to_owned();
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(Error::Validation("Username, email, and password are required".into()));
    }
    if body.password.len() < 8 {
        return Err(Error::Validation("Password must be at least 8 characters".into()));
    }
    let mut tx = db.begin().await?;
    let username_taken: bool = query_scalar("SELECT EXISTS(SELECT id FROM users WHERE LOWER(username) = LOWER($1))")
        .bind(&username)
        .fetch_one(&mut tx)
        .await?;
    if username_taken {
        return Err(Error::Validation("Username already exists".into()));
    }
    let email_taken: bool = query_scalar("SELECT EXISTS(SELECT id FROM users WHERE LOWER(email) = LOWER($1))")
        .bind(&email)
        .fetch_one(&mut tx)
        .await?;
    if email_taken {
        return Err(Error::Validation("Email already registered".into()));
    }
    let slt = random_salt();
    let user: User = query_as(
        "INSERT INTO users (username, email, password, salt, first_name, last_name)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *",
    )
    .bind(&username)
    .bind(&email)
    .bind(hash_password(&body.password, &slt))
    .bind(&slt)
    .bind(body.first_name.trim())
    .bind(body.last_name.trim())
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    log::info!("account created: {}", user.username);
    Ok(Json(AccountResponse {
        success: true,
        message: "Account created successfully".into(),
        user: user.into(),
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

pub async fn login(Json(Login { username, password }): Json<Login>, db: Data<PgPool>) -> Result<HttpResponse, Error> {
    let mut conn = db.acquire().await?;
    let user: Option<User> = query_as("SELECT * FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1)")
        .bind(username.trim())
        .fetch_optional(&mut conn)
        .await?;
    let user = match user {
        Some(u) if hash_password(&password, &u.salt) == u.password => u,
        _ => return Err(Error::Unauthenticated("Invalid username or password".into())),
    };
    let token = issue_token(user.id)?;
    Ok(HttpResponse::Ok().cookie(Cookie::new(JWT_TOKEN, token)).json(AccountResponse {
        success: true,
        message: "Login successful".into(),
        user: user.into(),
    }))
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .cookie(CookieBuilder::new(JWT_TOKEN, "").expires(OffsetDateTime::now_utc()).finish())
        .json(Message::new("Logged out successfully"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hash_password_is_deterministic() {
        assert_eq!(hash_password("hunter22", "salt"), hash_password("hunter22", "salt"));
    }

    #[test]
    fn test_hash_password_depends_on_salt() {
        assert_ne!(hash_password("hunter22", "a"), hash_password("hunter22", "b"));
    }

    #[test]
    fn test_random_salt_shape() {
        let slt = random_salt();
        assert_eq!(slt.len(), 32);
        assert!(slt.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_salts_differ() {
        assert_ne!(random_salt(), random_salt());
    }
}
