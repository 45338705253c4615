use std::future::{ready, Ready};

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::Cookie;
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "access_token";
const SESSION_DAYS: i64 = 30;

/// Signed session content. `exp` is seconds since the epoch, checked by
/// the decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub exp: usize,
}

pub fn issue_token(user_id: i64, email: &str, secret: &str) -> Result<String, AppError> {
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    let claims = Claims {
        id: user_id,
        email: email.to_string(),
        exp: expires_at.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Bad signature, malformed token and expired token all map to 403,
/// matching the split between "no cookie" (401) and "cookie rejected".
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Forbidden)
}

pub fn session_cookie(token: String, production: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(production)
        .max_age(CookieDuration::days(SESSION_DAYS))
        .finish()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .finish()
}

fn claims_from_request(req: &HttpRequest) -> Result<Claims, AppError> {
    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::Internal("configuration not registered".into()))?;
    let cookie = req.cookie(SESSION_COOKIE).ok_or(AppError::Unauthorized)?;
    verify_token(cookie.value(), &config.token_secret)
}

/// Extractor for routes that require a session. Rejects the request with
/// 401 (no cookie) or 403 (invalid/expired token).
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req).map(AuthUser))
    }
}

/// Extractor for optionally-authenticated routes: any verification failure
/// degrades to an anonymous caller instead of rejecting the request.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Claims>);

impl FromRequest for MaybeAuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(MaybeAuthUser(claims_from_request(req).ok())))
    }
}
