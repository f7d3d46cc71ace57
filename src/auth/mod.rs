use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Name of the HTTP-only cookie carrying the refresh credential.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

/// Identity a session is issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl Claims {
    pub fn new(user: &SessionUser, kind: TokenKind) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let ttl = match kind {
            TokenKind::Access => Duration::minutes(security.access_token_ttl_minutes),
            TokenKind::Refresh => Duration::days(security.refresh_token_ttl_days),
        };

        Self {
            sub: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn user(&self) -> SessionUser {
        SessionUser {
            id: self.sub,
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Expected {expected} token, got {actual}")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

fn signing_secret() -> Result<&'static str, JwtError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let encoding_key = EncodingKey::from_secret(signing_secret()?.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Decodes a token and checks it is of the expected kind. Expired tokens are rejected.
pub fn validate_jwt(token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
    let decoding_key = DecodingKey::from_secret(signing_secret()?.as_bytes());

    let claims = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::Invalid(e.to_string()))?
        .claims;

    if claims.kind != expected {
        return Err(JwtError::WrongKind { expected, actual: claims.kind });
    }
    Ok(claims)
}

pub fn issue_access_token(user: &SessionUser) -> Result<String, JwtError> {
    generate_jwt(&Claims::new(user, TokenKind::Access))
}

/// Builds the HTTP-only refresh cookie for a user.
pub fn refresh_cookie(user: &SessionUser) -> Result<Cookie<'static>, JwtError> {
    let token = generate_jwt(&Claims::new(user, TokenKind::Refresh))?;
    let security = &config::config().security;

    Ok(Cookie::build((REFRESH_COOKIE_NAME, token))
        .http_only(true)
        .secure(security.secure_cookies)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH)
        .max_age(time::Duration::days(security.refresh_token_ttl_days))
        .build())
}

/// Issues a fresh access token plus the refresh cookie backing it.
pub fn issue_session(user: &SessionUser) -> Result<(String, Cookie<'static>), JwtError> {
    Ok((issue_access_token(user)?, refresh_cookie(user)?))
}
