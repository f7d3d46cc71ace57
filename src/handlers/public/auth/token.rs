use axum_extra::extract::CookieJar;
use serde::Serialize;

use crate::auth::{issue_access_token, validate_jwt, TokenKind, REFRESH_COOKIE_NAME};
use crate::error::ApiError;
use crate::middleware::{ApiResult, ApiSuccess};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenBody {
    pub access_token: String,
}

/// GET /auth/token
///
/// Exchanges the HTTP-only refresh cookie for a new access token. An absent,
/// expired or tampered cookie yields 401.
pub async fn token_get(jar: CookieJar) -> ApiResult<AccessTokenBody> {
    let refresh = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    let claims = validate_jwt(&refresh, TokenKind::Refresh).map_err(|e| {
        tracing::info!("Refresh rejected: {}", e);
        ApiError::unauthorized("Invalid refresh token")
    })?;

    let access_token = issue_access_token(&claims.user())?;
    tracing::debug!(user_id = %claims.sub, "Issued access token from refresh cookie");

    Ok(ApiSuccess::ok(AccessTokenBody { access_token }))
}
