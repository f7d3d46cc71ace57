use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{validate_jwt, Claims, Role, TokenKind};
use crate::error::ApiError;

/// Authenticated user context extracted from an access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            roles: claims.roles,
        }
    }
}

/// Validates `Authorization: Bearer <access token>` and injects [`AuthUser`].
/// Refresh tokens are not accepted here.
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token, TokenKind::Access)?;

    let auth_user = AuthUser::from(claims);
    tracing::debug!(user_id = %auth_user.user_id, "Authenticated request");
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Role guard layered after [`jwt_auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let Some(user) = request.extensions().get::<AuthUser>() else {
        return Err(ApiError::unauthorized("Authentication required"));
    };
    if !user.is_admin() {
        tracing::warn!(user_id = %user.user_id, "Non-admin user denied");
        return Err(ApiError::forbidden("Administrator role required"));
    }
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
