#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use uuid::Uuid;

use weblarek_api_rust::auth::{self, Claims, Role, SessionUser, TokenKind};

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
}

/// Serves `app` on a free local port for the lifetime of the test runtime.
pub async fn spawn(app: Router) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        port,
        base_url: format!("http://127.0.0.1:{}", port),
    })
}

pub async fn spawn_api() -> Result<TestServer> {
    spawn(weblarek_api_rust::routes::app()).await
}

pub fn user_with(roles: Vec<Role>) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "admin@weblarek.test".to_string(),
        roles,
    }
}

pub fn admin() -> SessionUser {
    user_with(vec![Role::Customer, Role::Admin])
}

pub fn access_token(user: &SessionUser) -> String {
    auth::issue_access_token(user).expect("access token")
}

/// Access token that expired an hour ago.
pub fn expired_access_token(user: &SessionUser) -> String {
    let mut claims = Claims::new(user, TokenKind::Access);
    claims.iat -= 7200;
    claims.exp = claims.iat + 3600;
    auth::generate_jwt(&claims).expect("expired token")
}

/// `name=value` pairs from every Set-Cookie header, for replaying as a Cookie header.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
        .collect()
}

pub async fn json_body(response: Response<Body>) -> Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}
