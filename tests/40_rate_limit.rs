mod common;

use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

use weblarek_api_rust::middleware::RateLimiter;
use weblarek_api_rust::routes::app_with_limiter;

fn from_client(ip: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .uri("/csrf-token")
        .header("x-forwarded-for", ip)
        .body(Body::empty())?)
}

#[tokio::test]
async fn request_past_the_budget_gets_429() -> Result<()> {
    let app = app_with_limiter(RateLimiter::new(3, Duration::from_secs(900), true));

    for remaining in (0..3).rev() {
        let response = app.clone().oneshot(from_client("198.51.100.7")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "3");
        assert_eq!(response.headers()["ratelimit-remaining"], remaining.to_string().as_str());
    }

    let response = app.clone().oneshot(from_client("198.51.100.7")?).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = common::json_body(response).await?;
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");

    // Other clients keep their own budget
    let response = app.oneshot(from_client("203.0.113.9")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn limiter_runs_before_authentication() -> Result<()> {
    let app = app_with_limiter(RateLimiter::new(1, Duration::from_secs(900), true));

    let customers = || -> Result<Request<Body>> {
        Ok(Request::builder()
            .uri("/customers")
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::empty())?)
    };
    assert_eq!(app.clone().oneshot(customers()?).await?.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.oneshot(customers()?).await?.status(), StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}
