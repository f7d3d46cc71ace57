mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use weblarek_api_rust::auth::Role;
use weblarek_api_rust::routes::app;

struct Issued {
    cookie: String,
    token: String,
}

async fn issue(cookie: Option<&str>) -> Result<(Issued, Vec<String>)> {
    let mut request = Request::builder().uri("/csrf-token");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app().oneshot(request.body(Body::empty())?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let set = common::set_cookies(&response);
    let body = common::json_body(response).await?;
    let token = body["csrfToken"].as_str().expect("csrfToken field").to_string();
    let cookie = match cookie {
        Some(existing) => existing.to_string(),
        None => set.iter().find(|c| c.starts_with("_csrf=")).expect("secret cookie").clone(),
    };
    Ok((Issued { cookie, token }, set))
}

fn patch_customer(cookie: Option<&str>, header_token: Option<&str>, body: serde_json::Value) -> Result<Request<Body>> {
    let bearer = common::access_token(&common::admin());
    let mut request = Request::builder()
        .method(Method::PATCH)
        .uri(format!("/customers/{}", Uuid::new_v4()))
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    if let Some(token) = header_token {
        request = request.header("x-csrf-token", token);
    }
    Ok(request.body(Body::from(body.to_string()))?)
}

fn assert_passed_gate(status: StatusCode) {
    assert_ne!(status, StatusCode::FORBIDDEN, "request was stopped by the CSRF gate");
    assert_ne!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_token_request_sets_http_only_secret_cookie() -> Result<()> {
    let response = app().oneshot(common::get("/csrf-token")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("Set-Cookie")
        .to_string();
    assert!(raw.starts_with("_csrf="), "{}", raw);
    assert!(raw.contains("HttpOnly"), "{}", raw);
    assert!(raw.contains("SameSite"), "{}", raw);

    let body = common::json_body(response).await?;
    assert!(!body["csrfToken"].as_str().unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn existing_secret_is_reused() -> Result<()> {
    let (first, _) = issue(None).await?;
    let (second, set) = issue(Some(&first.cookie)).await?;

    assert!(set.is_empty(), "secret cookie re-issued: {:?}", set);
    assert_eq!(first.cookie, second.cookie);
    Ok(())
}

#[tokio::test]
async fn token_with_matching_cookie_passes_gate() -> Result<()> {
    let (issued, _) = issue(None).await?;
    let request = patch_customer(Some(&issued.cookie), Some(&issued.token), json!({ "name": "Ann" }))?;

    let response = app().oneshot(request).await?;
    assert_passed_gate(response.status());
    Ok(())
}

#[tokio::test]
async fn token_from_other_session_is_rejected() -> Result<()> {
    let (victim, _) = issue(None).await?;
    let (attacker, _) = issue(None).await?;

    let request = patch_customer(Some(&attacker.cookie), Some(&victim.token), json!({ "name": "Mallory" }))?;
    let response = app().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = common::json_body(response).await?;
    assert_eq!(body["message"], "Invalid CSRF token");
    Ok(())
}

#[tokio::test]
async fn token_without_secret_cookie_is_rejected() -> Result<()> {
    let (issued, _) = issue(None).await?;
    let request = patch_customer(None, Some(&issued.token), json!({ "name": "Ann" }))?;

    let response = app().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn mutation_without_any_token_is_rejected() -> Result<()> {
    let (issued, _) = issue(None).await?;
    let request = patch_customer(Some(&issued.cookie), None, json!({ "name": "Ann" }))?;

    let response = app().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let bearer = common::access_token(&common::admin());
    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/customers/{}", Uuid::new_v4()))
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .header(header::COOKIE, &issued.cookie)
        .body(Body::empty())?;
    assert_eq!(app().oneshot(delete).await?.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn token_is_accepted_from_body_and_query() -> Result<()> {
    let (issued, _) = issue(None).await?;

    let in_body = patch_customer(
        Some(&issued.cookie),
        None,
        json!({ "csrfToken": issued.token, "name": "Ann" }),
    )?;
    assert_passed_gate(app().oneshot(in_body).await?.status());

    let bearer = common::access_token(&common::admin());
    let in_query = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/customers/{}?csrfToken={}", Uuid::new_v4(), issued.token))
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .header(header::COOKIE, &issued.cookie)
        .body(Body::empty())?;
    assert_passed_gate(app().oneshot(in_query).await?.status());
    Ok(())
}

#[tokio::test]
async fn reads_do_not_need_a_token() -> Result<()> {
    let bearer = common::access_token(&common::admin());
    let request = Request::builder()
        .uri(format!("/customers/{}", Uuid::new_v4()))
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::empty())?;

    assert_passed_gate(app().oneshot(request).await?.status());
    Ok(())
}

#[tokio::test]
async fn customer_routes_require_admin_access_token() -> Result<()> {
    let anonymous = app().oneshot(common::get("/customers")).await?;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let customer = common::access_token(&common::user_with(vec![Role::Customer]));
    let request = Request::builder()
        .uri("/customers")
        .header(header::AUTHORIZATION, format!("Bearer {}", customer))
        .body(Body::empty())?;
    let response = app().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::json_body(response).await?;
    assert_eq!(body["message"], "Administrator role required");
    Ok(())
}

#[tokio::test]
async fn malformed_listing_parameters_are_rejected_before_storage() -> Result<()> {
    let bearer = common::access_token(&common::admin());
    let request = Request::builder()
        .uri("/customers?page=zero&$where=1")
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::empty())?;

    let response = app().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::json_body(response).await?;
    assert_eq!(body["field_errors"]["page"], "must be a positive integer");
    Ok(())
}
