use axum::{
    body::{to_bytes, Body, Bytes},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use serde_json::Value;
use std::collections::HashMap;

use super::secret::read_secret;
use super::token::verify;
use crate::config;
use crate::error::ApiError;

/// Proof that the CSRF gate ran and accepted the request. Handlers behind the
/// gate take this as an extension so they cannot be mounted without it.
#[derive(Clone, Copy, Debug)]
pub struct VerifiedCsrf;

/// Where the presented token was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenSource {
    Header,
    Body,
    Query,
}

/// Gate for state-mutating routes. Compares the token presented in the
/// `X-CSRF-Token` header (falling back to the `csrfToken` body field, then the
/// `csrfToken` query field) against the session secret cookie. Rejects with
/// 403 before the downstream handler runs; passes the request on unchanged
/// otherwise.
pub async fn verify_csrf(jar: CookieJar, request: Request, next: Next) -> Result<Response, ApiError> {
    let secret = read_secret(&jar);

    let (request, presented) = presented_token(request).await?;
    let source = presented.as_ref().map(|(_, source)| *source);
    let token = presented.as_ref().map(|(token, _)| token.as_str());

    if !verify(secret.as_ref(), token) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            has_secret = secret.is_some(),
            token_source = ?source,
            "Rejected request with invalid CSRF token"
        );
        return Err(ApiError::invalid_csrf_token());
    }

    let mut request = request;
    request.extensions_mut().insert(VerifiedCsrf);
    Ok(next.run(request).await)
}

/// Finds the presented token, buffering the body only when the header is absent.
/// The returned request carries the same body bytes it arrived with.
async fn presented_token(request: Request) -> Result<(Request, Option<(String, TokenSource)>), ApiError> {
    let cfg = &config::config().csrf;

    if let Some(token) = header_token(request.headers(), &cfg.header_name) {
        return Ok((request, Some((token, TokenSource::Header))));
    }

    let (parts, body) = request.into_parts();
    let limit = config::config().api.max_request_size_bytes;
    let bytes = to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::payload_too_large("Request body too large"))?;

    let from_body = body_token(&parts.headers, &bytes, &cfg.field_name).map(|t| (t, TokenSource::Body));
    let from_query = || {
        parts
            .uri
            .query()
            .and_then(|q| field_from_urlencoded(q.as_bytes(), &cfg.field_name))
            .map(|t| (t, TokenSource::Query))
    };
    let presented = from_body.or_else(from_query);

    Ok((Request::from_parts(parts, Body::from(bytes)), presented))
}

fn header_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn body_token(headers: &HeaderMap, body: &Bytes, field: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_slice(body).ok()?;
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        field_from_urlencoded(body, field)
    } else {
        None
    }
}

fn field_from_urlencoded(input: &[u8], field: &str) -> Option<String> {
    let pairs: HashMap<String, String> = serde_urlencoded::from_bytes(input).ok()?;
    pairs.get(field).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_token_ignores_blank_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_static("   "));
        assert_eq!(header_token(&headers, "x-csrf-token"), None);

        headers.insert("x-csrf-token", HeaderValue::from_static("abc.def"));
        assert_eq!(header_token(&headers, "x-csrf-token").as_deref(), Some("abc.def"));
    }

    #[test]
    fn body_token_reads_json_and_form_bodies() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = Bytes::from_static(br#"{"csrfToken":"tok","status":"cancelled"}"#);
        assert_eq!(body_token(&headers, &body, "csrfToken").as_deref(), Some("tok"));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
        let body = Bytes::from_static(b"name=x&csrfToken=form-tok");
        assert_eq!(body_token(&headers, &body, "csrfToken").as_deref(), Some("form-tok"));
    }

    #[test]
    fn body_token_ignores_non_string_and_unknown_bodies() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = Bytes::from_static(br#"{"csrfToken":42}"#);
        assert_eq!(body_token(&headers, &body, "csrfToken"), None);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let body = Bytes::from_static(b"csrfToken=tok");
        assert_eq!(body_token(&headers, &body, "csrfToken"), None);
    }
}
