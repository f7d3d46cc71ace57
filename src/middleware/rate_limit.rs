use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Window entries kept before expired ones are swept.
const SWEEP_THRESHOLD: usize = 10_000;

/// Fixed-window request counter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    trust_proxy: bool,
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the client's window resets.
    pub reset_after: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, trust_proxy: bool) -> Self {
        Self {
            max_requests,
            window,
            trust_proxy,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(
            security.rate_limit_max_requests,
            Duration::from_secs(security.rate_limit_window_secs),
            security.trust_proxy,
        )
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Counts one request for `client` and reports whether it fits the budget.
    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        // The map holds plain counters, so a poisoned lock is still usable
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows
            .entry(client.to_string())
            .or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }
        entry.count = entry.count.saturating_add(1);

        let elapsed = now.duration_since(entry.started);
        let reset_after = self.window.saturating_sub(elapsed).as_secs_f64().ceil() as u64;
        RateDecision {
            allowed: entry.count <= self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after,
        }
    }

    /// Client address: the last `X-Forwarded-For` hop behind a trusted proxy,
    /// otherwise the peer address.
    fn client_key(&self, request: &Request) -> String {
        if self.trust_proxy {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit(',').map(str::trim).find(|hop| !hop.is_empty()));
            if let Some(hop) = forwarded {
                return hop.to_string();
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            // Without connection info every caller shares one budget
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn header_value(value: impl std::fmt::Display) -> HeaderValue {
    HeaderValue::try_from(value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// Global per-IP limiter; over-budget requests get 429 before routing.
pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let client = limiter.client_key(&request);
    let decision = limiter.check(&client);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, method = %request.method(), path = %request.uri().path(), "Rate limit exceeded");
        let mut response = ApiError::too_many_requests("Too many requests from this IP, please try again later")
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, header_value(decision.reset_after));
        response
    };

    let headers = response.headers_mut();
    headers.insert("ratelimit-limit", header_value(limiter.max_requests()));
    headers.insert("ratelimit-remaining", header_value(decision.remaining));
    headers.insert("ratelimit-reset", header_value(decision.reset_after));
    response
}
