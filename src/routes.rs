use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::csrf::verify_csrf;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, rate_limit, require_admin, RateLimiter};

/// Full application router with global layers.
pub fn app() -> Router {
    app_with_limiter(RateLimiter::from_config(&config::config().security))
}

/// [`app`] with an explicit request budget.
pub fn app_with_limiter(limiter: RateLimiter) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(customer_routes())
        // Global middleware
        .layer(from_fn_with_state(Arc::new(limiter), rate_limit))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/health", get(public::health_get))
        .route("/csrf-token", get(public::csrf_token_get))
        .route("/auth/token", get(auth::token_get))
        .route("/auth/logout", get(auth::logout_get))
}

fn customer_routes() -> Router {
    use protected::customers;

    Router::new()
        .route("/customers", get(customers::customers_get))
        .route(
            "/customers/:id",
            get(customers::customer_get).merge(
                patch(customers::customer_patch)
                    .delete(customers::customer_delete)
                    .route_layer(from_fn(verify_csrf)),
            ),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let csrf_header = HeaderName::try_from(config::config().csrf.header_name.as_str())
        .unwrap_or_else(|_| HeaderName::from_static("x-csrf-token"));

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            csrf_header,
        ])
}
