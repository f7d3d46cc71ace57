use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Serialize;

use crate::csrf::{ensure_secret, issue_token};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenBody {
    pub csrf_token: String,
}

/// GET /csrf-token
///
/// Issues a token bound to the caller's secret cookie, setting that cookie
/// first when the request arrives without one.
pub async fn csrf_token_get(jar: CookieJar) -> (CookieJar, Json<CsrfTokenBody>) {
    let (jar, secret) = ensure_secret(jar);
    let token = issue_token(&secret);
    (
        jar,
        Json(CsrfTokenBody {
            csrf_token: token.into_string(),
        }),
    )
}
