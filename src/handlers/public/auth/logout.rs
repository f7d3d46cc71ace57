use axum_extra::extract::{cookie::Cookie, CookieJar};

use crate::auth::{REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH};
use crate::middleware::ApiSuccess;

/// GET /auth/logout - clears the refresh cookie
pub async fn logout_get(jar: CookieJar) -> (CookieJar, ApiSuccess<()>) {
    let removal = Cookie::build((REFRESH_COOKIE_NAME, "")).path(REFRESH_COOKIE_PATH).build();
    (jar.remove(removal), ApiSuccess::ok(()))
}
