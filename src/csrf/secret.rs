use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

use crate::config::{self, SameSitePolicy};

/// Shortest secret (in decoded bytes) accepted from a cookie.
const MIN_SECRET_BYTES: usize = 16;

/// Per-session secret every CSRF token is derived from. Lives only in an
/// HTTP-only cookie; the server keeps no copy.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSecret(String);

impl SessionSecret {
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; config::config().csrf.secret_bytes.max(MIN_SECRET_BYTES)];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accepts a cookie value only if it decodes to a secret of usable length.
    pub fn parse(value: &str) -> Option<Self> {
        let decoded = URL_SAFE_NO_PAD.decode(value).ok()?;
        (decoded.len() >= MIN_SECRET_BYTES).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the secret itself.
impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSecret(..)")
    }
}

/// Reads the session secret from the request cookies, if a well-formed one exists.
pub fn read_secret(jar: &CookieJar) -> Option<SessionSecret> {
    jar.get(&config::config().csrf.cookie_name)
        .and_then(|cookie| SessionSecret::parse(cookie.value()))
}

/// Returns the session's existing secret, or creates one and adds its cookie to the jar.
///
/// The returned jar must be part of the response for a new secret to reach the browser.
/// A malformed cookie counts as absent and is replaced.
pub fn ensure_secret(jar: CookieJar) -> (CookieJar, SessionSecret) {
    if let Some(secret) = read_secret(&jar) {
        return (jar, secret);
    }

    let secret = SessionSecret::generate();
    tracing::debug!("Issued new CSRF session secret");
    (jar.add(secret_cookie(&secret)), secret)
}

fn secret_cookie(secret: &SessionSecret) -> Cookie<'static> {
    let cfg = config::config();
    let same_site = match cfg.csrf.same_site {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
    };

    // Session cookie: no max-age, the secret lives as long as the browser session.
    Cookie::build((cfg.csrf.cookie_name.clone(), secret.as_str().to_string()))
        .http_only(true)
        .secure(cfg.security.secure_cookies)
        .same_site(same_site)
        .path("/")
        .build()
}
