//! Double-submit CSRF protection.
//!
//! A random per-session secret lives in an HTTP-only cookie. Tokens handed to
//! scripts are salted HMACs of that secret, so a request is accepted only when
//! it carries both the cookie and a token derived from it. Verification is
//! stateless beyond the cookie.

pub mod middleware;
pub mod secret;
pub mod token;

pub use middleware::{verify_csrf, TokenSource, VerifiedCsrf};
pub use secret::{ensure_secret, read_secret, SessionSecret};
pub use token::{issue_token, verify, CsrfToken};
