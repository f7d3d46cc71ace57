// Public handlers: token acquisition, anti-forgery token issuance, health.
pub mod auth;
pub mod csrf;
pub mod health;

pub use csrf::csrf_token_get;
pub use health::health_get;
