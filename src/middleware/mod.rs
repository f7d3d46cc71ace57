pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin, AuthUser};
pub use rate_limit::{rate_limit, RateLimiter};
pub use response::{ApiResult, ApiSuccess};
