// Refresh-cookie based session endpoints.
pub mod logout;
pub mod token;

pub use logout::logout_get;
pub use token::token_get;
