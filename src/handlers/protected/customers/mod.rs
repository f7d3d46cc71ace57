use axum::http::Uri;

use crate::error::ApiError;
use uuid::Uuid;

pub mod delete;
pub mod list;
pub mod show;
pub mod update;

pub use delete::customer_delete;
pub use list::customers_get;
pub use show::customer_get;
pub use update::customer_patch;

/// Raw query pairs in arrival order; repeated keys are kept.
pub(crate) fn query_pairs(uri: &Uri) -> Result<Vec<(String, String)>, ApiError> {
    match uri.query() {
        None => Ok(vec![]),
        Some(q) => serde_urlencoded::from_str::<Vec<(String, String)>>(q)
            .map_err(|_| ApiError::bad_request("Malformed query string")),
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid customer id"))
}
