use axum::{http::Uri, Json};

use super::query_pairs;
use crate::config;
use crate::error::ApiError;
use crate::filter::CustomerQuery;
use crate::services::{CustomerPage, CustomerService};

/// GET /customers
///
/// Query parameters (all optional): `page`, `limit`, `sortField`, `sortOrder`,
/// `registrationDateFrom/To`, `lastOrderDateFrom/To`, `totalAmountFrom/To`,
/// `orderCountFrom/To`, `search`. Keys starting with `$` are discarded.
pub async fn customers_get(uri: Uri) -> Result<Json<CustomerPage>, ApiError> {
    let query = CustomerQuery::from_pairs(query_pairs(&uri)?, &config::config().filter)?;
    let page = CustomerService::new().await?.list(&query).await?;
    Ok(Json(page))
}
