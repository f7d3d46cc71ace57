use axum::{extract::Path, Json};

use super::parse_id;
use crate::database::models::Customer;
use crate::error::ApiError;
use crate::services::CustomerService;

/// GET /customers/:id
pub async fn customer_get(Path(id): Path<String>) -> Result<Json<Customer>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(CustomerService::new().await?.get(id).await?))
}
