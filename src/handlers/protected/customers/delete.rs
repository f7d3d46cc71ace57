use axum::{extract::Path, Extension, Json};

use super::parse_id;
use crate::csrf::VerifiedCsrf;
use crate::database::models::Customer;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::CustomerService;

/// DELETE /customers/:id - returns the removed customer
pub async fn customer_delete(
    Extension(_csrf): Extension<VerifiedCsrf>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id = parse_id(&id)?;
    tracing::info!(admin_id = %admin.user_id, customer_id = %id, "Customer delete requested");
    Ok(Json(CustomerService::new().await?.delete(id).await?))
}
