use axum::{extract::Path, Extension, Json};

use super::parse_id;
use crate::csrf::VerifiedCsrf;
use crate::database::models::{Customer, CustomerPatch};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::CustomerService;

/// PATCH /customers/:id
///
/// Only `name`, `email` and `phone` are applied.
pub async fn customer_patch(
    Extension(_csrf): Extension<VerifiedCsrf>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>, ApiError> {
    let id = parse_id(&id)?;
    tracing::info!(admin_id = %admin.user_id, customer_id = %id, "Customer update requested");
    Ok(Json(CustomerService::new().await?.update(id, patch).await?))
}
