use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::customer::{
    Customer, CustomerPatch, OrderRef, CUSTOMERS_TABLE, CUSTOMER_COLUMNS, ORDERS_TABLE,
};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::error::FilterError;
use crate::filter::CustomerQuery;

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Query error: {0}")]
    Query(#[from] FilterError),
    #[error("Customer not found: {0}")]
    NotFound(Uuid),
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: &'static str },
}

impl From<sqlx::Error> for CustomerError {
    fn from(err: sqlx::Error) -> Self {
        CustomerError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<CustomerError> for ApiError {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::Database(e) => e.into(),
            CustomerError::Query(e) => e.into(),
            CustomerError::NotFound(_) => ApiError::not_found("Customer not found"),
            CustomerError::InvalidField { field, reason } => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field.to_string(), reason.to_string());
                ApiError::validation_error("Invalid customer update", Some(field_errors))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_users: i64,
    pub total_pages: i64,
    pub current_page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(total_users: i64, page: u32, limit: u32) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            total_users,
            total_pages: (total_users + limit_i - 1) / limit_i,
            current_page: page,
            page_size: limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub pagination: Pagination,
}

pub struct CustomerService {
    pool: PgPool,
}

impl CustomerService {
    pub async fn new() -> Result<Self, CustomerError> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    fn customers(&self) -> Repository<Customer> {
        Repository::new(CUSTOMERS_TABLE, self.pool.clone())
    }

    /// One page of customers matching the query, with totals for the whole match.
    pub async fn list(&self, query: &CustomerQuery) -> Result<CustomerPage, CustomerError> {
        // Search also matches customers whose last order went to a matching address
        let order_ids: Vec<Uuid> = match query.order_search_filter() {
            Some(order_filter) => Repository::<OrderRef>::new(ORDERS_TABLE, self.pool.clone())
                .select_any(order_filter)
                .await?
                .into_iter()
                .map(|o| o.id)
                .collect(),
            None => vec![],
        };

        let mut filter = query.to_filter_data(&order_ids);
        filter.select = Some(CUSTOMER_COLUMNS.iter().map(|c| c.to_string()).collect());

        let repo = self.customers();
        let customers = repo.select_any(filter).await?;
        let total = repo.count(query.to_count_filter(&order_ids)).await?;

        tracing::debug!(
            returned = customers.len(),
            total,
            page = query.page,
            "Listed customers"
        );

        Ok(CustomerPage {
            customers,
            pagination: Pagination::new(total, query.page, query.limit),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Customer, CustomerError> {
        self.customers()
            .select_id(id, &CUSTOMER_COLUMNS)
            .await?
            .ok_or(CustomerError::NotFound(id))
    }

    /// Apply a typed patch and return the updated customer.
    pub async fn update(&self, id: Uuid, patch: CustomerPatch) -> Result<Customer, CustomerError> {
        validate_patch(&patch)?;
        if patch.is_empty() {
            return self.get(id).await;
        }

        let query = format!(
            "UPDATE \"{}\" SET \
             \"name\" = COALESCE($2, \"name\"), \
             \"email\" = COALESCE($3, \"email\"), \
             \"phone\" = COALESCE($4, \"phone\") \
             WHERE \"id\" = $1 RETURNING {}",
            CUSTOMERS_TABLE,
            returning_columns()
        );
        let updated = sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .bind(patch.name)
            .bind(patch.email)
            .bind(patch.phone)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CustomerError::NotFound(id))?;

        tracing::info!(customer_id = %id, "Updated customer");
        Ok(updated)
    }

    /// Delete a customer and return the removed record.
    pub async fn delete(&self, id: Uuid) -> Result<Customer, CustomerError> {
        let query = format!(
            "DELETE FROM \"{}\" WHERE \"id\" = $1 RETURNING {}",
            CUSTOMERS_TABLE,
            returning_columns()
        );
        let deleted = sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CustomerError::NotFound(id))?;

        tracing::info!(customer_id = %id, "Deleted customer");
        Ok(deleted)
    }
}

fn returning_columns() -> String {
    CUSTOMER_COLUMNS
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_patch(patch: &CustomerPatch) -> Result<(), CustomerError> {
    if matches!(patch.name.as_deref(), Some(name) if name.trim().is_empty()) {
        return Err(CustomerError::InvalidField { field: "name", reason: "must not be empty" });
    }
    if matches!(patch.email.as_deref(), Some(email) if !email.contains('@')) {
        return Err(CustomerError::InvalidField { field: "email", reason: "must be an email address" });
    }
    Ok(())
}
