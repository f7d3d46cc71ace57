use serde_json::json;
use sqlx::{self, postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::FilterData;

pub struct Repository<T> {
    table_name: String,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>, pool: PgPool) -> Self {
        Self {
            table_name: table_name.into(),
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        QueryBuilder::<T>::new(&self.table_name)?
            .filter(filter_data)?
            .select_all(&self.pool)
            .await
    }

    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<T>, DatabaseError> {
        QueryBuilder::<T>::new(&self.table_name)?
            .filter(filter_data)?
            .select_optional(&self.pool)
            .await
    }

    pub async fn count(&self, filter_data: FilterData) -> Result<i64, DatabaseError> {
        QueryBuilder::<T>::new(&self.table_name)?
            .filter(filter_data)?
            .count(&self.pool)
            .await
    }

    /// Select one row by id, restricted to `columns`.
    pub async fn select_id(&self, id: Uuid, columns: &[&str]) -> Result<Option<T>, DatabaseError> {
        self.select_one(FilterData {
            select: Some(columns.iter().map(|c| c.to_string()).collect()),
            where_clause: Some(json!({ "id": id })),
            limit: Some(1),
            ..Default::default()
        })
        .await
    }
}
