use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::types::{SqlParam, SqlResult};
use crate::filter::{Filter, FilterData};

pub struct QueryBuilder<T> {
    table_name: String,
    filter: Option<Filter>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, DatabaseError> {
        let name = table_name.into();
        // Reuse Filter table name validation
        Filter::new(&name).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(Self {
            table_name: name,
            filter: None,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        let mut filter = Filter::new(&self.table_name).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        filter
            .assign(filter_data)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        self.filter = Some(filter);
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(pool).await?;
        Ok(row)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result = if let Some(filter) = self.filter {
            filter.to_count_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?
        } else {
            SqlResult { query: format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name), params: vec![] }
        };

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    fn sql_result(&self) -> Result<SqlResult, DatabaseError> {
        if let Some(filter) = &self.filter {
            filter
                .to_sql()
                .map_err(|e| DatabaseError::QueryError(e.to_string()))
        } else {
            Ok(SqlResult { query: format!("SELECT * FROM \"{}\"", self.table_name), params: vec![] })
        }
    }
}

/// Postgres type a filter parameter is bound as.
///
/// Filter documents only carry JSON, so plain comparison strings that parse as
/// a UUID or an RFC 3339 timestamp are bound with the matching column type.
/// Patterns are text regardless of their shape.
#[derive(Debug, PartialEq)]
enum BindValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Text(&'a str),
    Json(&'a Value),
}

impl<'a> From<&'a Value> for BindValue<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    // u64 beyond i64 lands here too
                    BindValue::Float(f)
                } else {
                    BindValue::Json(v)
                }
            }
            Value::String(s) => {
                if let Ok(id) = Uuid::parse_str(s) {
                    BindValue::Uuid(id)
                } else if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                    BindValue::Timestamp(ts.with_timezone(&Utc))
                } else {
                    BindValue::Text(s)
                }
            }
            // Arrays are expanded by FilterWhere before binding
            Value::Array(_) | Value::Object(_) => BindValue::Json(v),
        }
    }
}

impl<'a> From<&'a SqlParam> for BindValue<'a> {
    fn from(p: &'a SqlParam) -> Self {
        match p {
            SqlParam::Value(v) => BindValue::from(v),
            SqlParam::Pattern(s) => BindValue::Text(s),
        }
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match BindValue::from(v) {
        BindValue::Null => q.bind(None::<String>),
        BindValue::Bool(b) => q.bind(b),
        BindValue::Int(i) => q.bind(i),
        BindValue::Float(f) => q.bind(f),
        BindValue::Uuid(id) => q.bind(id),
        BindValue::Timestamp(ts) => q.bind(ts),
        BindValue::Text(s) => q.bind(s),
        BindValue::Json(j) => q.bind(sqlx::types::Json(j)),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match BindValue::from(v) {
        BindValue::Null => q.bind(None::<String>),
        BindValue::Bool(b) => q.bind(b),
        BindValue::Int(i) => q.bind(i),
        BindValue::Float(f) => q.bind(f),
        BindValue::Uuid(id) => q.bind(id),
        BindValue::Timestamp(ts) => q.bind(ts),
        BindValue::Text(s) => q.bind(s),
        BindValue::Json(j) => q.bind(sqlx::types::Json(j)),
    }
}
