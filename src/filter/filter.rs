use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{is_identifier, FilterData, FilterOrderInfo, SqlParam, SqlResult};

pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if column != "*" && !is_identifier(column) {
                return Err(FilterError::InvalidColumn(column.clone()));
            }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }

        // Apply max limit from config
        let max_limit = i32::try_from(crate::config::CONFIG.filter.max_limit).unwrap_or(i32::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_parts()?;
        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_parts()?;
        let query = format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_clause);
        Ok(SqlResult { query, params })
    }

    fn where_parts(&self) -> Result<(String, Vec<SqlParam>), FilterError> {
        match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, 0),
            None => Ok(("1=1".to_string(), vec![])),
        }
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}
