//! Customer listing filters.
//!
//! Turns the free-form `GET /customers` query string into a typed, range-checked
//! [`CustomerQuery`], then into the `$`-operator document the SQL [`Filter`]
//! renders. Keys starting with `$` are dropped before anything else looks at the
//! parameters, so callers can never smuggle storage operators in.
//!
//! [`Filter`]: super::Filter

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use super::error::FilterError;
use super::types::{FilterData, SortDirection};
use crate::config::FilterConfig;

/// Leading character of storage operator keys.
pub const OPERATOR_PREFIX: char = '$';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSortField {
    CreatedAt,
    Name,
    TotalAmount,
    OrderCount,
    LastOrderDate,
}

impl CustomerSortField {
    /// Maps the public field name onto its column. Unknown names map to `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "createdAt" => CustomerSortField::CreatedAt,
            "name" => CustomerSortField::Name,
            "totalAmount" => CustomerSortField::TotalAmount,
            "orderCount" => CustomerSortField::OrderCount,
            "lastOrderDate" => CustomerSortField::LastOrderDate,
            _ => return None,
        })
    }

    pub fn column(&self) -> &'static str {
        match self {
            CustomerSortField::CreatedAt => "created_at",
            CustomerSortField::Name => "name",
            CustomerSortField::TotalAmount => "total_amount",
            CustomerSortField::OrderCount => "order_count",
            CustomerSortField::LastOrderDate => "last_order_date",
        }
    }
}

/// Inclusive bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub from: Option<T>,
    pub to: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self { from: None, to: None }
    }
}

impl<T: PartialOrd + Copy> Bounds<T> {
    fn checked(self, field: &str) -> Result<Self, FilterError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(FilterError::invalid_parameter(
                    field,
                    "lower bound is greater than upper bound",
                ));
            }
        }
        Ok(self)
    }
}

impl<T: Copy + Into<Value>> Bounds<T> {
    fn to_condition(self) -> Option<Value> {
        let mut cond = Map::new();
        if let Some(from) = self.from {
            cond.insert("$gte".to_string(), from.into());
        }
        if let Some(to) = self.to {
            cond.insert("$lte".to_string(), to.into());
        }
        (!cond.is_empty()).then_some(Value::Object(cond))
    }
}

fn date_condition(bounds: Bounds<DateTime<Utc>>) -> Option<Value> {
    let render = |d: DateTime<Utc>| Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true));
    let mut cond = Map::new();
    if let Some(from) = bounds.from {
        cond.insert("$gte".to_string(), render(from));
    }
    if let Some(to) = bounds.to {
        cond.insert("$lte".to_string(), render(to));
    }
    (!cond.is_empty()).then_some(Value::Object(cond))
}

/// Validated `GET /customers` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: Option<(CustomerSortField, SortDirection)>,
    pub registration_date: Bounds<DateTime<Utc>>,
    pub last_order_date: Bounds<DateTime<Utc>>,
    pub total_amount: Bounds<f64>,
    pub order_count: Bounds<i64>,
    /// Search text already escaped for use as a regular expression.
    pub search_pattern: Option<String>,
}

/// Drops every parameter whose key starts with the operator prefix.
pub fn strip_operator_keys(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .filter(|(key, _)| {
            let unsafe_key = key.starts_with(OPERATOR_PREFIX);
            if unsafe_key {
                tracing::warn!(key = %key, "Dropped operator key from customer query");
            }
            !unsafe_key
        })
        .collect()
}

impl CustomerQuery {
    /// Parses raw query pairs. Operator keys are stripped first; malformed or
    /// out-of-range values are rejected. Empty values count as absent.
    pub fn from_pairs(pairs: Vec<(String, String)>, cfg: &FilterConfig) -> Result<Self, FilterError> {
        let params: HashMap<String, String> = strip_operator_keys(pairs)
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        let get = |key: &str| params.get(key).map(|v| v.trim());

        let page = match get("page") {
            Some(v) => parse_positive(v, "page")?,
            None => 1,
        };
        let limit = match get("limit") {
            Some(v) => parse_positive(v, "limit")?,
            None => cfg.default_limit,
        };
        if limit > cfg.max_limit {
            return Err(FilterError::invalid_parameter(
                "limit",
                format!("must not exceed {}", cfg.max_limit),
            ));
        }

        // Offset must stay representable for the SQL layer
        let offset = (u64::from(page) - 1) * u64::from(limit);
        if offset > i32::MAX as u64 {
            return Err(FilterError::invalid_parameter("page", "is out of range"));
        }

        let query = Self {
            page,
            limit,
            sort: parse_sort(get("sortField"), get("sortOrder"))?,
            registration_date: Bounds {
                from: get("registrationDateFrom").map(|v| parse_date(v, "registrationDateFrom", false)).transpose()?,
                to: get("registrationDateTo").map(|v| parse_date(v, "registrationDateTo", true)).transpose()?,
            }
            .checked("registrationDate")?,
            last_order_date: Bounds {
                from: get("lastOrderDateFrom").map(|v| parse_date(v, "lastOrderDateFrom", false)).transpose()?,
                to: get("lastOrderDateTo").map(|v| parse_date(v, "lastOrderDateTo", true)).transpose()?,
            }
            .checked("lastOrderDate")?,
            total_amount: Bounds {
                from: get("totalAmountFrom").map(|v| parse_amount(v, "totalAmountFrom")).transpose()?,
                to: get("totalAmountTo").map(|v| parse_amount(v, "totalAmountTo")).transpose()?,
            }
            .checked("totalAmount")?,
            order_count: Bounds {
                from: get("orderCountFrom").map(|v| parse_count(v, "orderCountFrom")).transpose()?,
                to: get("orderCountTo").map(|v| parse_count(v, "orderCountTo")).transpose()?,
            }
            .checked("orderCount")?,
            search_pattern: get("search").map(regex::escape),
        };

        if cfg.debug_logging {
            tracing::debug!(?query, "Parsed customer query");
        }
        Ok(query)
    }

    pub fn offset(&self) -> i32 {
        // Bounded in from_pairs
        ((self.page - 1) as i64 * self.limit as i64) as i32
    }

    /// Filter over delivery addresses of orders, used to find customers whose
    /// last order matches the search text. `None` when there is no search.
    pub fn order_search_filter(&self) -> Option<FilterData> {
        self.search_pattern.as_ref().map(|pattern| FilterData {
            select: Some(vec!["id".to_string()]),
            where_clause: Some(json!({ "delivery_address": { "$iregex": pattern } })),
            ..Default::default()
        })
    }

    /// Builds the customer filter. `matching_order_ids` are the orders found by
    /// [`order_search_filter`](Self::order_search_filter); ignored without a search.
    pub fn to_filter_data(&self, matching_order_ids: &[Uuid]) -> FilterData {
        FilterData {
            select: None,
            where_clause: Some(self.where_document(matching_order_ids)),
            order: self.sort.map(|(field, dir)| json!({ field.column(): dir })),
            limit: Some(self.limit as i32),
            offset: Some(self.offset()),
        }
    }

    /// Same predicate as [`to_filter_data`](Self::to_filter_data) without paging, for counting.
    pub fn to_count_filter(&self, matching_order_ids: &[Uuid]) -> FilterData {
        FilterData {
            where_clause: Some(self.where_document(matching_order_ids)),
            ..Default::default()
        }
    }

    fn where_document(&self, matching_order_ids: &[Uuid]) -> Value {
        let mut doc = Map::new();

        if let Some(cond) = date_condition(self.registration_date) {
            doc.insert("created_at".to_string(), cond);
        }
        if let Some(cond) = date_condition(self.last_order_date) {
            doc.insert("last_order_date".to_string(), cond);
        }
        if let Some(cond) = self.total_amount.to_condition() {
            doc.insert("total_amount".to_string(), cond);
        }
        if let Some(cond) = self.order_count.to_condition() {
            doc.insert("order_count".to_string(), cond);
        }
        if let Some(pattern) = &self.search_pattern {
            doc.insert(
                "$or".to_string(),
                json!([
                    { "name": { "$iregex": pattern } },
                    { "last_order_id": { "$in": matching_order_ids } }
                ]),
            );
        }

        Value::Object(doc)
    }
}

fn parse_positive(value: &str, field: &str) -> Result<u32, FilterError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| FilterError::invalid_parameter(field, "must be a positive integer"))
}

fn parse_amount(value: &str, field: &str) -> Result<f64, FilterError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| FilterError::invalid_parameter(field, "must be a non-negative number"))
}

fn parse_count(value: &str, field: &str) -> Result<i64, FilterError> {
    value
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| FilterError::invalid_parameter(field, "must be a non-negative integer"))
}

/// Accepts `YYYY-MM-DD` or RFC 3339. A bare date used as an upper bound covers
/// the whole day.
fn parse_date(value: &str, field: &str, end_of_day: bool) -> Result<DateTime<Utc>, FilterError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        };
        if let Some(time) = time {
            return Ok(date.and_time(time).and_utc());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| FilterError::invalid_parameter(field, "must be a date (YYYY-MM-DD or RFC 3339)"))
}

/// Resolves the sort clause. Operator-prefixed or unknown fields yield no sort;
/// a missing field falls back to newest customers first.
fn parse_sort(
    field: Option<&str>,
    order: Option<&str>,
) -> Result<Option<(CustomerSortField, SortDirection)>, FilterError> {
    let direction = match order.map(|o| o.to_ascii_lowercase()) {
        None => SortDirection::Desc,
        Some(o) if o == "desc" => SortDirection::Desc,
        Some(o) if o == "asc" => SortDirection::Asc,
        Some(_) => return Err(FilterError::invalid_parameter("sortOrder", "must be 'asc' or 'desc'")),
    };

    let Some(field) = field else {
        return Ok(Some((CustomerSortField::CreatedAt, direction)));
    };
    if field.starts_with(OPERATOR_PREFIX) {
        return Ok(None);
    }
    match CustomerSortField::parse(field) {
        Some(parsed) => Ok(Some((parsed, direction))),
        None => {
            tracing::debug!(field = %field, "Ignoring unknown customer sort field");
            Ok(None)
        }
    }
}
