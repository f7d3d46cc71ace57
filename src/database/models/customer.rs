use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Customers live in the `users` table alongside their order aggregates.
pub const CUSTOMERS_TABLE: &str = "users";
pub const ORDERS_TABLE: &str = "orders";

/// Columns safe to return to API clients. Credentials never leave the table.
pub const CUSTOMER_COLUMNS: [&str; 9] = [
    "id",
    "name",
    "email",
    "phone",
    "created_at",
    "total_amount",
    "order_count",
    "last_order_date",
    "last_order_id",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_amount: f64,
    pub order_count: i32,
    pub last_order_date: Option<DateTime<Utc>>,
    pub last_order_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderRef {
    pub id: Uuid,
}

/// Fields an administrator may change. Anything else in the request body is ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_ignores_unknown_keys() {
        let patch: CustomerPatch = serde_json::from_value(json!({
            "name": "Ann",
            "roles": ["admin"],
            "totalAmount": 0,
            "csrfToken": "abc.def"
        }))
        .unwrap();
        assert_eq!(patch, CustomerPatch { name: Some("Ann".into()), ..Default::default() });
    }

    #[test]
    fn customer_serializes_in_wire_shape() {
        let customer = Customer {
            id: Uuid::nil(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            phone: None,
            created_at: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc),
            total_amount: 1500.0,
            order_count: 2,
            last_order_date: None,
            last_order_id: None,
        };
        let value = serde_json::to_value(&customer).unwrap();
        assert_eq!(value["_id"], Uuid::nil().to_string());
        assert_eq!(value["totalAmount"], 1500.0);
        assert_eq!(value["orderCount"], 2);
        assert!(value.get("password").is_none());
    }
}
