use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{ApiClient, Call, ClientError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub file_name: String,
    #[serde(default)]
    pub original_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image: ImageRef,
    pub category: String,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    #[serde(default)]
    pub pagination: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Delivering,
    Completed,
    Cancelled,
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "delivering" => Ok(OrderStatus::Delivering),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

/// Checkout payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub payment: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub total: f64,
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Order as returned by the API. Fields this client does not model are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub order_number: Option<Value>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderRecord>,
    #[serde(default)]
    pub pagination: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub order_count: i64,
    #[serde(default)]
    pub last_order_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPagination {
    pub total_users: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPage {
    pub customers: Vec<CustomerRecord>,
    pub pagination: CustomerPagination,
}

/// Customer listing filters. Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
    pub registration_date_from: Option<String>,
    pub registration_date_to: Option<String>,
    pub last_order_date_from: Option<String>,
    pub last_order_date_to: Option<String>,
    pub total_amount_from: Option<f64>,
    pub total_amount_to: Option<f64>,
    pub order_count_from: Option<i64>,
    pub order_count_to: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterBody {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// Flattens a serializable filter struct into query pairs, skipping nulls.
pub fn query_pairs<T: Serialize>(filters: &T) -> Vec<(String, String)> {
    match serde_json::to_value(filters) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect(),
        _ => vec![],
    }
}

/// Typed WebLarek operations. Image file names are returned with the CDN
/// base prepended. Mutating calls carry the CSRF token.
pub struct WebLarekApi {
    client: Arc<ApiClient>,
    cdn: String,
}

impl WebLarekApi {
    pub fn new(client: Arc<ApiClient>, cdn: impl Into<String>) -> Self {
        Self {
            client,
            cdn: cdn.into(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn with_cdn(&self, mut product: Product) -> Product {
        product.image.file_name = format!("{}{}", self.cdn, product.image.file_name);
        product
    }

    // Products

    pub async fn product_list(&self, filters: Vec<(String, String)>) -> Result<ProductPage, ClientError> {
        let mut page: ProductPage = self.client.request(&Call::get("/product").query(filters), None).await?;
        page.items = page.items.into_iter().map(|p| self.with_cdn(p)).collect();
        Ok(page)
    }

    pub async fn product_item(&self, id: &str) -> Result<Product, ClientError> {
        let product = self.client.request(&Call::get(format!("/product/{}", id)), None).await?;
        Ok(self.with_cdn(product))
    }

    pub async fn create_product(&self, product: Value) -> Result<Product, ClientError> {
        let call = Call::new(Method::POST, "/product").json(product);
        let created = self.client.execute_mutating(call).await?;
        Ok(self.with_cdn(created))
    }

    pub async fn update_product(&self, id: &str, patch: Value) -> Result<Product, ClientError> {
        let call = Call::new(Method::PATCH, format!("/product/{}", id)).json(patch);
        let updated = self.client.execute_mutating(call).await?;
        Ok(self.with_cdn(updated))
    }

    pub async fn delete_product(&self, id: &str) -> Result<Product, ClientError> {
        self.client
            .execute_mutating(Call::new(Method::DELETE, format!("/product/{}", id)))
            .await
    }

    // Orders

    pub async fn create_order(&self, order: &NewOrder) -> Result<OrderRecord, ClientError> {
        let body = serde_json::to_value(order).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.client
            .execute_mutating(Call::new(Method::POST, "/order").json(body))
            .await
    }

    pub async fn update_order_status(&self, order_number: &str, status: OrderStatus) -> Result<OrderRecord, ClientError> {
        let call = Call::new(Method::PATCH, format!("/order/{}", order_number)).json(serde_json::json!({ "status": status }));
        self.client.execute_mutating(call).await
    }

    pub async fn all_orders(&self, filters: Vec<(String, String)>) -> Result<OrderPage, ClientError> {
        self.client.execute(Call::get("/order/all").query(filters)).await
    }

    pub async fn my_orders(&self, filters: Vec<(String, String)>) -> Result<OrderPage, ClientError> {
        self.client.execute(Call::get("/order/all/me").query(filters)).await
    }

    pub async fn order_by_number(&self, order_number: &str) -> Result<OrderRecord, ClientError> {
        self.client.execute(Call::get(format!("/order/{}", order_number))).await
    }

    pub async fn my_order_by_number(&self, order_number: &str) -> Result<OrderRecord, ClientError> {
        self.client.execute(Call::get(format!("/order/me/{}", order_number))).await
    }

    // Customers

    pub async fn customers(&self, filters: &CustomerFilters) -> Result<CustomerPage, ClientError> {
        self.client
            .execute(Call::get("/customers").query(query_pairs(filters)))
            .await
    }

    pub async fn customer(&self, id: &str) -> Result<CustomerRecord, ClientError> {
        self.client.execute(Call::get(format!("/customers/{}", id))).await
    }

    // Session

    pub async fn user(&self) -> Result<Value, ClientError> {
        self.client.execute(Call::get("/auth/user")).await
    }

    pub async fn user_roles(&self) -> Result<Vec<String>, ClientError> {
        self.client.execute(Call::get("/auth/user/roles")).await
    }

    pub async fn login(&self, body: &LoginBody) -> Result<TokenResponse, ClientError> {
        let call = Call::new(Method::POST, "/auth/login")
            .json(serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?);
        self.store_session(self.client.request(&call, None).await?).await
    }

    pub async fn register(&self, body: &RegisterBody) -> Result<TokenResponse, ClientError> {
        let call = Call::new(Method::POST, "/auth/register")
            .json(serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?);
        self.store_session(self.client.request(&call, None).await?).await
    }

    pub async fn logout(&self) -> Result<Value, ClientError> {
        let response = self.client.request(&Call::get("/auth/logout"), None).await?;
        self.client.credentials().clear().await?;
        self.client.invalidate_csrf_token().await;
        Ok(response)
    }

    async fn store_session(&self, response: TokenResponse) -> Result<TokenResponse, ClientError> {
        if let Some(token) = response.access_token.as_deref().filter(|_| response.success) {
            self.client.credentials().set_access_token(token).await?;
        }
        Ok(response)
    }
}
