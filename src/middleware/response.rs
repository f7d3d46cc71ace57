use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Success response whose fields sit next to `"success": true`,
/// e.g. `{ "success": true, "accessToken": "..." }`.
#[derive(Debug)]
pub struct ApiSuccess<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        let mut body = match serde_json::to_value(&self.data) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) => serde_json::Map::new(),
            Ok(other) => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": true,
                        "message": "Failed to serialize response data",
                        "code": "INTERNAL_SERVER_ERROR"
                    })),
                )
                    .into_response();
            }
        };
        body.insert("success".to_string(), Value::Bool(true));

        (self.status_code, Json(Value::Object(body))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiSuccess<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fields_are_flattened_next_to_success() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Token {
            access_token: &'static str,
        }

        let response = ApiSuccess::ok(Token { access_token: "abc" }).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "success": true, "accessToken": "abc" }));
    }
}
