use serde_json::Value;
use thiserror::Error;

/// Failure of a client call. HTTP-level variants carry the JSON body the
/// server returned, with `statusCode` added.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unauthorized: {}", message_of(.payload))]
    Unauthorized { payload: Value },

    #[error("forbidden: {}", message_of(.payload))]
    Forbidden { payload: Value },

    #[error("request failed with status {status}: {}", message_of(.payload))]
    Status { status: u16, payload: Value },

    #[error("credential refresh failed: {}", message_of(.payload))]
    RefreshFailed { payload: Value },

    #[error("CSRF token not found")]
    CsrfTokenMissing,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("credential store error: {0}")]
    Store(String),
}

fn message_of(payload: &Value) -> &str {
    payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
}

impl ClientError {
    /// Builds the error for a non-success response.
    pub fn from_response(status: u16, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(mut map) => {
                map.insert("statusCode".to_string(), Value::from(status));
                Value::Object(map)
            }
            other => serde_json::json!({ "message": other, "statusCode": status }),
        };

        match status {
            401 => ClientError::Unauthorized { payload },
            403 => ClientError::Forbidden { payload },
            _ => ClientError::Status { status, payload },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::Status { status, .. } => Some(*status),
            ClientError::RefreshFailed { payload } => payload
                .get("statusCode")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok()),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ClientError::Unauthorized { payload }
            | ClientError::Forbidden { payload }
            | ClientError::Status { payload, .. }
            | ClientError::RefreshFailed { payload } => Some(payload),
            _ => None,
        }
    }

    /// True when a credential refresh may fix the failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_pick_the_variant() {
        let err = ClientError::from_response(401, json!({ "message": "jwt expired" }));
        assert!(err.is_unauthorized());
        assert_eq!(err.payload().unwrap()["statusCode"], 401);
        assert_eq!(err.to_string(), "unauthorized: jwt expired");

        let err = ClientError::from_response(403, json!({ "message": "Invalid CSRF token" }));
        assert!(matches!(err, ClientError::Forbidden { .. }));
        assert!(!err.is_unauthorized());

        let err = ClientError::from_response(500, json!({ "message": "boom" }));
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn non_object_payloads_are_wrapped() {
        let err = ClientError::from_response(502, json!("Bad Gateway"));
        assert_eq!(err.payload().unwrap(), &json!({ "message": "Bad Gateway", "statusCode": 502 }));
    }
}
