//! HTTP client for the WebLarek API.
//!
//! [`ApiClient`] carries the access credential on every authorised call,
//! recovers from an expired one with a single refresh-and-replay, and
//! attaches a cached anti-forgery token to mutating calls.

pub mod api;
pub mod credentials;
pub mod csrf;
pub mod error;

use reqwest::{cookie::Jar, header, Method};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

pub use api::WebLarekApi;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionFile};
pub use csrf::CsrfTokenCache;
pub use error::ClientError;

pub const CSRF_TOKEN_PATH: &str = "/csrf-token";
pub const REFRESH_PATH: &str = "/auth/token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// One HTTP call, replayable as-is.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub csrf_token: Option<String>,
}

impl Call {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: vec![],
            body: None,
            csrf_token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn csrf(mut self, token: String) -> Self {
        self.csrf_token = Some(token);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(default)]
    success: bool,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    cookies: Arc<Jar>,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
    csrf: CsrfTokenCache,
    refresh_guard: Mutex<()>,
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        // Endpoints join under the base path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let cookies = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .build()?;

        Ok(Self {
            http,
            cookies,
            base_url,
            credentials,
            csrf: CsrfTokenCache::new(),
            refresh_guard: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Seeds a cookie (e.g. a refresh cookie from another session) for the API origin.
    pub fn add_cookie(&self, name: &str, value: &str) {
        self.cookies
            .add_cookie_str(&format!("{}={}; Path=/", name, value), &self.base_url);
    }

    fn url_for(&self, call: &Call) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(call.path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", call.path, e)))?;
        if !call.query.is_empty() {
            url.query_pairs_mut().extend_pairs(call.query.iter());
        }
        Ok(url)
    }

    /// Sends one call without any recovery. A 403 on a call that carried a
    /// CSRF token drops that token from the cache.
    pub async fn request<T: DeserializeOwned>(
        &self,
        call: &Call,
        access_token: Option<&str>,
    ) -> Result<T, ClientError> {
        let mut builder = self.http.request(call.method.clone(), self.url_for(call)?);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(csrf) = &call.csrf_token {
            builder = builder.header(CSRF_HEADER, csrf);
        }
        if let Some(body) = &call.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            let body = if bytes.is_empty() { &b"null"[..] } else { &bytes[..] };
            return serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()));
        }

        let payload = serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        let err = ClientError::from_response(status.as_u16(), payload);

        if let (ClientError::Forbidden { .. }, Some(csrf)) = (&err, &call.csrf_token) {
            if self.csrf.invalidate_if(csrf).await {
                tracing::warn!(path = %call.path, "CSRF token rejected, dropped from cache");
            }
        }
        Err(err)
    }

    /// Exchanges the refresh cookie for a new access token and stores it.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let response: RefreshResponse = match self.request(&Call::get(REFRESH_PATH), None).await {
            Ok(response) => response,
            Err(ClientError::Unauthorized { payload })
            | Err(ClientError::Forbidden { payload })
            | Err(ClientError::Status { payload, .. }) => return Err(ClientError::RefreshFailed { payload }),
            Err(other) => return Err(other),
        };

        let token = match response {
            RefreshResponse { success: true, access_token: Some(token) } if !token.is_empty() => token,
            _ => {
                return Err(ClientError::RefreshFailed {
                    payload: serde_json::json!({ "success": false, "message": "refresh response carried no access token" }),
                })
            }
        };

        self.credentials.set_access_token(&token).await?;
        tracing::debug!("Access token refreshed");
        Ok(token)
    }

    /// Refresh unless another caller already replaced the token that failed.
    async fn refresh_after(&self, failed: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.refresh_guard.lock().await;
        if let Some(current) = self.credentials.access_token().await? {
            if failed != Some(current.as_str()) {
                return Ok(current);
            }
        }
        self.refresh().await
    }

    /// Sends an authorised call. On 401 the access token is refreshed and the
    /// call replayed once; the replay's outcome is final. Other failures are
    /// returned without a refresh. A failed refresh is returned as is and the
    /// call is not replayed.
    pub async fn execute<T: DeserializeOwned>(&self, call: Call) -> Result<T, ClientError> {
        let token = self.credentials.access_token().await?;

        match self.request(&call, token.as_deref()).await {
            Err(err) if err.is_unauthorized() => {
                tracing::debug!(path = %call.path, "Access token rejected, refreshing");
                let fresh = self.refresh_after(token.as_deref()).await.map_err(|e| {
                    tracing::warn!(path = %call.path, "Refresh failed: {}", e);
                    e
                })?;
                tracing::debug!(path = %call.path, "Replaying call with refreshed token");
                self.request(&call, Some(&fresh)).await
            }
            other => other,
        }
    }

    /// Cached CSRF token; fetched from the server on first use.
    pub async fn csrf_token(&self) -> Result<String, ClientError> {
        self.csrf
            .get_or_fetch(|| async {
                let response: CsrfTokenResponse = self.request(&Call::get(CSRF_TOKEN_PATH), None).await?;
                match response.csrf_token {
                    Some(token) if !token.is_empty() => Ok(token),
                    _ => Err(ClientError::CsrfTokenMissing),
                }
            })
            .await
    }

    pub async fn invalidate_csrf_token(&self) {
        self.csrf.invalidate().await;
    }

    /// Attaches the CSRF token, then executes. The token fetch itself is not
    /// covered by refresh-and-replay.
    pub async fn execute_mutating<T: DeserializeOwned>(&self, call: Call) -> Result<T, ClientError> {
        let token = self.csrf_token().await?;
        self.execute(call.csrf(token)).await
    }
}
