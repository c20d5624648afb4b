//! Core HTTP client for the Upbit REST API v1.
//!
//! The [`UpbitClient`] struct is the entry point for every REST endpoint. It
//! wraps [`reqwest::Client`], signs requests with a per-request JWT when
//! credentials are configured, and provides typed `get`, `post` and `delete`
//! methods.
//!
//! API endpoint methods are added to `UpbitClient` via `impl` blocks in the
//! [`crate::api`] module.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{Credentials, JwtTokenProvider, TokenProvider};
use crate::constants::API_BASE_URL;
use crate::error::{ApiErrorEnvelope, Result, UpbitError};

/// Query parameters in send order. Repeated keys (`states[]`) are allowed.
pub type Query<'a> = [(&'a str, String)];

/// Core HTTP client for the Upbit REST API.
///
/// Quotation endpoints work without credentials. Exchange endpoints need
/// them and fail with [`UpbitError::Auth`] otherwise.
///
/// # Example
///
/// ```no_run
/// use upbit_rs::client::UpbitClient;
///
/// # #[tokio::main]
/// # async fn main() -> upbit_rs::Result<()> {
/// let client = UpbitClient::with_credentials("access-key", "secret-key")?;
/// let accounts = client.get_accounts().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct UpbitClient {
    http: reqwest::Client,
    /// Base URL for REST requests (defaults to [`API_BASE_URL`]).
    base_url: String,
    provider: Option<Arc<dyn TokenProvider>>,
}

impl UpbitClient {
    /// Client for the public quotation endpoints only.
    pub fn new() -> Result<Self> {
        Self::build(API_BASE_URL, None)
    }

    /// Client that signs every request with the given keys.
    pub fn with_credentials(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self> {
        let provider = JwtTokenProvider::new(Credentials::new(access_key, secret_key));
        Self::build(API_BASE_URL, Some(Arc::new(provider)))
    }

    /// Client with a custom token source.
    pub fn with_token_provider(provider: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::build(API_BASE_URL, Some(provider))
    }

    /// Point the client at another base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn build(base_url: &str, provider: Option<Arc<dyn TokenProvider>>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .default_headers(Self::default_headers())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            provider,
        })
    }

    /// Returns a reference to the underlying `reqwest::Client`.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests are signed.
    pub fn has_credentials(&self) -> bool {
        self.provider.is_some()
    }

    // -----------------------------------------------------------------------
    // Generic HTTP helpers
    // -----------------------------------------------------------------------

    /// Perform a GET request and deserialize the JSON response.
    pub async fn get<R: DeserializeOwned>(&self, path: &str, query: &Query<'_>) -> Result<R> {
        let url = self.url(path)?;
        tracing::debug!(%url, params = query.len(), "GET");

        let resp = self
            .http
            .get(url)
            .query(query)
            .headers(self.auth_headers(&raw_query(query))?)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    /// Perform a POST request with a JSON body and deserialize the response.
    ///
    /// The body fields are hashed into the token the same way query
    /// parameters are.
    pub async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = self.url(path)?;
        tracing::debug!(%url, "POST");

        let value = serde_json::to_value(body)?;
        let resp = self
            .http
            .post(url)
            .headers(self.auth_headers(&body_query(&value))?)
            .json(&value)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    /// Perform a DELETE request and deserialize the JSON response.
    pub async fn delete<R: DeserializeOwned>(&self, path: &str, query: &Query<'_>) -> Result<R> {
        let url = self.url(path)?;
        tracing::debug!(%url, params = query.len(), "DELETE");

        let resp = self
            .http
            .delete(url)
            .query(query)
            .headers(self.auth_headers(&raw_query(query))?)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Fail early on endpoints that need a signed request.
    pub(crate) fn require_credentials(&self) -> Result<()> {
        if self.provider.is_none() {
            return Err(UpbitError::Auth(
                "this endpoint requires an access key and secret key".into(),
            ));
        }
        Ok(())
    }

    /// Build the full URL from a path segment.
    fn url(&self, path: &str) -> Result<Url> {
        let full = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Ok(Url::parse(&full)?)
    }

    /// Default headers applied to every request.
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Per-request `Authorization` header. Empty when no credentials are set.
    fn auth_headers(&self, query: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(1);
        if let Some(provider) = &self.provider {
            let token = if query.is_empty() {
                provider.generate_token()?
            } else {
                provider.generate_token_with_query(query)?
            };
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| UpbitError::Auth(format!("token is not a valid header: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Read a response, returning either the deserialized body or an `UpbitError`.
    async fn handle_response<R: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<R> {
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(UpbitError::Json)
        } else {
            let body = String::from_utf8_lossy(&bytes);
            tracing::debug!(%status, "REST request rejected");
            Err(self.parse_error_body(status, &body))
        }
    }

    /// Try to parse the API's JSON error structure; fall back to a raw HTTP
    /// status error.
    pub(crate) fn parse_error_body(&self, status: reqwest::StatusCode, body: &str) -> UpbitError {
        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) {
            if envelope.error.name.is_some() || envelope.error.message.is_some() {
                return UpbitError::Api(envelope.error);
            }
        }
        UpbitError::HttpStatus {
            status,
            body: body.to_owned(),
        }
    }
}

impl std::fmt::Debug for UpbitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpbitClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.provider.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Query hashing input
// ---------------------------------------------------------------------------

/// The unescaped `k=v&k=v` string the server hashes to check `query_hash`.
fn raw_query(query: &Query<'_>) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Flatten a JSON object body into the same `k=v` form. Arrays become
/// repeated `k[]=v` pairs; nulls are skipped.
fn body_query(body: &serde_json::Value) -> String {
    use serde_json::Value;

    fn scalar(v: &Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    let Value::Object(map) = body else {
        return String::new();
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(v) = scalar(item) {
                        pairs.push(format!("{key}[]={v}"));
                    }
                }
            }
            other => {
                if let Some(v) = scalar(other) {
                    pairs.push(format!("{key}={v}"));
                }
            }
        }
    }
    pairs.join("&")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn raw_query_keeps_order_and_brackets() {
        let q = [
            ("market", "KRW-BTC".to_owned()),
            ("states[]", "wait".to_owned()),
            ("states[]", "watch".to_owned()),
        ];
        assert_eq!(raw_query(&q), "market=KRW-BTC&states[]=wait&states[]=watch");
    }

    #[test]
    fn body_query_flattens_scalars() {
        let body = json!({"market": "KRW-BTC", "side": "bid", "price": "5000", "identifier": null});
        let q = body_query(&body);
        assert!(q.contains("market=KRW-BTC"));
        assert!(q.contains("side=bid"));
        assert!(q.contains("price=5000"));
        assert!(!q.contains("identifier"));
    }

    #[test]
    fn error_body_is_parsed() {
        let client = UpbitClient::new().unwrap();
        let err = client.parse_error_body(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"name":"invalid_query_payload","message":"bad"}}"#,
        );
        match err {
            UpbitError::Api(body) => assert_eq!(body.name.as_deref(), Some("invalid_query_payload")),
            other => panic!("unexpected {other:?}"),
        }

        let err = client.parse_error_body(reqwest::StatusCode::BAD_GATEWAY, "oops");
        assert!(matches!(err, UpbitError::HttpStatus { .. }));
    }
}
