//! Bearer token generation for the Upbit API.
//!
//! Every authenticated request, and every WebSocket dial, carries a freshly
//! signed JWT with a new nonce. Tokens are never reused: the WebSocket client
//! asks its [`TokenProvider`] again on each reconnect attempt.
//!
//! REST calls with query parameters additionally sign a SHA-512 hash of the
//! exact query string (`query_hash` / `query_hash_alg` claims).

use std::fmt;

use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;
use sha2::{Digest, Sha512};

use crate::error::Result;

/// Produces bearer tokens for the WebSocket and REST clients.
///
/// Implementations must return a *fresh* token on every call.
pub trait TokenProvider: Send + Sync {
    /// Generate a token without a query hash.
    fn generate_token(&self) -> Result<String>;

    /// Generate a token bound to the given query string, in the unescaped
    /// `k=v&k=v` form the server hashes.
    ///
    /// The default implementation ignores the query.
    fn generate_token_with_query(&self, query: &str) -> Result<String> {
        let _ = query;
        self.generate_token()
    }
}

/// Upbit API key pair.
#[derive(Clone)]
pub struct Credentials {
    /// Access key, sent in the clear inside the token payload.
    pub access_key: String,
    /// Secret key used to sign tokens.
    pub secret_key: String,
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    access_key: &'a str,
    nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_hash_alg: Option<&'static str>,
}

/// HS256 JWT token provider backed by a [`Credentials`] pair.
///
/// # Example
///
/// ```
/// use upbit_rs::auth::{Credentials, JwtTokenProvider, TokenProvider};
///
/// let provider = JwtTokenProvider::new(Credentials::new("access", "secret"));
/// let token = provider.generate_token().unwrap();
/// assert_eq!(token.split('.').count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct JwtTokenProvider {
    credentials: Credentials,
}

impl JwtTokenProvider {
    /// Create a provider for the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Returns the access key this provider signs for.
    pub fn access_key(&self) -> &str {
        &self.credentials.access_key
    }

    fn sign(&self, query: Option<&str>) -> Result<String> {
        let query_hash = query
            .filter(|q| !q.is_empty())
            .map(|q| hex::encode(Sha512::digest(q.as_bytes())));
        let claims = Claims {
            access_key: &self.credentials.access_key,
            nonce: uuid::Uuid::new_v4().to_string(),
            query_hash_alg: query_hash.as_ref().map(|_| "SHA512"),
            query_hash,
        };

        let key = EncodingKey::from_secret(self.credentials.secret_key.as_bytes());
        Ok(jsonwebtoken::encode(&Header::default(), &claims, &key)?)
    }
}

impl TokenProvider for JwtTokenProvider {
    fn generate_token(&self) -> Result<String> {
        self.sign(None)
    }

    fn generate_token_with_query(&self, query: &str) -> Result<String> {
        self.sign(Some(query))
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{Algorithm, DecodingKey, Validation};
    use serde_json::Value;

    use super::*;

    fn decode(token: &str) -> Value {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        jsonwebtoken::decode::<Value>(token, &DecodingKey::from_secret(b"secret"), &validation)
            .expect("token should verify")
            .claims
    }

    #[test]
    fn token_carries_access_key_and_fresh_nonce() {
        let provider = JwtTokenProvider::new(Credentials::new("access", "secret"));

        let first = decode(&provider.generate_token().unwrap());
        let second = decode(&provider.generate_token().unwrap());

        assert_eq!(first["access_key"], "access");
        assert!(first.get("query_hash").is_none());
        assert_ne!(first["nonce"], second["nonce"]);
    }

    #[test]
    fn query_token_signs_sha512_of_query() {
        let provider = JwtTokenProvider::new(Credentials::new("access", "secret"));
        let query = "market=KRW-BTC&count=10";

        let claims = decode(&provider.generate_token_with_query(query).unwrap());

        let expected = hex::encode(Sha512::digest(query.as_bytes()));
        assert_eq!(claims["query_hash"], expected.as_str());
        assert_eq!(claims["query_hash_alg"], "SHA512");
    }

    #[test]
    fn empty_query_is_not_hashed() {
        let provider = JwtTokenProvider::new(Credentials::new("access", "secret"));
        let claims = decode(&provider.generate_token_with_query("").unwrap());
        assert!(claims.get("query_hash").is_none());
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("access", "super-secret");
        let printed = format!("{creds:?}");
        assert!(!printed.contains("super-secret"));
    }
}
