//! Error types for the `upbit-rs` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, UpbitError>`.
//!
//! [`UpbitError`] covers:
//! - **API errors** — Structured error responses from the Upbit REST API
//! - **HTTP status / transport errors** — Unexpected status codes, network failures
//! - **Connection errors** — Token generation, dial, keepalive and reconnect failures
//! - **Stream errors** — Undecodable frames and fatal read failures
//! - **Invalid arguments** — Client-side validation errors

use std::fmt;

/// Error payload returned by the Upbit REST API.
///
/// The wire format is `{"error": {"name": "...", "message": "..."}}`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error name (e.g. `"invalid_query_payload"`).
    #[serde(default)]
    pub name: Option<String>,
    /// Human-readable description of the error.
    #[serde(default)]
    pub message: Option<String>,
}

/// Envelope around [`ApiErrorBody`].
#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.name.as_deref().unwrap_or("unknown"),
            self.message.as_deref().unwrap_or("No message"),
        )
    }
}

/// All possible errors produced by the `upbit-rs` client.
#[derive(Debug, thiserror::Error)]
pub enum UpbitError {
    /// An error response returned by the Upbit REST API.
    #[error("API error: {0}")]
    Api(ApiErrorBody),

    /// The server returned an unexpected HTTP status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// The response body text.
        body: String,
    },

    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to (de)serialize a JSON body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A WebSocket-level error on an established connection.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Signing a JWT failed.
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The caller provided an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The token provider could not produce a bearer token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The WebSocket handshake could not be completed.
    #[error("failed to dial {endpoint}: {source}")]
    Dial {
        /// Endpoint that was dialled.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// An operation needed a live connection but none was open.
    #[error("not connected")]
    NotConnected,

    /// The reconnect budget was exhausted; the connection is stopped.
    #[error("reconnect failed after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts that were made.
        attempts: u32,
    },

    /// An inbound frame could not be decoded or routed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The connection came back but the subscription request could not be resent.
    #[error("subscription recovery failed: {0}")]
    SubscriptionRecovery(#[source] Box<UpbitError>),

    /// Reading from the connection failed and could not be recovered.
    #[error("read failed: {0}")]
    Read(String),

    /// The operation was interrupted because the connection was closed.
    #[error("operation cancelled: connection closed")]
    Cancelled,

    /// The client has shut down and no more messages will arrive.
    #[error("connection closed")]
    ConnectionClosed,
}

impl UpbitError {
    /// Returns `true` for errors after which the stream yields nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::MaxRetriesExceeded { .. } | Self::Read(_) | Self::ConnectionClosed
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UpbitError>;
