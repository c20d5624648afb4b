//! Fluent construction of [`PublicClient`] and [`PrivateClient`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::auth::{Credentials, JwtTokenProvider, TokenProvider};
use crate::constants::{WS_PRIVATE_URL, WS_PUBLIC_URL};
use crate::error::{Result, UpbitError};
use crate::ws::connection::{Connection, Keepalive, WsConfig};
use crate::ws::private::PrivateClient;
use crate::ws::public::PublicClient;

/// Builder for the WebSocket clients.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use upbit_rs::ws::WsClientBuilder;
///
/// let client = WsClientBuilder::new()
///     .ping_interval(Duration::from_secs(20))
///     .max_reconnect_attempts(10)
///     .build_public();
/// ```
#[derive(Default)]
pub struct WsClientBuilder {
    endpoint: Option<String>,
    provider: Option<Arc<dyn TokenProvider>>,
    config: WsConfig,
}

impl WsClientBuilder {
    /// A builder with default settings and no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign every dial with a JWT built from these keys.
    pub fn credentials(self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let provider = JwtTokenProvider::new(Credentials::new(access_key, secret_key));
        self.token_provider(provider)
    }

    /// Use a custom token source.
    pub fn token_provider(self, provider: impl TokenProvider + 'static) -> Self {
        self.shared_token_provider(Arc::new(provider))
    }

    /// Use a token source shared with other clients.
    pub fn shared_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Override the endpoint URL. Defaults to the production URL of the
    /// client being built.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Heartbeat period. Default: 30 s. `Duration::ZERO` disables it.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    /// Keepalive frame kind. Default: protocol ping.
    pub fn keepalive(mut self, keepalive: Keepalive) -> Self {
        self.config.keepalive = keepalive;
        self
    }

    /// Reconnect attempts before giving up. Default: 5. Zero turns automatic
    /// reconnects off: a lost link goes straight to `Failed`.
    pub fn max_reconnect_attempts(mut self, n: u32) -> Self {
        self.config.max_reconnect_attempts = n;
        self
    }

    /// Base wait between reconnect attempts. Default: 3 s.
    pub fn reconnect_wait(mut self, wait: Duration) -> Self {
        self.config.reconnect_wait = wait;
        self
    }

    /// Capacity of each record channel. Default: 1,000. Minimum 1.
    pub fn channel_capacity(mut self, cap: usize) -> Self {
        self.config.channel_capacity = cap.max(1);
        self
    }

    /// Replace every tunable at once.
    pub fn config(mut self, config: WsConfig) -> Self {
        self.config = WsConfig {
            channel_capacity: config.channel_capacity.max(1),
            ..config
        };
        self
    }

    fn connection(
        self,
        default_endpoint: &str,
    ) -> (Arc<Connection>, mpsc::Sender<UpbitError>, mpsc::Receiver<UpbitError>) {
        let (errors_tx, errors_rx) = mpsc::channel(self.config.channel_capacity);
        let endpoint = self.endpoint.unwrap_or_else(|| default_endpoint.to_owned());
        let conn = Connection::new(endpoint, self.provider, self.config, errors_tx.clone());
        (conn, errors_tx, errors_rx)
    }

    /// Build a client for the public quotation endpoint.
    ///
    /// Credentials are optional here; when present the dial is signed.
    pub fn build_public(self) -> PublicClient {
        let (conn, errors_tx, errors_rx) = self.connection(WS_PUBLIC_URL);
        PublicClient::new(conn, errors_tx, errors_rx)
    }

    /// Build a client for the private account endpoint.
    ///
    /// Fails with [`UpbitError::InvalidArgument`] when no credentials or
    /// token provider were given.
    pub fn build_private(self) -> Result<PrivateClient> {
        if self.provider.is_none() {
            return Err(UpbitError::InvalidArgument(
                "the private stream needs credentials or a token provider".into(),
            ));
        }
        let (conn, errors_tx, errors_rx) = self.connection(WS_PRIVATE_URL);
        Ok(PrivateClient::new(conn, errors_tx, errors_rx))
    }
}

impl std::fmt::Debug for WsClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.provider.is_some())
            .field("config", &self.config)
            .finish()
    }
}
