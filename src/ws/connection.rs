//! Persistent, authenticated WebSocket connection with keepalive and bounded
//! reconnect.
//!
//! A [`Connection`] owns one physical socket at a time. Every dial asks the
//! [`TokenProvider`] for a fresh token, so reconnects never reuse a nonce.
//! Each successful dial is a new *link*: it gets its own cancellation token
//! and a generation number, and its read half is handed to the dispatcher
//! exactly once.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect──▶ Connecting ──▶ Open ◀──▶ Reconnecting ──(budget spent)──▶ Failed
//!                                   │
//!                                 close
//!                                   ▼
//!                                 Closed
//! ```
//!
//! `close` is terminal. `Failed` is not: the caller may still `connect` or
//! `reconnect` explicitly.
//!
//! # Reconnect policy
//!
//! Up to `max_reconnect_attempts` attempts; attempt `n` first waits
//! `reconnect_wait * n`. Each attempt tears the old link down and dials a new
//! one. After a success the accumulated subscription directives are resent
//! under a new ticket. Once the budget is spent the link is torn down and the
//! state becomes `Failed`; a budget of zero fails at once.
//!
//! Concurrent triggers for the same lost link (the heartbeat and the
//! dispatcher may both notice) are collapsed into one reconnect by comparing
//! link generations.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use crate::auth::TokenProvider;
use crate::constants::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_PING_INTERVAL,
    DEFAULT_RECONNECT_WAIT,
};
use crate::error::{Result, UpbitError};
use crate::ws::subscription::SubscriptionRegistry;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WriterHalf = SplitSink<WsStream, Message>;
pub(crate) type ReaderHalf = SplitStream<WsStream>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the heartbeat keeps the link alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Keepalive {
    /// WebSocket protocol ping frame.
    #[default]
    Ping,
    /// The literal text frame `PING`; the server answers `{"status":"UP"}`.
    Text,
}

/// Tunables shared by the public and private clients.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Heartbeat period. Must stay below the server's 120 s idle timeout.
    /// `Duration::ZERO` disables the heartbeat.
    pub ping_interval: Duration,
    /// Keepalive frame kind.
    pub keepalive: Keepalive,
    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Base wait between attempts; attempt `n` waits `n` times this.
    pub reconnect_wait: Duration,
    /// Capacity of each record channel and of the error channel.
    pub channel_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            keepalive: Keepalive::default(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or the last explicit `connect` failed.
    Idle,
    Connecting,
    Open,
    Reconnecting,
    /// Shut down by `close`; terminal.
    Closed,
    /// The reconnect budget was spent or the link failed twice in a row.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The current physical link. Replaced wholesale on every dial.
struct Link {
    running: bool,
    cancel: CancellationToken,
    generation: u64,
    reader: Option<ReaderHalf>,
}

/// What the dispatcher needs to read from one link.
pub(crate) struct LinkReader {
    pub reader: ReaderHalf,
    pub cancel: CancellationToken,
    pub generation: u64,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Connection manager for one Upbit WebSocket endpoint.
///
/// Usually driven through [`PublicClient`](crate::ws::public::PublicClient) or
/// [`PrivateClient`](crate::ws::private::PrivateClient), which own the
/// dispatcher and the typed channels.
///
/// The handshake does not offer `permessage-deflate`: `tokio-tungstenite` has
/// no support for it, so every frame travels uncompressed.
pub struct Connection {
    endpoint: String,
    provider: Option<Arc<dyn TokenProvider>>,
    config: WsConfig,
    /// Serialises connect and close.
    lifecycle: Mutex<()>,
    /// Serialises reconnect runs.
    reconnect_lock: Mutex<()>,
    link: Mutex<Link>,
    writer: Mutex<Option<WriterHalf>>,
    subscriptions: SubscriptionRegistry,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
    errors: StdMutex<Option<mpsc::Sender<UpbitError>>>,
}

impl Connection {
    /// Create an unconnected manager. Errors raised by background tasks
    /// (keepalive-triggered reconnects) are pushed to `errors`.
    pub fn new(
        endpoint: impl Into<String>,
        provider: Option<Arc<dyn TokenProvider>>,
        config: WsConfig,
        errors: mpsc::Sender<UpbitError>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Arc::new(Self {
            endpoint: endpoint.into(),
            provider,
            config,
            lifecycle: Mutex::new(()),
            reconnect_lock: Mutex::new(()),
            link: Mutex::new(Link {
                running: false,
                cancel: CancellationToken::new(),
                generation: 0,
                reader: None,
            }),
            writer: Mutex::new(None),
            subscriptions: SubscriptionRegistry::new(),
            state,
            shutdown: CancellationToken::new(),
            errors: StdMutex::new(Some(errors)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Directives replayed after every (re)connect.
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Whether a live link is installed.
    pub async fn is_running(&self) -> bool {
        self.link.lock().await.running
    }

    /// `true` once [`close`](Self::close) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Number of links dialled so far.
    pub async fn generation(&self) -> u64 {
        self.link.lock().await.generation
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(endpoint = %self.endpoint, from = %previous, to = %next, "State change");
        }
    }

    // -----------------------------------------------------------------------
    // Connect / close
    // -----------------------------------------------------------------------

    /// Dial the endpoint and send the accumulated subscriptions.
    ///
    /// A no-op while a link is already running.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(UpbitError::ConnectionClosed);
        }

        {
            let _guard = self.lifecycle.lock().await;
            if self.link.lock().await.running {
                return Ok(());
            }
            let previous = self.state();
            if let Err(e) = self.connect_locked().await {
                self.set_state(previous);
                return Err(e);
            }
        }

        if !self.subscriptions.is_empty() {
            self.send_subscriptions(None).await?;
        }
        Ok(())
    }

    async fn connect_locked(self: &Arc<Self>) -> Result<()> {
        if self.state() != ConnectionState::Reconnecting {
            self.set_state(ConnectionState::Connecting);
        }

        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|source| UpbitError::Dial {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        if let Some(provider) = &self.provider {
            let token = provider
                .generate_token()
                .map_err(|e| UpbitError::Auth(e.to_string()))?;
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| UpbitError::Auth(format!("token is not a valid header: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, _resp) = connect_async(request)
            .await
            .map_err(|source| UpbitError::Dial {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        let (write, read) = ws.split();
        *self.writer.lock().await = Some(write);

        let (cancel, generation) = {
            let mut link = self.link.lock().await;
            link.running = true;
            link.cancel = CancellationToken::new();
            link.generation += 1;
            link.reader = Some(read);
            (link.cancel.clone(), link.generation)
        };

        self.spawn_heartbeat(cancel, generation);
        self.set_state(ConnectionState::Open);

        tracing::info!(endpoint = %self.endpoint, generation, "WebSocket connected");
        Ok(())
    }

    /// Tear down the current link, if any, and move to `next`.
    async fn close_locked(&self, next: ConnectionState) {
        let was_running = {
            let mut link = self.link.lock().await;
            let was_running = link.running;
            link.running = false;
            link.cancel.cancel();
            link.reader = None;
            was_running
        };

        let writer = self.writer.lock().await.take();
        if let Some(mut w) = writer {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            };
            match w.send(Message::Close(Some(frame))).await {
                Ok(()) => {}
                Err(tungstenite::Error::AlreadyClosed | tungstenite::Error::ConnectionClosed) => {}
                Err(e) => {
                    tracing::debug!(endpoint = %self.endpoint, error = %e, "Close frame not delivered");
                }
            }
            let _ = w.close().await;
        }

        if was_running {
            tracing::info!(endpoint = %self.endpoint, next = %next, "WebSocket link closed");
        }
        self.set_state(next);
    }

    /// Shut the connection down for good.
    ///
    /// Cancels the heartbeat and any blocked read or ping, sends a normal
    /// closure frame, and stops the dispatcher. Calling it again is a no-op.
    pub async fn close(&self) -> Result<()> {
        self.shutdown.cancel();
        let _guard = self.lifecycle.lock().await;
        self.close_locked(ConnectionState::Closed).await;
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        Ok(())
    }

    /// Stop the given link after an unrecoverable read failure.
    pub(crate) async fn fail(&self, generation: u64) {
        let _guard = self.lifecycle.lock().await;
        if self.link.lock().await.generation == generation {
            self.close_locked(ConnectionState::Failed).await;
        }
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    async fn send_message(&self, msg: Message) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let w = guard.as_mut().ok_or(UpbitError::NotConnected)?;
        w.send(msg).await?;
        Ok(())
    }

    /// Send one text frame on the current link.
    pub async fn send_text(&self, text: String) -> Result<()> {
        let cancel = {
            let link = self.link.lock().await;
            if !link.running {
                return Err(UpbitError::NotConnected);
            }
            link.cancel.clone()
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(UpbitError::Cancelled),
            res = self.send_message(Message::Text(text.into())) => res,
        }
    }

    /// Send every accumulated directive as one request.
    pub async fn send_subscriptions(&self, ticket: Option<&str>) -> Result<()> {
        let frame = self.subscriptions.encode_request(ticket)?;
        tracing::debug!(
            endpoint = %self.endpoint,
            directives = self.subscriptions.len(),
            "Sending subscription request"
        );
        self.send_text(frame).await
    }

    /// Send one keepalive frame.
    pub async fn ping(&self) -> Result<()> {
        let cancel = {
            let link = self.link.lock().await;
            if !link.running {
                return Err(UpbitError::NotConnected);
            }
            link.cancel.clone()
        };
        let msg = match self.config.keepalive {
            Keepalive::Ping => Message::Ping(Bytes::new()),
            Keepalive::Text => Message::Text("PING".into()),
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(UpbitError::Cancelled),
            res = self.send_message(msg) => res,
        }
    }

    // -----------------------------------------------------------------------
    // Reconnect
    // -----------------------------------------------------------------------

    /// Replace the current link with a new one.
    ///
    /// Returns [`UpbitError::MaxRetriesExceeded`] (and moves to `Failed`) when
    /// the budget is spent, or [`UpbitError::SubscriptionRecovery`] when the
    /// link came back but the directives could not be resent.
    pub async fn reconnect(self: &Arc<Self>) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(UpbitError::ConnectionClosed);
        }
        let _serial = self.reconnect_lock.lock().await;
        let result = self.reconnect_attempts().await;
        if matches!(result, Err(UpbitError::MaxRetriesExceeded { .. })) {
            self.set_state(ConnectionState::Failed);
        }
        result
    }

    /// Recover the link identified by `generation` on behalf of a background
    /// task. Errors go to the error channel. Returns `true` if a live link is
    /// available afterwards.
    pub(crate) async fn recover(self: &Arc<Self>, generation: u64) -> bool {
        let _serial = self.reconnect_lock.lock().await;
        {
            let link = self.link.lock().await;
            if link.generation != generation {
                // Someone else already replaced this link.
                return link.running;
            }
        }
        if self.shutdown.is_cancelled() {
            return false;
        }

        match self.reconnect_attempts().await {
            Ok(()) => true,
            Err(UpbitError::Cancelled) => false,
            Err(e @ UpbitError::SubscriptionRecovery(_)) => {
                self.report(e).await;
                true
            }
            Err(e) => {
                tracing::error!(endpoint = %self.endpoint, error = %e, "Giving up on connection");
                self.set_state(ConnectionState::Failed);
                self.report(e).await;
                false
            }
        }
    }

    async fn reconnect_attempts(self: &Arc<Self>) -> Result<()> {
        let max = self.config.max_reconnect_attempts;
        self.set_state(ConnectionState::Reconnecting);

        for attempt in 1..=max {
            let wait = self.config.reconnect_wait * attempt;
            tracing::info!(
                endpoint = %self.endpoint,
                attempt,
                max,
                wait_ms = wait.as_millis() as u64,
                "Attempting reconnect..."
            );
            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(UpbitError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }

            let result = {
                let _guard = self.lifecycle.lock().await;
                if self.shutdown.is_cancelled() {
                    return Err(UpbitError::Cancelled);
                }
                self.close_locked(ConnectionState::Reconnecting).await;
                self.connect_locked().await
            };

            match result {
                Ok(()) => {
                    tracing::info!(endpoint = %self.endpoint, attempt, "Reconnected successfully");
                    if !self.subscriptions.is_empty() {
                        if let Err(e) = self.send_subscriptions(None).await {
                            tracing::warn!(
                                endpoint = %self.endpoint,
                                error = %e,
                                "Failed to resubscribe after reconnect"
                            );
                            return Err(UpbitError::SubscriptionRecovery(Box::new(e)));
                        }
                    }
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        attempt,
                        error = %e,
                        "Reconnect attempt failed"
                    );
                }
            }
        }

        // Budget spent (or zero): leave no half-live link behind.
        {
            let _guard = self.lifecycle.lock().await;
            if self.shutdown.is_cancelled() {
                return Err(UpbitError::Cancelled);
            }
            self.close_locked(ConnectionState::Failed).await;
        }
        Err(UpbitError::MaxRetriesExceeded { attempts: max })
    }

    // -----------------------------------------------------------------------
    // Background plumbing
    // -----------------------------------------------------------------------

    /// Push an error to the error channel, unless the connection is shut down.
    pub(crate) async fn report(&self, err: UpbitError) {
        let sender = self
            .errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(tx) = sender {
            tokio::select! {
                _ = self.shutdown.cancelled() => {}
                _ = tx.send(err) => {}
            }
        }
    }

    fn spawn_heartbeat(self: &Arc<Self>, cancel: CancellationToken, generation: u64) {
        let period = self.config.ping_interval;
        if period.is_zero() {
            return;
        }

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(conn) = weak.upgrade() else { break };

                match conn.ping().await {
                    Ok(()) => tracing::trace!(endpoint = %conn.endpoint, generation, "Keepalive sent"),
                    Err(_) if cancel.is_cancelled() => break,
                    Err(e) => {
                        tracing::warn!(
                            endpoint = %conn.endpoint,
                            generation,
                            error = %e,
                            "Keepalive failed"
                        );
                        conn.recover(generation).await;
                        break;
                    }
                }
            }
        });
    }

    /// Hand the next link's read half to the dispatcher.
    ///
    /// Waits through `Idle`, `Reconnecting` and `Failed` (the caller may
    /// reconnect explicitly). Returns `None` once the connection is shut down.
    pub(crate) async fn next_reader(&self) -> Option<LinkReader> {
        let mut state = self.state.subscribe();
        loop {
            state.borrow_and_update();
            {
                let mut link = self.link.lock().await;
                if link.running {
                    if let Some(reader) = link.reader.take() {
                        return Some(LinkReader {
                            reader,
                            cancel: link.cancel.clone(),
                            generation: link.generation,
                        });
                    }
                }
            }
            if self.shutdown.is_cancelled() {
                return None;
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                changed = state.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.link.get_mut().cancel.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("directives", &self.subscriptions.len())
            .finish()
    }
}
