//! Client for the public quotation streams: ticker, orderbook and trade.
//!
//! # Example
//!
//! ```no_run
//! use upbit_rs::ws::{StreamKind, SubscribeOptions, WsClientBuilder};
//!
//! # #[tokio::main]
//! # async fn main() -> upbit_rs::Result<()> {
//! let mut client = WsClientBuilder::new().build_public();
//! client.add_subscription(StreamKind::Ticker, ["KRW-BTC", "KRW-ETH"], SubscribeOptions::default())?;
//! client.add_subscription(StreamKind::Trade, ["KRW-BTC"], SubscribeOptions::default())?;
//! client.connect().await?;
//!
//! loop {
//!     let ticker = client.next_ticker().await?;
//!     println!("{} {}", ticker.code, ticker.trade_price);
//! }
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::{Result, UpbitError};
use crate::ws::connection::{Connection, ConnectionState};
use crate::ws::dispatcher::{ChannelSet, DispatcherHandle};
use crate::ws::message::{Orderbook, Ticker, Trade};
use crate::ws::next_record;
use crate::ws::subscription::{Directive, StreamKind, SubscribeOptions};

/// Public WebSocket client.
///
/// Built with [`WsClientBuilder::build_public`](crate::ws::WsClientBuilder::build_public).
/// Each `next_*` accessor waits for the next record of its type or the next
/// error, whichever comes first. Records of one type arrive in wire order.
pub struct PublicClient {
    conn: Arc<Connection>,
    dispatcher: DispatcherHandle,
    errors: mpsc::Receiver<UpbitError>,
    ticker: mpsc::Receiver<Ticker>,
    orderbook: mpsc::Receiver<Orderbook>,
    trade: mpsc::Receiver<Trade>,
}

impl PublicClient {
    pub(crate) fn new(
        conn: Arc<Connection>,
        errors_tx: mpsc::Sender<UpbitError>,
        errors: mpsc::Receiver<UpbitError>,
    ) -> Self {
        let capacity = conn.config().channel_capacity;
        let (ticker_tx, ticker) = mpsc::channel(capacity);
        let (orderbook_tx, orderbook) = mpsc::channel(capacity);
        let (trade_tx, trade) = mpsc::channel(capacity);

        let mut channels = ChannelSet::new(errors_tx);
        channels.ticker = Some(ticker_tx);
        channels.orderbook = Some(orderbook_tx);
        channels.trade = Some(trade_tx);

        Self {
            dispatcher: DispatcherHandle::new(Arc::clone(&conn), channels),
            conn,
            errors,
            ticker,
            orderbook,
            trade,
        }
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Queue a directive to be sent on connect and after every reconnect.
    ///
    /// At least one market code is required. Nothing is sent until
    /// [`connect`](Self::connect).
    pub fn add_subscription<I, S>(
        &self,
        kind: StreamKind,
        codes: I,
        options: SubscribeOptions,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if kind.is_private() {
            return Err(UpbitError::InvalidArgument(format!(
                "{kind} is served on the private endpoint"
            )));
        }
        let directive = Directive::new(kind, codes, options)?;
        self.conn.subscriptions().add(directive);
        Ok(())
    }

    /// Queue a directive and, if connected, resend the full subscription list.
    pub async fn subscribe<I, S>(
        &self,
        kind: StreamKind,
        codes: I,
        options: SubscribeOptions,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_subscription(kind, codes, options)?;
        if self.conn.is_running().await {
            self.conn.send_subscriptions(None).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Connect, send the queued subscriptions and start dispatching.
    pub async fn connect(&self) -> Result<()> {
        self.dispatcher.ensure_started();
        self.conn.connect().await
    }

    /// Shut down. Buffered records stay readable; afterwards every accessor
    /// returns [`UpbitError::ConnectionClosed`].
    pub async fn close(&self) -> Result<()> {
        self.dispatcher.discard_pending();
        self.conn.close().await
    }

    /// Force a reconnect with the configured backoff.
    pub async fn reconnect(&self) -> Result<()> {
        self.dispatcher.ensure_started();
        self.conn.reconnect().await
    }

    /// Send one keepalive frame.
    pub async fn ping(&self) -> Result<()> {
        self.conn.ping().await
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.conn.watch_state()
    }

    pub async fn is_running(&self) -> bool {
        self.conn.is_running().await
    }

    /// The underlying connection, for controlling it from another task.
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.conn)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Next ticker update, or the next error.
    pub async fn next_ticker(&mut self) -> Result<Ticker> {
        next_record(&mut self.errors, &mut self.ticker).await
    }

    /// Next orderbook update, or the next error.
    pub async fn next_orderbook(&mut self) -> Result<Orderbook> {
        next_record(&mut self.errors, &mut self.orderbook).await
    }

    /// Next public trade, or the next error.
    pub async fn next_trade(&mut self) -> Result<Trade> {
        next_record(&mut self.errors, &mut self.trade).await
    }
}

impl std::fmt::Debug for PublicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicClient").field("conn", &self.conn).finish()
    }
}
