//! Client for the private account streams: `myOrder` and `myAsset`.
//!
//! The private endpoint requires credentials; every dial carries a freshly
//! signed token.
//!
//! # Example
//!
//! ```no_run
//! use upbit_rs::ws::{SubscribeOptions, WsClientBuilder};
//!
//! # #[tokio::main]
//! # async fn main() -> upbit_rs::Result<()> {
//! let mut client = WsClientBuilder::new()
//!     .credentials("access-key", "secret-key")
//!     .build_private()?;
//! client.add_my_orders(Vec::<String>::new(), SubscribeOptions::default())?;
//! client.add_my_assets(SubscribeOptions::default())?;
//! client.connect().await?;
//!
//! let order = client.next_my_order().await?;
//! println!("{} {:?}", order.uuid, order.state);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::{Result, UpbitError};
use crate::ws::connection::{Connection, ConnectionState};
use crate::ws::dispatcher::{ChannelSet, DispatcherHandle};
use crate::ws::message::{MyAsset, MyOrder};
use crate::ws::next_record;
use crate::ws::subscription::{Directive, StreamKind, SubscribeOptions};

/// Private WebSocket client.
///
/// Built with [`WsClientBuilder::build_private`](crate::ws::WsClientBuilder::build_private).
pub struct PrivateClient {
    conn: Arc<Connection>,
    dispatcher: DispatcherHandle,
    errors: mpsc::Receiver<UpbitError>,
    my_order: mpsc::Receiver<MyOrder>,
    my_asset: mpsc::Receiver<MyAsset>,
}

impl PrivateClient {
    pub(crate) fn new(
        conn: Arc<Connection>,
        errors_tx: mpsc::Sender<UpbitError>,
        errors: mpsc::Receiver<UpbitError>,
    ) -> Self {
        let capacity = conn.config().channel_capacity;
        let (my_order_tx, my_order) = mpsc::channel(capacity);
        let (my_asset_tx, my_asset) = mpsc::channel(capacity);

        let mut channels = ChannelSet::new(errors_tx);
        channels.my_order = Some(my_order_tx);
        channels.my_asset = Some(my_asset_tx);

        Self {
            dispatcher: DispatcherHandle::new(Arc::clone(&conn), channels),
            conn,
            errors,
            my_order,
            my_asset,
        }
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Queue a private directive.
    ///
    /// `myOrder` takes optional market codes (none means every market).
    /// `myAsset` is account-wide and rejects any code.
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
        if !kind.is_private() {
            return Err(UpbitError::InvalidArgument(format!(
                "{kind} is served on the public endpoint"
            )));
        }
        let directive = Directive::new(kind, codes, options)?;
        self.conn.subscriptions().add(directive);
        Ok(())
    }

    /// Queue a `myOrder` directive.
    pub fn add_my_orders<I, S>(&self, codes: I, options: SubscribeOptions) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_subscription(StreamKind::MyOrder, codes, options)
    }

    /// Queue a `myAsset` directive.
    pub fn add_my_assets(&self, options: SubscribeOptions) -> Result<()> {
        self.add_subscription(StreamKind::MyAsset, std::iter::empty::<&str>(), options)
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

    pub async fn connect(&self) -> Result<()> {
        self.dispatcher.ensure_started();
        self.conn.connect().await
    }

    pub async fn close(&self) -> Result<()> {
        self.dispatcher.discard_pending();
        self.conn.close().await
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.dispatcher.ensure_started();
        self.conn.reconnect().await
    }

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

    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.conn)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Next order or fill update, or the next error.
    pub async fn next_my_order(&mut self) -> Result<MyOrder> {
        next_record(&mut self.errors, &mut self.my_order).await
    }

    /// Next balance update, or the next error.
    pub async fn next_my_asset(&mut self) -> Result<MyAsset> {
        next_record(&mut self.errors, &mut self.my_asset).await
    }
}

impl std::fmt::Debug for PrivateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateClient").field("conn", &self.conn).finish()
    }
}
