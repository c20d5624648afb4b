//! The read loop that demultiplexes one socket into typed channels.
//!
//! One dispatcher task runs per client for the client's whole life. It takes
//! the read half of each link the [`Connection`] dials, decodes every payload
//! frame, and forwards the record to the channel for its type. Sends wait for
//! space, so a slow consumer slows the reader instead of losing records.
//!
//! Link loss (close frame, stream end, transport error) triggers one
//! reconnect. If the very next link is lost again before it delivers a single
//! frame of any kind (pongs and `{"status":"UP"}` count), the dispatcher
//! reports a fatal [`UpbitError::Read`], marks the connection failed and waits
//! for the caller to reconnect or close.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::error::UpbitError;
use crate::ws::connection::{Connection, LinkReader};
use crate::ws::message::{Frame, MyAsset, MyOrder, Orderbook, Record, Ticker, Trade, decode_frame};

// ---------------------------------------------------------------------------
// Channel set
// ---------------------------------------------------------------------------

/// Senders for the record types a client serves, plus the error channel.
///
/// A record whose type has no sender here is reported as a decode error.
pub(crate) struct ChannelSet {
    pub ticker: Option<mpsc::Sender<Ticker>>,
    pub orderbook: Option<mpsc::Sender<Orderbook>>,
    pub trade: Option<mpsc::Sender<Trade>>,
    pub my_order: Option<mpsc::Sender<MyOrder>>,
    pub my_asset: Option<mpsc::Sender<MyAsset>>,
    pub errors: mpsc::Sender<UpbitError>,
}

impl ChannelSet {
    pub fn new(errors: mpsc::Sender<UpbitError>) -> Self {
        Self {
            ticker: None,
            orderbook: None,
            trade: None,
            my_order: None,
            my_asset: None,
            errors,
        }
    }
}

async fn deliver<T>(tx: &mpsc::Sender<T>, item: T, shutdown: &CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tx.send(item) => {}
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

struct Dispatcher {
    conn: Arc<Connection>,
    channels: ChannelSet,
    shutdown: CancellationToken,
}

impl Dispatcher {
    async fn report(&self, err: UpbitError) {
        deliver(&self.channels.errors, err, &self.shutdown).await;
    }

    async fn route<T>(&self, tx: &Option<mpsc::Sender<T>>, record: T) -> bool {
        match tx {
            Some(tx) => {
                deliver(tx, record, &self.shutdown).await;
                true
            }
            None => false,
        }
    }

    /// Decode one payload and route it. Failures go to the error channel.
    async fn dispatch(&self, data: &[u8]) {
        let record = match decode_frame(data) {
            Ok(Frame::Status) => return,
            Ok(Frame::Record(record)) => record,
            Err(e) => {
                tracing::warn!(endpoint = %self.conn.endpoint(), error = %e, "Failed to decode frame");
                self.report(e).await;
                return;
            }
        };

        let kind = record.kind();
        let c = &self.channels;
        let routed = match record {
            Record::Ticker(r) => self.route(&c.ticker, r).await,
            Record::Orderbook(r) => self.route(&c.orderbook, r).await,
            Record::Trade(r) => self.route(&c.trade, r).await,
            Record::MyOrder(r) => self.route(&c.my_order, r).await,
            Record::MyAsset(r) => self.route(&c.my_asset, r).await,
        };

        if !routed {
            self.report(UpbitError::Decode(format!(
                "unexpected {kind} message on this connection"
            )))
            .await;
        }
    }

    async fn run(self) {
        let endpoint = self.conn.endpoint().to_owned();
        let mut after_reconnect = false;

        'links: while let Some(link) = self.conn.next_reader().await {
            let LinkReader {
                mut reader,
                cancel,
                generation,
            } = link;
            tracing::debug!(endpoint = %endpoint, generation, "Dispatcher attached to link");

            let lost = loop {
                let frame = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => continue 'links,
                    frame = reader.next() => frame,
                };

                if matches!(frame, Some(Ok(ref msg)) if !msg.is_close()) {
                    // Any traffic, keepalive replies included, proves the new link.
                    after_reconnect = false;
                }

                match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_bytes()).await,
                    Some(Ok(Message::Binary(data))) => self.dispatch(&data).await,
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(endpoint = %endpoint, generation, ?frame, "WebSocket closed by server");
                        break "closed by server".to_owned();
                    }
                    Some(Err(e)) => {
                        tracing::warn!(endpoint = %endpoint, generation, error = %e, "WebSocket read error");
                        break e.to_string();
                    }
                    None => {
                        tracing::info!(endpoint = %endpoint, generation, "WebSocket stream ended");
                        break "stream ended".to_owned();
                    }
                }
            };
            drop(reader);

            if cancel.is_cancelled() {
                // Torn down locally while the read was completing.
                continue;
            }

            if after_reconnect {
                tracing::error!(endpoint = %endpoint, generation, reason = %lost, "Link lost again right after reconnect");
                self.conn.fail(generation).await;
                self.report(UpbitError::Read(lost)).await;
                after_reconnect = false;
                continue;
            }

            after_reconnect = self.conn.recover(generation).await;
        }

        tracing::debug!(endpoint = %endpoint, "Dispatcher stopped");
    }
}

// ---------------------------------------------------------------------------
// Task handle
// ---------------------------------------------------------------------------

/// Owns the dispatcher task of one client.
///
/// The task is spawned lazily on the first connect, so clients can be built
/// outside a runtime. Dropping the handle aborts the task.
pub(crate) struct DispatcherHandle {
    conn: Arc<Connection>,
    pending: Mutex<Option<ChannelSet>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DispatcherHandle {
    pub fn new(conn: Arc<Connection>, channels: ChannelSet) -> Self {
        Self {
            conn,
            pending: Mutex::new(Some(channels)),
            task: Mutex::new(None),
        }
    }

    /// Spawn the task if it has not been spawned yet.
    pub fn ensure_started(&self) {
        let Some(channels) = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };
        let dispatcher = Dispatcher {
            conn: Arc::clone(&self.conn),
            shutdown: self.conn.shutdown_token(),
            channels,
        };
        let task = tokio::spawn(dispatcher.run());
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
    }

    /// Drop the unspawned senders so receivers observe the shutdown.
    pub fn discard_pending(&self) {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }
}
