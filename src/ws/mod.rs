//! WebSocket streaming for Upbit.
//!
//! Upbit exposes two WebSocket endpoints:
//!
//! ## [`public`]: quotation streams
//!
//! `wss://api.upbit.com/websocket/v1` serves `ticker`, `orderbook` and
//! `trade` for any market. No credentials are needed.
//!
//! ## [`private`]: account streams
//!
//! `wss://api.upbit.com/websocket/v1/private` serves `myOrder` (order and
//! fill updates) and `myAsset` (balance changes). Every dial carries a
//! signed JWT in the `Authorization` header.
//!
//! ## Architecture
//!
//! Each client owns one [`Connection`](connection::Connection) and one
//! dispatcher task. The connection dials, keeps the link alive with a
//! periodic ping, and reconnects with linear backoff when the link drops,
//! replaying every subscription directive afterwards. The dispatcher reads
//! frames, decodes them by their `type` field and pushes each record to a
//! bounded channel for its type. Errors from background work go to a
//! separate channel that every `next_*` accessor also watches.
//!
//! ## Limits
//!
//! - The server drops a link after 120 s without traffic.
//! - Subscriptions cannot be removed; a new request replaces the previous
//!   one, so the whole list is always sent.

use tokio::sync::mpsc;

use crate::error::{Result, UpbitError};

pub mod builder;
pub mod connection;
pub(crate) mod dispatcher;
pub mod message;
pub mod private;
pub mod public;
pub mod subscription;

pub use builder::WsClientBuilder;
pub use connection::{Connection, ConnectionState, Keepalive, WsConfig};
pub use message::{Asset, MyAsset, MyOrder, Orderbook, Record, Ticker, Trade};
pub use private::PrivateClient;
pub use public::PublicClient;
pub use subscription::{CodePolicy, Directive, StreamKind, SubscribeOptions, SubscriptionRegistry};

/// Wait for the next record or the next error, whichever arrives first.
///
/// Both channels close when the client shuts down; buffered items are still
/// drained before [`UpbitError::ConnectionClosed`] is returned.
pub(crate) async fn next_record<T>(
    errors: &mut mpsc::Receiver<UpbitError>,
    records: &mut mpsc::Receiver<T>,
) -> Result<T> {
    tokio::select! {
        Some(err) = errors.recv() => Err(err),
        Some(record) = records.recv() => Ok(record),
        else => Err(UpbitError::ConnectionClosed),
    }
}
