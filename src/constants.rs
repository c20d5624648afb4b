//! Constants for the Upbit API.
//!
//! Contains base URLs, WebSocket endpoints, connection defaults and request
//! limits. These are used internally by [`UpbitClient`](crate::client::UpbitClient)
//! and the WebSocket clients, but are also exported for advanced usage.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Base URLs
// ---------------------------------------------------------------------------

/// Base URL for the Upbit REST API.
pub const API_BASE_URL: &str = "https://api.upbit.com";

// ---------------------------------------------------------------------------
// WebSocket URLs
// ---------------------------------------------------------------------------

/// WebSocket endpoint for public quotation streams (ticker, trade, orderbook).
pub const WS_PUBLIC_URL: &str = "wss://api.upbit.com/websocket/v1";

/// WebSocket endpoint for private streams (myOrder, myAsset).
pub const WS_PRIVATE_URL: &str = "wss://api.upbit.com/websocket/v1/private";

// ---------------------------------------------------------------------------
// WebSocket defaults
// ---------------------------------------------------------------------------

/// Market code separator, as in `KRW-BTC`.
pub const MARKET_SEPARATOR: char = '-';

/// The server drops connections that stay idle for 120 seconds.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Reconnect attempts made before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base wait between reconnect attempts; attempt `n` waits `n` times this.
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_secs(3);

/// Capacity of every per-type record channel and of the error channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

// ---------------------------------------------------------------------------
// Request limits
// ---------------------------------------------------------------------------

/// Request limits enforced client-side before hitting the REST API.
pub mod limits {
    /// Maximum candles per request.
    pub const MAX_CANDLES_PER_REQUEST: u32 = 200;
    /// Maximum trade ticks per request.
    pub const MAX_TRADES_PER_REQUEST: u32 = 500;
    /// Trade ticks can be fetched at most this many days back.
    pub const MAX_TRADES_DAYS_AGO: u32 = 7;
    /// Maximum open orders per page.
    pub const MAX_OPEN_ORDERS_PER_PAGE: u32 = 100;
    /// Maximum closed orders per request.
    pub const MAX_CLOSED_ORDERS_PER_REQUEST: u32 = 1000;
    /// Widest `start_time`..`end_time` window for closed orders, in days.
    pub const MAX_CLOSED_ORDERS_WINDOW_DAYS: i64 = 7;
    /// Maximum uuids or identifiers per order lookup.
    pub const MAX_ORDER_IDS_PER_REQUEST: usize = 100;
    /// Supported minute-candle units.
    pub const MINUTE_CANDLE_UNITS: [u32; 8] = [1, 3, 5, 10, 15, 30, 60, 240];
}
