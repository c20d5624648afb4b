//! Shared enum types that map directly to Upbit API string values.
//!
//! Variant names match the JSON wire format exactly (the WebSocket streams use
//! upper-case values, the exchange REST endpoints lower-case ones), so we
//! suppress the Rust naming convention lint.
//!
//! Enums that appear in responses carry an `Unknown` catch-all, so a value
//! added on the server side does not make the whole record undecodable.
#![allow(non_camel_case_types)]

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ask / Bid (WebSocket streams)
// ---------------------------------------------------------------------------

/// Aggressor side of a trade, as reported by the streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AskBid {
    /// Sell.
    ASK,
    /// Buy.
    BID,
    /// Value introduced by the server after this crate was written.
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

/// Direction of the price change against the previous close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Change {
    RISE,
    EVEN,
    FALL,
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Market state / warning
// ---------------------------------------------------------------------------

/// Trading status of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketState {
    /// Deposits open, trading not yet supported.
    PREVIEW,
    /// Trading supported.
    ACTIVE,
    /// Trading ended.
    DELISTED,
    #[serde(other)]
    Unknown,
}

/// Investment warning flag on a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketWarning {
    NONE,
    CAUTION,
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Stream type
// ---------------------------------------------------------------------------

/// Whether a streamed record is the initial snapshot or a live update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamType {
    SNAPSHOT,
    REALTIME,
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Order side (exchange REST)
// ---------------------------------------------------------------------------

/// Side of an order on the exchange REST endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy.
    bid,
    /// Sell.
    ask,
}

impl OrderSide {
    /// Wire value, used when building query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::bid => "bid",
            Self::ask => "ask",
        }
    }
}

// ---------------------------------------------------------------------------
// Order type
// ---------------------------------------------------------------------------

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Limit order; needs `volume` and `price`.
    limit,
    /// Market buy; needs `price` (total spend) only.
    price,
    /// Market sell; needs `volume` only.
    market,
    /// Best-price limit order; needs `time_in_force`.
    best,
    #[serde(other)]
    Unknown,
}

impl OrderType {
    /// Wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::limit => "limit",
            Self::price => "price",
            Self::market => "market",
            Self::best => "best",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Order state
// ---------------------------------------------------------------------------

/// Lifecycle state of an order.
///
/// `trade` only appears on the `myOrder` stream, when a fill happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    wait,
    watch,
    trade,
    done,
    cancel,
    /// Cancelled by self-match prevention.
    prevented,
    /// Value introduced by the server after this crate was written.
    #[serde(other)]
    Unknown,
}

impl OrderState {
    /// Wire value, used when building query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::wait => "wait",
            Self::watch => "watch",
            Self::trade => "trade",
            Self::done => "done",
            Self::cancel => "cancel",
            Self::prevented => "prevented",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Time in force
// ---------------------------------------------------------------------------

/// Execution condition of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Immediate or cancel.
    ioc,
    /// Fill or kill.
    fok,
    /// Maker only; cancelled if it would take.
    post_only,
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Sort order
// ---------------------------------------------------------------------------

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    asc,
    desc,
}

impl SortOrder {
    /// Wire value, used when building query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::asc => "asc",
            Self::desc => "desc",
        }
    }
}
