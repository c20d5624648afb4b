#![allow(missing_docs)]
//! Typed records delivered by the Upbit WebSocket streams, and the frame
//! decoder that turns raw payloads into them.
//!
//! Every payload frame is a JSON object whose `type` field names the record.
//! Decoding peeks at that discriminator first and only then decodes the
//! concrete record, so an unknown type is reported without attempting a full
//! parse. The server's heartbeat acknowledgement `{"status":"UP"}` is
//! recognised here and never becomes a record.
//!
//! Numeric fields the server always sends (`code`, prices, `timestamp`) are
//! required; a frame that lacks them, or carries them with the wrong JSON type,
//! fails to decode. Everything else defaults.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, UpbitError};
use crate::types::enums::{
    AskBid, Change, MarketState, MarketWarning, OrderState, OrderType, StreamType, TimeInForce,
};
use crate::types::quotation::OrderbookUnit;
use crate::ws::subscription::StreamKind;

fn millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Current-price update (`type: "ticker"`).
#[derive(Debug, Clone, Deserialize)]
pub struct Ticker {
    pub code: String,
    #[serde(default)]
    pub opening_price: f64,
    #[serde(default)]
    pub high_price: f64,
    #[serde(default)]
    pub low_price: f64,
    pub trade_price: f64,
    #[serde(default)]
    pub prev_closing_price: f64,
    #[serde(default)]
    pub change: Option<Change>,
    #[serde(default)]
    pub change_price: f64,
    #[serde(default)]
    pub signed_change_price: f64,
    #[serde(default)]
    pub change_rate: f64,
    #[serde(default)]
    pub signed_change_rate: f64,
    #[serde(default)]
    pub trade_volume: f64,
    #[serde(default)]
    pub acc_trade_volume: f64,
    #[serde(default)]
    pub acc_trade_volume_24h: f64,
    #[serde(default)]
    pub acc_trade_price: f64,
    #[serde(default)]
    pub acc_trade_price_24h: f64,
    #[serde(default)]
    pub trade_date: String,
    #[serde(default)]
    pub trade_time: String,
    #[serde(default)]
    pub trade_timestamp: i64,
    #[serde(default)]
    pub ask_bid: Option<AskBid>,
    #[serde(default)]
    pub acc_ask_volume: f64,
    #[serde(default)]
    pub acc_bid_volume: f64,
    #[serde(default)]
    pub highest_52_week_price: f64,
    #[serde(default)]
    pub highest_52_week_date: String,
    #[serde(default)]
    pub lowest_52_week_price: f64,
    #[serde(default)]
    pub lowest_52_week_date: String,
    #[serde(default)]
    pub market_state: Option<MarketState>,
    #[serde(default)]
    pub market_warning: Option<MarketWarning>,
    pub timestamp: i64,
    #[serde(default)]
    pub stream_type: Option<StreamType>,
}

impl Ticker {
    /// Time of the last trade.
    pub fn trade_at(&self) -> Option<DateTime<Utc>> {
        millis(self.trade_timestamp)
    }

    /// Time the update was generated.
    pub fn timestamp_at(&self) -> Option<DateTime<Utc>> {
        millis(self.timestamp)
    }
}

// ---------------------------------------------------------------------------
// Orderbook
// ---------------------------------------------------------------------------

/// Order book update (`type: "orderbook"`).
#[derive(Debug, Clone, Deserialize)]
pub struct Orderbook {
    pub code: String,
    #[serde(default)]
    pub total_ask_size: f64,
    #[serde(default)]
    pub total_bid_size: f64,
    pub orderbook_units: Vec<OrderbookUnit>,
    pub timestamp: i64,
    /// Aggregation level; `0` when the book is not aggregated.
    #[serde(default)]
    pub level: f64,
    #[serde(default)]
    pub stream_type: Option<StreamType>,
}

impl Orderbook {
    pub fn timestamp_at(&self) -> Option<DateTime<Utc>> {
        millis(self.timestamp)
    }

    /// Best bid and ask, from the first unit.
    pub fn best(&self) -> Option<&OrderbookUnit> {
        self.orderbook_units.first()
    }
}

// ---------------------------------------------------------------------------
// Trade
// ---------------------------------------------------------------------------

/// Fill on the public tape (`type: "trade"`).
#[derive(Debug, Clone, Deserialize)]
pub struct Trade {
    pub code: String,
    pub trade_price: f64,
    pub trade_volume: f64,
    #[serde(default)]
    pub ask_bid: Option<AskBid>,
    #[serde(default)]
    pub prev_closing_price: f64,
    #[serde(default)]
    pub change: Option<Change>,
    #[serde(default)]
    pub change_price: f64,
    #[serde(default)]
    pub trade_date: String,
    #[serde(default)]
    pub trade_time: String,
    #[serde(default)]
    pub trade_timestamp: i64,
    pub timestamp: i64,
    /// Unique per fill; use it to de-duplicate across reconnects.
    #[serde(default)]
    pub sequential_id: i64,
    #[serde(default)]
    pub stream_type: Option<StreamType>,
}

impl Trade {
    pub fn trade_at(&self) -> Option<DateTime<Utc>> {
        millis(self.trade_timestamp)
    }

    pub fn timestamp_at(&self) -> Option<DateTime<Utc>> {
        millis(self.timestamp)
    }
}

// ---------------------------------------------------------------------------
// MyOrder
// ---------------------------------------------------------------------------

/// Private order / fill update (`type: "myOrder"`).
#[derive(Debug, Clone, Deserialize)]
pub struct MyOrder {
    pub code: String,
    pub uuid: String,
    #[serde(default)]
    pub ask_bid: Option<AskBid>,
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub state: Option<OrderState>,
    /// Present when `state` is `trade`.
    #[serde(default)]
    pub trade_uuid: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub remaining_volume: f64,
    #[serde(default)]
    pub executed_volume: f64,
    #[serde(default)]
    pub trades_count: u32,
    #[serde(default)]
    pub reserved_fee: f64,
    #[serde(default)]
    pub remaining_fee: f64,
    #[serde(default)]
    pub paid_fee: f64,
    #[serde(default)]
    pub locked: f64,
    #[serde(default)]
    pub executed_funds: f64,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub trade_timestamp: Option<i64>,
    #[serde(default)]
    pub order_timestamp: i64,
    pub timestamp: i64,
    #[serde(default)]
    pub stream_type: Option<StreamType>,
}

impl MyOrder {
    pub fn trade_at(&self) -> Option<DateTime<Utc>> {
        self.trade_timestamp.and_then(millis)
    }

    pub fn order_at(&self) -> Option<DateTime<Utc>> {
        millis(self.order_timestamp)
    }

    pub fn timestamp_at(&self) -> Option<DateTime<Utc>> {
        millis(self.timestamp)
    }
}

// ---------------------------------------------------------------------------
// MyAsset
// ---------------------------------------------------------------------------

/// One currency balance inside a [`MyAsset`] update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Asset {
    pub currency: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub locked: f64,
}

/// Private balance update (`type: "myAsset"`).
#[derive(Debug, Clone, Deserialize)]
pub struct MyAsset {
    pub asset_uuid: String,
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub asset_timestamp: i64,
    pub timestamp: i64,
    #[serde(default)]
    pub stream_type: Option<StreamType>,
}

impl MyAsset {
    pub fn asset_at(&self) -> Option<DateTime<Utc>> {
        millis(self.asset_timestamp)
    }

    pub fn timestamp_at(&self) -> Option<DateTime<Utc>> {
        millis(self.timestamp)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A decoded payload, one variant per streamable record type.
#[derive(Debug, Clone)]
pub enum Record {
    Ticker(Ticker),
    Orderbook(Orderbook),
    Trade(Trade),
    MyOrder(MyOrder),
    MyAsset(MyAsset),
}

impl Record {
    /// The stream this record belongs to.
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Ticker(_) => StreamKind::Ticker,
            Self::Orderbook(_) => StreamKind::Orderbook,
            Self::Trade(_) => StreamKind::Trade,
            Self::MyOrder(_) => StreamKind::MyOrder,
            Self::MyAsset(_) => StreamKind::MyAsset,
        }
    }
}

/// Result of decoding one inbound frame.
#[derive(Debug)]
pub(crate) enum Frame {
    /// Heartbeat acknowledgement, to be discarded.
    Status,
    Record(Record),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn decode_as<'a, T: Deserialize<'a>>(kind: StreamKind, data: &'a [u8]) -> Result<T> {
    serde_json::from_slice(data)
        .map_err(|e| UpbitError::Decode(format!("invalid {} payload: {e}", kind.as_str())))
}

/// Decode one inbound payload.
///
/// Returns [`Frame::Status`] for `{"status":"UP"}`. Malformed JSON, a missing
/// or unknown `type`, and fields of the wrong shape are all
/// [`UpbitError::Decode`].
pub(crate) fn decode_frame(data: &[u8]) -> Result<Frame> {
    let envelope: Envelope = serde_json::from_slice(data)
        .map_err(|e| UpbitError::Decode(format!("invalid frame: {e}")))?;

    let Some(tag) = envelope.kind else {
        if envelope.status.as_deref() == Some("UP") {
            return Ok(Frame::Status);
        }
        return Err(UpbitError::Decode("frame has no type field".into()));
    };

    let kind = StreamKind::from_wire(&tag)
        .ok_or_else(|| UpbitError::Decode(format!("unknown message type: {tag}")))?;

    let record = match kind {
        StreamKind::Ticker => Record::Ticker(decode_as(kind, data)?),
        StreamKind::Orderbook => Record::Orderbook(decode_as(kind, data)?),
        StreamKind::Trade => Record::Trade(decode_as(kind, data)?),
        StreamKind::MyOrder => Record::MyOrder(decode_as(kind, data)?),
        StreamKind::MyAsset => Record::MyAsset(decode_as(kind, data)?),
    };
    Ok(Frame::Record(record))
}
