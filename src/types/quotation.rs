#![allow(missing_docs)]
//! Quotation types: markets, tickers, order books, trade ticks and candles.
//!
//! These endpoints are public and need no credentials.

use serde::{Deserialize, Serialize};

use crate::types::enums::{AskBid, Change};

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Caution flags attached to a market when `is_details=true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketCaution {
    #[serde(rename = "PRICE_FLUCTUATIONS", default)]
    pub price_fluctuations: bool,
    #[serde(rename = "TRADING_VOLUME_SOARING", default)]
    pub trading_volume_soaring: bool,
    #[serde(rename = "DEPOSIT_AMOUNT_SOARING", default)]
    pub deposit_amount_soaring: bool,
    #[serde(rename = "GLOBAL_PRICE_DIFFERENCES", default)]
    pub global_price_differences: bool,
    #[serde(rename = "CONCENTRATION_OF_SMALL_ACCOUNTS", default)]
    pub concentration_of_small_accounts: bool,
}

/// Market event flags.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketEvent {
    pub warning: bool,
    #[serde(default)]
    pub caution: MarketCaution,
}

/// One tradable market from `GET /v1/market/all`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketInfo {
    /// Market code, e.g. `KRW-BTC`.
    pub market: String,
    pub korean_name: String,
    pub english_name: String,
    /// Only present with `is_details=true`.
    #[serde(default)]
    pub market_warning: Option<String>,
    #[serde(default)]
    pub market_event: Option<MarketEvent>,
}

// ---------------------------------------------------------------------------
// Ticker snapshot
// ---------------------------------------------------------------------------

/// Current price snapshot from `GET /v1/ticker`.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerSnapshot {
    pub market: String,
    pub trade_date: String,
    pub trade_time: String,
    #[serde(default)]
    pub trade_date_kst: String,
    #[serde(default)]
    pub trade_time_kst: String,
    pub trade_timestamp: i64,
    pub opening_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub trade_price: f64,
    pub prev_closing_price: f64,
    pub change: Change,
    pub change_price: f64,
    pub change_rate: f64,
    pub signed_change_price: f64,
    pub signed_change_rate: f64,
    pub trade_volume: f64,
    pub acc_trade_price: f64,
    pub acc_trade_price_24h: f64,
    pub acc_trade_volume: f64,
    pub acc_trade_volume_24h: f64,
    #[serde(default)]
    pub highest_52_week_price: f64,
    #[serde(default)]
    pub highest_52_week_date: String,
    #[serde(default)]
    pub lowest_52_week_price: f64,
    #[serde(default)]
    pub lowest_52_week_date: String,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Order book snapshot
// ---------------------------------------------------------------------------

/// One price level of an order book (shared with the orderbook stream).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderbookUnit {
    pub ask_price: f64,
    pub bid_price: f64,
    pub ask_size: f64,
    pub bid_size: f64,
}

/// Order book snapshot from `GET /v1/orderbook`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookSnapshot {
    pub market: String,
    pub timestamp: i64,
    pub total_ask_size: f64,
    pub total_bid_size: f64,
    pub orderbook_units: Vec<OrderbookUnit>,
    #[serde(default)]
    pub level: f64,
}

/// Grouping levels one market accepts for `level` (KRW markets only; other
/// markets report just `0`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupportedLevels {
    pub market: String,
    pub supported_levels: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Trade ticks
// ---------------------------------------------------------------------------

/// Query for `GET /v1/trades/ticks`.
#[derive(Debug, Clone, Default)]
pub struct TradesRequest {
    /// Market code (required).
    pub market: String,
    /// Last fill time, `HHmmss` or `HH:mm:ss`.
    pub to: Option<String>,
    /// Number of ticks, capped at 500.
    pub count: Option<u32>,
    /// Pagination cursor (`sequential_id`).
    pub cursor: Option<String>,
    /// Days back, 1 to 7.
    pub days_ago: Option<u32>,
}

impl TradesRequest {
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            ..Self::default()
        }
    }
}

/// One trade tick.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeTick {
    pub market: String,
    pub trade_date_utc: String,
    pub trade_time_utc: String,
    pub timestamp: i64,
    pub trade_price: f64,
    pub trade_volume: f64,
    pub prev_closing_price: f64,
    pub change_price: f64,
    pub ask_bid: AskBid,
    pub sequential_id: i64,
}

// ---------------------------------------------------------------------------
// Candles
// ---------------------------------------------------------------------------

/// Query for the candle endpoints.
#[derive(Debug, Clone, Default)]
pub struct CandleRequest {
    /// Market code (required).
    pub market: String,
    /// Last candle time (exclusive), ISO 8601.
    pub to: Option<String>,
    /// Number of candles, capped at 200.
    pub count: Option<u32>,
    /// Day candles only: quote currency to convert the close into (e.g. `KRW`).
    pub converting_price_unit: Option<String>,
}

impl CandleRequest {
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            ..Self::default()
        }
    }
}

/// One OHLCV candle. Minute candles carry `unit`; day candles carry the
/// previous-close and change fields; week, month and year candles carry
/// `first_day_of_period`.
#[derive(Debug, Clone, Deserialize)]
pub struct Candle {
    pub market: String,
    pub candle_date_time_utc: String,
    pub candle_date_time_kst: String,
    pub opening_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub trade_price: f64,
    pub timestamp: i64,
    pub candle_acc_trade_price: f64,
    pub candle_acc_trade_volume: f64,
    #[serde(default)]
    pub unit: Option<u32>,
    #[serde(default)]
    pub prev_closing_price: Option<f64>,
    #[serde(default)]
    pub change_price: Option<f64>,
    #[serde(default)]
    pub change_rate: Option<f64>,
    #[serde(default)]
    pub converted_trade_price: Option<f64>,
    #[serde(default)]
    pub first_day_of_period: Option<String>,
}
