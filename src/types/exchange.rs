#![allow(missing_docs)]
//! Exchange types: accounts, order chance, order lists and lookups, placing
//! and cancelling.
//!
//! Upbit returns decimal amounts as strings on these endpoints; they are kept
//! as `String` so no precision is lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::enums::{OrderSide, OrderState, OrderType, SortOrder, TimeInForce};

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Balance of one currency from `GET /v1/accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub currency: String,
    pub balance: String,
    pub locked: String,
    pub avg_buy_price: String,
    pub avg_buy_price_modified: bool,
    pub unit_currency: String,
}

// ---------------------------------------------------------------------------
// Order chance
// ---------------------------------------------------------------------------

/// Per-side order constraint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderConstraint {
    pub currency: String,
    #[serde(default)]
    pub price_unit: Option<String>,
    /// Upbit sends this as a string or a number depending on the market.
    pub min_total: serde_json::Value,
}

/// Market rules returned with the order chance.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderMarket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub order_types: Vec<String>,
    #[serde(default)]
    pub ask_types: Vec<String>,
    #[serde(default)]
    pub bid_types: Vec<String>,
    #[serde(default)]
    pub order_sides: Vec<String>,
    pub bid: OrderConstraint,
    pub ask: OrderConstraint,
    pub max_total: String,
    pub state: String,
}

/// Response from `GET /v1/orders/chance`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderChance {
    pub bid_fee: String,
    pub ask_fee: String,
    pub market: OrderMarket,
    pub bid_account: Account,
    pub ask_account: Account,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// An order as returned by the place, cancel and list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub uuid: String,
    pub side: OrderSide,
    pub ord_type: OrderType,
    #[serde(default)]
    pub price: Option<String>,
    pub state: OrderState,
    pub market: String,
    pub created_at: String,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub remaining_volume: Option<String>,
    pub reserved_fee: String,
    pub remaining_fee: String,
    pub paid_fee: String,
    pub locked: String,
    pub executed_volume: String,
    #[serde(default)]
    pub executed_funds: Option<String>,
    pub trades_count: u32,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub identifier: Option<String>,
}

/// Request body for `POST /v1/orders`.
///
/// Which of `volume` / `price` is required depends on `ord_type`:
/// `limit` needs both, `price` (market buy) needs `price`, `market`
/// (market sell) needs `volume`, `best` needs `time_in_force`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    pub market: String,
    pub side: OrderSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub ord_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
}

impl PlaceOrderRequest {
    /// Limit order for `volume` at `price`.
    pub fn limit(
        market: impl Into<String>,
        side: OrderSide,
        volume: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            market: market.into(),
            side,
            volume: Some(volume.into()),
            price: Some(price.into()),
            ord_type: OrderType::limit,
            identifier: None,
            time_in_force: None,
        }
    }

    /// Market buy spending `total` of the quote currency.
    pub fn market_buy(market: impl Into<String>, total: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            side: OrderSide::bid,
            volume: None,
            price: Some(total.into()),
            ord_type: OrderType::price,
            identifier: None,
            time_in_force: None,
        }
    }

    /// Market sell of `volume`.
    pub fn market_sell(market: impl Into<String>, volume: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            side: OrderSide::ask,
            volume: Some(volume.into()),
            price: None,
            ord_type: OrderType::market,
            identifier: None,
            time_in_force: None,
        }
    }

    /// Attach a caller-chosen identifier.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Set IOC, FOK or post-only.
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }
}

// ---------------------------------------------------------------------------
// Open orders
// ---------------------------------------------------------------------------

/// Query for `GET /v1/orders/open`.
#[derive(Debug, Clone, Default)]
pub struct OpenOrdersRequest {
    pub market: Option<String>,
    /// A single state; mutually exclusive with `states`.
    pub state: Option<OrderState>,
    pub states: Vec<OrderState>,
    pub page: Option<u32>,
    /// Page size, at most 100.
    pub limit: Option<u32>,
    pub order_by: Option<SortOrder>,
}

// ---------------------------------------------------------------------------
// Closed orders
// ---------------------------------------------------------------------------

/// Query for `GET /v1/orders/closed`.
///
/// `state`/`states` accept only `done` and `cancel`. When both times are set
/// the window may span at most seven days.
#[derive(Debug, Clone, Default)]
pub struct ClosedOrdersRequest {
    pub market: Option<String>,
    pub state: Option<OrderState>,
    pub states: Vec<OrderState>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// At most 1000.
    pub limit: Option<u32>,
    pub order_by: Option<SortOrder>,
}

// ---------------------------------------------------------------------------
// Orders by id
// ---------------------------------------------------------------------------

/// Which ids an order lookup uses. The server takes one kind per request.
#[derive(Debug, Clone)]
pub enum OrderIds {
    Uuids(Vec<String>),
    Identifiers(Vec<String>),
}

/// Query for `GET /v1/orders/uuids`.
#[derive(Debug, Clone)]
pub struct OrdersByIdRequest {
    pub market: Option<String>,
    pub ids: OrderIds,
    pub order_by: Option<SortOrder>,
}

impl OrdersByIdRequest {
    pub fn uuids<I, S>(uuids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            market: None,
            ids: OrderIds::Uuids(uuids.into_iter().map(Into::into).collect()),
            order_by: None,
        }
    }

    pub fn identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            market: None,
            ids: OrderIds::Identifiers(identifiers.into_iter().map(Into::into).collect()),
            order_by: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// Selects the order to cancel with `DELETE /v1/order`.
#[derive(Debug, Clone)]
pub enum CancelOrderRequest {
    /// By exchange-assigned UUID.
    Uuid(String),
    /// By caller-assigned identifier.
    Identifier(String),
}
