//! Request and response types for the Upbit REST API.
//!
//! ## Organization
//!
//! - [`enums`] — Shared wire enumerations (order side, order state, change, etc.)
//! - [`quotation`] — Markets, tickers, orderbooks, trade ticks and candles
//! - [`exchange`] — Accounts, order chance, orders and their requests
//!
//! All enums are re-exported at the module root via `pub use enums::*`.
//! Streaming record types live in [`crate::ws::message`].

pub mod enums;
pub mod exchange;
pub mod quotation;

pub use enums::*;
