//! REST API endpoint implementations.
//!
//! Each sub-module adds high-level `async` methods to
//! [`UpbitClient`](crate::client::UpbitClient) via `impl` blocks. All methods
//! validate their arguments against the documented limits before any request
//! is sent, then handle signing, HTTP transport and error mapping.
//!
//! ## Usage
//!
//! ```no_run
//! use upbit_rs::UpbitClient;
//! use upbit_rs::types::quotation::CandleRequest;
//!
//! # #[tokio::main]
//! # async fn main() -> upbit_rs::Result<()> {
//! let client = UpbitClient::new()?;
//! let tickers = client.get_tickers(&["KRW-BTC", "KRW-ETH"]).await?;
//! let candles = client.get_minute_candles(5, &CandleRequest::new("KRW-BTC")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Endpoints | Description |
//! |---|---|---|
//! | [`quotation`] | 11 | Markets, tickers, orderbooks and levels, trades, candles |
//! | [`exchange`] | 7 | Accounts, order chance, open/closed orders, lookup, place, cancel |

use crate::constants::MARKET_SEPARATOR;
use crate::error::{Result, UpbitError};

pub mod exchange;
pub mod quotation;

/// Reject market codes that are not `QUOTE-BASE`.
pub(crate) fn validate_market(market: &str) -> Result<()> {
    let valid = market
        .split_once(MARKET_SEPARATOR)
        .is_some_and(|(quote, base)| !quote.is_empty() && !base.is_empty());
    if valid {
        Ok(())
    } else {
        Err(UpbitError::InvalidArgument(format!(
            "invalid market code {market:?}: expected QUOTE{MARKET_SEPARATOR}BASE"
        )))
    }
}

/// Validate and comma-join a market list.
pub(crate) fn join_markets(markets: &[&str]) -> Result<String> {
    if markets.is_empty() {
        return Err(UpbitError::InvalidArgument(
            "at least one market code is required".into(),
        ));
    }
    for market in markets {
        validate_market(market)?;
    }
    Ok(markets.join(","))
}
