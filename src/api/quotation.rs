//! Quotation endpoints: markets, tickers, orderbooks, trade ticks and candles
//! (minute, day, week, month, year).
//!
//! None of these need credentials.

use crate::api::{join_markets, validate_market};
use crate::client::UpbitClient;
use crate::constants::limits::{
    MAX_CANDLES_PER_REQUEST, MAX_TRADES_DAYS_AGO, MAX_TRADES_PER_REQUEST, MINUTE_CANDLE_UNITS,
};
use crate::error::{Result, UpbitError};
use crate::types::quotation::*;

impl UpbitClient {
    /// List every tradable market.
    ///
    /// With `details` the response carries warning and caution flags.
    ///
    /// **Endpoint:** `GET /v1/market/all`
    pub async fn get_markets(&self, details: bool) -> Result<Vec<MarketInfo>> {
        self.get("/v1/market/all", &[("is_details", details.to_string())])
            .await
    }

    /// Current ticker for each market.
    ///
    /// **Endpoint:** `GET /v1/ticker`
    pub async fn get_tickers(&self, markets: &[&str]) -> Result<Vec<TickerSnapshot>> {
        let markets = join_markets(markets)?;
        self.get("/v1/ticker", &[("markets", markets)]).await
    }

    /// Current ticker for every market quoted in the given currencies
    /// (e.g. `KRW`, `BTC`). An empty slice returns every market.
    ///
    /// **Endpoint:** `GET /v1/ticker/all`
    pub async fn get_tickers_by_quote(&self, quotes: &[&str]) -> Result<Vec<TickerSnapshot>> {
        if quotes.is_empty() {
            return self.get("/v1/ticker/all", &[]).await;
        }
        if let Some(bad) = quotes.iter().find(|q| q.trim().is_empty() || q.contains(',')) {
            return Err(UpbitError::InvalidArgument(format!("invalid quote currency: {bad:?}")));
        }
        let quotes = quotes.iter().map(|q| q.to_uppercase()).collect::<Vec<_>>().join(",");
        self.get("/v1/ticker/all", &[("quote_currencies", quotes)])
            .await
    }

    /// Orderbook snapshot for each market.
    ///
    /// `level` groups price levels (KRW markets only).
    ///
    /// **Endpoint:** `GET /v1/orderbook`
    pub async fn get_orderbooks(
        &self,
        markets: &[&str],
        level: Option<f64>,
    ) -> Result<Vec<OrderbookSnapshot>> {
        let mut query = vec![("markets", join_markets(markets)?)];
        if let Some(level) = level {
            query.push(("level", level.to_string()));
        }
        self.get("/v1/orderbook", &query).await
    }

    /// Grouping levels each market accepts for [`get_orderbooks`](Self::get_orderbooks).
    ///
    /// **Endpoint:** `GET /v1/orderbook/supported_levels`
    pub async fn get_supported_levels(&self) -> Result<Vec<SupportedLevels>> {
        self.get("/v1/orderbook/supported_levels", &[]).await
    }

    /// Recent trade ticks, newest first.
    ///
    /// **Endpoint:** `GET /v1/trades/ticks`
    pub async fn get_trades(&self, req: &TradesRequest) -> Result<Vec<TradeTick>> {
        validate_market(&req.market)?;
        let mut query = vec![("market", req.market.clone())];
        if let Some(to) = &req.to {
            query.push(("to", to.clone()));
        }
        if let Some(count) = req.count {
            if count == 0 || count > MAX_TRADES_PER_REQUEST {
                return Err(UpbitError::InvalidArgument(format!(
                    "count must be between 1 and {MAX_TRADES_PER_REQUEST}"
                )));
            }
            query.push(("count", count.to_string()));
        }
        if let Some(cursor) = &req.cursor {
            query.push(("cursor", cursor.clone()));
        }
        if let Some(days_ago) = req.days_ago {
            if days_ago == 0 || days_ago > MAX_TRADES_DAYS_AGO {
                return Err(UpbitError::InvalidArgument(format!(
                    "days_ago must be between 1 and {MAX_TRADES_DAYS_AGO}"
                )));
            }
            query.push(("daysAgo", days_ago.to_string()));
        }
        self.get("/v1/trades/ticks", &query).await
    }

    /// Minute candles. `unit` must be one of 1, 3, 5, 10, 15, 30, 60 or 240.
    ///
    /// **Endpoint:** `GET /v1/candles/minutes/{unit}`
    pub async fn get_minute_candles(&self, unit: u32, req: &CandleRequest) -> Result<Vec<Candle>> {
        if !MINUTE_CANDLE_UNITS.contains(&unit) {
            return Err(UpbitError::InvalidArgument(format!(
                "unsupported minute unit {unit}, expected one of {MINUTE_CANDLE_UNITS:?}"
            )));
        }
        reject_price_conversion(req)?;
        let query = candle_query(req)?;
        self.get(&format!("/v1/candles/minutes/{unit}"), &query)
            .await
    }

    /// Day candles.
    ///
    /// **Endpoint:** `GET /v1/candles/days`
    pub async fn get_day_candles(&self, req: &CandleRequest) -> Result<Vec<Candle>> {
        let mut query = candle_query(req)?;
        if let Some(unit) = &req.converting_price_unit {
            query.push(("convertingPriceUnit", unit.clone()));
        }
        self.get("/v1/candles/days", &query).await
    }

    /// Week candles.
    ///
    /// **Endpoint:** `GET /v1/candles/weeks`
    pub async fn get_week_candles(&self, req: &CandleRequest) -> Result<Vec<Candle>> {
        self.period_candles("weeks", req).await
    }

    /// Month candles.
    ///
    /// **Endpoint:** `GET /v1/candles/months`
    pub async fn get_month_candles(&self, req: &CandleRequest) -> Result<Vec<Candle>> {
        self.period_candles("months", req).await
    }

    /// Year candles.
    ///
    /// **Endpoint:** `GET /v1/candles/years`
    pub async fn get_year_candles(&self, req: &CandleRequest) -> Result<Vec<Candle>> {
        self.period_candles("years", req).await
    }

    async fn period_candles(&self, period: &str, req: &CandleRequest) -> Result<Vec<Candle>> {
        reject_price_conversion(req)?;
        let query = candle_query(req)?;
        self.get(&format!("/v1/candles/{period}"), &query).await
    }
}

fn reject_price_conversion(req: &CandleRequest) -> Result<()> {
    if req.converting_price_unit.is_some() {
        return Err(UpbitError::InvalidArgument(
            "converting_price_unit is only accepted for day candles".into(),
        ));
    }
    Ok(())
}

fn candle_query(req: &CandleRequest) -> Result<Vec<(&'static str, String)>> {
    validate_market(&req.market)?;
    let mut query = vec![("market", req.market.clone())];
    if let Some(to) = &req.to {
        query.push(("to", to.clone()));
    }
    if let Some(count) = req.count {
        if count == 0 || count > MAX_CANDLES_PER_REQUEST {
            return Err(UpbitError::InvalidArgument(format!(
                "count must be between 1 and {MAX_CANDLES_PER_REQUEST}"
            )));
        }
        query.push(("count", count.to_string()));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_count_is_capped() {
        let mut req = CandleRequest::new("KRW-BTC");
        req.count = Some(201);
        assert!(matches!(candle_query(&req), Err(UpbitError::InvalidArgument(_))));

        req.count = Some(200);
        let query = candle_query(&req).unwrap();
        assert_eq!(query, vec![("market", "KRW-BTC".to_owned()), ("count", "200".to_owned())]);
    }
}
