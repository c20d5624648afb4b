//! Exchange endpoints: balances, order chance, order lists and lookups,
//! placing and cancelling. Every call is signed.

use chrono::SecondsFormat;

use crate::api::validate_market;
use crate::client::UpbitClient;
use crate::constants::limits::{
    MAX_CLOSED_ORDERS_PER_REQUEST, MAX_CLOSED_ORDERS_WINDOW_DAYS, MAX_OPEN_ORDERS_PER_PAGE,
    MAX_ORDER_IDS_PER_REQUEST,
};
use crate::error::{Result, UpbitError};
use crate::types::enums::{OrderState, OrderType, TimeInForce};
use crate::types::exchange::*;

impl UpbitClient {
    /// Balances of every currency held.
    ///
    /// **Endpoint:** `GET /v1/accounts`
    pub async fn get_accounts(&self) -> Result<Vec<Account>> {
        self.require_credentials()?;
        self.get("/v1/accounts", &[]).await
    }

    /// Fees, limits and balances relevant to ordering on one market.
    ///
    /// **Endpoint:** `GET /v1/orders/chance`
    pub async fn get_order_chance(&self, market: &str) -> Result<OrderChance> {
        self.require_credentials()?;
        validate_market(market)?;
        self.get("/v1/orders/chance", &[("market", market.to_owned())])
            .await
    }

    /// Orders waiting to be filled.
    ///
    /// **Endpoint:** `GET /v1/orders/open`
    pub async fn get_open_orders(&self, req: &OpenOrdersRequest) -> Result<Vec<Order>> {
        self.require_credentials()?;
        let query = open_orders_query(req)?;
        self.get("/v1/orders/open", &query).await
    }

    /// Finished (filled or cancelled) orders, newest first by default.
    ///
    /// **Endpoint:** `GET /v1/orders/closed`
    pub async fn get_closed_orders(&self, req: &ClosedOrdersRequest) -> Result<Vec<Order>> {
        self.require_credentials()?;
        let query = closed_orders_query(req)?;
        self.get("/v1/orders/closed", &query).await
    }

    /// Look orders up by UUID or by caller identifier, up to 100 at a time.
    ///
    /// **Endpoint:** `GET /v1/orders/uuids`
    pub async fn get_orders_by_id(&self, req: &OrdersByIdRequest) -> Result<Vec<Order>> {
        self.require_credentials()?;
        let query = orders_by_id_query(req)?;
        self.get("/v1/orders/uuids", &query).await
    }

    /// Submit an order.
    ///
    /// **Endpoint:** `POST /v1/orders`
    pub async fn place_order(&self, req: &PlaceOrderRequest) -> Result<Order> {
        self.require_credentials()?;
        validate_order(req)?;
        tracing::info!(market = %req.market, side = req.side.as_str(), ord_type = req.ord_type.as_str(), "Placing order");
        self.post("/v1/orders", req).await
    }

    /// Cancel an order by UUID or by caller identifier.
    ///
    /// **Endpoint:** `DELETE /v1/order`
    pub async fn cancel_order(&self, req: &CancelOrderRequest) -> Result<Order> {
        self.require_credentials()?;
        let param = match req {
            CancelOrderRequest::Uuid(uuid) => ("uuid", uuid),
            CancelOrderRequest::Identifier(id) => ("identifier", id),
        };
        if param.1.trim().is_empty() {
            return Err(UpbitError::InvalidArgument(format!("{} must not be empty", param.0)));
        }
        self.delete("/v1/order", &[(param.0, param.1.clone())])
            .await
    }
}

fn open_orders_query(req: &OpenOrdersRequest) -> Result<Vec<(&'static str, String)>> {
    let mut query = Vec::new();
    if let Some(market) = &req.market {
        validate_market(market)?;
        query.push(("market", market.clone()));
    }
    if req.state == Some(OrderState::Unknown) || req.states.contains(&OrderState::Unknown) {
        return Err(UpbitError::InvalidArgument("cannot filter by an unknown order state".into()));
    }
    match (req.state, req.states.is_empty()) {
        (Some(_), false) => {
            return Err(UpbitError::InvalidArgument(
                "state and states cannot be used together".into(),
            ));
        }
        (Some(state), true) => query.push(("state", state.as_str().to_owned())),
        (None, _) => {
            for state in &req.states {
                query.push(("states[]", state.as_str().to_owned()));
            }
        }
    }
    if let Some(page) = req.page {
        query.push(("page", page.to_string()));
    }
    if let Some(limit) = req.limit {
        if limit == 0 || limit > MAX_OPEN_ORDERS_PER_PAGE {
            return Err(UpbitError::InvalidArgument(format!(
                "limit must be between 1 and {MAX_OPEN_ORDERS_PER_PAGE}"
            )));
        }
        query.push(("limit", limit.to_string()));
    }
    if let Some(order_by) = req.order_by {
        query.push(("order_by", order_by.as_str().to_owned()));
    }
    Ok(query)
}

fn closed_orders_query(req: &ClosedOrdersRequest) -> Result<Vec<(&'static str, String)>> {
    let mut query = Vec::new();
    if let Some(market) = &req.market {
        validate_market(market)?;
        query.push(("market", market.clone()));
    }
    let closed = |state: &OrderState| matches!(state, OrderState::done | OrderState::cancel);
    if !req.state.iter().chain(&req.states).all(closed) {
        return Err(UpbitError::InvalidArgument(
            "closed orders can only be filtered by done or cancel".into(),
        ));
    }
    match (req.state, req.states.is_empty()) {
        (Some(_), false) => {
            return Err(UpbitError::InvalidArgument(
                "state and states cannot be used together".into(),
            ));
        }
        (Some(state), true) => query.push(("state", state.as_str().to_owned())),
        (None, _) => {
            for state in &req.states {
                query.push(("states[]", state.as_str().to_owned()));
            }
        }
    }
    if let (Some(start), Some(end)) = (req.start_time, req.end_time) {
        if end < start {
            return Err(UpbitError::InvalidArgument("end_time is before start_time".into()));
        }
        if end - start > chrono::Duration::days(MAX_CLOSED_ORDERS_WINDOW_DAYS) {
            return Err(UpbitError::InvalidArgument(format!(
                "time window cannot exceed {MAX_CLOSED_ORDERS_WINDOW_DAYS} days"
            )));
        }
    }
    if let Some(start) = req.start_time {
        query.push(("start_time", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    if let Some(end) = req.end_time {
        query.push(("end_time", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    if let Some(limit) = req.limit {
        if limit == 0 || limit > MAX_CLOSED_ORDERS_PER_REQUEST {
            return Err(UpbitError::InvalidArgument(format!(
                "limit must be between 1 and {MAX_CLOSED_ORDERS_PER_REQUEST}"
            )));
        }
        query.push(("limit", limit.to_string()));
    }
    if let Some(order_by) = req.order_by {
        query.push(("order_by", order_by.as_str().to_owned()));
    }
    Ok(query)
}

fn orders_by_id_query(req: &OrdersByIdRequest) -> Result<Vec<(&'static str, String)>> {
    let mut query = Vec::new();
    if let Some(market) = &req.market {
        validate_market(market)?;
        query.push(("market", market.clone()));
    }
    let (key, ids) = match &req.ids {
        OrderIds::Uuids(ids) => ("uuids[]", ids),
        OrderIds::Identifiers(ids) => ("identifiers[]", ids),
    };
    if ids.is_empty() || ids.len() > MAX_ORDER_IDS_PER_REQUEST {
        return Err(UpbitError::InvalidArgument(format!(
            "between 1 and {MAX_ORDER_IDS_PER_REQUEST} ids are required"
        )));
    }
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(UpbitError::InvalidArgument("ids must not be empty".into()));
    }
    query.extend(ids.iter().map(|id| (key, id.clone())));
    if let Some(order_by) = req.order_by {
        query.push(("order_by", order_by.as_str().to_owned()));
    }
    Ok(query)
}

fn validate_order(req: &PlaceOrderRequest) -> Result<()> {
    validate_market(&req.market)?;
    let missing = |field: &str| {
        Err(UpbitError::InvalidArgument(format!(
            "{} order needs {field}",
            req.ord_type.as_str()
        )))
    };
    if req.time_in_force == Some(TimeInForce::Unknown) {
        return Err(UpbitError::InvalidArgument("unknown time_in_force".into()));
    }
    match req.ord_type {
        OrderType::Unknown => Err(UpbitError::InvalidArgument("unknown ord_type".into())),
        OrderType::limit if req.volume.is_none() => missing("volume"),
        OrderType::limit if req.price.is_none() => missing("price"),
        OrderType::price if req.price.is_none() => missing("price"),
        OrderType::market if req.volume.is_none() => missing("volume"),
        OrderType::best if req.time_in_force.is_none() => missing("time_in_force"),
        _ => Ok(()),
    }
}
