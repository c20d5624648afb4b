//! Subscription directives and the registry that replays them.
//!
//! Upbit has no unsubscribe: a subscription request replaces nothing and is
//! simply the full list of streams the client wants, prefixed by a ticket.
//! The registry therefore keeps every directive ever added, in order, and the
//! connection resends the whole list after each (re)connect.
//!
//! ```text
//! [{"ticket":"5f0c…"},{"type":"ticker","codes":["KRW-BTC"]},{"type":"trade","codes":["KRW-ETH"]}]
//! ```

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::constants::MARKET_SEPARATOR;
use crate::error::{Result, UpbitError};

// ---------------------------------------------------------------------------
// Stream kinds
// ---------------------------------------------------------------------------

/// Whether a stream accepts market codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePolicy {
    /// At least one code must be given.
    Required,
    /// Codes may be omitted, meaning every market.
    Optional,
    /// The stream is account-wide; codes are rejected.
    Forbidden,
}

/// The streamable record types, keyed by their wire `type` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    Ticker,
    Trade,
    Orderbook,
    MyOrder,
    MyAsset,
}

impl StreamKind {
    /// Wire value of the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Trade => "trade",
            Self::Orderbook => "orderbook",
            Self::MyOrder => "myOrder",
            Self::MyAsset => "myAsset",
        }
    }

    /// Parse a wire `type` value.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ticker" => Some(Self::Ticker),
            "trade" => Some(Self::Trade),
            "orderbook" => Some(Self::Orderbook),
            "myOrder" => Some(Self::MyOrder),
            "myAsset" => Some(Self::MyAsset),
            _ => None,
        }
    }

    pub fn code_policy(self) -> CodePolicy {
        match self {
            Self::Ticker | Self::Trade | Self::Orderbook => CodePolicy::Required,
            Self::MyOrder => CodePolicy::Optional,
            Self::MyAsset => CodePolicy::Forbidden,
        }
    }

    /// `true` for streams served on the private endpoint.
    pub fn is_private(self) -> bool {
        matches!(self, Self::MyOrder | Self::MyAsset)
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Directive
// ---------------------------------------------------------------------------

/// Optional per-directive settings. Unset fields are left off the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SubscribeOptions {
    /// Orderbook aggregation unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    /// Only send the initial snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_only_snapshot: Option<bool>,
    /// Only send live updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_only_realtime: Option<bool>,
}

impl SubscribeOptions {
    pub fn level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn only_snapshot(mut self) -> Self {
        self.is_only_snapshot = Some(true);
        self
    }

    pub fn only_realtime(mut self) -> Self {
        self.is_only_realtime = Some(true);
        self
    }
}

/// One "subscribe to this stream for these markets" instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    #[serde(rename = "type")]
    kind: StreamKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    codes: Vec<String>,
    #[serde(flatten)]
    options: SubscribeOptions,
}

impl Directive {
    /// Validate and normalise a directive.
    ///
    /// Codes are upper-cased and must contain the market separator (`KRW-BTC`).
    /// The stream's [`CodePolicy`] decides whether an empty list is allowed.
    pub fn new<I, S>(kind: StreamKind, codes: I, options: SubscribeOptions) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| {
                let code = c.as_ref().trim();
                if code.contains(MARKET_SEPARATOR) {
                    Ok(code.to_uppercase())
                } else {
                    Err(UpbitError::InvalidArgument(format!(
                        "invalid market code {code:?}: expected QUOTE{MARKET_SEPARATOR}BASE"
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        match (kind.code_policy(), codes.is_empty()) {
            (CodePolicy::Required, true) => {
                return Err(UpbitError::InvalidArgument(format!(
                    "{kind} subscription needs at least one market code"
                )));
            }
            (CodePolicy::Forbidden, false) => {
                return Err(UpbitError::InvalidArgument(format!(
                    "{kind} subscription does not take market codes"
                )));
            }
            _ => {}
        }

        Ok(Self {
            kind,
            codes,
            options,
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn options(&self) -> &SubscribeOptions {
        &self.options
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(untagged)]
enum RequestItem<'a> {
    Ticket { ticket: &'a str },
    Directive(&'a Directive),
}

/// Append-only, ordered list of directives.
///
/// Guarded by its own lock so directives may be added while a connection is
/// open.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    directives: Mutex<Vec<Directive>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Directive>> {
        // A panic while pushing cannot leave the vec half-written.
        self.directives.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a directive. Nothing is sent.
    pub fn add(&self, directive: Directive) {
        self.lock().push(directive);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the accumulated directives, in insertion order.
    pub fn directives(&self) -> Vec<Directive> {
        self.lock().clone()
    }

    /// Serialise the full request: the ticket (a fresh UUID v4 when `None`)
    /// followed by every directive in order.
    pub fn encode_request(&self, ticket: Option<&str>) -> Result<String> {
        let generated;
        let ticket = match ticket {
            Some(t) => t,
            None => {
                generated = uuid::Uuid::new_v4().to_string();
                &generated
            }
        };

        let directives = self.lock();
        let mut items = Vec::with_capacity(directives.len() + 1);
        items.push(RequestItem::Ticket { ticket });
        items.extend(directives.iter().map(RequestItem::Directive));
        Ok(serde_json::to_string(&items)?)
    }
}
