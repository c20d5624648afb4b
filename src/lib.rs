//! # upbit-rs
//!
//! A Rust client library for the [Upbit](https://upbit.com) exchange:
//! resilient WebSocket streams plus the quotation and exchange REST
//! endpoints.
//!
//! ## Quick Start
//!
//! ```no_run
//! use upbit_rs::ws::{StreamKind, SubscribeOptions, WsClientBuilder};
//!
//! #[tokio::main]
//! async fn main() -> upbit_rs::Result<()> {
//!     let mut stream = WsClientBuilder::new().build_public();
//!     stream.add_subscription(StreamKind::Ticker, ["KRW-BTC"], SubscribeOptions::default())?;
//!     stream.connect().await?;
//!
//!     let ticker = stream.next_ticker().await?;
//!     println!("{} traded at {}", ticker.code, ticker.trade_price);
//!
//!     stream.close().await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ws`] — Public and private WebSocket clients with keepalive,
//!   reconnect and subscription replay
//! - [`client`] / [`api`] — REST client and endpoint methods
//! - [`auth`] — JWT token generation
//! - [`types`] — REST request and response types

pub mod api;
pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod types;
pub mod ws;

/// Re-export the REST client at crate root for convenience.
pub use client::UpbitClient;
/// Re-export the error type and Result alias.
pub use error::{Result, UpbitError};
/// Re-export the token provider types.
pub use auth::{Credentials, JwtTokenProvider, TokenProvider};
/// Re-export the WebSocket entry points.
pub use ws::{PrivateClient, PublicClient, WsClientBuilder};
