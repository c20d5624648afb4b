//! Common test utilities: an in-process WebSocket server that records what
//! the client sends and lets a test push frames or kill the link.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// How long a `wait_*` helper polls before failing the test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Something for the server to do on the current link.
#[derive(Debug)]
pub enum Command {
    Text(String),
    Binary(Vec<u8>),
    /// Drop the TCP stream without a close frame.
    Drop,
    /// Send a normal close frame, then drop.
    Close,
}

#[derive(Default)]
struct ServerState {
    /// TCP connections accepted, including refused ones.
    dials: AtomicUsize,
    /// Completed WebSocket handshakes.
    connections: AtomicUsize,
    /// Protocol pings plus text `PING` frames.
    pings: AtomicUsize,
    /// Close the TCP stream before the handshake.
    refuse: AtomicBool,
    /// Complete the handshake, then drop the link at once.
    drop_on_accept: AtomicBool,
    frames: Mutex<Vec<String>>,
    auth_headers: Mutex<Vec<Option<String>>>,
    current: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

/// In-process WebSocket server bound to an ephemeral local port.
pub struct MockWsServer {
    pub url: String,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let state = Arc::new(ServerState::default());

        let accept_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                accept_state.dials.fetch_add(1, Ordering::SeqCst);
                if accept_state.refuse.load(Ordering::SeqCst) {
                    drop(stream);
                    continue;
                }
                tokio::spawn(serve(Arc::clone(&accept_state), stream));
            }
        });

        Self { url, state, task }
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    fn command(&self, cmd: Command) {
        let current = self.state.current.lock().unwrap();
        current
            .as_ref()
            .expect("no live connection")
            .send(cmd)
            .expect("connection task gone");
    }

    pub fn send_text(&self, text: impl Into<String>) {
        self.command(Command::Text(text.into()));
    }

    pub fn send_json(&self, value: &Value) {
        self.send_text(value.to_string());
    }

    pub fn send_binary(&self, data: impl Into<Vec<u8>>) {
        self.command(Command::Binary(data.into()));
    }

    pub fn drop_connection(&self) {
        self.command(Command::Drop);
    }

    pub fn close_connection(&self) {
        self.command(Command::Close);
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn drop_on_accept(&self, enable: bool) {
        self.state.drop_on_accept.store(enable, Ordering::SeqCst);
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    pub fn dials(&self) -> usize {
        self.state.dials.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    /// Text frames received, excluding keepalives.
    pub fn frames(&self) -> Vec<String> {
        self.state.frames.lock().unwrap().clone()
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.auth_headers.lock().unwrap().clone()
    }

    pub async fn wait_for_frames(&self, n: usize) -> Vec<String> {
        self.wait_until(|s| s.frames().len() >= n).await;
        self.frames()
    }

    pub async fn wait_for_connections(&self, n: usize) {
        self.wait_until(|s| s.connections() >= n).await;
    }

    pub async fn wait_for_dials(&self, n: usize) {
        self.wait_until(|s| s.dials() >= n).await;
    }

    pub async fn wait_until(&self, cond: impl Fn(&Self) -> bool) {
        tokio::time::timeout(WAIT, async {
            while !cond(self) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(state: Arc<ServerState>, stream: tokio::net::TcpStream) {
    let header_state = Arc::clone(&state);
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let auth = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        header_state.auth_headers.lock().unwrap().push(auth);
        Ok(resp)
    };

    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
        return;
    };
    if state.drop_on_accept.load(Ordering::SeqCst) {
        state.connections.fetch_add(1, Ordering::SeqCst);
        return;
    }

    // Install the command channel before the link is counted, so a test that
    // waited for the count always drives the newest link.
    let (tx, mut rx) = mpsc::unbounded_channel();
    *state.current.lock().unwrap() = Some(tx);
    state.connections.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Text(text)) => {
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(Command::Binary(data)) => {
                    if ws.send(Message::Binary(data.into())).await.is_err() {
                        break;
                    }
                }
                Some(Command::Close) => {
                    let _ = ws.close(None).await;
                    break;
                }
                Some(Command::Drop) | None => break,
            },
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) if text.as_str() == "PING" => {
                    state.pings.fetch_add(1, Ordering::SeqCst);
                    let _ = ws.send(Message::Text(json!({"status": "UP"}).to_string().into())).await;
                }
                Some(Ok(Message::Text(text))) => {
                    state.frames.lock().unwrap().push(text.as_str().to_owned());
                }
                Some(Ok(Message::Ping(_))) => {
                    state.pings.fetch_add(1, Ordering::SeqCst);
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn ticker_json(code: &str, price: f64) -> Value {
    json!({
        "type": "ticker",
        "code": code,
        "trade_price": price,
        "change": "RISE",
        "signed_change_rate": 0.01,
        "timestamp": 1_700_000_000_000i64,
        "stream_type": "REALTIME"
    })
}

pub fn trade_json(code: &str, sequential_id: i64) -> Value {
    json!({
        "type": "trade",
        "code": code,
        "trade_price": 50_000_000.0,
        "trade_volume": 0.01,
        "ask_bid": "BID",
        "timestamp": 1_700_000_000_000i64,
        "sequential_id": sequential_id,
        "stream_type": "REALTIME"
    })
}

pub fn orderbook_json(code: &str, timestamp: i64) -> Value {
    json!({
        "type": "orderbook",
        "code": code,
        "total_ask_size": 1.5,
        "total_bid_size": 2.5,
        "orderbook_units": [
            {"ask_price": 101.0, "bid_price": 100.0, "ask_size": 1.5, "bid_size": 2.5}
        ],
        "timestamp": timestamp,
        "level": 0
    })
}

pub fn my_order_json(uuid: &str) -> Value {
    json!({
        "type": "myOrder",
        "code": "KRW-BTC",
        "uuid": uuid,
        "ask_bid": "BID",
        "order_type": "limit",
        "state": "wait",
        "price": 50_000_000.0,
        "volume": 0.001,
        "remaining_volume": 0.001,
        "executed_volume": 0.0,
        "trades_count": 0,
        "order_timestamp": 1_700_000_000_000i64,
        "timestamp": 1_700_000_000_001i64,
        "stream_type": "REALTIME"
    })
}

pub fn my_asset_json(asset_uuid: &str) -> Value {
    json!({
        "type": "myAsset",
        "asset_uuid": asset_uuid,
        "assets": [{"currency": "KRW", "balance": 1000.0, "locked": 0.0}],
        "asset_timestamp": 1_700_000_000_000i64,
        "timestamp": 1_700_000_000_001i64,
        "stream_type": "REALTIME"
    })
}
