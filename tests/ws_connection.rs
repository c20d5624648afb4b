//! Connection lifecycle against an in-process server: handshake, keepalive,
//! subscription replay, bounded reconnect and shutdown.

mod common;

use std::time::Duration;

use common::{MockWsServer, ticker_json};
use serde_json::Value;
use tokio::sync::mpsc;
use upbit_rs::UpbitError;
use upbit_rs::ws::{
    Connection, ConnectionState, Directive, Keepalive, StreamKind, SubscribeOptions,
    WsClientBuilder, WsConfig,
};

fn builder(server: &MockWsServer) -> WsClientBuilder {
    WsClientBuilder::new()
        .endpoint(server.url.clone())
        .ping_interval(Duration::ZERO)
        .reconnect_wait(Duration::from_millis(20))
}

fn parse(frame: &str) -> Vec<Value> {
    serde_json::from_str::<Value>(frame)
        .unwrap()
        .as_array()
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn subscription_request_is_one_frame_with_ticket_first() {
    let server = MockWsServer::start().await;
    let client = builder(&server).build_public();
    client
        .add_subscription(StreamKind::Ticker, ["krw-btc", "KRW-ETH"], SubscribeOptions::default())
        .unwrap();
    client
        .add_subscription(StreamKind::Trade, ["KRW-BTC"], SubscribeOptions::default().only_realtime())
        .unwrap();

    client.connect().await.unwrap();
    let frames = server.wait_for_frames(1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.frames().len(), 1, "exactly one subscription frame");

    let items = parse(&frames[0]);
    assert_eq!(items.len(), 3);
    assert!(items[0]["ticket"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(items[1]["type"], "ticker");
    assert_eq!(items[1]["codes"], serde_json::json!(["KRW-BTC", "KRW-ETH"]));
    assert_eq!(items[2]["type"], "trade");
    assert_eq!(items[2]["is_only_realtime"], true);

    assert_eq!(client.state(), ConnectionState::Open);
    assert!(client.is_running().await);
    client.close().await.unwrap();
}

#[tokio::test]
async fn connect_is_a_noop_while_running() {
    let server = MockWsServer::start().await;
    let client = builder(&server).build_public();
    client.connect().await.unwrap();
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connections(), 1);
    assert_eq!(client.connection().generation().await, 1);
}

#[tokio::test]
async fn healthy_heartbeat_never_reconnects() {
    let server = MockWsServer::start().await;
    let client = builder(&server)
        .ping_interval(Duration::from_millis(40))
        .build_public();
    client.connect().await.unwrap();

    server.wait_until(|s| s.pings() >= 5).await;
    assert_eq!(server.connections(), 1);
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test]
async fn text_keepalive_status_replies_are_swallowed() {
    let server = MockWsServer::start().await;
    let mut client = builder(&server)
        .ping_interval(Duration::from_millis(30))
        .keepalive(Keepalive::Text)
        .build_public();
    client.connect().await.unwrap();

    server.wait_until(|s| s.pings() >= 3).await;
    let next = tokio::time::timeout(Duration::from_millis(200), client.next_ticker()).await;
    assert!(next.is_err(), "status frames must not surface: {next:?}");
    assert!(server.frames().is_empty());
}

#[tokio::test]
async fn directives_are_resent_verbatim_after_abnormal_closure() {
    let server = MockWsServer::start().await;
    let client = builder(&server).build_public();
    client
        .add_subscription(StreamKind::Orderbook, ["KRW-BTC"], SubscribeOptions::default().level(1000.0))
        .unwrap();
    client
        .add_subscription(StreamKind::Ticker, ["KRW-ETH"], SubscribeOptions::default())
        .unwrap();
    client.connect().await.unwrap();
    server.wait_for_frames(1).await;

    server.drop_connection();
    server.wait_for_connections(2).await;
    let frames = server.wait_for_frames(2).await;

    let first = parse(&frames[0]);
    let second = parse(&frames[1]);
    assert_ne!(first[0]["ticket"], second[0]["ticket"], "fresh ticket per request");
    assert_eq!(first[1..], second[1..]);

    server.wait_until(|_| client.state() == ConnectionState::Open).await;
    assert_eq!(client.connection().generation().await, 2);
}

#[tokio::test]
async fn reconnect_attempts_are_bounded() {
    let server = MockWsServer::start().await;
    let mut client = builder(&server).max_reconnect_attempts(3).build_public();
    client.connect().await.unwrap();
    server.wait_for_connections(1).await;

    server.refuse_connections(true);
    server.drop_connection();

    let err = tokio::time::timeout(Duration::from_secs(5), client.next_ticker())
        .await
        .unwrap()
        .unwrap_err();
    assert!(
        matches!(err, UpbitError::MaxRetriesExceeded { attempts: 3 }),
        "unexpected {err:?}"
    );
    assert!(err.is_terminal());
    assert_eq!(client.state(), ConnectionState::Failed);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.dials(), 1 + 3, "no attempt past the cap");
    assert!(!client.is_running().await);
}

#[tokio::test]
async fn failed_client_can_reconnect_explicitly() {
    let server = MockWsServer::start().await;
    let mut client = builder(&server).max_reconnect_attempts(1).build_public();
    client.connect().await.unwrap();
    server.wait_for_connections(1).await;

    server.refuse_connections(true);
    server.drop_connection();
    let err = client.next_ticker().await.unwrap_err();
    assert!(matches!(err, UpbitError::MaxRetriesExceeded { .. }));

    server.refuse_connections(false);
    client.reconnect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Open);

    server.wait_for_connections(2).await;
    server.send_json(&ticker_json("KRW-BTC", 1.0));
    let ticker = client.next_ticker().await.unwrap();
    assert_eq!(ticker.code, "KRW-BTC");
}

#[tokio::test]
async fn link_lost_again_right_after_reconnect_is_fatal() {
    let server = MockWsServer::start().await;
    let mut client = builder(&server).build_public();
    client.connect().await.unwrap();
    server.wait_for_connections(1).await;

    server.drop_on_accept(true);
    server.drop_connection();

    let err = tokio::time::timeout(Duration::from_secs(5), client.next_ticker())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, UpbitError::Read(_)), "unexpected {err:?}");
    assert_eq!(client.state(), ConnectionState::Failed);
    assert_eq!(server.connections(), 2);
}

#[tokio::test]
async fn quiet_link_survives_a_later_drop() {
    let server = MockWsServer::start().await;
    let mut client = builder(&server)
        .ping_interval(Duration::from_millis(20))
        .build_public();
    client.connect().await.unwrap();
    server.wait_for_connections(1).await;

    server.drop_connection();
    server.wait_for_connections(2).await;

    // Only keepalive traffic on the new link, no records.
    let base = server.pings();
    server.wait_until(|s| s.pings() >= base + 5).await;

    server.drop_connection();
    server.wait_for_connections(3).await;
    server.wait_until(|_| client.state() == ConnectionState::Open).await;

    let next = tokio::time::timeout(Duration::from_millis(200), client.next_ticker()).await;
    assert!(next.is_err(), "no error expected: {next:?}");
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(client.connection().generation().await, 3);
}

#[tokio::test]
async fn failed_keepalive_triggers_exactly_one_reconnect() {
    let server = MockWsServer::start().await;
    let (errors_tx, mut errors_rx) = mpsc::channel(8);
    let config = WsConfig {
        ping_interval: Duration::from_millis(20),
        reconnect_wait: Duration::from_millis(10),
        ..WsConfig::default()
    };
    // No dispatcher: nothing reads, so only the heartbeat can notice.
    let conn = Connection::new(server.url.clone(), None, config, errors_tx);
    conn.subscriptions().add(
        Directive::new(StreamKind::Ticker, ["KRW-BTC"], SubscribeOptions::default()).unwrap(),
    );
    conn.connect().await.unwrap();
    server.wait_for_frames(1).await;

    server.drop_connection();
    server.wait_for_connections(2).await;
    let frames = server.wait_for_frames(2).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.dials(), 2, "one reconnect per failed keepalive");
    assert_eq!(server.frames().len(), 2, "directives resent once");
    assert_eq!(parse(&frames[0])[1..], parse(&frames[1])[1..]);
    assert_eq!(conn.state(), ConnectionState::Open);
    assert_eq!(conn.generation().await, 2);
    assert!(errors_rx.try_recv().is_err());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn loss_noticed_by_reader_and_heartbeat_reconnects_once() {
    let server = MockWsServer::start().await;
    let client = builder(&server)
        .ping_interval(Duration::from_millis(5))
        .reconnect_wait(Duration::from_millis(50))
        .build_public();
    client
        .add_subscription(StreamKind::Ticker, ["KRW-BTC"], SubscribeOptions::default())
        .unwrap();
    client.connect().await.unwrap();
    server.wait_for_frames(1).await;

    server.drop_connection();
    server.wait_for_connections(2).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(server.dials(), 2);
    assert_eq!(server.frames().len(), 2);
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test]
async fn zero_reconnect_budget_tears_the_link_down() {
    let server = MockWsServer::start().await;
    let client = builder(&server).max_reconnect_attempts(0).build_public();
    client.connect().await.unwrap();

    let err = client.reconnect().await.unwrap_err();
    assert!(matches!(err, UpbitError::MaxRetriesExceeded { attempts: 0 }), "unexpected {err:?}");
    assert_eq!(client.state(), ConnectionState::Failed);
    assert!(!client.is_running().await);

    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(server.dials(), 2);
}

#[tokio::test]
async fn explicit_reconnect_replaces_the_link() {
    let server = MockWsServer::start().await;
    let client = builder(&server).build_public();
    client.connect().await.unwrap();
    client.reconnect().await.unwrap();

    server.wait_for_connections(2).await;
    assert_eq!(client.connection().generation().await, 2);
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test]
async fn dial_failure_is_reported_and_state_restored() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = WsClientBuilder::new().endpoint(url).build_public();
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, UpbitError::Dial { .. }), "unexpected {err:?}");
    assert_eq!(client.state(), ConnectionState::Idle);
    assert!(!client.is_running().await);
}

#[tokio::test]
async fn ping_without_link_is_not_connected() {
    let client = WsClientBuilder::new().build_public();
    assert!(matches!(client.ping().await, Err(UpbitError::NotConnected)));
}

#[tokio::test]
async fn double_close_is_ok_and_terminal() {
    let server = MockWsServer::start().await;
    let mut client = builder(&server).build_public();
    client.connect().await.unwrap();

    client.close().await.unwrap();
    client.close().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(matches!(client.next_ticker().await, Err(UpbitError::ConnectionClosed)));
    assert!(matches!(client.connect().await, Err(UpbitError::ConnectionClosed)));
}

#[tokio::test]
async fn close_before_connect_closes_the_channels() {
    let mut client = WsClientBuilder::new().build_public();
    client.close().await.unwrap();
    assert!(matches!(client.next_trade().await, Err(UpbitError::ConnectionClosed)));
}

#[tokio::test]
async fn private_dials_carry_a_fresh_bearer_token() {
    let server = MockWsServer::start().await;
    let client = builder(&server)
        .credentials("access-key", "secret-key")
        .build_private()
        .unwrap();
    client.connect().await.unwrap();
    client.reconnect().await.unwrap();
    server.wait_for_connections(2).await;

    let headers = server.auth_headers();
    assert_eq!(headers.len(), 2);
    let first = headers[0].as_deref().unwrap();
    let second = headers[1].as_deref().unwrap();
    assert!(first.starts_with("Bearer "));
    assert!(second.starts_with("Bearer "));
    assert_ne!(first, second, "every dial signs a new nonce");
}

#[tokio::test]
async fn public_dial_without_credentials_has_no_auth_header() {
    let server = MockWsServer::start().await;
    let client = builder(&server).build_public();
    client.connect().await.unwrap();
    server.wait_for_connections(1).await;
    assert_eq!(server.auth_headers(), vec![None]);
}

#[tokio::test]
async fn state_changes_are_observable() {
    let server = MockWsServer::start().await;
    let client = builder(&server).build_public();
    let mut watch = client.watch_state();
    assert_eq!(*watch.borrow(), ConnectionState::Idle);

    client.connect().await.unwrap();
    watch.wait_for(|s| *s == ConnectionState::Open).await.unwrap();

    client.close().await.unwrap();
    watch.wait_for(|s| *s == ConnectionState::Closed).await.unwrap();
}
