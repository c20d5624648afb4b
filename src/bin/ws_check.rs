//! Binary to connect to the Upbit public WebSocket and subscribe to the
//! KRW-BTC and KRW-ETH tickers for inspecting live data.
//!
//! # Usage
//!
//! ```sh
//! # optional: sign the handshake
//! export UPBIT_ACCESS_KEY="your-access-key"
//! export UPBIT_SECRET_KEY="your-secret-key"
//! cargo run --bin ws_check --features cli
//! ```

use std::env;
use std::time::Duration;

use tokio::time;
use upbit_rs::ws::{StreamKind, SubscribeOptions, WsClientBuilder};

#[tokio::main]
async fn main() -> upbit_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut builder = WsClientBuilder::new();
    if let (Ok(access), Ok(secret)) = (env::var("UPBIT_ACCESS_KEY"), env::var("UPBIT_SECRET_KEY")) {
        println!("Using credentials from the environment");
        builder = builder.credentials(access, secret);
    }
    let mut client = builder.build_public();

    println!("Subscribing to KRW-BTC, KRW-ETH (ticker)…");
    client.add_subscription(
        StreamKind::Ticker,
        ["KRW-BTC", "KRW-ETH"],
        SubscribeOptions::default(),
    )?;

    println!("Connecting to Upbit WebSocket…");
    client.connect().await?;

    println!("Listening for events for 10 seconds…\n");

    let deadline = time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                println!("\n10 seconds elapsed — disconnecting…");
                break;
            }
            event = client.next_ticker() => {
                match event {
                    Ok(t) => println!(
                        "{:<8} {:>16} {:?} {:+.2}%",
                        t.code,
                        t.trade_price,
                        t.change,
                        t.signed_change_rate * 100.0
                    ),
                    Err(e) if e.is_terminal() => {
                        eprintln!("Stream ended: {e}");
                        break;
                    }
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
    }

    client.close().await?;
    println!("Done.");

    Ok(())
}
