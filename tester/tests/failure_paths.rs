//! Harness runs against servers that misbehave on purpose.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use seatbook_core::inventory::Inventory;
use seatbook_core::protocol::{Request, Verb};
use seatbook_server::handler::respond;
use seatbook_tester::{Config, StrategyError, Tester, TesterError};
use seatbook_testing::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Reply for one request line. `None` hangs up on the client.
type Answer = fn(&Inventory, &str) -> Option<String>;

async fn spawn_scripted_server(answer: Answer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let inventory = Arc::new(Inventory::new());

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let inventory = Arc::clone(&inventory);
            tokio::spawn(async move {
                let mut stream = BufReader::new(stream);
                let mut line = String::new();
                loop {
                    line.clear();
                    if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
                        return;
                    }
                    let Some(reply) = answer(&inventory, &line) else {
                        return;
                    };
                    let written = stream
                        .get_mut()
                        .write_all(format!("{reply}\n").as_bytes())
                        .await;
                    if written.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

/// Accepts every malformed line, refuses every transition, answers queries.
fn accepts_garbage(inventory: &Inventory, line: &str) -> Option<String> {
    match Request::parse(line) {
        Err(_) => Some("OK".to_string()),
        Ok(request) if request.verb == Verb::Query => Some(respond(inventory, line).to_string()),
        Ok(_) => Some("FAIL".to_string()),
    }
}

/// Behaves correctly except that it closes any connection sending `BUY`.
fn hangs_up_on_buyers(inventory: &Inventory, line: &str) -> Option<String> {
    match Request::parse(line) {
        Ok(request) if request.verb == Verb::Buy => None,
        _ => Some(respond(inventory, line).to_string()),
    }
}

fn config(addr: SocketAddr) -> Config {
    Config {
        host: addr.ip().to_string(),
        port: addr.port(),
        seats: 30,
        concurrency: 6,
        seed: 7,
    }
}

#[tokio::test]
async fn accepted_garbage_fails_the_run_through_the_fuzzer() {
    init_tracing();
    let addr = spawn_scripted_server(accepts_garbage).await;

    let tester = Tester::start(config(addr)).await.unwrap();
    let error = tester.run().await.unwrap_err();

    assert!(matches!(error, TesterError::Fuzzer(_)), "{error}");
    assert!(error.to_string().contains("[fuzzer-000]"), "{error}");
}

#[tokio::test]
async fn dropped_connection_fails_the_run_through_the_consumer() {
    init_tracing();
    let addr = spawn_scripted_server(hangs_up_on_buyers).await;

    let tester = Tester::start(config(addr)).await.unwrap();
    let error = tester.run().await.unwrap_err();

    assert!(
        matches!(
            &error,
            TesterError::Consumer {
                name,
                source: StrategyError::Transport { .. },
            } if name.starts_with("buyer-")
        ),
        "{error}"
    );
}
