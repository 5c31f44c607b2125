//! Line-protocol behaviour over real TCP connections.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use seatbook_core::seat::{Seat, SeatStatus};
use seatbook_testing::{TestServer, init_tracing};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Minimal line client over a raw socket.
struct Connection {
    stream: BufReader<TcpStream>,
}

impl Connection {
    async fn open(addr: SocketAddr) -> Self {
        Self {
            stream: BufReader::new(TcpStream::connect(addr).await.unwrap()),
        }
    }

    async fn request(&mut self, line: &str) -> String {
        self.stream
            .get_mut()
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
        let mut reply = String::new();
        self.stream.read_line(&mut reply).await.unwrap();
        reply.trim_end().to_string()
    }
}

#[tokio::test]
async fn reserve_then_buy_then_query() {
    init_tracing();
    let server = TestServer::start().await.unwrap();
    let mut conn = Connection::open(server.addr()).await;

    assert_eq!(conn.request("RESERVE: A1").await, "OK");
    assert_eq!(conn.request("BUY: A1").await, "OK");
    assert_eq!(conn.request("QUERY: A1").await, "SOLD");
}

#[tokio::test]
async fn buy_without_reservation_fails() {
    let server = TestServer::start().await.unwrap();
    let mut conn = Connection::open(server.addr()).await;

    assert_eq!(conn.request("BUY: A1").await, "FAIL");
    assert_eq!(conn.request("QUERY: A1").await, "FREE");
}

#[tokio::test]
async fn double_reserve_fails() {
    let server = TestServer::start().await.unwrap();
    let mut conn = Connection::open(server.addr()).await;

    assert_eq!(conn.request("RESERVE: A1").await, "OK");
    assert_eq!(conn.request("RESERVE: A1").await, "FAIL");
    assert_eq!(conn.request("QUERY: A1").await, "RESERVED");
}

#[tokio::test]
async fn malformed_line_keeps_connection_usable() {
    let server = TestServer::start().await.unwrap();
    let mut conn = Connection::open(server.addr()).await;

    assert_eq!(conn.request("BUY:B0").await, "FAIL");
    assert_eq!(conn.request("RESERVE: B0").await, "OK");
    assert_eq!(conn.request("").await, "FAIL");
    assert_eq!(conn.request("RESERVE: A1,A2").await, "FAIL");
    assert_eq!(conn.request("QUERY: B0").await, "RESERVED");
}

#[tokio::test]
async fn invalid_utf8_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let mut conn = Connection::open(server.addr()).await;

    conn.stream.get_mut().write_all(b"RESERVE: \xff\n").await.unwrap();
    let mut reply = String::new();
    conn.stream.read_line(&mut reply).await.unwrap();
    assert_eq!(reply, "FAIL\n");

    assert_eq!(conn.request("QUERY: A1").await, "FREE");
}

#[tokio::test]
async fn pipelined_requests_are_answered_in_order() {
    let server = TestServer::start().await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    stream
        .write_all(b"RESERVE: A1\nRESERVE: A1\nBUY: A1\nQUERY: A1\n")
        .await
        .unwrap();
    stream.shutdown().await.unwrap();

    let mut replies = String::new();
    stream.read_to_string(&mut replies).await.unwrap();
    assert_eq!(replies, "OK\nFAIL\nOK\nSOLD\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reserves_have_one_winner() {
    let server = TestServer::start().await.unwrap();
    let addr = server.addr();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        tasks.push(tokio::spawn(async move {
            let mut conn = Connection::open(addr).await;
            conn.request("RESERVE: A1").await
        }));
    }

    let mut replies = Vec::new();
    for task in tasks {
        replies.push(task.await.unwrap());
    }

    assert_eq!(replies.iter().filter(|r| *r == "OK").count(), 1);
    assert_eq!(replies.iter().filter(|r| *r == "FAIL").count(), 7);

    let mut conn = Connection::open(addr).await;
    assert_eq!(conn.request("QUERY: A1").await, "RESERVED");
}

#[tokio::test]
async fn connections_share_one_inventory() {
    let server = TestServer::start().await.unwrap();
    let mut first = Connection::open(server.addr()).await;
    let mut second = Connection::open(server.addr()).await;

    assert_eq!(first.request("RESERVE: Z9").await, "OK");
    assert_eq!(second.request("BUY: Z9").await, "OK");
    assert_eq!(first.request("QUERY: Z9").await, "SOLD");
    assert_eq!(server.inventory().get(&Seat::new("Z9")), SeatStatus::Sold);
}

#[tokio::test]
async fn closed_connection_does_not_affect_others() {
    let server = TestServer::start().await.unwrap();
    let mut survivor = Connection::open(server.addr()).await;

    {
        let mut doomed = TcpStream::connect(server.addr()).await.unwrap();
        doomed.write_all(b"RESERVE: A1").await.unwrap();
    }

    assert_eq!(survivor.request("RESERVE: A2").await, "OK");
    assert_eq!(survivor.request("QUERY: A1").await, "FREE");
}
