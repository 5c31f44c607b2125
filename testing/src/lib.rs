//! # Seatbook Testing
//!
//! Testing utilities and helpers for Seatbook.
//!
//! This crate provides:
//! - A scripted [`MockClient`] for driving harness strategies without a server
//! - An in-process [`TestServer`] bound to an ephemeral port
//! - proptest strategies for seat identifiers and request lines
//!
//! ## Example
//!
//! ```ignore
//! use seatbook_testing::{MockClient, TestServer};
//! use seatbook_tester::{Client, TcpClient};
//!
//! #[tokio::test]
//! async fn reserve_then_query() {
//!     let server = TestServer::start().await.unwrap();
//!     let mut client = TcpClient::connect(server.address()).await.unwrap();
//!
//!     assert_eq!(client.send("RESERVE: A1").await.unwrap(), "OK");
//!     assert_eq!(client.send("QUERY: A1").await.unwrap(), "RESERVED");
//! }
//! ```

/// Mock implementations for testing.
pub mod mocks {
    use async_trait::async_trait;
    use seatbook_tester::client::Client;
    use seatbook_tester::error::ClientError;
    use std::collections::VecDeque;

    /// Scripted [`Client`] that records every message it is asked to send.
    ///
    /// Replies come from, in order of precedence:
    /// 1. the injected error, if set
    /// 2. the fixed reply, if set
    /// 3. the queue of scripted replies
    ///
    /// Running out of scripted replies is reported as a transport error.
    ///
    /// # Example
    ///
    /// ```
    /// use seatbook_testing::MockClient;
    /// use seatbook_tester::Client;
    ///
    /// # tokio_test::block_on(async {
    /// let mut client = MockClient::with_responses(["OK", "FAIL"]);
    /// assert_eq!(client.send("RESERVE: A1").await.unwrap(), "OK");
    /// assert_eq!(client.send("RESERVE: A1").await.unwrap(), "FAIL");
    /// assert!(client.send("RESERVE: A1").await.is_err());
    /// assert_eq!(client.sent().len(), 3);
    /// # });
    /// ```
    #[derive(Debug, Default, Clone)]
    pub struct MockClient {
        responses: VecDeque<String>,
        always: Option<String>,
        error: Option<String>,
        sent: Vec<String>,
    }

    impl MockClient {
        /// A client that answers every message with `response`.
        #[must_use]
        pub fn always(response: impl Into<String>) -> Self {
            Self {
                always: Some(response.into()),
                ..Self::default()
            }
        }

        /// A client that answers with `responses` in order.
        #[must_use]
        pub fn with_responses<I, S>(responses: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                responses: responses.into_iter().map(Into::into).collect(),
                ..Self::default()
            }
        }

        /// A client whose every send fails with `message`.
        #[must_use]
        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                error: Some(message.into()),
                ..Self::default()
            }
        }

        /// Set or clear the injected error.
        pub fn set_error(&mut self, error: Option<String>) {
            self.error = error;
        }

        /// Messages received so far, in order.
        #[must_use]
        pub fn sent(&self) -> &[String] {
            &self.sent
        }
    }

    #[async_trait]
    impl Client for MockClient {
        async fn send(&mut self, message: &str) -> Result<String, ClientError> {
            self.sent.push(message.to_string());

            if let Some(error) = &self.error {
                return Err(ClientError::Transport(error.clone()));
            }
            if let Some(response) = &self.always {
                return Ok(response.clone());
            }
            self.responses
                .pop_front()
                .ok_or_else(|| ClientError::Transport("no scripted response left".to_string()))
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use seatbook_core::inventory::Inventory;
    use seatbook_server::{Server, ServerError};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::task::JoinHandle;

    /// A [`Server`] running on its own task on `127.0.0.1` with an ephemeral
    /// port. The task is aborted when this value is dropped.
    #[derive(Debug)]
    pub struct TestServer {
        addr: SocketAddr,
        inventory: Arc<Inventory>,
        handle: JoinHandle<()>,
    }

    impl TestServer {
        /// Start a server over a fresh inventory.
        ///
        /// # Errors
        ///
        /// Returns [`ServerError`] if the listener cannot be bound.
        pub async fn start() -> Result<Self, ServerError> {
            Self::with_inventory(Arc::new(Inventory::new())).await
        }

        /// Start a server over `inventory`.
        ///
        /// # Errors
        ///
        /// Returns [`ServerError`] if the listener cannot be bound.
        pub async fn with_inventory(inventory: Arc<Inventory>) -> Result<Self, ServerError> {
            let server = Server::bind("127.0.0.1:0", Arc::clone(&inventory)).await?;
            let addr = server.local_addr();
            let handle = tokio::spawn(server.run());
            Ok(Self {
                addr,
                inventory,
                handle,
            })
        }

        /// Bound socket address.
        #[must_use]
        pub const fn addr(&self) -> SocketAddr {
            self.addr
        }

        /// `host:port` string for clients.
        #[must_use]
        pub fn address(&self) -> String {
            self.addr.to_string()
        }

        /// The inventory behind the server.
        #[must_use]
        pub fn inventory(&self) -> &Inventory {
            &self.inventory
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    /// Install a test-writer tracing subscriber honouring `RUST_LOG`.
    ///
    /// Safe to call from every test; only the first call installs it.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use seatbook_core::protocol::Verb;
    use seatbook_core::seat::Seat;

    /// Valid seat identifiers: one or more word characters.
    pub fn seat() -> impl Strategy<Value = Seat> {
        "[A-Za-z0-9_]{1,8}".prop_map(Seat::new)
    }

    /// Any request verb.
    pub fn verb() -> impl Strategy<Value = Verb> {
        prop::sample::select(Verb::ALL.to_vec())
    }

    /// Well-formed request lines, without terminator.
    pub fn request_line() -> impl Strategy<Value = String> {
        (verb(), seat()).prop_map(|(verb, seat)| format!("{verb}: {seat}"))
    }
}

// Re-export commonly used items
pub use helpers::{TestServer, init_tracing};
pub use mocks::MockClient;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use seatbook_core::protocol::Request;
    use seatbook_tester::Client;

    #[tokio::test]
    async fn mock_records_messages_even_when_failing() {
        let mut client = MockClient::failing("boom");
        assert!(client.send("BUY: A1").await.is_err());
        assert_eq!(client.sent(), ["BUY: A1"]);

        client.set_error(None);
        assert!(client.send("BUY: A1").await.is_err());
        assert_eq!(client.sent().len(), 2);
    }

    proptest! {
        #[test]
        fn generated_request_lines_parse(line in properties::request_line()) {
            prop_assert!(Request::parse(&line).is_ok());
        }
    }
}
