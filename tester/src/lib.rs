//! # Seatbook Tester
//!
//! Concurrent load and protocol-fuzzing harness for the Seatbook server.
//!
//! The harness splits a seat range into three groups that must end `FREE`,
//! `SOLD` and `RESERVED`, then drives them there from many connections at
//! once while a fuzzer hammers the server with malformed messages:
//!
//! - **Client**: one persistent connection per consumer ([`client`])
//! - **Strategies**: retry-until-OK and malformed-message fuzzing ([`strategy`])
//! - **Orchestrator**: partitioning, run barrier and state verification
//!   ([`orchestrator`])

/// Request/response transport
pub mod client;

/// Environment-driven harness configuration
pub mod config;

/// Named client + strategy pairs
pub mod consumer;

/// Test-run orchestration and verification
pub mod orchestrator;

/// Consumer behaviours
pub mod strategy;

pub use client::{Client, TcpClient};
pub use config::Config;
pub use consumer::Consumer;
pub use error::{ClientError, SeatMismatch, StrategyError, TesterError};
pub use orchestrator::{SeatPlan, Tester, new_many_repeaters, query_all_seats, verify_state};
pub use strategy::{BrokenStrategy, FailureCallback, RepeatUntilAllOk, Strategy};

/// Error types for the harness
pub mod error {
    use seatbook_core::protocol::{ProtocolError, Response};
    use seatbook_core::seat::{Seat, SeatStatus};
    use std::fmt;
    use thiserror::Error;

    /// Errors from a single request/response exchange
    #[derive(Error, Debug)]
    pub enum ClientError {
        /// The server could not be reached
        #[error("error connecting to [{address}]: {source}")]
        Connect {
            /// Server address
            address: String,
            /// Underlying I/O error
            #[source]
            source: std::io::Error,
        },

        /// The request could not be written
        #[error("error writing to socket at [{address}]: {source}")]
        Write {
            /// Server address
            address: String,
            /// Underlying I/O error
            #[source]
            source: std::io::Error,
        },

        /// The reply could not be read
        #[error("error reading socket at [{address}]: {source}")]
        Read {
            /// Server address
            address: String,
            /// Underlying I/O error
            #[source]
            source: std::io::Error,
        },

        /// The server closed the connection before replying
        #[error("server at [{address}] closed the connection")]
        ConnectionClosed {
            /// Server address
            address: String,
        },

        /// Any other transport failure
        #[error("transport error: {0}")]
        Transport(String),
    }

    /// Errors raised by a strategy step
    #[derive(Error, Debug)]
    pub enum StrategyError {
        /// The client failed while sending
        #[error("[{name}] error sending message [{message}]: {source}")]
        Transport {
            /// Consumer name
            name: String,
            /// Message being sent
            message: String,
            /// Client failure
            #[source]
            source: ClientError,
        },

        /// The server accepted a message it must reject
        #[error(
            "[{name}] expected failure but server accepted message [{message}] with [{response}]"
        )]
        UnexpectedSuccess {
            /// Consumer name
            name: String,
            /// Malformed message that was accepted
            message: String,
            /// Server reply
            response: String,
        },
    }

    /// A seat whose final status differs from the plan
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SeatMismatch {
        /// Seat
        pub seat: Seat,
        /// Planned status
        pub expected: SeatStatus,
        /// Server reply, `None` if the seat was missing from the query results
        pub actual: Option<Response>,
    }

    impl fmt::Display for SeatMismatch {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.actual {
                Some(actual) => write!(
                    f,
                    "[{}] expected [{}] got [{actual}]",
                    self.seat, self.expected
                ),
                None => write!(f, "[{}] expected [{}] got nothing", self.seat, self.expected),
            }
        }
    }

    /// Errors that fail a harness run
    #[derive(Error, Debug)]
    pub enum TesterError {
        /// Connecting or talking to the server failed
        #[error(transparent)]
        Client(#[from] ClientError),

        /// A blocking consumer failed
        #[error("[{name}] found error, exiting test suite: {source}")]
        Consumer {
            /// Consumer name
            name: String,
            /// Strategy failure
            #[source]
            source: StrategyError,
        },

        /// The fuzzer detected a misbehaving server
        #[error("background consumer reported a failure: {0}")]
        Fuzzer(String),

        /// A status query returned something outside the response vocabulary
        #[error("error while querying state of all known seats: {0}")]
        Protocol(#[from] ProtocolError),

        /// Server state differs from the plan
        #[error(
            "actual results different from expected for {} seat(s): {}",
            .mismatches.len(),
            .mismatches.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        )]
        Assertion {
            /// Every seat that did not match
            mismatches: Vec<SeatMismatch>,
        },

        /// A consumer task panicked or was cancelled
        #[error("consumer task failed: {0}")]
        Join(#[from] tokio::task::JoinError),
    }
}
