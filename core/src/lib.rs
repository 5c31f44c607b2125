//! # Seatbook Core
//!
//! Domain types for the Seatbook booking service.
//!
//! This crate holds everything the server and the load harness must agree on:
//!
//! - **Seat / SeatStatus**: opaque seat identifiers and their lifecycle
//!   (`FREE → RESERVED → SOLD`)
//! - **Inventory**: the concurrent seat-status store with atomic transitions
//! - **Protocol**: the newline-delimited request/response grammar
//!
//! ## Example
//!
//! ```
//! use seatbook_core::inventory::Inventory;
//! use seatbook_core::protocol::{Request, Response, Verb};
//!
//! let inventory = Inventory::new();
//! let request = Request::parse("RESERVE: A1").unwrap();
//! assert_eq!(request.verb, Verb::Reserve);
//!
//! let response = match inventory.reserve(&request.seat) {
//!     Ok(()) => Response::Ok,
//!     Err(_) => Response::Fail,
//! };
//! assert_eq!(response.to_string(), "OK");
//! ```

/// Seat identifiers and lifecycle states
pub mod seat;

/// Concurrent seat-status store
pub mod inventory;

/// Line protocol grammar
pub mod protocol;

// Re-export commonly used items
pub use inventory::{Inventory, TransitionError};
pub use protocol::{Command, ProtocolError, Request, Response, Verb, parse_response};
pub use seat::{Seat, SeatStatus};
