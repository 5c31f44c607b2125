//! Consumer strategies.
//!
//! A strategy decides what a consumer sends on each tick and when it is done:
//!
//! - [`RepeatUntilAllOk`] keeps sending one verb for a set of seats, removing a
//!   seat once the server answers `OK`, until none are left.
//! - [`BrokenStrategy`] sends a random malformed message each tick and treats
//!   anything other than a rejection as a failure.

use crate::client::Client;
use crate::error::StrategyError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seatbook_core::protocol::{Command, Response, Verb, parse_response};
use seatbook_core::seat::Seat;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

/// Callback invoked when a [`BrokenStrategy`] detects a failure.
pub type FailureCallback = Arc<dyn Fn(&StrategyError) + Send + Sync>;

/// Messages the server must reject.
///
/// None of these match `<VERB>: <SEAT>` with a known verb and a valid seat.
pub const BROKEN_MESSAGES: &[&str] = &[
    "🍏", "🍎", " 🍐", "🍊 🍋", "🍌", "🍉", "🍇", "🍓", "🍈", "🍒", "🍑", "🍍", "🥭", "🥥", "🥝",
    "🍅", "🍆", "🥑", "🥦", "🥒", "🌶", "🌽", "🥕", "🥔", "🍠", "🥐", "🍞", "🥖", "🥨", "🥯",
    "🧀", "🥚", "🍳", "🥞 🥓", "🥩", "🍗", "🍖", "🌭", "🍔", "🍟", "🍕", "🥪", "🥙", "🌮",
    "🌯", "🥗",
    "BOUGHT: Z12",
    "QUERY Z121",
    "",
    "Z1",
    "BUY:B0",
    "RESERVE:: A1",
    "RESERVE: 🍏",
    " 🍐: A1",
    "RESERV: A1",
    "OK",
    "FAIL: A1",
    "SOLD: A1",
    "FREE",
];

/// A consumer behaviour: one step per tick.
#[derive(Debug)]
pub enum Strategy {
    /// Retry a verb over a seat set until every seat succeeded
    RepeatUntilAllOk(RepeatUntilAllOk),
    /// Send malformed messages forever
    Broken(BrokenStrategy),
}

impl Strategy {
    /// Run one step.
    ///
    /// `Ok(true)` means the strategy has finished, `Ok(false)` means it wants
    /// another tick.
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyError`] on transport failure or when the server
    /// behaves incorrectly.
    pub async fn execute<C>(&self, name: &str, client: &mut C) -> Result<bool, StrategyError>
    where
        C: Client + ?Sized,
    {
        match self {
            Self::RepeatUntilAllOk(strategy) => strategy.execute(name, client).await,
            Self::Broken(strategy) => strategy.execute(name, client).await,
        }
    }
}

impl From<RepeatUntilAllOk> for Strategy {
    fn from(strategy: RepeatUntilAllOk) -> Self {
        Self::RepeatUntilAllOk(strategy)
    }
}

impl From<BrokenStrategy> for Strategy {
    fn from(strategy: BrokenStrategy) -> Self {
        Self::Broken(strategy)
    }
}

/// Sends `verb` for each pending seat until the server answers `OK` for all.
///
/// Pending seats are visited in sorted order. Each tick holds the pending set
/// exclusively for the whole pass.
#[derive(Debug)]
pub struct RepeatUntilAllOk {
    verb: Verb,
    pending: tokio::sync::Mutex<BTreeSet<Seat>>,
}

impl RepeatUntilAllOk {
    /// Create a repeater for `verb` over `seats`.
    pub fn new(verb: Verb, seats: impl IntoIterator<Item = Seat>) -> Self {
        Self {
            verb,
            pending: tokio::sync::Mutex::new(seats.into_iter().collect()),
        }
    }

    /// The verb this repeater sends.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// Seats that have not been answered `OK` yet, in sorted order.
    pub async fn pending(&self) -> Vec<Seat> {
        self.pending.lock().await.iter().cloned().collect()
    }

    /// One pass over the pending seats.
    ///
    /// Stops at the first transport error, leaving the remaining seats pending.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Transport`] if the client fails.
    pub async fn execute<C>(&self, name: &str, client: &mut C) -> Result<bool, StrategyError>
    where
        C: Client + ?Sized,
    {
        let mut pending = self.pending.lock().await;
        let seats: Vec<Seat> = pending.iter().cloned().collect();

        for seat in seats {
            let message = Command::single(self.verb, seat.clone()).serialize();
            let response = client.send(&message).await.map_err(|source| {
                error!(consumer = name, %message, %source, "Error sending message");
                StrategyError::Transport {
                    name: name.to_string(),
                    message: message.clone(),
                    source,
                }
            })?;

            if matches!(parse_response(&response), Ok(Response::Ok)) {
                debug!(consumer = name, %message, "Request succeeded");
                pending.remove(&seat);
            } else {
                debug!(consumer = name, %message, %response, "Request failed, will retry");
            }
        }

        if pending.is_empty() {
            info!(consumer = name, verb = %self.verb, "All requests succeeded");
        }
        Ok(pending.is_empty())
    }
}

/// Sends a randomly chosen message from [`BROKEN_MESSAGES`] on each tick.
///
/// The server must answer anything but `OK`. A transport error or an `OK`
/// reply is reported to the failure callback before it is returned.
pub struct BrokenStrategy {
    rng: Mutex<StdRng>,
    on_failure: FailureCallback,
}

impl BrokenStrategy {
    /// Create a fuzzer whose message choice is driven by `seed`.
    #[must_use]
    pub fn new(seed: u64, on_failure: FailureCallback) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            on_failure,
        }
    }

    fn next_message(&self) -> &'static str {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        BROKEN_MESSAGES[rng.gen_range(0..BROKEN_MESSAGES.len())]
    }

    /// Send one malformed message.
    ///
    /// Returns `Ok(true)` when the server rejected it.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Transport`] if the client fails, or
    /// [`StrategyError::UnexpectedSuccess`] if the server answered `OK`.
    pub async fn execute<C>(&self, name: &str, client: &mut C) -> Result<bool, StrategyError>
    where
        C: Client + ?Sized,
    {
        let message = self.next_message();

        let failure = match client.send(message).await {
            Err(source) => StrategyError::Transport {
                name: name.to_string(),
                message: message.to_string(),
                source,
            },
            Ok(response) if matches!(parse_response(&response), Ok(Response::Ok)) => {
                StrategyError::UnexpectedSuccess {
                    name: name.to_string(),
                    message: message.to_string(),
                    response,
                }
            }
            Ok(response) => {
                debug!(consumer = name, %message, %response, "Malformed message rejected");
                return Ok(true);
            }
        };

        error!(consumer = name, error = %failure, "Broken message was not rejected");
        (self.on_failure)(&failure);
        Err(failure)
    }
}

impl fmt::Debug for BrokenStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokenStrategy").finish_non_exhaustive()
    }
}
