//! Test-run orchestration.
//!
//! A run goes through three phases:
//!
//! 1. **Start**: partition the seats, build consumers, open one connection
//!    each.
//! 2. **Run**: check every seat is `FREE`, start the fuzzer in the
//!    background, then run the allocators and buyers until all of them are
//!    done. The first failure from any consumer aborts the run.
//! 3. **Finish**: query every seat and compare it with the plan.

use crate::client::{Client, TcpClient};
use crate::config::Config;
use crate::consumer::Consumer;
use crate::error::{SeatMismatch, StrategyError, TesterError};
use crate::strategy::{BrokenStrategy, FailureCallback, RepeatUntilAllOk};
use seatbook_core::protocol::{Command, Response, Verb, parse_response};
use seatbook_core::seat::{Seat, SeatStatus};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Seat groups and the status each seat must end in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatPlan {
    /// Final status of every seat in the run
    pub expected: BTreeMap<Seat, SeatStatus>,
    /// Seats the allocators reserve (everything not left `FREE`)
    pub to_allocate: Vec<Seat>,
    /// Seats the buyers buy after they are reserved
    pub to_buy: Vec<Seat>,
}

impl SeatPlan {
    /// Split `num_seats` into three equal groups.
    ///
    /// `A###` seats stay `FREE`, `B###` seats end `SOLD` and `C###` seats end
    /// `RESERVED`. A remainder of `num_seats / 3` is not used.
    #[must_use]
    pub fn new(num_seats: usize) -> Self {
        let per_group = num_seats / 3;
        let group = |prefix: char| -> Vec<Seat> {
            (0..per_group)
                .map(|index| Seat::new(format!("{prefix}{index:03}")))
                .collect()
        };

        let free = group('A');
        let sold = group('B');
        let reserved = group('C');

        let mut expected = BTreeMap::new();
        expected.extend(free.iter().map(|seat| (seat.clone(), SeatStatus::Free)));
        expected.extend(sold.iter().map(|seat| (seat.clone(), SeatStatus::Sold)));
        expected.extend(reserved.iter().map(|seat| (seat.clone(), SeatStatus::Reserved)));

        let to_allocate = reserved.into_iter().chain(sold.iter().cloned()).collect();

        Self {
            expected,
            to_allocate,
            to_buy: sold,
        }
    }

    /// Every seat in the run, sorted.
    #[must_use]
    pub fn all_seats(&self) -> Vec<Seat> {
        self.expected.keys().cloned().collect()
    }
}

/// Split `seats` across `count` repeaters for `verb`.
///
/// Each repeater gets a contiguous chunk of `max(1, len / count)` seats; what
/// is left after `count` chunks goes to one extra repeater. Every seat ends up
/// in exactly one repeater and no repeater is empty. A `count` of zero is
/// treated as one.
#[must_use]
pub fn new_many_repeaters(count: usize, seats: &[Seat], verb: Verb) -> Vec<RepeatUntilAllOk> {
    let count = count.max(1);
    let chunk = (seats.len() / count).max(1);

    let mut chunks = seats.chunks(chunk);
    let mut repeaters: Vec<RepeatUntilAllOk> = chunks
        .by_ref()
        .take(count)
        .map(|chunk| RepeatUntilAllOk::new(verb, chunk.iter().cloned()))
        .collect();

    let remainder: Vec<Seat> = chunks.flatten().cloned().collect();
    if !remainder.is_empty() {
        repeaters.push(RepeatUntilAllOk::new(verb, remainder));
    }

    repeaters
}

/// Query the status of each seat over `client`.
///
/// # Errors
///
/// Returns [`TesterError::Client`] on transport failure and
/// [`TesterError::Protocol`] if a reply is outside the response vocabulary.
pub async fn query_all_seats<C>(
    seats: &[Seat],
    client: &mut C,
) -> Result<BTreeMap<Seat, Response>, TesterError>
where
    C: Client + ?Sized,
{
    let mut results = BTreeMap::new();
    for seat in seats {
        let message = Command::query_seat(seat.clone()).serialize();
        let response = client.send(&message).await?;
        results.insert(seat.clone(), parse_response(&response)?);
    }
    Ok(results)
}

/// Query every seat in `expected` and compare with the server's answers.
///
/// # Errors
///
/// Returns [`TesterError::Assertion`] listing every mismatching seat, or the
/// error from [`query_all_seats`].
pub async fn verify_state<C>(
    client: &mut C,
    expected: &BTreeMap<Seat, SeatStatus>,
) -> Result<(), TesterError>
where
    C: Client + ?Sized,
{
    let seats: Vec<Seat> = expected.keys().cloned().collect();
    let actual = query_all_seats(&seats, client).await?;

    let mismatches: Vec<SeatMismatch> = expected
        .iter()
        .filter_map(|(seat, &status)| {
            let got = actual.get(seat).copied();
            if got == Some(Response::Status(status)) {
                debug!(%seat, %status, "✅ Seat matches");
                return None;
            }
            warn!(%seat, expected = %status, actual = ?got, "❌ Seat does not match");
            Some(SeatMismatch {
                seat: seat.clone(),
                expected: status,
                actual: got,
            })
        })
        .collect();

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(TesterError::Assertion { mismatches })
    }
}

/// A prepared harness run.
#[derive(Debug)]
pub struct Tester {
    config: Config,
    plan: SeatPlan,
    blocking: Vec<Consumer<TcpClient>>,
    background: Vec<Consumer<TcpClient>>,
    failures: mpsc::UnboundedReceiver<String>,
}

impl Tester {
    /// Partition the seats and connect every consumer.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Client`] if any consumer cannot connect.
    pub async fn start(config: Config) -> Result<Self, TesterError> {
        let plan = SeatPlan::new(config.seats);
        let address = config.address();
        let per_verb = config.repeaters_per_verb();
        info!(
            %address,
            seats = plan.expected.len(),
            repeaters_per_verb = per_verb,
            "Starting test"
        );

        let mut blocking = Vec::new();
        for (prefix, verb, seats) in [
            ("buyer", Verb::Buy, &plan.to_buy),
            ("allocator", Verb::Reserve, &plan.to_allocate),
        ] {
            for (index, repeater) in new_many_repeaters(per_verb, seats, verb)
                .into_iter()
                .enumerate()
            {
                let client = TcpClient::connect(address.clone()).await?;
                blocking.push(Consumer::new(format!("{prefix}-{index:03}"), client, repeater));
            }
        }

        let (failure_tx, failures) = mpsc::unbounded_channel();
        let on_failure: FailureCallback = Arc::new(move |error: &StrategyError| {
            // The receiver is gone once the run has ended.
            let _ = failure_tx.send(error.to_string());
        });
        let fuzzer = Consumer::new(
            "fuzzer-000",
            TcpClient::connect(address).await?,
            BrokenStrategy::new(config.seed, on_failure),
        );

        Ok(Self {
            config,
            plan,
            blocking,
            background: vec![fuzzer],
            failures,
        })
    }

    /// The seat plan for this run.
    #[must_use]
    pub const fn plan(&self) -> &SeatPlan {
        &self.plan
    }

    /// Number of consumers that must finish before the run ends.
    #[must_use]
    pub fn blocking_consumers(&self) -> usize {
        self.blocking.len()
    }

    /// Execute the run and verify the final state.
    ///
    /// # Errors
    ///
    /// Returns the first failure: a seat that is not `FREE` up front, a
    /// consumer error, a fuzzer report, or a final-state mismatch.
    pub async fn run(self) -> Result<(), TesterError> {
        let Self {
            config,
            plan,
            blocking,
            background,
            mut failures,
        } = self;
        let address = config.address();

        info!("Making sure server is clear");
        let all_free: BTreeMap<Seat, SeatStatus> = plan
            .expected
            .keys()
            .map(|seat| (seat.clone(), SeatStatus::Free))
            .collect();
        verify_state(&mut TcpClient::connect(address.clone()).await?, &all_free).await?;

        let fuzzers: Vec<JoinHandle<()>> = background
            .into_iter()
            .map(|consumer| tokio::spawn(run_forever(consumer)))
            .collect();

        let mut barrier = JoinSet::new();
        for consumer in blocking {
            barrier.spawn(run_until_done(consumer));
        }

        info!(consumers = barrier.len(), "Waiting for consumers to finish");
        let outcome = tokio::select! {
            result = wait_for_all(&mut barrier) => result,
            Some(reason) = failures.recv() => Err(TesterError::Fuzzer(reason)),
        };
        let outcome = outcome.and_then(|()| {
            failures
                .try_recv()
                .map_or(Ok(()), |reason| Err(TesterError::Fuzzer(reason)))
        });

        for fuzzer in &fuzzers {
            fuzzer.abort();
        }
        barrier.abort_all();
        outcome?;

        info!("Checking final state");
        verify_state(&mut TcpClient::connect(address).await?, &plan.expected).await?;

        info!("✅ TEST SUCCESSFUL ✅");
        Ok(())
    }
}

async fn run_until_done<C: Client>(mut consumer: Consumer<C>) -> Result<(), TesterError> {
    loop {
        match consumer.tick().await {
            Ok(true) => {
                info!(consumer = consumer.name(), "Consumer finished");
                return Ok(());
            }
            Ok(false) => debug!(consumer = consumer.name(), "Consumer has not finished yet"),
            Err(source) => {
                return Err(TesterError::Consumer {
                    name: consumer.name().to_string(),
                    source,
                });
            }
        }
    }
}

async fn run_forever<C: Client>(mut consumer: Consumer<C>) {
    while consumer.tick().await.is_ok() {}
    warn!(consumer = consumer.name(), "Background consumer stopped");
}

async fn wait_for_all(barrier: &mut JoinSet<Result<(), TesterError>>) -> Result<(), TesterError> {
    while let Some(joined) = barrier.join_next().await {
        joined??;
    }
    Ok(())
}
