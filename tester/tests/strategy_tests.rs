//! Strategy behaviour against scripted clients.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use seatbook_core::protocol::Verb;
use seatbook_core::seat::Seat;
use seatbook_tester::strategy::BROKEN_MESSAGES;
use seatbook_tester::{
    BrokenStrategy, Consumer, FailureCallback, RepeatUntilAllOk, StrategyError,
};
use seatbook_testing::MockClient;
use std::sync::{Arc, Mutex};

fn seats(ids: &[&str]) -> Vec<Seat> {
    ids.iter().copied().map(Seat::new).collect()
}

fn recording_callback() -> (FailureCallback, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: FailureCallback = Arc::new(move |error: &StrategyError| {
        sink.lock().unwrap().push(error.to_string());
    });
    (callback, seen)
}

#[tokio::test]
async fn repeater_sends_verb_for_each_seat() {
    for verb in Verb::ALL {
        let strategy = RepeatUntilAllOk::new(verb, seats(&["A1", "B2", "C3"]));
        let mut client = MockClient::always("OK");

        let done = strategy.execute("test", &mut client).await.unwrap();

        assert!(done);
        assert_eq!(
            client.sent(),
            [
                format!("{verb}: A1"),
                format!("{verb}: B2"),
                format!("{verb}: C3"),
            ]
        );
    }
}

#[tokio::test]
async fn repeater_retries_only_failed_seats() {
    let strategy = RepeatUntilAllOk::new(Verb::Reserve, seats(&["A1", "B2", "C3"]));
    let mut client = MockClient::with_responses(["OK", "FAIL", "OK", "FAIL", "OK"]);

    assert!(!strategy.execute("test", &mut client).await.unwrap());
    assert_eq!(strategy.pending().await, seats(&["B2"]));

    assert!(!strategy.execute("test", &mut client).await.unwrap());
    assert!(strategy.execute("test", &mut client).await.unwrap());

    assert_eq!(
        client.sent(),
        [
            "RESERVE: A1",
            "RESERVE: B2",
            "RESERVE: C3",
            "RESERVE: B2",
            "RESERVE: B2",
        ]
    );
    assert!(strategy.pending().await.is_empty());
}

#[tokio::test]
async fn repeater_treats_status_replies_as_failures() {
    let strategy = RepeatUntilAllOk::new(Verb::Buy, seats(&["A1"]));
    let mut client = MockClient::with_responses(["SOLD", "", "OK"]);

    assert!(!strategy.execute("test", &mut client).await.unwrap());
    assert!(!strategy.execute("test", &mut client).await.unwrap());
    assert!(strategy.execute("test", &mut client).await.unwrap());
}

#[tokio::test]
async fn repeater_recovers_after_transport_error() {
    let strategy = RepeatUntilAllOk::new(Verb::Reserve, seats(&["A1", "B2", "C3"]));
    let mut client = MockClient::failing("connection reset");

    let error = strategy.execute("test", &mut client).await.unwrap_err();
    assert!(matches!(error, StrategyError::Transport { .. }));
    assert_eq!(strategy.pending().await.len(), 3);

    let mut client = MockClient::always("OK");
    assert!(strategy.execute("test", &mut client).await.unwrap());
    assert_eq!(client.sent(), ["RESERVE: A1", "RESERVE: B2", "RESERVE: C3"]);
}

#[tokio::test]
async fn repeater_stops_pass_at_first_transport_error() {
    let strategy = RepeatUntilAllOk::new(Verb::Reserve, seats(&["A1", "B2", "C3"]));
    // One scripted reply, then the mock runs dry and reports a transport error.
    let mut client = MockClient::with_responses(["OK"]);

    assert!(strategy.execute("test", &mut client).await.is_err());
    assert_eq!(client.sent(), ["RESERVE: A1", "RESERVE: B2"]);
    assert_eq!(strategy.pending().await, seats(&["B2", "C3"]));
}

#[tokio::test]
async fn repeater_with_no_seats_is_done_immediately() {
    let strategy = RepeatUntilAllOk::new(Verb::Buy, Vec::new());
    let mut client = MockClient::default();

    assert!(strategy.execute("test", &mut client).await.unwrap());
    assert!(client.sent().is_empty());
}

#[tokio::test]
async fn broken_strategy_sends_malformed_messages() {
    let (callback, seen) = recording_callback();
    let strategy = BrokenStrategy::new(1, callback);
    let mut client = MockClient::always("FAIL");

    for _ in 0..50 {
        assert!(strategy.execute("fuzzer", &mut client).await.unwrap());
    }

    assert_eq!(client.sent().len(), 50);
    for message in client.sent() {
        assert!(BROKEN_MESSAGES.contains(&message.as_str()), "{message:?}");
    }
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn broken_strategy_reports_unexpected_success() {
    let (callback, seen) = recording_callback();
    let strategy = BrokenStrategy::new(1, callback);
    let mut client = MockClient::always("OK");

    let error = strategy.execute("fuzzer", &mut client).await.unwrap_err();

    assert!(matches!(error, StrategyError::UnexpectedSuccess { .. }));
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(seen.lock().unwrap()[0].contains("[fuzzer]"));
}

#[tokio::test]
async fn broken_strategy_reports_transport_error() {
    let (callback, seen) = recording_callback();
    let strategy = BrokenStrategy::new(1, callback);
    let mut client = MockClient::failing("broken pipe");

    let error = strategy.execute("fuzzer", &mut client).await.unwrap_err();

    assert!(matches!(error, StrategyError::Transport { .. }));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn consumer_ticks_its_strategy_with_its_client() {
    let strategy = RepeatUntilAllOk::new(Verb::Query, seats(&["Z9"]));
    let mut consumer = Consumer::new("querier", MockClient::always("OK"), strategy);

    assert_eq!(consumer.name(), "querier");
    assert!(consumer.tick().await.unwrap());
    assert_eq!(consumer.client().sent(), ["QUERY: Z9"]);
}
