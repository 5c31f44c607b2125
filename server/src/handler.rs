//! Per-connection read → parse → dispatch → respond loop.
//!
//! A connection is served strictly sequentially: one request line is read,
//! answered and flushed before the next one is read. Protocol and transition
//! failures become `FAIL` responses and the connection stays open; only an I/O
//! error ends it early.

use seatbook_core::inventory::Inventory;
use seatbook_core::protocol::{Request, Response, Verb};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

/// Answer a single request line against `inventory`.
///
/// Never fails: malformed lines and illegal transitions both map to
/// [`Response::Fail`], and `QUERY` always answers with the current status.
pub fn respond(inventory: &Inventory, line: &str) -> Response {
    let request = match Request::parse(line) {
        Ok(request) => request,
        Err(error) => {
            debug!(%error, "Rejecting malformed request");
            record("invalid", Response::Fail);
            return Response::Fail;
        }
    };

    debug!(verb = %request.verb, seat = %request.seat, "Executing request");
    let response = match request.verb {
        Verb::Reserve => transition_response(inventory.reserve(&request.seat)),
        Verb::Buy => transition_response(inventory.buy(&request.seat)),
        Verb::Query => Response::Status(inventory.get(&request.seat)),
    };

    record(request.verb.as_str(), response);
    response
}

fn transition_response(result: Result<(), seatbook_core::TransitionError>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(error) => {
            debug!(%error, "Transition refused");
            Response::Fail
        }
    }
}

fn record(verb: &'static str, response: Response) {
    metrics::counter!("seatbook.requests", "verb" => verb, "response" => response.as_str())
        .increment(1);
}

/// Serve one connection until the peer closes it.
///
/// Request bytes that are not valid UTF-8 are decoded lossily, so they are
/// answered with `FAIL` like any other malformed line. A trailing fragment
/// without a newline at end-of-stream is discarded.
///
/// Line length is not capped: a peer that never sends a newline makes the
/// read buffer grow until it disconnects.
///
/// # Errors
///
/// Returns the underlying I/O error if reading from or writing to the stream
/// fails. The caller is expected to drop the connection.
pub async fn handle_connection<S>(stream: S, inventory: &Inventory) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).await?;
        if read == 0 || line.last() != Some(&b'\n') {
            debug!("Peer closed connection");
            return Ok(());
        }

        let message = String::from_utf8_lossy(&line);
        debug!(message = %message.trim_end(), "Received message");
        let response = respond(inventory, &message);

        debug!(%response, "Sending response");
        writer.write_all(response.as_str().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
}
