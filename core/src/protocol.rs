//! Line protocol spoken between booking clients and the server.
//!
//! Every exchange is one request line followed by one response line:
//!
//! ```text
//! client → server   RESERVE: A1\n
//! server → client   OK\n
//! ```
//!
//! # Grammar
//!
//! - Request (server side): `VERB ": " SEAT`, where `VERB` is one of
//!   `RESERVE`, `BUY`, `QUERY` and `SEAT` is a single wire-safe token
//!   (see [`Seat::is_valid_token`]). Parsed by [`Request::parse`].
//! - Command (client side): `VERB ": " SEAT ("," SEAT)*`. Built and parsed by
//!   [`Command`]; the comma-joined form is only produced for batch
//!   construction, the server accepts exactly one seat.
//! - Response: exactly one of `OK`, `FAIL`, `FREE`, `RESERVED`, `SOLD`.
//!   Parsed by [`parse_response`].

use crate::seat::{Seat, SeatStatus};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between a verb and its predicate.
pub const SEPARATOR: &str = ": ";

/// Errors produced while reading protocol lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line is not of the form `VERB: PREDICATE`
    #[error("expected [{line}] to follow form [VERB: PREDICATE]")]
    Malformed {
        /// Offending line
        line: String,
    },

    /// The verb is not part of the vocabulary
    #[error("unknown verb [{verb}] in message [{line}]")]
    UnknownVerb {
        /// Verb as received
        verb: String,
        /// Offending line
        line: String,
    },

    /// The seat token contains characters outside the seat alphabet
    #[error("invalid seat [{seat}] in message [{line}]")]
    InvalidSeat {
        /// Seat token as received
        seat: String,
        /// Offending line
        line: String,
    },

    /// The predicate holds no seats at all
    #[error("no seats in message [{line}]")]
    EmptyPredicate {
        /// Offending line
        line: String,
    },

    /// A response token outside the response vocabulary
    #[error("unexpected response [{response}], should be one of OK, FAIL, FREE, RESERVED, SOLD")]
    UnknownResponse {
        /// Response as received
        response: String,
    },
}

/// Protocol command name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verb {
    /// `FREE → RESERVED`
    Reserve,
    /// `RESERVED → SOLD`
    Buy,
    /// Read the current status
    Query,
}

impl Verb {
    /// All verbs the server understands.
    pub const ALL: [Self; 3] = [Self::Reserve, Self::Buy, Self::Query];

    /// The wire token for this verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserve => "RESERVE",
            Self::Buy => "BUY",
            Self::Query => "QUERY",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownVerb {
                verb: s.to_string(),
                line: s.to_string(),
            })
    }
}

/// A single-seat request as accepted by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// What to do
    pub verb: Verb,
    /// Which seat to do it to
    pub seat: Seat,
}

impl Request {
    /// Parse one request line.
    ///
    /// Leading and trailing whitespace (including the line terminator) is
    /// ignored. The rest must be exactly `VERB: SEAT`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the line does not split into exactly two
    /// parts on `": "`, the verb is unknown, or the seat token is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use seatbook_core::protocol::{Request, Verb};
    ///
    /// let request = Request::parse("BUY: B0\n").unwrap();
    /// assert_eq!(request.verb, Verb::Buy);
    /// assert_eq!(request.seat.as_str(), "B0");
    ///
    /// assert!(Request::parse("BUY:B0").is_err());
    /// ```
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let trimmed = line.trim();
        let (verb, seat) = split_verb(trimmed)?;

        let verb = verb.parse::<Verb>().map_err(|_| ProtocolError::UnknownVerb {
            verb: verb.to_string(),
            line: trimmed.to_string(),
        })?;

        let seat = seat.parse::<Seat>().map_err(|_| ProtocolError::InvalidSeat {
            seat: seat.to_string(),
            line: trimmed.to_string(),
        })?;

        Ok(Self { verb, seat })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.verb, self.seat)
    }
}

/// A client-side command over one or more seats.
///
/// `Display` renders the wire form, `VERB: s1,s2,...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    seats: Vec<Seat>,
}

impl Command {
    /// Create a command for `verb` over `seats`.
    #[must_use]
    pub fn new(verb: Verb, seats: impl IntoIterator<Item = Seat>) -> Self {
        Self {
            verb,
            seats: seats.into_iter().collect(),
        }
    }

    /// Create a single-seat command.
    #[must_use]
    pub fn single(verb: Verb, seat: Seat) -> Self {
        Self {
            verb,
            seats: vec![seat],
        }
    }

    /// `RESERVE` the given seats.
    #[must_use]
    pub fn reserve_seats(seats: impl IntoIterator<Item = Seat>) -> Self {
        Self::new(Verb::Reserve, seats)
    }

    /// `BUY` the given seats.
    #[must_use]
    pub fn buy_seats(seats: impl IntoIterator<Item = Seat>) -> Self {
        Self::new(Verb::Buy, seats)
    }

    /// `QUERY` a single seat.
    #[must_use]
    pub fn query_seat(seat: Seat) -> Self {
        Self::single(Verb::Query, seat)
    }

    /// The command's verb.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// The seats the command applies to.
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Render the command as a protocol line (without terminator).
    #[must_use]
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Parse a client-side command line.
    ///
    /// Seats are split on `,` and are not individually validated; the
    /// predicate must contain at least one non-separator character.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the message does not split into exactly
    /// two parts on `": "`, the predicate is empty, or the verb is unknown.
    pub fn parse(message: &str) -> Result<Self, ProtocolError> {
        let (verb, predicate) = split_verb(message)?;

        if predicate.replace(',', "").trim().is_empty() {
            return Err(ProtocolError::EmptyPredicate {
                line: message.to_string(),
            });
        }

        let verb = verb.parse::<Verb>().map_err(|_| ProtocolError::UnknownVerb {
            verb: verb.to_string(),
            line: message.to_string(),
        })?;

        let seats = predicate.trim().split(',').map(Seat::from).collect();
        Ok(Self { verb, seats })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}", self.verb)?;
        for (i, seat) in self.seats.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{seat}")?;
        }
        Ok(())
    }
}

impl From<Request> for Command {
    fn from(request: Request) -> Self {
        Self::single(request.verb, request.seat)
    }
}

/// One response line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Response {
    /// The transition succeeded
    Ok,
    /// The request was malformed or the transition was not allowed
    Fail,
    /// Answer to a `QUERY`
    Status(SeatStatus),
}

impl Response {
    /// Whether this is the success token.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// The wire token for this response.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Status(status) => status.as_str(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SeatStatus> for Response {
    fn from(status: SeatStatus) -> Self {
        Self::Status(status)
    }
}

impl FromStr for Response {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_response(s)
    }
}

/// Parse a response token against the closed response vocabulary.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownResponse`] for anything else, including the
/// empty string.
pub fn parse_response(response: &str) -> Result<Response, ProtocolError> {
    match response {
        "OK" => Ok(Response::Ok),
        "FAIL" => Ok(Response::Fail),
        other => other
            .parse::<SeatStatus>()
            .map(Response::Status)
            .map_err(|_| ProtocolError::UnknownResponse {
                response: other.to_string(),
            }),
    }
}

fn split_verb(line: &str) -> Result<(&str, &str), ProtocolError> {
    let mut parts = line.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(verb), Some(predicate), None) => Ok((verb, predicate)),
        _ => Err(ProtocolError::Malformed {
            line: line.to_string(),
        }),
    }
}
