//! Seat identifiers and lifecycle states.
//!
//! A seat never needs to be created explicitly: the first reference to an
//! identifier brings it into existence with [`SeatStatus::Free`].

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `Seat` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid seat [{0}]: expected one or more ASCII letters, digits or '_'")]
pub struct ParseSeatError(String);

/// Error type for `SeatStatus` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown seat status [{0}]")]
pub struct ParseStatusError(String);

/// Opaque identifier of a bookable seat.
///
/// # Validation
///
/// - `FromStr::from_str()`: accepts only wire-safe tokens (ASCII alphanumerics
///   and `_`, non-empty)
/// - `From::from()` and `new()`: no validation, for application-controlled ids
///
/// # Examples
///
/// ```
/// use seatbook_core::seat::Seat;
///
/// let seat = Seat::new("A001");
/// assert_eq!(seat.as_str(), "A001");
///
/// assert!("A 1".parse::<Seat>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seat(String);

impl Seat {
    /// Create a new `Seat` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the seat identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `Seat` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether `token` is acceptable as a seat on the wire.
    #[must_use]
    pub fn is_valid_token(token: &str) -> bool {
        !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Seat {
    type Err = ParseSeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid_token(s) {
            return Err(ParseSeatError(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for Seat {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Seat {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for Seat {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Seat {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a seat.
///
/// The only legal path is `Free → Reserved → Sold`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatStatus {
    /// Never reserved
    #[default]
    Free,
    /// Held, waiting to be bought
    Reserved,
    /// Bought (terminal)
    Sold,
}

impl SeatStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Free, Self::Reserved, Self::Sold];

    /// The wire token for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Reserved => "RESERVED",
            Self::Sold => "SOLD",
        }
    }

    /// The status a seat moves to from this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Free => Some(Self::Reserved),
            Self::Reserved => Some(Self::Sold),
            Self::Sold => None,
        }
    }

    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Reserved => 1,
            Self::Sold => 2,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Reserved,
            2 => Self::Sold,
            _ => Self::Free,
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_tokens() {
        assert!(Seat::is_valid_token("A1"));
        assert!(Seat::is_valid_token("seat_001"));
        assert!(Seat::is_valid_token("32y789dwund"));

        assert!(!Seat::is_valid_token(""));
        assert!(!Seat::is_valid_token("A1,B2"));
        assert!(!Seat::is_valid_token("A 1"));
        assert!(!Seat::is_valid_token("B0:"));
        assert!(!Seat::is_valid_token("🍏"));
    }

    #[test]
    fn parse_rejects_invalid_tokens() {
        assert!("".parse::<Seat>().is_err());
        assert!("A1,".parse::<Seat>().is_err());
        assert_eq!("A1".parse::<Seat>(), Ok(Seat::new("A1")));
    }

    #[test]
    fn seats_sort_lexicographically() {
        let mut seats = vec![Seat::new("C3"), Seat::new("A1"), Seat::new("B2")];
        seats.sort();
        assert_eq!(seats, vec![Seat::new("A1"), Seat::new("B2"), Seat::new("C3")]);
    }

    #[test]
    fn status_wire_tokens() {
        for status in SeatStatus::ALL {
            assert_eq!(status.as_str().parse::<SeatStatus>(), Ok(status));
            assert_eq!(SeatStatus::from_u8(status.to_u8()), status);
        }
        assert!("free".parse::<SeatStatus>().is_err());
        assert!("OK".parse::<SeatStatus>().is_err());
    }

    #[test]
    fn lifecycle_order() {
        assert_eq!(SeatStatus::default(), SeatStatus::Free);
        assert_eq!(SeatStatus::Free.next(), Some(SeatStatus::Reserved));
        assert_eq!(SeatStatus::Reserved.next(), Some(SeatStatus::Sold));
        assert_eq!(SeatStatus::Sold.next(), None);
    }
}
