//! Seat inventory with atomic check-and-set transitions.
//!
//! The inventory is the only state shared between connections. Every seat lives
//! in its own atomic cell so that transitions on different seats never contend:
//!
//! - `reserve`, `buy` and `get` take the map's **shared** lock and operate on the
//!   seat's cell with a single compare-and-swap or load
//! - creating a cell for a never-seen seat takes the **exclusive** lock
//! - [`Inventory::snapshot`] takes the **exclusive** lock, so a multi-seat read
//!   observes no transition in progress
//!
//! Unseen seats are `Free`. Reads never create cells.
//!
//! # Example
//!
//! ```
//! use seatbook_core::inventory::Inventory;
//! use seatbook_core::seat::{Seat, SeatStatus};
//!
//! let inventory = Inventory::new();
//! let seat = Seat::new("A1");
//!
//! inventory.reserve(&seat).unwrap();
//! assert!(inventory.reserve(&seat).is_err());
//! inventory.buy(&seat).unwrap();
//! assert_eq!(inventory.get(&seat), SeatStatus::Sold);
//! ```

use crate::seat::{Seat, SeatStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// A seat was not in the status an operation requires.
///
/// The inventory is left unchanged whenever this error is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("seat [{seat}] must be [{required}] for this operation, it is [{actual}]")]
pub struct TransitionError {
    /// The seat the operation targeted
    pub seat: Seat,
    /// Status the operation requires
    pub required: SeatStatus,
    /// Status the seat actually had
    pub actual: SeatStatus,
}

/// Seat status store.
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
#[derive(Debug, Default)]
pub struct Inventory {
    seats: RwLock<HashMap<Seat, AtomicU8>>,
}

impl Inventory {
    /// Create an empty inventory (every seat `Free`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `seat` from `Free` to `Reserved`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the seat is not `Free`.
    pub fn reserve(&self, seat: &Seat) -> Result<(), TransitionError> {
        self.transition(seat, SeatStatus::Free, SeatStatus::Reserved)
    }

    /// Move `seat` from `Reserved` to `Sold`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the seat is not `Reserved`.
    pub fn buy(&self, seat: &Seat) -> Result<(), TransitionError> {
        self.transition(seat, SeatStatus::Reserved, SeatStatus::Sold)
    }

    /// Current status of `seat`.
    #[must_use]
    pub fn get(&self, seat: &Seat) -> SeatStatus {
        self.read()
            .get(seat)
            .map_or(SeatStatus::Free, |cell| {
                SeatStatus::from_u8(cell.load(Ordering::Acquire))
            })
    }

    /// Consistent view of several seats at once.
    ///
    /// Holds the exclusive lock for the whole read, so no reservation or
    /// purchase can interleave with it.
    pub fn snapshot<'a, I>(&self, seats: I) -> BTreeMap<Seat, SeatStatus>
    where
        I: IntoIterator<Item = &'a Seat>,
    {
        let guard = self.write();
        seats
            .into_iter()
            .map(|seat| {
                let status = guard.get(seat).map_or(SeatStatus::Free, |cell| {
                    SeatStatus::from_u8(cell.load(Ordering::Acquire))
                });
                (seat.clone(), status)
            })
            .collect()
    }

    /// Number of seats that have ever been mutated.
    #[must_use]
    pub fn tracked_seats(&self) -> usize {
        self.read().len()
    }

    fn transition(
        &self,
        seat: &Seat,
        required: SeatStatus,
        target: SeatStatus,
    ) -> Result<(), TransitionError> {
        {
            let seats = self.read();
            match seats.get(seat) {
                Some(cell) => return compare_and_set(seat, cell, required, target),
                None if required != SeatStatus::Free => {
                    return Err(TransitionError {
                        seat: seat.clone(),
                        required,
                        actual: SeatStatus::Free,
                    });
                }
                None => {}
            }
        }

        // First mutation of this seat: another writer may have created the
        // cell between the two lock acquisitions, so the CAS still decides.
        let mut seats = self.write();
        let cell = seats
            .entry(seat.clone())
            .or_insert_with(|| AtomicU8::new(SeatStatus::Free.to_u8()));
        compare_and_set(seat, cell, required, target)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Seat, AtomicU8>> {
        self.seats.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Seat, AtomicU8>> {
        self.seats.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn compare_and_set(
    seat: &Seat,
    cell: &AtomicU8,
    required: SeatStatus,
    target: SeatStatus,
) -> Result<(), TransitionError> {
    cell.compare_exchange(
        required.to_u8(),
        target.to_u8(),
        Ordering::AcqRel,
        Ordering::Acquire,
    )
    .map(|_| ())
    .map_err(|actual| TransitionError {
        seat: seat.clone(),
        required,
        actual: SeatStatus::from_u8(actual),
    })
}
