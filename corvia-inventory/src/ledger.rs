use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::flight::CabinClass;

/// Seat pool for one flight/cabin-class pair.
/// Invariant: `0 <= available <= total`, under any concurrency.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SeatCounter {
    pub total: u32,
    pub available: u32,
}

/// Owns every seat counter and is the only code allowed to mutate one.
///
/// `try_reserve` is the sole oversell gate: the availability check and the
/// decrement happen in one critical section under the write lock, so callers
/// can never observe-then-overwrite a stale count.
pub struct SeatLedger {
    seats: RwLock<HashMap<(Uuid, CabinClass), SeatCounter>>,
}

impl SeatLedger {
    pub fn new() -> Self {
        Self {
            seats: RwLock::new(HashMap::new()),
        }
    }

    /// Open a seat pool with `total` seats, all available
    pub fn open(&self, flight_id: Uuid, cabin: CabinClass, total: u32) {
        self.seats.write().expect("seat ledger lock").insert(
            (flight_id, cabin),
            SeatCounter {
                total,
                available: total,
            },
        );
    }

    /// Atomically check `available >= count` and decrement. All-or-nothing
    /// for the full count; a failure reserves nothing.
    pub fn try_reserve(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
        count: u32,
    ) -> Result<(), InventoryError> {
        let mut seats = self.seats.write().expect("seat ledger lock");
        let counter = seats
            .get_mut(&(flight_id, cabin))
            .ok_or(InventoryError::UnknownPool { flight_id, cabin })?;

        if counter.available < count {
            return Err(InventoryError::InsufficientInventory {
                requested: count,
                available: counter.available,
            });
        }

        counter.available -= count;
        Ok(())
    }

    /// Return `count` seats to the pool, clamped at `total`. Exceeding the
    /// total signals a double release upstream; the clamp holds the invariant
    /// and the warning makes the bug visible.
    pub fn release(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
        count: u32,
    ) -> Result<(), InventoryError> {
        let mut seats = self.seats.write().expect("seat ledger lock");
        let counter = seats
            .get_mut(&(flight_id, cabin))
            .ok_or(InventoryError::UnknownPool { flight_id, cabin })?;

        let restored = counter.available.saturating_add(count);
        if restored > counter.total {
            tracing::warn!(
                %flight_id,
                ?cabin,
                restored,
                total = counter.total,
                "seat release exceeds pool total, clamping"
            );
            counter.available = counter.total;
        } else {
            counter.available = restored;
        }
        Ok(())
    }

    /// Advisory snapshot; stale the moment it returns. Admission control
    /// happens in `try_reserve`, never here.
    pub fn availability(&self, flight_id: Uuid, cabin: CabinClass) -> Option<u32> {
        self.seats
            .read()
            .expect("seat ledger lock")
            .get(&(flight_id, cabin))
            .map(|c| c.available)
    }
}

impl Default for SeatLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("No seat pool for flight {flight_id} cabin {cabin:?}")]
    UnknownPool { flight_id: Uuid, cabin: CabinClass },

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_reserve_release_lifecycle() {
        let ledger = SeatLedger::new();
        let flight_id = Uuid::new_v4();
        ledger.open(flight_id, CabinClass::Economy, 10);

        ledger.try_reserve(flight_id, CabinClass::Economy, 4).unwrap();
        assert_eq!(ledger.availability(flight_id, CabinClass::Economy), Some(6));

        ledger.release(flight_id, CabinClass::Economy, 4).unwrap();
        assert_eq!(ledger.availability(flight_id, CabinClass::Economy), Some(10));
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let ledger = SeatLedger::new();
        let flight_id = Uuid::new_v4();
        ledger.open(flight_id, CabinClass::Business, 3);

        let err = ledger
            .try_reserve(flight_id, CabinClass::Business, 4)
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientInventory {
                requested: 4,
                available: 3
            }
        ));
        // Nothing was taken
        assert_eq!(ledger.availability(flight_id, CabinClass::Business), Some(3));
    }

    #[test]
    fn test_release_clamps_at_total() {
        let ledger = SeatLedger::new();
        let flight_id = Uuid::new_v4();
        ledger.open(flight_id, CabinClass::First, 4);

        ledger.try_reserve(flight_id, CabinClass::First, 1).unwrap();
        ledger.release(flight_id, CabinClass::First, 3).unwrap();
        assert_eq!(ledger.availability(flight_id, CabinClass::First), Some(4));
    }

    #[test]
    fn test_unknown_pool() {
        let ledger = SeatLedger::new();
        let err = ledger
            .try_reserve(Uuid::new_v4(), CabinClass::Economy, 1)
            .unwrap_err();
        assert!(matches!(err, InventoryError::UnknownPool { .. }));
    }

    #[test]
    fn test_no_oversell_under_concurrency() {
        // k available seats, k+1 concurrent single-seat reservations:
        // exactly k succeed and the pool ends at zero.
        let k = 16u32;
        let ledger = Arc::new(SeatLedger::new());
        let flight_id = Uuid::new_v4();
        ledger.open(flight_id, CabinClass::Economy, k);

        let handles: Vec<_> = (0..k + 1)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    ledger.try_reserve(flight_id, CabinClass::Economy, 1).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(successes as u32, k);
        assert_eq!(ledger.availability(flight_id, CabinClass::Economy), Some(0));
    }
}
