use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Payment, PaymentStatus};

/// In-memory booking store. Mutations run as closures under the write lock,
/// so every status change is a check-then-commit against the latest
/// persisted state rather than against a caller's stale snapshot.
pub struct BookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, booking: Booking) {
        self.bookings
            .write()
            .expect("booking store lock")
            .insert(booking.id, booking);
    }

    pub fn get(&self, id: &Uuid) -> Option<Booking> {
        self.bookings
            .read()
            .expect("booking store lock")
            .get(id)
            .cloned()
    }

    /// Run `f` against the stored record under the write lock
    pub fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut Booking) -> R) -> Option<R> {
        self.bookings
            .write()
            .expect("booking store lock")
            .get_mut(id)
            .map(f)
    }

    /// Arm the one permitted seat release for this booking. Returns true for
    /// exactly one caller over the booking's lifetime; whoever wins performs
    /// the ledger release.
    pub fn arm_seat_release(&self, id: &Uuid) -> bool {
        self.update(id, |b| {
            if b.seats_released {
                false
            } else {
                b.seats_released = true;
                true
            }
        })
        .unwrap_or(false)
    }

    /// Pending bookings created before `cutoff`, for the stale-hold sweep
    pub fn pending_older_than(&self, cutoff: DateTime<Utc>) -> Vec<Uuid> {
        self.bookings
            .read()
            .expect("booking store lock")
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .map(|b| b.id)
            .collect()
    }
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Payment rows keyed by gateway intent id, the idempotency key every
/// reconciliation path looks up by. Never keyed by booking id: a booking may
/// own several attempts.
pub struct PaymentStore {
    payments: RwLock<HashMap<String, Payment>>,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self {
            payments: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, payment: Payment) {
        self.payments
            .write()
            .expect("payment store lock")
            .insert(payment.intent_id.clone(), payment);
    }

    pub fn get(&self, intent_id: &str) -> Option<Payment> {
        self.payments
            .read()
            .expect("payment store lock")
            .get(intent_id)
            .cloned()
    }

    /// Run `f` against the stored record under the write lock
    pub fn update<R>(&self, intent_id: &str, f: impl FnOnce(&mut Payment) -> R) -> Option<R> {
        self.payments
            .write()
            .expect("payment store lock")
            .get_mut(intent_id)
            .map(f)
    }

    /// The booking's settled payment, if any. At most one row can be in
    /// `Succeeded` because only `Pending -> Succeeded` transitions exist and
    /// a booking leaves `pending` on the first success.
    pub fn succeeded_for_booking(&self, booking_id: &Uuid) -> Option<Payment> {
        self.payments
            .read()
            .expect("payment store lock")
            .values()
            .find(|p| p.booking_id == *booking_id && p.status == PaymentStatus::Succeeded)
            .cloned()
    }

    /// Every attempt made against a booking, oldest first
    pub fn attempts_for_booking(&self, booking_id: &Uuid) -> Vec<Payment> {
        let mut attempts: Vec<Payment> = self
            .payments
            .read()
            .expect("payment store lock")
            .values()
            .filter(|p| p.booking_id == *booking_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|p| p.created_at);
        attempts
    }
}

impl Default for PaymentStore {
    fn default() -> Self {
        Self::new()
    }
}
