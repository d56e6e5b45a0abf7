use chrono::{DateTime, Duration, Utc};
use corvia_core::actor::Actor;
use corvia_core::notify::{Notice, Notifier};
use corvia_inventory::fares::{calculate_fare, FareError, PassengerType};
use corvia_inventory::flight::{CabinClass, FlightDirectory};
use corvia_inventory::ledger::{InventoryError, SeatLedger};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    generate_reference, Booking, BookingPaymentStatus, BookingStatus, ContactInfo, Passenger,
};
use crate::payments::{PaymentError, PaymentManager};
use crate::settings::BusinessRules;
use crate::store::BookingStore;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Flight {0} has already departed")]
    FlightDeparted(Uuid),

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Not enough seats: requested {requested}, available {available}")]
    SeatsUnavailable { requested: u32, available: u32 },

    #[error("Not authorized to manage this booking")]
    NotAuthorized,

    #[error("Cancellation window closed: departure in {hours_to_departure}h, window is {window_hours}h")]
    CancellationWindowClosed {
        hours_to_departure: i64,
        window_hours: i64,
    },

    #[error("Booking already in terminal status {0:?}")]
    AlreadyCancelled(BookingStatus),

    #[error(transparent)]
    Fare(#[from] FareError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub passengers: Vec<Passenger>,
    pub contact: ContactInfo,
}

/// Orchestrates the booking lifecycle. Creation is the only seat-consuming
/// path and goes through the ledger's atomic reserve; `pending -> confirmed`
/// belongs to the reconciliation processor alone, so a booking can never be
/// confirmed without a settled payment.
pub struct BookingManager {
    flights: Arc<FlightDirectory>,
    ledger: Arc<SeatLedger>,
    bookings: Arc<BookingStore>,
    payments: Arc<PaymentManager>,
    notifier: Arc<dyn Notifier>,
    rules: BusinessRules,
}

impl BookingManager {
    pub fn new(
        flights: Arc<FlightDirectory>,
        ledger: Arc<SeatLedger>,
        bookings: Arc<BookingStore>,
        payments: Arc<PaymentManager>,
        notifier: Arc<dyn Notifier>,
        rules: BusinessRules,
    ) -> Self {
        Self {
            flights,
            ledger,
            bookings,
            payments,
            notifier,
            rules,
        }
    }

    /// Reserve seats and open a pending booking. All-or-nothing: on
    /// `SeatsUnavailable` nothing was reserved and nothing persisted.
    pub fn create_booking(
        &self,
        request: CreateBookingRequest,
        owner: &Actor,
    ) -> Result<Booking, BookingError> {
        let flight = self
            .flights
            .get(&request.flight_id)
            .ok_or(BookingError::FlightNotFound(request.flight_id))?;

        let now = Utc::now();
        if flight.departure_at <= now {
            return Err(BookingError::FlightDeparted(flight.id));
        }

        // Fare first: it is pure, so a bad request fails before any seat moves
        let party: Vec<PassengerType> = request
            .passengers
            .iter()
            .map(|p| p.passenger_type)
            .collect();
        let total_amount = calculate_fare(flight.base_fare, request.cabin_class, &party)?;

        let seat_count = request.passengers.len() as u32;
        self.ledger
            .try_reserve(request.flight_id, request.cabin_class, seat_count)
            .map_err(|e| match e {
                InventoryError::InsufficientInventory {
                    requested,
                    available,
                } => BookingError::SeatsUnavailable {
                    requested,
                    available,
                },
                InventoryError::UnknownPool { .. } => {
                    BookingError::FlightNotFound(request.flight_id)
                }
            })?;

        let booking = Booking {
            id: Uuid::new_v4(),
            reference: generate_reference(),
            user_id: owner.user_id,
            flight_id: request.flight_id,
            cabin_class: request.cabin_class,
            passengers: request.passengers,
            contact: request.contact,
            total_amount,
            currency: self.rules.currency.clone(),
            status: BookingStatus::Pending,
            payment_status: BookingPaymentStatus::Pending,
            reserved_seats: seat_count,
            seats_released: false,
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(booking.clone());

        tracing::info!(
            booking = %booking.reference,
            flight = %flight.flight_number,
            cabin = ?booking.cabin_class,
            seats = seat_count,
            total = total_amount,
            "booking created"
        );

        Ok(booking)
    }

    /// Cancel a booking. A confirmed booking is only cancellable outside the
    /// cancellation window, measured against the flight's scheduled
    /// departure. Seats are released exactly once; a paid booking gets a full
    /// refund through the payment manager.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: &Actor,
    ) -> Result<Booking, BookingError> {
        let snapshot = self
            .bookings
            .get(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;

        if !actor.can_manage(snapshot.user_id) {
            return Err(BookingError::NotAuthorized);
        }

        let flight = self
            .flights
            .get(&snapshot.flight_id)
            .ok_or(BookingError::FlightNotFound(snapshot.flight_id))?;

        let now = Utc::now();
        let window = Duration::hours(self.rules.cancellation_window_hours);

        // Commit against the latest persisted status, not the snapshot: a
        // reconciliation event may have raced us here.
        let decision = self
            .bookings
            .update(&booking_id, |b| {
                if b.status.is_terminal() {
                    return Err(BookingError::AlreadyCancelled(b.status));
                }
                if b.status == BookingStatus::Confirmed
                    && !cancellation_window_open(flight.departure_at, now, window)
                {
                    return Err(BookingError::CancellationWindowClosed {
                        hours_to_departure: (flight.departure_at - now).num_hours(),
                        window_hours: self.rules.cancellation_window_hours,
                    });
                }
                b.status = BookingStatus::Cancelled;
                b.updated_at = now;
                Ok(b.payment_status == BookingPaymentStatus::Paid)
            })
            .ok_or(BookingError::NotFound(booking_id))?;
        let was_paid = decision?;

        if self.bookings.arm_seat_release(&booking_id) {
            if let Err(e) = self.ledger.release(
                snapshot.flight_id,
                snapshot.cabin_class,
                snapshot.reserved_seats,
            ) {
                tracing::warn!(booking = %snapshot.reference, error = %e, "seat release failed");
            }
        }

        tracing::info!(booking = %snapshot.reference, was_paid, "booking cancelled");

        if was_paid {
            // Refund whatever is still refundable, not the booking total: a
            // prior partial refund (fare adjustment, goodwill) already
            // returned part of it.
            if let Some(payment) = self.payments.settled_payment(booking_id) {
                let refundable = payment.amount - payment.refund_amount;
                if refundable > 0 {
                    self.payments
                        .refund(booking_id, refundable, "booking cancelled")
                        .await?;
                }
            }
        }

        self.notify(Notice::BookingCancelled {
            reference: snapshot.reference,
            email: snapshot.contact.email,
        })
        .await;

        self.bookings
            .get(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))
    }

    /// Sweep for pending bookings whose payment retry window has elapsed:
    /// cancel them and return their seats. Covers seats stranded by a failed
    /// payment that never produced another gateway event.
    pub async fn expire_stale_holds(&self) -> usize {
        let now = Utc::now();
        let cutoff = now - Duration::minutes(self.rules.payment_retry_window_minutes);
        let stale = self.bookings.pending_older_than(cutoff);

        let mut expired = 0;
        for booking_id in stale {
            // Re-check under the lock; a success may have landed meanwhile
            let cancelled = self
                .bookings
                .update(&booking_id, |b| {
                    if b.status == BookingStatus::Pending && b.created_at < cutoff {
                        b.status = BookingStatus::Cancelled;
                        b.updated_at = now;
                        true
                    } else {
                        false
                    }
                })
                .unwrap_or(false);

            if !cancelled {
                continue;
            }

            if self.bookings.arm_seat_release(&booking_id) {
                if let Some(b) = self.bookings.get(&booking_id) {
                    if let Err(e) =
                        self.ledger.release(b.flight_id, b.cabin_class, b.reserved_seats)
                    {
                        tracing::warn!(booking = %b.reference, error = %e, "seat release failed");
                    }
                }
            }

            if let Some(b) = self.bookings.get(&booking_id) {
                tracing::info!(booking = %b.reference, "stale hold expired");
                self.notify(Notice::BookingCancelled {
                    reference: b.reference,
                    email: b.contact.email,
                })
                .await;
            }
            expired += 1;
        }
        expired
    }

    pub fn get_booking(&self, booking_id: Uuid) -> Option<Booking> {
        self.bookings.get(&booking_id)
    }

    async fn notify(&self, notice: Notice) {
        if let Err(e) = self.notifier.send(notice).await {
            tracing::warn!(error = %e, "notifier failed, transition stands");
        }
    }
}

/// A confirmed booking is cancellable strictly more than `window` before the
/// scheduled departure; the boundary instant itself is already closed.
fn cancellation_window_open(
    departure_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    departure_at - now > window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_window_boundary() {
        let window = Duration::hours(24);
        let now = Utc::now();

        assert!(cancellation_window_open(now + Duration::hours(25), now, window));
        assert!(!cancellation_window_open(now + Duration::hours(23), now, window));

        // Exactly 24h out is already closed; a second later than that is open
        assert!(!cancellation_window_open(now + Duration::hours(24), now, window));
        assert!(cancellation_window_open(
            now + Duration::hours(24) + Duration::seconds(1),
            now,
            window
        ));
    }
}
