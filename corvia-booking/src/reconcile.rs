use chrono::{Duration, Utc};
use corvia_core::notify::{Notice, Notifier};
use corvia_inventory::ledger::SeatLedger;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{BookingPaymentStatus, BookingStatus, PaymentStatus};
use crate::store::{BookingStore, PaymentStore};

/// What applying an event did. Duplicates and stale deliveries are success
/// no-ops, never errors: the gateway delivers at least once and an admin
/// replay tool may re-fire anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event's effect was committed
    Applied,
    /// The effect was already reflected in persisted state
    Duplicate,
    /// The event targets a state older than the current one; discarded
    Stale,
    /// Event kind this processor does not handle
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Unknown payment intent: {0}")]
    UnknownIntent(String),
}

/// Raw gateway webhook, Stripe-shaped. The HTTP layer verifies the signature
/// before this payload reaches the processor.
#[derive(Debug, Deserialize)]
pub struct GatewayWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Charge events reference their intent here rather than in `id`
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_refunded: Option<i64>,
}

/// Applies gateway events to Booking + Payment state exactly once.
///
/// Every handler re-reads persisted state under the store lock before acting,
/// so duplicated, replayed, and out-of-order deliveries collapse into no-ops.
/// The synchronous confirmation path routes through these same handlers, so
/// there is one implementation of every transition.
pub struct ReconciliationProcessor {
    bookings: Arc<BookingStore>,
    payments: Arc<PaymentStore>,
    ledger: Arc<SeatLedger>,
    notifier: Arc<dyn Notifier>,
    /// How long a pending booking keeps its seats after a failed payment
    retry_window: Duration,
}

impl ReconciliationProcessor {
    pub fn new(
        bookings: Arc<BookingStore>,
        payments: Arc<PaymentStore>,
        ledger: Arc<SeatLedger>,
        notifier: Arc<dyn Notifier>,
        retry_window_minutes: i64,
    ) -> Self {
        Self {
            bookings,
            payments,
            ledger,
            notifier,
            retry_window: Duration::minutes(retry_window_minutes),
        }
    }

    /// Normalize and dispatch a raw gateway event
    pub async fn handle_gateway_event(
        &self,
        event: GatewayWebhook,
    ) -> Result<Outcome, ReconcileError> {
        tracing::info!(
            event_id = %event.id,
            kind = %event.type_,
            object = %event.data.object.id,
            "gateway event received"
        );

        match event.type_.as_str() {
            "payment_intent.succeeded" => self.on_intent_succeeded(&event.data.object.id).await,
            "payment_intent.payment_failed" | "payment_intent.canceled" => {
                self.on_intent_failed(&event.data.object.id).await
            }
            "charge.refunded" => {
                let intent_id = event
                    .data
                    .object
                    .payment_intent
                    .as_deref()
                    .unwrap_or(&event.data.object.id);
                let amount = event.data.object.amount_refunded.unwrap_or(0);
                self.on_charge_refunded(intent_id, amount).await
            }
            other => {
                tracing::debug!(kind = other, "ignoring unhandled gateway event");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Payment settled: payment moves to `succeeded` (from `pending`, or from
    /// `failed` when the cardholder retried the same intent), booking
    /// `pending -> confirmed` + paid. Inventory is untouched; the seats were
    /// taken at booking creation.
    pub async fn on_intent_succeeded(&self, intent_id: &str) -> Result<Outcome, ReconcileError> {
        let payment = self
            .payments
            .get(intent_id)
            .ok_or_else(|| ReconcileError::UnknownIntent(intent_id.to_string()))?;

        let now = Utc::now();
        let outcome = self
            .payments
            .update(intent_id, |p| {
                if p.status == PaymentStatus::Succeeded {
                    return Outcome::Duplicate;
                }
                if !p.status.can_transition(PaymentStatus::Succeeded) {
                    return Outcome::Stale;
                }
                p.status = PaymentStatus::Succeeded;
                p.updated_at = now;
                Outcome::Applied
            })
            .ok_or_else(|| ReconcileError::UnknownIntent(intent_id.to_string()))?;

        match outcome {
            Outcome::Duplicate => {
                tracing::info!(intent_id, "duplicate intent.succeeded, no-op");
                return Ok(Outcome::Duplicate);
            }
            Outcome::Stale => {
                tracing::warn!(
                    intent_id,
                    "intent.succeeded for a payment no longer pending, discarding"
                );
                return Ok(Outcome::Stale);
            }
            _ => {}
        }

        let confirmed = self
            .bookings
            .update(&payment.booking_id, |b| {
                if b.status.can_transition(BookingStatus::Confirmed) {
                    b.status = BookingStatus::Confirmed;
                    b.payment_status = BookingPaymentStatus::Paid;
                    b.updated_at = now;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);

        if confirmed {
            tracing::info!(intent_id, booking_id = %payment.booking_id, "booking confirmed");
            if let Some(booking) = self.bookings.get(&payment.booking_id) {
                self.notify(Notice::BookingConfirmed {
                    reference: booking.reference,
                    email: booking.contact.email,
                })
                .await;
            }
        } else {
            // The user cancelled while the success was in flight. Never flip
            // the booking back; the settled payment stays on file for ops.
            tracing::warn!(
                intent_id,
                booking_id = %payment.booking_id,
                "settled payment landed on a non-pending booking, not confirming"
            );
        }

        Ok(Outcome::Applied)
    }

    /// Payment attempt failed: payment `pending -> failed`. The booking stays
    /// pending and keeps its seats for another attempt, unless the retry
    /// window has already elapsed, in which case it is cancelled and the
    /// seats go back to the pool.
    pub async fn on_intent_failed(&self, intent_id: &str) -> Result<Outcome, ReconcileError> {
        let payment = self
            .payments
            .get(intent_id)
            .ok_or_else(|| ReconcileError::UnknownIntent(intent_id.to_string()))?;

        let now = Utc::now();
        let outcome = self
            .payments
            .update(intent_id, |p| {
                if p.status != PaymentStatus::Pending {
                    return Outcome::Duplicate;
                }
                p.status = PaymentStatus::Failed;
                p.updated_at = now;
                Outcome::Applied
            })
            .ok_or_else(|| ReconcileError::UnknownIntent(intent_id.to_string()))?;

        if outcome == Outcome::Duplicate {
            tracing::info!(intent_id, "intent already terminal, no-op");
            return Ok(Outcome::Duplicate);
        }

        let retry_window = self.retry_window;
        let cancelled = self
            .bookings
            .update(&payment.booking_id, |b| {
                if b.status != BookingStatus::Pending {
                    return false;
                }
                b.payment_status = BookingPaymentStatus::Failed;
                b.updated_at = now;
                if now - b.created_at >= retry_window {
                    b.status = BookingStatus::Cancelled;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);

        if cancelled {
            tracing::info!(
                intent_id,
                booking_id = %payment.booking_id,
                "retry window elapsed, booking cancelled"
            );
            self.release_seats_once(&payment.booking_id);
            if let Some(booking) = self.bookings.get(&payment.booking_id) {
                self.notify(Notice::BookingCancelled {
                    reference: booking.reference,
                    email: booking.contact.email,
                })
                .await;
            }
        } else {
            tracing::info!(
                intent_id,
                booking_id = %payment.booking_id,
                "payment failed, booking held for retry"
            );
        }

        Ok(Outcome::Applied)
    }

    /// Money went back: accumulate `refund_amount`; once fully refunded the
    /// payment and booking reach their refunded terminal states and the seats
    /// are released at most once, whichever path gets there first.
    pub async fn on_charge_refunded(
        &self,
        intent_id: &str,
        amount: i64,
    ) -> Result<Outcome, ReconcileError> {
        if amount <= 0 {
            tracing::warn!(intent_id, amount, "refund event with non-positive amount, ignoring");
            return Ok(Outcome::Ignored);
        }

        let payment = self
            .payments
            .get(intent_id)
            .ok_or_else(|| ReconcileError::UnknownIntent(intent_id.to_string()))?;

        let now = Utc::now();
        let (outcome, fully_refunded) = self
            .payments
            .update(intent_id, |p| {
                if p.status == PaymentStatus::Refunded {
                    return (Outcome::Duplicate, false);
                }
                if !p.status.can_transition(PaymentStatus::Refunded) {
                    // Refund for an intent that never settled here
                    return (Outcome::Stale, false);
                }
                p.refund_amount += amount;
                p.updated_at = now;
                let full = p.refund_amount >= p.amount;
                if full {
                    p.status = PaymentStatus::Refunded;
                }
                (Outcome::Applied, full)
            })
            .ok_or_else(|| ReconcileError::UnknownIntent(intent_id.to_string()))?;

        match outcome {
            Outcome::Duplicate => {
                tracing::info!(intent_id, "duplicate charge.refunded, no-op");
                return Ok(Outcome::Duplicate);
            }
            Outcome::Stale => {
                tracing::warn!(intent_id, "charge.refunded for an unsettled payment, discarding");
                return Ok(Outcome::Stale);
            }
            _ => {}
        }

        if !fully_refunded {
            tracing::info!(intent_id, amount, "partial refund recorded");
            return Ok(Outcome::Applied);
        }

        self.bookings.update(&payment.booking_id, |b| {
            if b.status.can_transition(BookingStatus::Refunded) {
                b.status = BookingStatus::Refunded;
                b.updated_at = now;
            }
            b.payment_status = BookingPaymentStatus::Refunded;
        });

        tracing::info!(intent_id, booking_id = %payment.booking_id, "booking fully refunded");
        self.release_seats_once(&payment.booking_id);

        if let Some(booking) = self.bookings.get(&payment.booking_id) {
            self.notify(Notice::BookingRefunded {
                reference: booking.reference,
                email: booking.contact.email,
                amount: payment.amount,
            })
            .await;
        }

        Ok(Outcome::Applied)
    }

    /// Return the booking's reserved seats to the ledger, guarded by the
    /// booking's release-once flag. Safe to call from any path at any time.
    fn release_seats_once(&self, booking_id: &uuid::Uuid) {
        if !self.bookings.arm_seat_release(booking_id) {
            return;
        }
        if let Some(booking) = self.bookings.get(booking_id) {
            if let Err(e) =
                self.ledger
                    .release(booking.flight_id, booking.cabin_class, booking.reserved_seats)
            {
                tracing::warn!(%booking_id, error = %e, "seat release failed");
            }
        }
    }

    async fn notify(&self, notice: Notice) {
        if let Err(e) = self.notifier.send(notice).await {
            tracing::warn!(error = %e, "notifier failed, transition stands");
        }
    }
}
