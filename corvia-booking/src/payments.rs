use chrono::Utc;
use corvia_core::payment::{GatewayIntentStatus, PaymentGateway};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{BookingStatus, Payment, PaymentStatus};
use crate::reconcile::{ReconcileError, ReconciliationProcessor};
use crate::store::{BookingStore, PaymentStore};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Booking {0} is not payable in status {1:?}")]
    BookingNotPayable(Uuid, BookingStatus),

    #[error("No settled payment on file for booking {0}")]
    NoPaymentOnFile(Uuid),

    #[error("Refund of {requested} exceeds refundable balance {refundable}")]
    RefundExceedsPaid { requested: i64, refundable: i64 },

    #[error("Unknown payment intent: {0}")]
    UnknownIntent(String),

    #[error("Intent {intent_id} does not belong to booking {booking_id}")]
    IntentMismatch { intent_id: String, booking_id: Uuid },

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
}

impl From<ReconcileError> for PaymentError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::UnknownIntent(id) => PaymentError::UnknownIntent(id),
        }
    }
}

/// Handle returned to the client so it can complete payment with the provider
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub intent_id: String,
    pub client_secret: Option<String>,
}

/// Opens, confirms, and refunds payment intents against the external gateway
/// and keeps the local Payment rows in step. Every gateway call is bounded by
/// a timeout; a failed call surfaces `GatewayUnavailable` and leaves local
/// state exactly as it was before the call.
pub struct PaymentManager {
    gateway: Arc<dyn PaymentGateway>,
    payments: Arc<PaymentStore>,
    bookings: Arc<BookingStore>,
    reconciler: Arc<ReconciliationProcessor>,
    gateway_timeout: Duration,
}

impl PaymentManager {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        payments: Arc<PaymentStore>,
        bookings: Arc<BookingStore>,
        reconciler: Arc<ReconciliationProcessor>,
        gateway_timeout_seconds: u64,
    ) -> Self {
        Self {
            gateway,
            payments,
            bookings,
            reconciler,
            gateway_timeout: Duration::from_secs(gateway_timeout_seconds),
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, PaymentError>
    where
        F: Future<Output = Result<T, Box<dyn std::error::Error + Send + Sync>>>,
    {
        match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PaymentError::GatewayUnavailable(e.to_string())),
            Err(_) => Err(PaymentError::GatewayUnavailable("timed out".to_string())),
        }
    }

    /// Open an intent with the gateway for the booking's total and persist a
    /// pending Payment keyed by the gateway's intent id
    pub async fn create_intent(&self, booking_id: Uuid) -> Result<IntentHandle, PaymentError> {
        let booking = self
            .bookings
            .get(&booking_id)
            .ok_or(PaymentError::BookingNotFound(booking_id))?;
        if booking.status != BookingStatus::Pending {
            return Err(PaymentError::BookingNotPayable(booking_id, booking.status));
        }

        let metadata = serde_json::json!({
            "booking_id": booking.id,
            "reference": booking.reference,
        });
        let intent = self
            .bounded(
                self.gateway
                    .create_intent(booking.total_amount, &booking.currency, metadata),
            )
            .await?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            user_id: booking.user_id,
            intent_id: intent.id.clone(),
            amount: booking.total_amount,
            currency: booking.currency.clone(),
            status: PaymentStatus::Pending,
            refund_amount: 0,
            created_at: now,
            updated_at: now,
        };
        self.payments.insert(payment);

        tracing::info!(
            booking = %booking.reference,
            intent_id = %intent.id,
            amount = booking.total_amount,
            "payment intent opened"
        );

        Ok(IntentHandle {
            intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    /// Client-reported success path. The client's claim is a hint only: the
    /// intent's true status is re-fetched from the gateway and the result
    /// routed through the same reconciliation handlers as a webhook, so there
    /// is no second success path to diverge.
    pub async fn confirm_synchronously(
        &self,
        intent_id: &str,
        booking_id: Uuid,
    ) -> Result<Payment, PaymentError> {
        let payment = self
            .payments
            .get(intent_id)
            .ok_or_else(|| PaymentError::UnknownIntent(intent_id.to_string()))?;
        if payment.booking_id != booking_id {
            return Err(PaymentError::IntentMismatch {
                intent_id: intent_id.to_string(),
                booking_id,
            });
        }

        let intent = self.bounded(self.gateway.retrieve_intent(intent_id)).await?;

        match intent.status {
            GatewayIntentStatus::Succeeded => {
                self.reconciler.on_intent_succeeded(intent_id).await?;
            }
            GatewayIntentStatus::Failed | GatewayIntentStatus::Canceled => {
                self.reconciler.on_intent_failed(intent_id).await?;
            }
            status => {
                tracing::info!(intent_id, ?status, "intent still in flight, nothing to apply");
            }
        }

        self.payments
            .get(intent_id)
            .ok_or_else(|| PaymentError::UnknownIntent(intent_id.to_string()))
    }

    /// Refund part or all of the booking's settled payment. The gateway is
    /// asked first; bookkeeping then goes through the reconciliation refund
    /// path, the same one a `charge.refunded` webhook takes.
    pub async fn refund(
        &self,
        booking_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> Result<Payment, PaymentError> {
        let payment = self
            .payments
            .succeeded_for_booking(&booking_id)
            .ok_or(PaymentError::NoPaymentOnFile(booking_id))?;

        let refundable = payment.amount - payment.refund_amount;
        if amount <= 0 || amount > refundable {
            return Err(PaymentError::RefundExceedsPaid {
                requested: amount,
                refundable,
            });
        }

        let refund_id = self
            .bounded(self.gateway.create_refund(&payment.intent_id, amount))
            .await?;

        tracing::info!(
            booking_id = %booking_id,
            intent_id = %payment.intent_id,
            refund_id = %refund_id,
            amount,
            reason,
            "gateway accepted refund"
        );

        self.reconciler
            .on_charge_refunded(&payment.intent_id, amount)
            .await?;

        self.payments
            .get(&payment.intent_id)
            .ok_or_else(|| PaymentError::UnknownIntent(payment.intent_id.clone()))
    }

    /// The booking's settled payment, if one exists
    pub fn settled_payment(&self, booking_id: Uuid) -> Option<Payment> {
        self.payments.succeeded_for_booking(&booking_id)
    }
}
