use chrono::{DateTime, NaiveDate, Utc};
use corvia_inventory::fares::PassengerType;
use corvia_inventory::flight::CabinClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Refunded)
    }

    /// Transition table. Every writer consults this before committing, so a
    /// racing event can lose cleanly instead of clobbering state.
    /// `Cancelled -> Refunded` is the one move out of a terminal state: a
    /// refund settling after the user already cancelled.
    pub fn can_transition(self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Refunded)
                | (Cancelled, Refunded)
        )
    }
}

/// Money-side view carried on the booking, distinct from the lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub passenger_type: PassengerType,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub document_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    /// Human-shareable reference, e.g. "CV4F9A2B"
    pub reference: String,
    pub user_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub passengers: Vec<Passenger>,
    pub contact: ContactInfo,
    /// Smallest currency unit, computed once at creation
    pub total_amount: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    /// Seats taken from the ledger at creation; released with exactly this count
    pub reserved_seats: u32,
    /// Set the moment a release is armed, so seats go back at most once
    pub seats_released: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn generate_reference() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("CV{}", hex[..6].to_uppercase())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// `Failed -> Succeeded` is allowed: with intent-style gateways a failed
    /// attempt can still settle when the cardholder retries on the same
    /// intent. Only `Refunded` admits no further transition.
    pub fn can_transition(self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Succeeded)
                | (Pending, Failed)
                | (Failed, Succeeded)
                | (Succeeded, Refunded)
        )
    }
}

/// One row per gateway intent attempt. A booking may accumulate failed
/// attempts but holds at most one succeeded payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    /// Gateway intent id, the idempotency key for all reconciliation
    pub intent_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    /// Accumulates across partial refunds
    pub refund_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_transition_table() {
        use BookingStatus::*;
        assert!(Pending.can_transition(Confirmed));
        assert!(Pending.can_transition(Cancelled));
        assert!(Confirmed.can_transition(Cancelled));
        assert!(Confirmed.can_transition(Refunded));
        assert!(Cancelled.can_transition(Refunded));

        assert!(!Pending.can_transition(Refunded));
        assert!(!Confirmed.can_transition(Pending));
        assert!(!Cancelled.can_transition(Confirmed));
        assert!(!Refunded.can_transition(Cancelled));
        assert!(!Refunded.can_transition(Confirmed));
    }

    #[test]
    fn test_payment_transition_table() {
        use PaymentStatus::*;
        assert!(Pending.can_transition(Succeeded));
        assert!(Pending.can_transition(Failed));
        assert!(Failed.can_transition(Succeeded));
        assert!(Succeeded.can_transition(Refunded));

        assert!(!Refunded.can_transition(Succeeded));
        assert!(!Failed.can_transition(Refunded));
        assert!(!Succeeded.can_transition(Failed));
    }

    #[test]
    fn test_reference_shape() {
        let reference = generate_reference();
        assert_eq!(reference.len(), 8);
        assert!(reference.starts_with("CV"));
        assert!(reference[2..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
