pub mod manager;
pub mod models;
pub mod payments;
pub mod reconcile;
pub mod settings;
pub mod store;
pub mod system;

pub use manager::{BookingError, BookingManager, CreateBookingRequest};
pub use payments::{IntentHandle, PaymentError, PaymentManager};
pub use reconcile::{Outcome, ReconcileError, ReconciliationProcessor};
pub use system::BookingSystem;
