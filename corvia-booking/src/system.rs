use corvia_core::notify::Notifier;
use corvia_core::payment::PaymentGateway;
use corvia_inventory::flight::FlightDirectory;
use corvia_inventory::ledger::SeatLedger;
use std::sync::Arc;

use crate::manager::BookingManager;
use crate::payments::PaymentManager;
use crate::reconcile::ReconciliationProcessor;
use crate::settings::BusinessRules;
use crate::store::{BookingStore, PaymentStore};

/// Wires the booking core together around one gateway and one notifier.
/// The HTTP layer holds one of these and hands out the component handles.
pub struct BookingSystem {
    pub flights: Arc<FlightDirectory>,
    pub ledger: Arc<SeatLedger>,
    pub bookings: Arc<BookingStore>,
    pub payments: Arc<PaymentStore>,
    pub reconciler: Arc<ReconciliationProcessor>,
    pub payment_manager: Arc<PaymentManager>,
    pub booking_manager: Arc<BookingManager>,
}

impl BookingSystem {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        rules: BusinessRules,
    ) -> Self {
        let flights = Arc::new(FlightDirectory::new());
        let ledger = Arc::new(SeatLedger::new());
        let bookings = Arc::new(BookingStore::new());
        let payments = Arc::new(PaymentStore::new());

        let reconciler = Arc::new(ReconciliationProcessor::new(
            Arc::clone(&bookings),
            Arc::clone(&payments),
            Arc::clone(&ledger),
            Arc::clone(&notifier),
            rules.payment_retry_window_minutes,
        ));

        let payment_manager = Arc::new(PaymentManager::new(
            gateway,
            Arc::clone(&payments),
            Arc::clone(&bookings),
            Arc::clone(&reconciler),
            rules.gateway_timeout_seconds,
        ));

        let booking_manager = Arc::new(BookingManager::new(
            Arc::clone(&flights),
            Arc::clone(&ledger),
            Arc::clone(&bookings),
            Arc::clone(&payment_manager),
            notifier,
            rules,
        ));

        Self {
            flights,
            ledger,
            bookings,
            payments,
            reconciler,
            payment_manager,
            booking_manager,
        }
    }
}
