pub mod fares;
pub mod flight;
pub mod ledger;

pub use fares::{calculate_fare, FareError, PassengerType};
pub use flight::{CabinClass, Flight, FlightDirectory};
pub use ledger::{InventoryError, SeatCounter, SeatLedger};
