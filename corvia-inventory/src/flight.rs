use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::ledger::SeatLedger;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn fare_multiplier(&self) -> f64 {
        match self {
            CabinClass::Economy => 1.0,
            CabinClass::PremiumEconomy => 1.5,
            CabinClass::Business => 2.5,
            CabinClass::First => 4.0,
        }
    }
}

/// Scheduled flight with its per-cabin seat allotments. Seat counters are
/// owned by the `SeatLedger`; this record only carries the configured totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub airline: String,       // IATA carrier code, e.g. "BA"
    pub flight_number: String, // e.g. "BA117"
    pub origin: String,        // IATA airport code
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    /// Adult economy fare in the currency's smallest unit, before multipliers
    pub base_fare: f64,
    /// Cabin class -> total seats on this aircraft
    pub cabins: HashMap<CabinClass, u32>,
}

/// Read model over scheduled flights. Flight management tooling creates the
/// records; the booking core only reads them.
pub struct FlightDirectory {
    flights: RwLock<HashMap<Uuid, Flight>>,
}

impl FlightDirectory {
    pub fn new() -> Self {
        Self {
            flights: RwLock::new(HashMap::new()),
        }
    }

    /// Register a flight and seed its seat pools in the ledger
    pub fn register(&self, flight: Flight, ledger: &SeatLedger) {
        for (&cabin, &total) in &flight.cabins {
            ledger.open(flight.id, cabin, total);
        }
        self.flights
            .write()
            .expect("flight directory lock")
            .insert(flight.id, flight);
    }

    pub fn get(&self, id: &Uuid) -> Option<Flight> {
        self.flights
            .read()
            .expect("flight directory lock")
            .get(id)
            .cloned()
    }
}

impl Default for FlightDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_flight() -> Flight {
        let departure = Utc::now() + Duration::days(7);
        Flight {
            id: Uuid::new_v4(),
            airline: "CV".to_string(),
            flight_number: "CV204".to_string(),
            origin: "LHR".to_string(),
            destination: "JFK".to_string(),
            departure_at: departure,
            arrival_at: departure + Duration::hours(8),
            base_fare: 100.0,
            cabins: HashMap::from([(CabinClass::Economy, 150), (CabinClass::Business, 12)]),
        }
    }

    #[test]
    fn test_register_seeds_ledger() {
        let directory = FlightDirectory::new();
        let ledger = SeatLedger::new();
        let flight = sample_flight();
        let flight_id = flight.id;

        directory.register(flight, &ledger);

        assert!(directory.get(&flight_id).is_some());
        assert_eq!(ledger.availability(flight_id, CabinClass::Economy), Some(150));
        assert_eq!(ledger.availability(flight_id, CabinClass::Business), Some(12));
        assert_eq!(ledger.availability(flight_id, CabinClass::First), None);
    }
}
