use serde::{Deserialize, Serialize};

use crate::flight::CabinClass;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassengerType {
    Adult,
    Child,
    Infant,
}

impl PassengerType {
    pub fn fare_multiplier(&self) -> f64 {
        match self {
            PassengerType::Adult => 1.0,
            PassengerType::Child => 0.5,
            PassengerType::Infant => 0.1,
        }
    }
}

/// Fixed tax and fee load applied to every itinerary
const TAX_LOAD: f64 = 1.15;

/// Total price for a party on one flight, in the currency's smallest unit.
///
/// `sum(base_fare * type_multiplier) * cabin_multiplier * TAX_LOAD`, rounded
/// half-up exactly once on the final amount, never per passenger. Pure: no
/// state, no side effects.
pub fn calculate_fare(
    base_fare: f64,
    cabin: CabinClass,
    passengers: &[PassengerType],
) -> Result<i64, FareError> {
    if base_fare <= 0.0 {
        return Err(FareError::NonPositiveBaseFare(base_fare));
    }
    if passengers.is_empty() {
        return Err(FareError::NoPassengers);
    }

    let party_total: f64 = passengers
        .iter()
        .map(|p| base_fare * p.fare_multiplier())
        .sum();
    let total = party_total * cabin.fare_multiplier() * TAX_LOAD;

    // Half-up on the final amount only
    Ok((total + 0.5).floor() as i64)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FareError {
    #[error("Base fare must be positive, got {0}")]
    NonPositiveBaseFare(f64),

    #[error("Passenger list is empty")]
    NoPassengers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use PassengerType::*;

    #[test]
    fn test_business_adult_child() {
        // (100 + 50) * 2.5 * 1.15 = 431.25 -> 431
        let total = calculate_fare(100.0, CabinClass::Business, &[Adult, Child]).unwrap();
        assert_eq!(total, 431);
    }

    #[test]
    fn test_single_adult_economy() {
        // 100 * 1.0 * 1.15 = 115
        let total = calculate_fare(100.0, CabinClass::Economy, &[Adult]).unwrap();
        assert_eq!(total, 115);
    }

    #[test]
    fn test_infant_discount() {
        // (200 + 20) * 1.5 * 1.15 = 379.5 -> rounds half-up to 380
        let total =
            calculate_fare(200.0, CabinClass::PremiumEconomy, &[Adult, Infant]).unwrap();
        assert_eq!(total, 380);
    }

    #[test]
    fn test_first_family() {
        // (300 + 300 + 150) * 4 * 1.15 = 3450
        let total = calculate_fare(300.0, CabinClass::First, &[Adult, Adult, Child]).unwrap();
        assert_eq!(total, 3450);
    }

    #[test]
    fn test_rejects_non_positive_base() {
        assert_eq!(
            calculate_fare(0.0, CabinClass::Economy, &[Adult]),
            Err(FareError::NonPositiveBaseFare(0.0))
        );
        assert!(calculate_fare(-10.0, CabinClass::Economy, &[Adult]).is_err());
    }

    #[test]
    fn test_rejects_empty_party() {
        assert_eq!(
            calculate_fare(100.0, CabinClass::Economy, &[]),
            Err(FareError::NoPassengers)
        );
    }
}
