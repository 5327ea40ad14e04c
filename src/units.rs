//! Unit conversions shared by the ledger and the excise calculations.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Liters per US wine gallon. Part of the reporting contract.
pub const LITERS_PER_WINE_GALLON: Decimal = dec!(3.78541);

/// Converts dissolved CO2 measured in volumes to grams per 100 mL.
/// Physical constant, deliberately not configurable.
pub const CO2_VOLUMES_TO_GRAMS_PER_100ML: Decimal = dec!(0.1977);

pub fn liters_to_wine_gallons(liters: Decimal) -> Decimal {
    liters / LITERS_PER_WINE_GALLON
}

pub fn wine_gallons_to_liters(gallons: Decimal) -> Decimal {
    gallons * LITERS_PER_WINE_GALLON
}

pub fn co2_volumes_to_g_per_100ml(volumes: Decimal) -> Decimal {
    volumes * CO2_VOLUMES_TO_GRAMS_PER_100ML
}
