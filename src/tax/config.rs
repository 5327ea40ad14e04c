//! Tax classification ruleset, supplied per organization.
//!
//! Always passed explicitly into classification and calculation calls so two
//! jurisdictions can be evaluated side by side in one process. `Default`
//! carries the standard federal values and is substituted transparently when
//! an organization has no override.

use crate::batch::FruitSource;
use crate::tax::classify::TaxClass;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Window a product must sit in to qualify for the low-tax hard cider class.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HardCiderWindow {
    /// Minimum ABV, percent
    #[schemars(with = "f64")]
    pub abv_min: Decimal,
    /// Maximum ABV, percent
    #[schemars(with = "f64")]
    pub abv_max: Decimal,
    /// Dissolved CO2 ceiling, grams per 100 mL
    #[schemars(with = "f64")]
    pub co2_ceiling_g_per_100ml: Decimal,
    /// Fruit sources eligible for the class
    pub eligible_fruit: Vec<FruitSource>,
}

impl HardCiderWindow {
    pub fn fruit_eligible(&self, fruit: FruitSource) -> bool {
        self.eligible_fruit.contains(&fruit)
    }
}

/// Annual small-producer credit: a per-gallon reduction up to a gallon cap.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SmallProducerCredit {
    #[schemars(with = "f64")]
    pub rate_per_gallon: Decimal,
    #[schemars(with = "f64")]
    pub annual_gallon_cap: Decimal,
}

/// ABV bracket ceilings for still wine-like product, percent.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StillAbvBrackets {
    #[schemars(with = "f64")]
    pub low_max: Decimal,
    #[schemars(with = "f64")]
    pub medium_max: Decimal,
    #[schemars(with = "f64")]
    pub high_max: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaxConfig {
    pub hard_cider: HardCiderWindow,
    /// CO2 above this is effervescent product, grams per 100 mL
    #[schemars(with = "f64")]
    pub still_co2_ceiling_g_per_100ml: Decimal,
    pub still_abv_brackets: StillAbvBrackets,
    /// Per-gallon rate by tax class
    #[schemars(with = "BTreeMap<TaxClass, f64>")]
    pub rates: BTreeMap<TaxClass, Decimal>,
    pub small_producer_credit: SmallProducerCredit,
}

impl Default for TaxConfig {
    fn default() -> Self {
        let rates = BTreeMap::from([
            (TaxClass::HardCider, dec!(0.226)),
            (TaxClass::StillWineLow, dec!(1.07)),
            (TaxClass::StillWineMedium, dec!(1.57)),
            (TaxClass::StillWineHigh, dec!(3.15)),
            (TaxClass::SparklingWine, dec!(3.40)),
            (TaxClass::CarbonatedWine, dec!(3.30)),
            (TaxClass::Spirits, dec!(13.50)),
            (TaxClass::SpecialtyWine, dec!(3.15)),
        ]);
        TaxConfig {
            hard_cider: HardCiderWindow {
                abv_min: dec!(0.5),
                abv_max: dec!(8.5),
                co2_ceiling_g_per_100ml: dec!(0.64),
                eligible_fruit: vec![FruitSource::Apple, FruitSource::Pear],
            },
            still_co2_ceiling_g_per_100ml: dec!(0.392),
            still_abv_brackets: StillAbvBrackets {
                low_max: dec!(16),
                medium_max: dec!(21),
                high_max: dec!(24),
            },
            rates,
            small_producer_credit: SmallProducerCredit {
                rate_per_gallon: dec!(0.056),
                annual_gallon_cap: dec!(30000),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_rate_for_every_class() {
        let config = TaxConfig::default();
        for class in TaxClass::ALL {
            assert!(config.rates.contains_key(&class), "missing rate: {class}");
        }
    }

    #[test]
    fn default_eligibility() {
        let config = TaxConfig::default();
        assert!(config.hard_cider.fruit_eligible(FruitSource::Apple));
        assert!(config.hard_cider.fruit_eligible(FruitSource::Pear));
        assert!(!config.hard_cider.fruit_eligible(FruitSource::OtherFruit));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = TaxConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: TaxConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rates.len(), 8);
        assert_eq!(
            back.small_producer_credit.annual_gallon_cap,
            dec!(30000)
        );
    }
}
