//! Tax classification: a priority-ordered rule chain.
//!
//! The ordering is regulatory, not incidental. Each rule is a named entry in
//! [`RULE_CHAIN`] and the first match wins, so the precedence is visible and
//! each rule is testable on its own.

use crate::batch::{Batch, FruitSource, ProductType};
use crate::events::{CarbonationMethod, GroupedEvents};
use crate::tax::config::TaxConfig;
use crate::units::co2_volumes_to_g_per_100ml;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Regulatory tax class. Closed set; juice classifies to `None` instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaxClass {
    /// Low-tax fermented apple/pear product
    HardCider,
    /// Still wine-like, ABV at or under the low bracket ceiling
    StillWineLow,
    /// Still wine-like, ABV in the middle bracket
    StillWineMedium,
    /// Still wine-like, ABV in the top bracket
    StillWineHigh,
    /// Effervescent by natural secondary fermentation
    SparklingWine,
    /// Effervescent by forced carbonation
    CarbonatedWine,
    Spirits,
    /// Wine-like product outside the named categories
    SpecialtyWine,
}

impl TaxClass {
    pub const ALL: [TaxClass; 8] = [
        TaxClass::HardCider,
        TaxClass::StillWineLow,
        TaxClass::StillWineMedium,
        TaxClass::StillWineHigh,
        TaxClass::SparklingWine,
        TaxClass::CarbonatedWine,
        TaxClass::Spirits,
        TaxClass::SpecialtyWine,
    ];

    pub fn display(&self) -> &'static str {
        match self {
            TaxClass::HardCider => "hard cider",
            TaxClass::StillWineLow => "still wine <=16%",
            TaxClass::StillWineMedium => "still wine 16-21%",
            TaxClass::StillWineHigh => "still wine 21-24%",
            TaxClass::SparklingWine => "sparkling wine",
            TaxClass::CarbonatedWine => "carbonated wine",
            TaxClass::Spirits => "spirits",
            TaxClass::SpecialtyWine => "specialty wine",
        }
    }
}

impl std::fmt::Display for TaxClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Everything classification needs about one batch.
#[derive(Debug, Clone)]
pub struct BatchTaxData {
    pub product_type: ProductType,
    /// Percent; `None` means unmeasured, never zero
    pub abv: Option<Decimal>,
    /// Dissolved CO2 in volumes; `None` means unmeasured
    pub co2_volumes: Option<Decimal>,
    pub carbonation_method: CarbonationMethod,
    pub fruit_source: FruitSource,
}

impl BatchTaxData {
    /// Pull classification inputs out of a batch and its carbonation history.
    /// Returns `None` when the batch has no product type to classify under.
    pub fn from_batch(batch: &Batch, events: &GroupedEvents) -> Option<Self> {
        let product_type = batch.product_type?;
        // the last measured reading supersedes earlier ones
        let measured = events
            .carbonations(batch.id)
            .iter()
            .filter(|c| c.final_co2_volumes.is_some())
            .next_back();
        let method = measured
            .or_else(|| events.carbonations(batch.id).last())
            .map(|c| c.method)
            .unwrap_or(CarbonationMethod::None);
        Some(BatchTaxData {
            product_type,
            abv: batch.abv(),
            co2_volumes: measured.and_then(|c| c.final_co2_volumes),
            carbonation_method: method,
            fruit_source: product_type.fruit_source(),
        })
    }

    /// Measured CO2 as grams per 100 mL; unmeasured reads as still.
    fn co2_g_per_100ml(&self) -> Decimal {
        self.co2_volumes
            .map(co2_volumes_to_g_per_100ml)
            .unwrap_or(Decimal::ZERO)
    }
}

/// What one rule decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    NoMatch,
    /// Terminal: the product owes no excise tax
    NonTaxable,
    Classified(TaxClass),
}

pub struct ClassificationRule {
    pub name: &'static str,
    pub apply: fn(&BatchTaxData, &TaxConfig) -> RuleOutcome,
}

/// The rule chain, highest priority first. The final rule is total.
pub const RULE_CHAIN: &[ClassificationRule] = &[
    ClassificationRule {
        name: "brandy-is-spirits",
        apply: brandy_is_spirits,
    },
    ClassificationRule {
        name: "juice-is-non-taxable",
        apply: juice_is_non_taxable,
    },
    ClassificationRule {
        name: "unmeasured-pommeau",
        apply: unmeasured_pommeau,
    },
    ClassificationRule {
        name: "unmeasured-hard-cider",
        apply: unmeasured_hard_cider,
    },
    ClassificationRule {
        name: "hard-cider-window",
        apply: hard_cider_window,
    },
    ClassificationRule {
        name: "effervescent",
        apply: effervescent,
    },
    ClassificationRule {
        name: "still-abv-brackets",
        apply: still_abv_brackets,
    },
    ClassificationRule {
        name: "product-type-fallback",
        apply: product_type_fallback,
    },
];

/// Classify a batch under the supplied ruleset. Every product terminates in a
/// class except juice, which is non-taxable.
pub fn classify(data: &BatchTaxData, config: &TaxConfig) -> Option<TaxClass> {
    for rule in RULE_CHAIN {
        match (rule.apply)(data, config) {
            RuleOutcome::NoMatch => continue,
            RuleOutcome::NonTaxable => {
                log::debug!("{} -> non-taxable via {}", data.product_type, rule.name);
                return None;
            }
            RuleOutcome::Classified(class) => {
                log::debug!("{} -> {} via {}", data.product_type, class, rule.name);
                return Some(class);
            }
        }
    }
    unreachable!("classification rule chain ends in a total fallback")
}

fn brandy_is_spirits(data: &BatchTaxData, _config: &TaxConfig) -> RuleOutcome {
    if data.product_type == ProductType::Brandy {
        RuleOutcome::Classified(TaxClass::Spirits)
    } else {
        RuleOutcome::NoMatch
    }
}

fn juice_is_non_taxable(data: &BatchTaxData, _config: &TaxConfig) -> RuleOutcome {
    if data.product_type == ProductType::Juice {
        RuleOutcome::NonTaxable
    } else {
        RuleOutcome::NoMatch
    }
}

/// Fortified product sits in the middle still bracket by definition, even
/// before its ABV is measured.
fn unmeasured_pommeau(data: &BatchTaxData, _config: &TaxConfig) -> RuleOutcome {
    if data.abv.is_none() && data.product_type == ProductType::Pommeau {
        RuleOutcome::Classified(TaxClass::StillWineMedium)
    } else {
        RuleOutcome::NoMatch
    }
}

/// An unmeasured ABV is not zero. Eligible fruit at cellar carbonation is
/// still presumed hard cider.
fn unmeasured_hard_cider(data: &BatchTaxData, config: &TaxConfig) -> RuleOutcome {
    if data.abv.is_none()
        && config.hard_cider.fruit_eligible(data.fruit_source)
        && data.co2_g_per_100ml() <= config.hard_cider.co2_ceiling_g_per_100ml
    {
        RuleOutcome::Classified(TaxClass::HardCider)
    } else {
        RuleOutcome::NoMatch
    }
}

fn hard_cider_window(data: &BatchTaxData, config: &TaxConfig) -> RuleOutcome {
    let abv = data.abv.unwrap_or(Decimal::ZERO);
    if config.hard_cider.fruit_eligible(data.fruit_source)
        && abv >= config.hard_cider.abv_min
        && abv <= config.hard_cider.abv_max
        && data.co2_g_per_100ml() <= config.hard_cider.co2_ceiling_g_per_100ml
    {
        RuleOutcome::Classified(TaxClass::HardCider)
    } else {
        RuleOutcome::NoMatch
    }
}

fn effervescent(data: &BatchTaxData, config: &TaxConfig) -> RuleOutcome {
    if data.co2_g_per_100ml() <= config.still_co2_ceiling_g_per_100ml {
        return RuleOutcome::NoMatch;
    }
    match data.carbonation_method {
        CarbonationMethod::Natural => RuleOutcome::Classified(TaxClass::SparklingWine),
        CarbonationMethod::Forced | CarbonationMethod::None => {
            RuleOutcome::Classified(TaxClass::CarbonatedWine)
        }
    }
}

fn still_abv_brackets(data: &BatchTaxData, config: &TaxConfig) -> RuleOutcome {
    let abv = data.abv.unwrap_or(Decimal::ZERO);
    let brackets = &config.still_abv_brackets;
    if abv <= brackets.low_max {
        RuleOutcome::Classified(TaxClass::StillWineLow)
    } else if abv <= brackets.medium_max {
        RuleOutcome::Classified(TaxClass::StillWineMedium)
    } else if abv <= brackets.high_max {
        RuleOutcome::Classified(TaxClass::StillWineHigh)
    } else {
        RuleOutcome::NoMatch
    }
}

/// Total fallback for anything the earlier rules passed over (ABV above the
/// top bracket, unexpected combinations).
fn product_type_fallback(data: &BatchTaxData, _config: &TaxConfig) -> RuleOutcome {
    match data.product_type {
        ProductType::Cider | ProductType::Perry => RuleOutcome::Classified(TaxClass::HardCider),
        ProductType::Pommeau => RuleOutcome::Classified(TaxClass::StillWineMedium),
        ProductType::Brandy => RuleOutcome::Classified(TaxClass::Spirits),
        ProductType::Juice => RuleOutcome::NonTaxable,
        ProductType::Other => RuleOutcome::Classified(TaxClass::SpecialtyWine),
    }
}
