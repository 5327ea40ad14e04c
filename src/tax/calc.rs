//! Excise tax arithmetic for a classified volume.

use crate::error::{LedgerError, Result};
use crate::tax::classify::TaxClass;
use crate::tax::config::TaxConfig;
use rust_decimal::Decimal;
use serde::Serialize;

/// Tax owed on a taxable volume, with the small-producer credit applied.
/// Money is rounded to 2 decimals, rates to 4, volumes to 3.
#[derive(Debug, Clone, Serialize)]
pub struct TaxComputation {
    pub tax_class: TaxClass,
    pub taxable_gallons: Decimal,
    pub gross_tax: Decimal,
    pub credit_eligible_gallons: Decimal,
    pub credit: Decimal,
    pub net_tax: Decimal,
    pub effective_rate: Decimal,
}

impl TaxComputation {
    fn zero(tax_class: TaxClass) -> Self {
        TaxComputation {
            tax_class,
            taxable_gallons: Decimal::ZERO,
            gross_tax: Decimal::ZERO,
            credit_eligible_gallons: Decimal::ZERO,
            credit: Decimal::ZERO,
            net_tax: Decimal::ZERO,
            effective_rate: Decimal::ZERO,
        }
    }
}

/// Compute gross tax, small-producer credit, and net tax for a taxable
/// volume in wine gallons.
///
/// `prior_year_gallons_used` is how much of the annual credit cap earlier
/// removals in the same year already consumed. A missing rate-table entry is
/// a configuration bug and errors; zero volume short-circuits to an all-zero
/// result.
pub fn compute_tax(
    tax_class: TaxClass,
    taxable_gallons: Decimal,
    prior_year_gallons_used: Decimal,
    config: &TaxConfig,
) -> Result<TaxComputation> {
    let rate = config
        .rates
        .get(&tax_class)
        .copied()
        .ok_or(LedgerError::MissingRate(tax_class))?;

    if taxable_gallons.is_zero() {
        return Ok(TaxComputation::zero(tax_class));
    }

    let gross_tax = (taxable_gallons * rate).round_dp(2);

    let credit = &config.small_producer_credit;
    let headroom = (credit.annual_gallon_cap - prior_year_gallons_used).max(Decimal::ZERO);
    let credit_eligible_gallons = taxable_gallons.min(headroom).round_dp(3);
    let credit_amount = (credit_eligible_gallons * credit.rate_per_gallon).round_dp(2);

    let net_tax = (gross_tax - credit_amount).round_dp(2);
    let effective_rate = (net_tax / taxable_gallons).round_dp(4);

    Ok(TaxComputation {
        tax_class,
        taxable_gallons: taxable_gallons.round_dp(3),
        gross_tax,
        credit_eligible_gallons,
        credit: credit_amount,
        net_tax,
        effective_rate,
    })
}
