//! Period reconciliation: does what came in match what went out plus what
//! remains?

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Loose tolerance absorbing unit-conversion rounding across a period. Not a
/// data-quality signal.
pub const RECONCILIATION_TOLERANCE: Decimal = dec!(0.1);

/// One period's ledger figures, all in the same unit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationInput {
    #[schemars(with = "f64")]
    pub beginning: Decimal,
    #[schemars(with = "f64")]
    pub produced: Decimal,
    #[schemars(with = "f64")]
    pub received: Decimal,
    #[schemars(with = "f64")]
    pub tax_paid_removals: Decimal,
    #[schemars(with = "f64")]
    pub other_removals: Decimal,
    #[schemars(with = "f64")]
    pub ending: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationSummary {
    pub total_available: Decimal,
    pub total_accounted_for: Decimal,
    pub variance: Decimal,
    pub balanced: bool,
}

pub fn reconcile(input: &ReconciliationInput) -> ReconciliationSummary {
    let total_available = input.beginning + input.produced + input.received;
    let total_accounted_for = input.tax_paid_removals + input.other_removals + input.ending;
    let variance = total_available - total_accounted_for;
    ReconciliationSummary {
        total_available,
        total_accounted_for,
        variance,
        balanced: variance.abs() < RECONCILIATION_TOLERANCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ReconciliationInput {
        ReconciliationInput {
            beginning: dec!(100),
            produced: dec!(50),
            received: dec!(0),
            tax_paid_removals: dec!(140),
            other_removals: dec!(5),
            ending: dec!(5),
        }
    }

    #[test]
    fn balanced_period() {
        let summary = reconcile(&input());
        assert_eq!(summary.total_available, dec!(150));
        assert_eq!(summary.total_accounted_for, dec!(150));
        assert_eq!(summary.variance, dec!(0));
        assert!(summary.balanced);
    }

    #[test]
    fn variance_beyond_tolerance_unbalanced() {
        let mut i = input();
        i.ending += dec!(0.2);
        let summary = reconcile(&i);
        assert_eq!(summary.variance, dec!(-0.2));
        assert!(!summary.balanced);
    }

    #[test]
    fn variance_inside_tolerance_balanced() {
        let mut i = input();
        i.ending += dec!(0.05);
        assert!(reconcile(&i).balanced);
    }
}
