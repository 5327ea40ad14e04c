use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Storage-assigned batch identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct BatchId(pub i64);

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the batch is, for tax treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Cider,
    Perry,
    /// Apple juice fortified with apple brandy
    Pommeau,
    Brandy,
    Juice,
    Other,
}

impl ProductType {
    pub fn display(&self) -> &'static str {
        match self {
            ProductType::Cider => "cider",
            ProductType::Perry => "perry",
            ProductType::Pommeau => "pommeau",
            ProductType::Brandy => "brandy",
            ProductType::Juice => "juice",
            ProductType::Other => "other",
        }
    }

    /// Primary fruit the product is fermented from.
    pub fn fruit_source(&self) -> FruitSource {
        match self {
            ProductType::Cider | ProductType::Pommeau | ProductType::Brandy | ProductType::Juice => {
                FruitSource::Apple
            }
            ProductType::Perry => FruitSource::Pear,
            ProductType::Other => FruitSource::OtherFruit,
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Fruit the fermentable sugars came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FruitSource {
    Apple,
    Pear,
    OtherFruit,
}

/// A production batch as read from storage. Nullable fields stay nullable;
/// the validator reports on missing data instead of rejecting the row.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Batch {
    pub id: BatchId,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Declared starting volume. Meaningful for root batches only; a batch
    /// created by transfer starts from its inbound transfer volume.
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub initial_volume_liters: Option<Decimal>,
    #[schemars(with = "f64")]
    pub current_volume_liters: Decimal,
    #[serde(default)]
    pub parent_batch_id: Option<BatchId>,
    #[serde(default)]
    pub vessel_id: Option<i64>,
    /// Measured ABV, percent. Wins over the estimate when both are present.
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub actual_abv: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub estimated_abv: Option<Decimal>,
}

impl Batch {
    /// Best available ABV figure, if any was recorded.
    pub fn abv(&self) -> Option<Decimal> {
        self.actual_abv.or(self.estimated_abv)
    }

    /// A root batch was created from raw material rather than by transfer.
    pub fn is_root(&self) -> bool {
        self.parent_batch_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn batch() -> Batch {
        Batch {
            id: BatchId(1),
            product_type: Some(ProductType::Cider),
            start_date: NaiveDate::from_ymd_opt(2024, 10, 1),
            initial_volume_liters: Some(dec!(1000)),
            current_volume_liters: dec!(950),
            parent_batch_id: None,
            vessel_id: Some(3),
            actual_abv: None,
            estimated_abv: None,
        }
    }

    #[test]
    fn actual_abv_wins_over_estimate() {
        let mut b = batch();
        b.estimated_abv = Some(dec!(6.5));
        assert_eq!(b.abv(), Some(dec!(6.5)));
        b.actual_abv = Some(dec!(6.9));
        assert_eq!(b.abv(), Some(dec!(6.9)));
    }

    #[test]
    fn root_batch_has_no_parent() {
        let mut b = batch();
        assert!(b.is_root());
        b.parent_batch_id = Some(BatchId(7));
        assert!(!b.is_root());
    }

    #[test]
    fn fruit_sources() {
        assert_eq!(ProductType::Cider.fruit_source(), FruitSource::Apple);
        assert_eq!(ProductType::Perry.fruit_source(), FruitSource::Pear);
        assert_eq!(ProductType::Pommeau.fruit_source(), FruitSource::Apple);
        assert_eq!(ProductType::Other.fruit_source(), FruitSource::OtherFruit);
    }
}
