use crate::batch::BatchId;
use crate::tax::TaxClass;
use rust_decimal::Decimal;
use thiserror::Error;

/// Contract violations. Data-quality problems never surface here; the
/// validator degrades those to warnings with a message.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An event carried a negative quantity where only non-negative volumes
    /// are meaningful. The storage boundary is supposed to reject these rows.
    #[error("negative volume {volume} in {kind} event for batch {batch}")]
    NegativeVolume {
        batch: BatchId,
        kind: &'static str,
        volume: Decimal,
    },

    /// The supplied rate table has no entry for a tax class.
    #[error("no tax rate configured for class {0}")]
    MissingRate(TaxClass),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
