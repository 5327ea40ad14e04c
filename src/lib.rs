//! Production ledger and excise compliance engine for a cidery.
//!
//! Two pure cores over a batch and its bulk-loaded event history: the volume
//! balance validator (is the recorded volume consistent with everything that
//! happened to the batch?) and the tax classifier/calculator (which
//! regulatory class does it fall in, and what is owed?).

pub mod batch;
pub mod error;
pub mod events;
pub mod reconcile;
pub mod tax;
pub mod units;
pub mod validation;

pub use batch::{Batch, BatchId, ProductType};
pub use error::LedgerError;
pub use events::{EventStore, GroupedEvents, InMemorySnapshot, Snapshot};
pub use reconcile::{reconcile, ReconciliationInput, ReconciliationSummary};
pub use tax::{classify, compute_tax, BatchTaxData, TaxClass, TaxComputation, TaxConfig};
pub use validation::{validate_batches, validate_with_store, BatchValidation, CheckStatus};
