//! Volume-affecting events and the bulk loader contract.
//!
//! Events arrive from storage already grouped by batch id, one collection per
//! kind, so validating N batches costs one fan-out rather than N queries.

use crate::batch::BatchId;
use crate::units::LITERS_PER_WINE_GALLON;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Racking/filter rows whose notes carry this marker are backfilled history,
/// not operational losses, and stay out of the balance math.
pub const HISTORICAL_RECORD_MARKER: &str = "Historical Record";

/// Unit a blend inflow was measured in. Press runs are recorded in gallons,
/// purchased juice in liters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VolumeUnit {
    Liters,
    Gallons,
}

/// How a batch was carbonated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CarbonationMethod {
    None,
    /// Secondary fermentation in bottle or tank
    Natural,
    /// Forced CO2 injection
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DistillationStatus {
    Planned,
    Sent,
    Received,
    Cancelled,
}

impl DistillationStatus {
    /// Only liquid that actually left for (or came back from) the still is a
    /// permanent departure from the cellar.
    pub fn is_departure(&self) -> bool {
        matches!(self, DistillationStatus::Sent | DistillationStatus::Received)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PackagingForm {
    Bottled,
    Kegged,
}

/// Movement of volume between two batches.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transfer {
    pub source_batch_id: BatchId,
    pub dest_batch_id: BatchId,
    #[schemars(with = "f64")]
    pub volume_liters: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub loss_liters: Decimal,
    #[serde(default)]
    pub deleted: bool,
}

impl Transfer {
    /// Self-transfers are vessel moves, not volume changes.
    pub fn is_self_transfer(&self) -> bool {
        self.source_batch_id == self.dest_batch_id
    }
}

/// Post-creation inflow blended into an existing batch (press run, purchased
/// juice). Augments current volume but is not part of the declared initial.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BlendAddition {
    pub batch_id: BatchId,
    #[schemars(with = "f64")]
    pub volume: Decimal,
    pub unit: VolumeUnit,
}

impl BlendAddition {
    pub fn volume_liters(&self) -> Decimal {
        match self.unit {
            VolumeUnit::Liters => self.volume,
            VolumeUnit::Gallons => self.volume * LITERS_PER_WINE_GALLON,
        }
    }
}

/// Volume leaving the cellar as packaged product.
///
/// Bottling rows also record units produced and package size; operators
/// sometimes record `volume_taken_liters` inclusive of the loss and sometimes
/// not, so the balance math has to detect which convention a row used.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Packaging {
    pub batch_id: BatchId,
    pub form: PackagingForm,
    #[schemars(with = "f64")]
    pub volume_taken_liters: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub loss_liters: Decimal,
    /// Bottled runs only
    #[serde(default)]
    pub units_produced: Option<i64>,
    /// Bottled runs only, milliliters per unit
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub package_size_ml: Option<Decimal>,
}

impl Packaging {
    /// Finished-goods volume implied by the bottle count, when recorded.
    pub fn product_volume_liters(&self) -> Option<Decimal> {
        match (self.form, self.units_produced, self.package_size_ml) {
            (PackagingForm::Bottled, Some(units), Some(size_ml)) => {
                Some(Decimal::from(units) * size_ml / Decimal::from(1000))
            }
            _ => None,
        }
    }
}

/// Signed correction to recorded volume, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VolumeAdjustment {
    pub batch_id: BatchId,
    #[schemars(with = "f64")]
    pub adjustment_liters: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RackingLoss {
    pub batch_id: BatchId,
    #[schemars(with = "f64")]
    pub volume_liters: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RackingLoss {
    pub fn is_historical(&self) -> bool {
        notes_are_historical(&self.notes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FilterLoss {
    pub batch_id: BatchId,
    #[schemars(with = "f64")]
    pub volume_liters: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FilterLoss {
    pub fn is_historical(&self) -> bool {
        notes_are_historical(&self.notes)
    }
}

fn notes_are_historical(notes: &Option<String>) -> bool {
    notes
        .as_deref()
        .is_some_and(|n| n.contains(HISTORICAL_RECORD_MARKER))
}

/// Carbonation measurement for a batch. CO2 stays null until measured.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CarbonationRecord {
    pub batch_id: BatchId,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub final_co2_volumes: Option<Decimal>,
    pub method: CarbonationMethod,
}

/// Volume sent off to the still.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Distillation {
    pub source_batch_id: BatchId,
    #[schemars(with = "f64")]
    pub volume_liters: Decimal,
    pub status: DistillationStatus,
}

/// Every event collection for a set of batches, pre-grouped by batch id.
///
/// Transfers are indexed under both their source and destination so that
/// per-batch, per-direction filtering stays an in-memory lookup.
#[derive(Debug, Clone, Default)]
pub struct GroupedEvents {
    transfers_out: BTreeMap<BatchId, Vec<Transfer>>,
    transfers_in: BTreeMap<BatchId, Vec<Transfer>>,
    blends: BTreeMap<BatchId, Vec<BlendAddition>>,
    packagings: BTreeMap<BatchId, Vec<Packaging>>,
    adjustments: BTreeMap<BatchId, Vec<VolumeAdjustment>>,
    racking_losses: BTreeMap<BatchId, Vec<RackingLoss>>,
    filter_losses: BTreeMap<BatchId, Vec<FilterLoss>>,
    carbonations: BTreeMap<BatchId, Vec<CarbonationRecord>>,
    distillations: BTreeMap<BatchId, Vec<Distillation>>,
}

fn slice_for<T>(map: &BTreeMap<BatchId, Vec<T>>, id: BatchId) -> &[T] {
    map.get(&id).map(Vec::as_slice).unwrap_or(&[])
}

impl GroupedEvents {
    pub fn push_transfer(&mut self, transfer: Transfer) {
        self.transfers_in
            .entry(transfer.dest_batch_id)
            .or_default()
            .push(transfer.clone());
        self.transfers_out
            .entry(transfer.source_batch_id)
            .or_default()
            .push(transfer);
    }

    pub fn push_blend(&mut self, blend: BlendAddition) {
        self.blends.entry(blend.batch_id).or_default().push(blend);
    }

    pub fn push_packaging(&mut self, packaging: Packaging) {
        self.packagings
            .entry(packaging.batch_id)
            .or_default()
            .push(packaging);
    }

    pub fn push_adjustment(&mut self, adjustment: VolumeAdjustment) {
        self.adjustments
            .entry(adjustment.batch_id)
            .or_default()
            .push(adjustment);
    }

    pub fn push_racking_loss(&mut self, loss: RackingLoss) {
        self.racking_losses
            .entry(loss.batch_id)
            .or_default()
            .push(loss);
    }

    pub fn push_filter_loss(&mut self, loss: FilterLoss) {
        self.filter_losses
            .entry(loss.batch_id)
            .or_default()
            .push(loss);
    }

    pub fn push_carbonation(&mut self, record: CarbonationRecord) {
        self.carbonations
            .entry(record.batch_id)
            .or_default()
            .push(record);
    }

    pub fn push_distillation(&mut self, distillation: Distillation) {
        self.distillations
            .entry(distillation.source_batch_id)
            .or_default()
            .push(distillation);
    }

    /// Transfers whose destination is `id`.
    pub fn transfers_in(&self, id: BatchId) -> &[Transfer] {
        slice_for(&self.transfers_in, id)
    }

    /// Transfers whose source is `id`.
    pub fn transfers_out(&self, id: BatchId) -> &[Transfer] {
        slice_for(&self.transfers_out, id)
    }

    pub fn blends(&self, id: BatchId) -> &[BlendAddition] {
        slice_for(&self.blends, id)
    }

    pub fn packagings(&self, id: BatchId) -> &[Packaging] {
        slice_for(&self.packagings, id)
    }

    pub fn adjustments(&self, id: BatchId) -> &[VolumeAdjustment] {
        slice_for(&self.adjustments, id)
    }

    pub fn racking_losses(&self, id: BatchId) -> &[RackingLoss] {
        slice_for(&self.racking_losses, id)
    }

    pub fn filter_losses(&self, id: BatchId) -> &[FilterLoss] {
        slice_for(&self.filter_losses, id)
    }

    pub fn carbonations(&self, id: BatchId) -> &[CarbonationRecord] {
        slice_for(&self.carbonations, id)
    }

    pub fn distillations(&self, id: BatchId) -> &[Distillation] {
        slice_for(&self.distillations, id)
    }
}

/// Bulk event loader contract implemented by the storage layer.
///
/// One call covers an entire batch set. An empty id list must return empty
/// collections without touching storage, so the validator composes safely in
/// a loop. Soft-deleted rows must never be returned. Implementations are
/// expected to issue their per-kind reads concurrently; any timeout belongs
/// on this call, not inside the validator.
pub trait EventStore: Send + Sync {
    fn load(&self, batch_ids: &[BatchId]) -> anyhow::Result<GroupedEvents>;
}

/// Full input snapshot: batches plus a flat list per event kind. This is the
/// JSON format the CLI reads and the in-memory stand-in for storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    #[serde(default)]
    pub reference_year: Option<i32>,
    pub batches: Vec<crate::batch::Batch>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    #[serde(default)]
    pub blend_additions: Vec<BlendAddition>,
    #[serde(default)]
    pub packagings: Vec<Packaging>,
    #[serde(default)]
    pub adjustments: Vec<VolumeAdjustment>,
    #[serde(default)]
    pub racking_losses: Vec<RackingLoss>,
    #[serde(default)]
    pub filter_losses: Vec<FilterLoss>,
    #[serde(default)]
    pub carbonations: Vec<CarbonationRecord>,
    #[serde(default)]
    pub distillations: Vec<Distillation>,
}

/// In-memory `EventStore` over a snapshot.
pub struct InMemorySnapshot {
    snapshot: Snapshot,
}

impl InMemorySnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        InMemorySnapshot { snapshot }
    }
}

impl EventStore for InMemorySnapshot {
    fn load(&self, batch_ids: &[BatchId]) -> anyhow::Result<GroupedEvents> {
        let mut grouped = GroupedEvents::default();
        if batch_ids.is_empty() {
            return Ok(grouped);
        }
        let wanted: BTreeSet<BatchId> = batch_ids.iter().copied().collect();

        for transfer in &self.snapshot.transfers {
            if transfer.deleted {
                continue;
            }
            if wanted.contains(&transfer.source_batch_id)
                || wanted.contains(&transfer.dest_batch_id)
            {
                grouped.push_transfer(transfer.clone());
            }
        }
        for blend in &self.snapshot.blend_additions {
            if wanted.contains(&blend.batch_id) {
                grouped.push_blend(blend.clone());
            }
        }
        for packaging in &self.snapshot.packagings {
            if wanted.contains(&packaging.batch_id) {
                grouped.push_packaging(packaging.clone());
            }
        }
        for adjustment in &self.snapshot.adjustments {
            if wanted.contains(&adjustment.batch_id) {
                grouped.push_adjustment(adjustment.clone());
            }
        }
        for loss in &self.snapshot.racking_losses {
            if wanted.contains(&loss.batch_id) {
                grouped.push_racking_loss(loss.clone());
            }
        }
        for loss in &self.snapshot.filter_losses {
            if wanted.contains(&loss.batch_id) {
                grouped.push_filter_loss(loss.clone());
            }
        }
        for record in &self.snapshot.carbonations {
            if wanted.contains(&record.batch_id) {
                grouped.push_carbonation(record.clone());
            }
        }
        for distillation in &self.snapshot.distillations {
            if wanted.contains(&distillation.source_batch_id) {
                grouped.push_distillation(distillation.clone());
            }
        }
        log::debug!("loaded events for {} batch(es)", batch_ids.len());
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transfer(source: i64, dest: i64, volume: Decimal) -> Transfer {
        Transfer {
            source_batch_id: BatchId(source),
            dest_batch_id: BatchId(dest),
            volume_liters: volume,
            loss_liters: dec!(0),
            deleted: false,
        }
    }

    #[test]
    fn transfers_indexed_both_ways() {
        let mut grouped = GroupedEvents::default();
        grouped.push_transfer(transfer(1, 2, dec!(100)));

        assert_eq!(grouped.transfers_out(BatchId(1)).len(), 1);
        assert_eq!(grouped.transfers_in(BatchId(2)).len(), 1);
        assert!(grouped.transfers_in(BatchId(1)).is_empty());
        assert!(grouped.transfers_out(BatchId(2)).is_empty());
    }

    #[test]
    fn unknown_batch_yields_empty_slices() {
        let grouped = GroupedEvents::default();
        assert!(grouped.blends(BatchId(99)).is_empty());
        assert!(grouped.packagings(BatchId(99)).is_empty());
        assert!(grouped.distillations(BatchId(99)).is_empty());
    }

    #[test]
    fn empty_id_list_loads_nothing() {
        let mut snapshot = Snapshot::default();
        snapshot.transfers.push(transfer(1, 2, dec!(100)));
        let store = InMemorySnapshot::new(snapshot);

        let grouped = store.load(&[]).unwrap();
        assert!(grouped.transfers_out(BatchId(1)).is_empty());
    }

    #[test]
    fn soft_deleted_transfers_excluded() {
        let mut snapshot = Snapshot::default();
        let mut dead = transfer(1, 2, dec!(100));
        dead.deleted = true;
        snapshot.transfers.push(dead);
        snapshot.transfers.push(transfer(1, 3, dec!(50)));
        let store = InMemorySnapshot::new(snapshot);

        let grouped = store.load(&[BatchId(1)]).unwrap();
        assert_eq!(grouped.transfers_out(BatchId(1)).len(), 1);
        assert_eq!(
            grouped.transfers_out(BatchId(1))[0].dest_batch_id,
            BatchId(3)
        );
    }

    #[test]
    fn blend_volume_converts_gallons() {
        let blend = BlendAddition {
            batch_id: BatchId(1),
            volume: dec!(100),
            unit: VolumeUnit::Gallons,
        };
        assert_eq!(blend.volume_liters(), dec!(378.541));

        let blend = BlendAddition {
            batch_id: BatchId(1),
            volume: dec!(100),
            unit: VolumeUnit::Liters,
        };
        assert_eq!(blend.volume_liters(), dec!(100));
    }

    #[test]
    fn bottled_product_volume_from_units() {
        let packaging = Packaging {
            batch_id: BatchId(1),
            form: PackagingForm::Bottled,
            volume_taken_liters: dec!(100),
            loss_liters: dec!(2),
            units_produced: Some(130),
            package_size_ml: Some(dec!(750)),
        };
        assert_eq!(packaging.product_volume_liters(), Some(dec!(97.5)));

        let kegged = Packaging {
            batch_id: BatchId(1),
            form: PackagingForm::Kegged,
            volume_taken_liters: dec!(100),
            loss_liters: dec!(1),
            units_produced: None,
            package_size_ml: None,
        };
        assert_eq!(kegged.product_volume_liters(), None);
    }

    #[test]
    fn historical_marker_detected() {
        let loss = RackingLoss {
            batch_id: BatchId(1),
            volume_liters: dec!(10),
            notes: Some("Historical Record - migrated from spreadsheet".to_string()),
        };
        assert!(loss.is_historical());

        let loss = RackingLoss {
            batch_id: BatchId(1),
            volume_liters: dec!(10),
            notes: Some("routine racking".to_string()),
        };
        assert!(!loss.is_historical());
    }
}
