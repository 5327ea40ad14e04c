//! End-to-end flow: snapshot -> bulk load -> validate -> classify -> tax.

use cellarman::events::{
    CarbonationMethod, CarbonationRecord, EventStore, Packaging, PackagingForm, RackingLoss,
    Transfer,
};
use cellarman::tax::{classify, compute_tax, BatchTaxData, TaxClass, TaxConfig};
use cellarman::units::liters_to_wine_gallons;
use cellarman::validation::{compute_balance, validate_with_store};
use cellarman::{Batch, BatchId, CheckStatus, InMemorySnapshot, ProductType, Snapshot};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn cellar_snapshot() -> Snapshot {
    let mut snapshot = Snapshot {
        reference_year: Some(2024),
        ..Default::default()
    };

    // Root cider batch: bottled, racked, and partly moved to batch 2.
    snapshot.batches.push(Batch {
        id: BatchId(1),
        product_type: Some(ProductType::Cider),
        start_date: NaiveDate::from_ymd_opt(2024, 9, 15),
        initial_volume_liters: Some(dec!(1000)),
        current_volume_liters: dec!(485.5),
        parent_batch_id: None,
        vessel_id: Some(1),
        actual_abv: Some(dec!(6.5)),
        estimated_abv: None,
    });
    // Transfer-created batch: the stale declared initial must be ignored.
    snapshot.batches.push(Batch {
        id: BatchId(2),
        product_type: Some(ProductType::Cider),
        start_date: NaiveDate::from_ymd_opt(2024, 11, 2),
        initial_volume_liters: Some(dec!(50)),
        current_volume_liters: dec!(340),
        parent_batch_id: Some(BatchId(1)),
        vessel_id: Some(2),
        actual_abv: None,
        estimated_abv: Some(dec!(6.0)),
    });
    // Fresh juice: never taxable.
    snapshot.batches.push(Batch {
        id: BatchId(3),
        product_type: Some(ProductType::Juice),
        start_date: NaiveDate::from_ymd_opt(2024, 10, 20),
        initial_volume_liters: Some(dec!(200)),
        current_volume_liters: dec!(200),
        parent_batch_id: None,
        vessel_id: Some(3),
        actual_abv: None,
        estimated_abv: Some(dec!(0)),
    });

    snapshot.transfers.push(Transfer {
        source_batch_id: BatchId(1),
        dest_batch_id: BatchId(2),
        volume_liters: dec!(400),
        loss_liters: dec!(5),
        deleted: false,
    });
    // 130 x 750 mL = 97.5 L product; 99.5 taken = product + loss, so the
    // loss is already inside the volume taken.
    snapshot.packagings.push(Packaging {
        batch_id: BatchId(1),
        form: PackagingForm::Bottled,
        volume_taken_liters: dec!(99.5),
        loss_liters: dec!(2),
        units_produced: Some(130),
        package_size_ml: Some(dec!(750)),
    });
    snapshot.packagings.push(Packaging {
        batch_id: BatchId(2),
        form: PackagingForm::Kegged,
        volume_taken_liters: dec!(58.6),
        loss_liters: dec!(1.4),
        units_produced: None,
        package_size_ml: None,
    });
    snapshot.racking_losses.push(RackingLoss {
        batch_id: BatchId(1),
        volume_liters: dec!(10),
        notes: None,
    });
    snapshot.carbonations.push(CarbonationRecord {
        batch_id: BatchId(2),
        final_co2_volumes: Some(dec!(2.8)),
        method: CarbonationMethod::Natural,
    });

    snapshot
}

#[test]
fn full_cellar_validates_clean() {
    let snapshot = cellar_snapshot();
    let batches = snapshot.batches.clone();
    let store = InMemorySnapshot::new(snapshot);

    let results = validate_with_store(&store, &batches, 2024).unwrap();
    assert_eq!(results.len(), 3);
    for validation in results.values() {
        assert_eq!(
            validation.status,
            CheckStatus::Pass,
            "batch {} checks: {:?}",
            validation.batch_id,
            validation.checks
        );
        assert_eq!(validation.checks.len(), 5);
    }
}

#[test]
fn transfer_created_batch_balances_from_inbound_volume() {
    let snapshot = cellar_snapshot();
    let batches = snapshot.batches.clone();
    let store = InMemorySnapshot::new(snapshot);
    let events = store.load(&[BatchId(1), BatchId(2), BatchId(3)]).unwrap();

    let balance = compute_balance(&batches[1], &events).unwrap();
    assert_eq!(balance.effective_initial, dec!(0));
    assert_eq!(balance.transfers_in, dec!(400));
    assert_eq!(balance.expected(), dec!(340.0));
}

#[test]
fn classification_and_tax_flow() {
    let snapshot = cellar_snapshot();
    let batches = snapshot.batches.clone();
    let store = InMemorySnapshot::new(snapshot);
    let events = store.load(&[BatchId(1), BatchId(2), BatchId(3)]).unwrap();
    let config = TaxConfig::default();

    // Batch 2 is sparkling-level CO2 but inside the hard cider window.
    let data = BatchTaxData::from_batch(&batches[1], &events).unwrap();
    assert_eq!(classify(&data, &config), Some(TaxClass::HardCider));

    // Juice never reaches the rate table.
    let juice = BatchTaxData::from_batch(&batches[2], &events).unwrap();
    assert_eq!(classify(&juice, &config), None);

    // Tax on batch 2's kegged removals.
    let balance = compute_balance(&batches[1], &events).unwrap();
    let gallons = liters_to_wine_gallons(balance.packaged_volume()).round_dp(3);
    assert_eq!(gallons, dec!(15.480));

    let computation = compute_tax(TaxClass::HardCider, gallons, dec!(0), &config).unwrap();
    assert_eq!(computation.gross_tax, dec!(3.50));
    assert_eq!(computation.credit, dec!(0.87));
    assert_eq!(computation.net_tax, dec!(2.63));
}

#[test]
fn empty_batch_set_is_a_no_op() {
    let store = InMemorySnapshot::new(cellar_snapshot());
    let results = validate_with_store(&store, &[], 2024).unwrap();
    assert!(results.is_empty());
}
