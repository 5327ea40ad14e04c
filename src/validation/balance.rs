//! Volume balance: expected-vs-actual reconstruction from the event history.

use crate::batch::Batch;
use crate::error::LedgerError;
use crate::events::{GroupedEvents, PackagingForm};
use crate::validation::ValidationCheck;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Band within which `volume_taken ≈ product_volume + loss` means the
/// operator recorded the bottling loss inside the volume taken. Documented
/// data-entry policy, not a tunable.
pub const BOTTLING_LOSS_INCLUSION_BAND_LITERS: Decimal = dec!(2.0);

/// Discrepancy allowance floor. Small batches get this instead of the
/// percentage-based allowance.
pub const MIN_TOLERANCE_LITERS: Decimal = dec!(2.0);

/// Percentage-based allowance on the batch's inflow base.
pub const TOLERANCE_FRACTION: Decimal = dec!(0.05);

/// Per-source breakdown of everything that moved volume on a batch.
#[derive(Debug, Clone, Default)]
pub struct VolumeBalance {
    pub effective_initial: Decimal,
    pub transfers_in: Decimal,
    pub transfers_out: Decimal,
    pub transfer_losses: Decimal,
    pub blend_volume: Decimal,
    pub bottled_volume: Decimal,
    pub bottled_loss: Decimal,
    pub kegged_volume: Decimal,
    pub kegged_loss: Decimal,
    pub adjustments: Decimal,
    pub racking_losses: Decimal,
    pub filter_losses: Decimal,
    pub distilled_volume: Decimal,
}

impl VolumeBalance {
    /// Volume the batch should hold now if every event was recorded honestly.
    pub fn expected(&self) -> Decimal {
        self.effective_initial + self.transfers_in + self.blend_volume
            - self.transfers_out
            - self.transfer_losses
            - self.bottled_volume
            - self.bottled_loss
            - self.kegged_volume
            - self.kegged_loss
            - self.distilled_volume
            + self.adjustments
            - self.racking_losses
            - self.filter_losses
    }

    /// Allowed discrepancy: 5% of the larger of what the batch started with
    /// (declared + blended) and what was transferred in, floored at 2 L.
    pub fn tolerance(&self) -> Decimal {
        let base = (self.effective_initial + self.blend_volume).max(self.transfers_in);
        (TOLERANCE_FRACTION * base).max(MIN_TOLERANCE_LITERS)
    }

    /// Total packaged volume, for taxable-removal reporting.
    pub fn packaged_volume(&self) -> Decimal {
        self.bottled_volume + self.kegged_volume
    }
}

fn ensure_non_negative(
    batch: &Batch,
    kind: &'static str,
    volume: Decimal,
) -> Result<(), LedgerError> {
    if volume < Decimal::ZERO {
        return Err(LedgerError::NegativeVolume {
            batch: batch.id,
            kind,
            volume,
        });
    }
    Ok(())
}

/// Reconstruct the balance for one batch from its grouped events.
///
/// Errors only on contract violations (negative unsigned volumes); data
/// quality problems are the check's job, not this function's.
pub fn compute_balance(batch: &Batch, events: &GroupedEvents) -> Result<VolumeBalance, LedgerError> {
    let mut balance = VolumeBalance::default();

    for transfer in events.transfers_in(batch.id) {
        ensure_non_negative(batch, "transfer", transfer.volume_liters)?;
        ensure_non_negative(batch, "transfer", transfer.loss_liters)?;
        if transfer.is_self_transfer() {
            continue;
        }
        balance.transfers_in += transfer.volume_liters;
    }
    for transfer in events.transfers_out(batch.id) {
        ensure_non_negative(batch, "transfer", transfer.volume_liters)?;
        ensure_non_negative(batch, "transfer", transfer.loss_liters)?;
        if transfer.is_self_transfer() {
            continue;
        }
        balance.transfers_out += transfer.volume_liters;
        balance.transfer_losses += transfer.loss_liters;
    }

    for blend in events.blends(batch.id) {
        ensure_non_negative(batch, "blend", blend.volume)?;
        balance.blend_volume += blend.volume_liters();
    }

    for packaging in events.packagings(batch.id) {
        ensure_non_negative(batch, "packaging", packaging.volume_taken_liters)?;
        ensure_non_negative(batch, "packaging", packaging.loss_liters)?;
        match packaging.form {
            PackagingForm::Bottled => {
                balance.bottled_volume += packaging.volume_taken_liters;
                let loss_included = packaging.product_volume_liters().is_some_and(|product| {
                    let implied = product + packaging.loss_liters;
                    (packaging.volume_taken_liters - implied).abs()
                        <= BOTTLING_LOSS_INCLUSION_BAND_LITERS
                });
                if loss_included {
                    log::debug!(
                        "batch {}: bottling loss {} already inside volume taken {}",
                        batch.id,
                        packaging.loss_liters,
                        packaging.volume_taken_liters
                    );
                } else {
                    balance.bottled_loss += packaging.loss_liters;
                }
            }
            PackagingForm::Kegged => {
                balance.kegged_volume += packaging.volume_taken_liters;
                balance.kegged_loss += packaging.loss_liters;
            }
        }
    }

    for adjustment in events.adjustments(batch.id) {
        // adjustments are the one signed quantity
        balance.adjustments += adjustment.adjustment_liters;
    }

    for loss in events.racking_losses(batch.id) {
        ensure_non_negative(batch, "racking", loss.volume_liters)?;
        if loss.is_historical() {
            continue;
        }
        balance.racking_losses += loss.volume_liters;
    }
    for loss in events.filter_losses(batch.id) {
        ensure_non_negative(batch, "filter", loss.volume_liters)?;
        if loss.is_historical() {
            continue;
        }
        balance.filter_losses += loss.volume_liters;
    }

    for distillation in events.distillations(batch.id) {
        ensure_non_negative(batch, "distillation", distillation.volume_liters)?;
        if distillation.status.is_departure() {
            balance.distilled_volume += distillation.volume_liters;
        }
    }

    // A transfer-created batch holds exactly what came in by transfer; a
    // declared initial volume on it would double count.
    let has_inbound = events
        .transfers_in(batch.id)
        .iter()
        .any(|t| !t.is_self_transfer());
    balance.effective_initial = if !batch.is_root() && has_inbound {
        Decimal::ZERO
    } else {
        batch.initial_volume_liters.unwrap_or(Decimal::ZERO)
    };

    log::debug!(
        "batch {}: expected {} = initial {} + in {} + blends {} - out {} - packaged {} - distilled {} + adj {} - losses {}",
        batch.id,
        balance.expected(),
        balance.effective_initial,
        balance.transfers_in,
        balance.blend_volume,
        balance.transfers_out + balance.transfer_losses,
        balance.bottled_volume + balance.bottled_loss + balance.kegged_volume + balance.kegged_loss,
        balance.distilled_volume,
        balance.adjustments,
        balance.racking_losses + balance.filter_losses,
    );

    Ok(balance)
}

/// The volume-balance check itself: compare expected against recorded.
pub fn balance_check(batch: &Batch, events: &GroupedEvents) -> Result<ValidationCheck, LedgerError> {
    let balance = compute_balance(batch, events)?;
    let expected = balance.expected();
    let actual = batch.current_volume_liters;
    let discrepancy = actual - expected;
    let tolerance = balance.tolerance();

    let deviation = discrepancy.abs();
    let percent = if expected.is_zero() {
        None
    } else {
        Some((deviation / expected.abs() * dec!(100)).round_dp(1))
    };
    let deviation_text = match percent {
        Some(pct) => format!(
            "expected {} L, actual {} L, off by {} L ({}%)",
            expected.round_dp(1),
            actual.round_dp(1),
            deviation.round_dp(1),
            pct
        ),
        None => format!(
            "expected {} L, actual {} L, off by {} L",
            expected.round_dp(1),
            actual.round_dp(1),
            deviation.round_dp(1)
        ),
    };
    let detail = format!(
        "initial {} + transfers in {} + blends {} - transfers out {} - transfer losses {} \
         - bottled {} - bottling losses {} - kegged {} - kegging losses {} - distilled {} \
         + adjustments {} - racking losses {} - filter losses {}; tolerance {} L",
        balance.effective_initial,
        balance.transfers_in,
        balance.blend_volume,
        balance.transfers_out,
        balance.transfer_losses,
        balance.bottled_volume,
        balance.bottled_loss,
        balance.kegged_volume,
        balance.kegged_loss,
        balance.distilled_volume,
        balance.adjustments,
        balance.racking_losses,
        balance.filter_losses,
        tolerance.round_dp(1),
    );

    let check = if deviation <= tolerance {
        ValidationCheck::pass("volume-balance", deviation_text)
    } else if deviation > tolerance * dec!(2) {
        ValidationCheck::fail("volume-balance", deviation_text)
    } else {
        ValidationCheck::warning("volume-balance", deviation_text)
    };
    Ok(check.with_detail(detail))
}
