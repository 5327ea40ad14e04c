//! Per-batch validation: five independent checks, aggregated worst-of.
//!
//! Checks never error on missing or odd data; they degrade to a pass or
//! warning with an explanatory message. A false fail on regulatory output is
//! worse than a missed warning.

pub mod balance;

pub use balance::{compute_balance, VolumeBalance};

use crate::batch::{Batch, BatchId};
use crate::error::Result;
use crate::events::{EventStore, GroupedEvents};
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of a single check. Ordering is severity, so worst-of aggregation
/// is just `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl CheckStatus {
    pub fn display(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warning => "warning",
            CheckStatus::Fail => "fail",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// One check result. The id is stable across releases so UIs can filter on it.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationCheck {
    pub id: &'static str,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ValidationCheck {
    pub fn pass(id: &'static str, message: impl Into<String>) -> Self {
        Self::new(id, CheckStatus::Pass, message)
    }

    pub fn warning(id: &'static str, message: impl Into<String>) -> Self {
        Self::new(id, CheckStatus::Warning, message)
    }

    pub fn fail(id: &'static str, message: impl Into<String>) -> Self {
        Self::new(id, CheckStatus::Fail, message)
    }

    fn new(id: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        ValidationCheck {
            id,
            status,
            message: message.into(),
            detail: None,
            link: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// All checks for one batch plus the aggregated status.
#[derive(Debug, Clone, Serialize)]
pub struct BatchValidation {
    pub batch_id: BatchId,
    pub status: CheckStatus,
    pub checks: Vec<ValidationCheck>,
}

impl BatchValidation {
    fn from_checks(batch_id: BatchId, checks: Vec<ValidationCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass);
        BatchValidation {
            batch_id,
            status,
            checks,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

/// Run every check for every batch against pre-grouped events.
///
/// `reference_year` is the reporting year being viewed; only start dates
/// after it are suspicious.
pub fn validate_batches(
    batches: &[Batch],
    events: &GroupedEvents,
    reference_year: i32,
) -> Result<BTreeMap<BatchId, BatchValidation>> {
    let mut results = BTreeMap::new();
    for batch in batches {
        let link = format!("/batches/{}", batch.id);
        let checks = vec![
            required_fields_check(batch).with_link(link.clone()),
            balance::balance_check(batch, events)?.with_link(link.clone()),
            classification_data_check(batch, events).with_link(link.clone()),
            active_volume_check(batch, events).with_link(link.clone()),
            date_check(batch, reference_year).with_link(link),
        ];
        results.insert(batch.id, BatchValidation::from_checks(batch.id, checks));
    }
    Ok(results)
}

/// Load events through the bulk loader and validate in one go. One fan-out
/// covers the whole batch set.
pub fn validate_with_store(
    store: &dyn EventStore,
    batches: &[Batch],
    reference_year: i32,
) -> anyhow::Result<BTreeMap<BatchId, BatchValidation>> {
    let ids: Vec<BatchId> = batches.iter().map(|b| b.id).collect();
    let events = store.load(&ids)?;
    Ok(validate_batches(batches, &events, reference_year)?)
}

fn required_fields_check(batch: &Batch) -> ValidationCheck {
    let mut missing = Vec::new();
    if batch.product_type.is_none() {
        missing.push("product type");
    }
    if batch.start_date.is_none() {
        missing.push("start date");
    }
    let initial_ok = batch
        .initial_volume_liters
        .is_some_and(|v| v > Decimal::ZERO);
    if batch.is_root() && !initial_ok {
        missing.push("positive initial volume");
    }

    if missing.is_empty() {
        ValidationCheck::pass("required-fields", "all required fields present")
    } else {
        ValidationCheck::fail(
            "required-fields",
            format!("missing required fields: {}", missing.join(", ")),
        )
    }
}

fn classification_data_check(batch: &Batch, events: &GroupedEvents) -> ValidationCheck {
    let mut issues = Vec::new();
    if batch.abv().is_none() {
        issues.push("no actual or estimated ABV recorded".to_string());
    }
    let carbonations = events.carbonations(batch.id);
    if !carbonations.is_empty() && carbonations.iter().all(|c| c.final_co2_volumes.is_none()) {
        issues.push("carbonation recorded but no final CO2 reading".to_string());
    }

    if issues.is_empty() {
        ValidationCheck::pass("classification-data", "classification data complete")
    } else {
        ValidationCheck::warning("classification-data", issues.join("; "))
    }
}

fn active_volume_check(batch: &Batch, events: &GroupedEvents) -> ValidationCheck {
    let current = batch.current_volume_liters;
    if current > Decimal::ZERO && batch.vessel_id.is_none() {
        return ValidationCheck::warning(
            "active-volume",
            format!("{} L in inventory but no vessel assigned", current.round_dp(1)),
        );
    }

    let had_initial = batch
        .initial_volume_liters
        .is_some_and(|v| v > Decimal::ZERO);
    if current.is_zero() && had_initial {
        let any_outflow = events
            .transfers_out(batch.id)
            .iter()
            .any(|t| !t.is_self_transfer())
            || !events.packagings(batch.id).is_empty()
            || !events.distillations(batch.id).is_empty();
        if !any_outflow {
            return ValidationCheck::warning(
                "active-volume",
                "volume is zero but no transfer, packaging, or distillation was recorded",
            );
        }
    }

    ValidationCheck::pass("active-volume", "volume and vessel assignment consistent")
}

fn date_check(batch: &Batch, reference_year: i32) -> ValidationCheck {
    match batch.start_date {
        // prior-year starts are carried-forward inventory, nothing to flag
        Some(date) if date.year() > reference_year => ValidationCheck::warning(
            "date-sanity",
            format!(
                "start date {} is after the {} reporting year",
                date, reference_year
            ),
        ),
        Some(_) => ValidationCheck::pass("date-sanity", "start date within reporting range"),
        None => ValidationCheck::pass("date-sanity", "no start date recorded to check"),
    }
}
