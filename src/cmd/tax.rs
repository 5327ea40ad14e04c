//! Tax command - classify each batch and compute excise on packaged removals

use crate::cmd::{read_config, read_snapshot};
use cellarman::events::EventStore;
use cellarman::tax::{classify, compute_tax, BatchTaxData, TaxComputation};
use cellarman::units::liters_to_wine_gallons;
use cellarman::validation::compute_balance;
use cellarman::{BatchId, InMemorySnapshot};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{Table, Tabled};

#[derive(Args, Debug)]
pub struct TaxCommand {
    /// JSON snapshot of batches and events (or "-" for stdin)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Organization tax config override (JSON); defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Credit-cap gallons already used earlier in the year
    #[arg(long, default_value = "0")]
    prior_gallons: Decimal,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Per-batch line in the report
#[derive(Debug, Serialize)]
struct BatchTaxLine {
    batch_id: BatchId,
    product_type: String,
    tax_class: Option<String>,
    taxable_gallons: String,
    gross_tax: String,
    credit: String,
    net_tax: String,
}

#[derive(Debug, Serialize)]
struct TaxOutput {
    batches: Vec<BatchTaxLine>,
    total_taxable_gallons: String,
    total_gross_tax: String,
    total_credit: String,
    total_net_tax: String,
}

#[derive(Tabled)]
struct TaxRow {
    batch: String,
    product: String,
    class: String,
    gallons: String,
    gross: String,
    credit: String,
    net: String,
}

impl TaxCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let snapshot = read_snapshot(&self.snapshot)?;
        let config = read_config(self.config.as_deref())?;

        let mut batches = snapshot.batches.clone();
        batches.sort_by_key(|b| b.id);
        let ids: Vec<BatchId> = batches.iter().map(|b| b.id).collect();
        let store = InMemorySnapshot::new(snapshot);
        let events = store.load(&ids)?;

        let mut lines = Vec::new();
        let mut totals = Totals::default();
        // the annual credit cap is consumed in batch-id order
        let mut gallons_used = self.prior_gallons;

        for batch in &batches {
            let data = match BatchTaxData::from_batch(batch, &events) {
                Some(data) => data,
                None => {
                    log::warn!("batch {} has no product type, skipping", batch.id);
                    continue;
                }
            };
            let product_type = data.product_type;
            let tax_class = classify(&data, &config);

            let balance = compute_balance(batch, &events)?;
            let taxable_gallons =
                liters_to_wine_gallons(balance.packaged_volume()).round_dp(3);

            let line = match tax_class {
                Some(class) => {
                    let computation =
                        compute_tax(class, taxable_gallons, gallons_used, &config)?;
                    gallons_used += computation.credit_eligible_gallons;
                    totals.add(&computation);
                    BatchTaxLine {
                        batch_id: batch.id,
                        product_type: product_type.to_string(),
                        tax_class: Some(class.to_string()),
                        taxable_gallons: computation.taxable_gallons.to_string(),
                        gross_tax: computation.gross_tax.to_string(),
                        credit: computation.credit.to_string(),
                        net_tax: computation.net_tax.to_string(),
                    }
                }
                // juice: non-taxable, excluded from all totals
                None => BatchTaxLine {
                    batch_id: batch.id,
                    product_type: product_type.to_string(),
                    tax_class: None,
                    taxable_gallons: taxable_gallons.to_string(),
                    gross_tax: "0".to_string(),
                    credit: "0".to_string(),
                    net_tax: "0".to_string(),
                },
            };
            lines.push(line);
        }

        if self.json {
            let output = TaxOutput {
                batches: lines,
                total_taxable_gallons: totals.gallons.round_dp(3).to_string(),
                total_gross_tax: totals.gross.to_string(),
                total_credit: totals.credit.to_string(),
                total_net_tax: totals.net.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            self.print_text(&lines, &totals);
        }
        Ok(())
    }

    fn print_text(&self, lines: &[BatchTaxLine], totals: &Totals) {
        println!();
        println!("EXCISE TAX REPORT");
        println!();

        let rows: Vec<TaxRow> = lines
            .iter()
            .map(|line| TaxRow {
                batch: line.batch_id.to_string(),
                product: line.product_type.clone(),
                class: line
                    .tax_class
                    .clone()
                    .unwrap_or_else(|| "non-taxable".to_string()),
                gallons: line.taxable_gallons.clone(),
                gross: line.gross_tax.clone(),
                credit: line.credit.clone(),
                net: line.net_tax.clone(),
            })
            .collect();
        println!("{}", Table::new(rows));

        println!();
        println!(
            "Taxable: {} gal  Gross: {}  Credit: {}  Net: {}",
            totals.gallons.round_dp(3),
            totals.gross,
            totals.credit,
            totals.net
        );
    }
}

#[derive(Default)]
struct Totals {
    gallons: Decimal,
    gross: Decimal,
    credit: Decimal,
    net: Decimal,
}

impl Totals {
    fn add(&mut self, computation: &TaxComputation) {
        self.gallons += computation.taxable_gallons;
        self.gross += computation.gross_tax;
        self.credit += computation.credit;
        self.net += computation.net_tax;
    }
}
