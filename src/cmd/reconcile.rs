//! Reconcile command - period totals against removals and ending inventory

use cellarman::reconcile::{reconcile, ReconciliationInput, ReconciliationSummary};
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::PathBuf;
use tabled::{Table, Tabled};

#[derive(Args, Debug)]
pub struct ReconcileCommand {
    /// CSV worksheet of periods (period,beginning,produced,received,tax_paid_removals,other_removals,ending)
    #[arg(short, long, conflicts_with_all = ["beginning", "produced", "received", "tax_paid_removals", "other_removals", "ending"])]
    file: Option<PathBuf>,

    #[arg(long, default_value = "0")]
    beginning: Decimal,

    #[arg(long, default_value = "0")]
    produced: Decimal,

    #[arg(long, default_value = "0")]
    received: Decimal,

    #[arg(long, default_value = "0")]
    tax_paid_removals: Decimal,

    #[arg(long, default_value = "0")]
    other_removals: Decimal,

    #[arg(long, default_value = "0")]
    ending: Decimal,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// CSV worksheet row
#[derive(Debug, Deserialize)]
struct PeriodRecord {
    period: String,
    beginning: Decimal,
    produced: Decimal,
    received: Decimal,
    tax_paid_removals: Decimal,
    other_removals: Decimal,
    ending: Decimal,
}

impl PeriodRecord {
    fn input(&self) -> ReconciliationInput {
        ReconciliationInput {
            beginning: self.beginning,
            produced: self.produced,
            received: self.received,
            tax_paid_removals: self.tax_paid_removals,
            other_removals: self.other_removals,
            ending: self.ending,
        }
    }
}

#[derive(Debug, Serialize)]
struct PeriodOutput {
    period: String,
    total_available: String,
    total_accounted_for: String,
    variance: String,
    balanced: bool,
}

#[derive(Tabled)]
struct PeriodRow {
    period: String,
    available: String,
    accounted: String,
    variance: String,
    balanced: String,
}

impl ReconcileCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let periods: Vec<(String, ReconciliationSummary)> = match &self.file {
            Some(path) => {
                let mut rdr = csv::Reader::from_reader(File::open(path)?);
                let records: Result<Vec<PeriodRecord>, _> =
                    rdr.deserialize::<PeriodRecord>().collect();
                records?
                    .into_iter()
                    .map(|record| (record.period.clone(), reconcile(&record.input())))
                    .collect()
            }
            None => {
                let input = ReconciliationInput {
                    beginning: self.beginning,
                    produced: self.produced,
                    received: self.received,
                    tax_paid_removals: self.tax_paid_removals,
                    other_removals: self.other_removals,
                    ending: self.ending,
                };
                vec![("period".to_string(), reconcile(&input))]
            }
        };

        if self.json {
            let output: Vec<PeriodOutput> = periods
                .iter()
                .map(|(period, summary)| PeriodOutput {
                    period: period.clone(),
                    total_available: summary.total_available.to_string(),
                    total_accounted_for: summary.total_accounted_for.to_string(),
                    variance: summary.variance.to_string(),
                    balanced: summary.balanced,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            let rows: Vec<PeriodRow> = periods
                .iter()
                .map(|(period, summary)| PeriodRow {
                    period: period.clone(),
                    available: summary.total_available.to_string(),
                    accounted: summary.total_accounted_for.to_string(),
                    variance: summary.variance.to_string(),
                    balanced: if summary.balanced { "yes" } else { "NO" }.to_string(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }

        // Exit with code 1 if any period is out of balance
        if periods.iter().any(|(_, summary)| !summary.balanced) {
            std::process::exit(1);
        }
        Ok(())
    }
}
