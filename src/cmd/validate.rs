//! Validate command - run the five ledger checks over a snapshot

use crate::cmd::{read_snapshot, resolve_reference_year};
use cellarman::validation::validate_with_store;
use cellarman::{BatchValidation, CheckStatus, InMemorySnapshot};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{Table, Tabled};

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// JSON snapshot of batches and events (or "-" for stdin)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Reporting year to check start dates against
    #[arg(short, long)]
    year: Option<i32>,

    /// Only show batches with warnings or failures
    #[arg(long)]
    problems_only: bool,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    reference_year: i32,
    batch_count: usize,
    fail_count: usize,
    warning_count: usize,
    batches: Vec<BatchValidation>,
}

#[derive(Tabled)]
struct CheckRow {
    batch: String,
    check: &'static str,
    status: String,
    message: String,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let snapshot = read_snapshot(&self.snapshot)?;
        let reference_year = resolve_reference_year(self.year, &snapshot);
        let batches = snapshot.batches.clone();
        let store = InMemorySnapshot::new(snapshot);

        let results = validate_with_store(&store, &batches, reference_year)?;
        let validations: Vec<BatchValidation> = results
            .into_values()
            .filter(|v| !self.problems_only || v.status != CheckStatus::Pass)
            .collect();

        let fail_count = validations
            .iter()
            .filter(|v| v.status == CheckStatus::Fail)
            .count();
        let warning_count = validations
            .iter()
            .filter(|v| v.status == CheckStatus::Warning)
            .count();

        if self.json {
            let output = ValidationOutput {
                reference_year,
                batch_count: validations.len(),
                fail_count,
                warning_count,
                batches: validations,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            self.print_text(&validations, reference_year, fail_count, warning_count);
        }

        // Exit with code 1 if any batch failed
        if fail_count > 0 {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(
        &self,
        validations: &[BatchValidation],
        reference_year: i32,
        fail_count: usize,
        warning_count: usize,
    ) {
        println!();
        println!("LEDGER VALIDATION ({})", reference_year);
        println!();

        if validations.is_empty() {
            println!("\u{2713} No batches to report.");
            return;
        }

        let mut rows: Vec<CheckRow> = Vec::new();
        for validation in validations {
            for check in &validation.checks {
                if self.problems_only && check.status == CheckStatus::Pass {
                    continue;
                }
                rows.push(CheckRow {
                    batch: validation.batch_id.to_string(),
                    check: check.id,
                    status: check.status.to_string(),
                    message: check.message.clone(),
                });
            }
        }
        println!("{}", Table::new(rows));

        println!();
        if fail_count == 0 && warning_count == 0 {
            println!("\u{2713} All batches balanced.");
        } else {
            println!(
                "\u{26A0} {} failure(s), {} warning(s) across {} batch(es)",
                fail_count,
                warning_count,
                validations.len()
            );
        }
    }
}
