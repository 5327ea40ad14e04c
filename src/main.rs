use clap::{Parser, Subcommand};

mod cmd;

use cmd::reconcile::ReconcileCommand;
use cmd::schema::SchemaCommand;
use cmd::tax::TaxCommand;
use cmd::validate::ValidateCommand;

#[derive(Parser, Debug)]
#[command(
    name = "cellarman",
    version,
    about = "Cidery production ledger: volume balance validation and excise tax"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ledger checks over a snapshot of batches and events
    Validate(ValidateCommand),
    /// Classify batches and compute excise tax on packaged removals
    Tax(TaxCommand),
    /// Reconcile a reporting period's totals
    Reconcile(ReconcileCommand),
    /// Print JSON Schemas for the input formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Validate(command) => command.exec(),
        Command::Tax(command) => command.exec(),
        Command::Reconcile(command) => command.exec(),
        Command::Schema(command) => command.exec(),
    }
}
