//! Schema command - print expected input formats

use cellarman::{Snapshot, TaxConfig};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which schema to print
    #[arg(value_enum, default_value = "snapshot")]
    target: SchemaTarget,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaTarget {
    /// JSON Schema for the batch/event snapshot input
    Snapshot,
    /// JSON Schema for an organization tax config override
    Config,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.target {
            SchemaTarget::Snapshot => schema_for!(Snapshot),
            SchemaTarget::Config => schema_for!(TaxConfig),
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}
