pub mod reconcile;
pub mod schema;
pub mod tax;
pub mod validate;

use cellarman::{Snapshot, TaxConfig};
use chrono::Datelike;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read a snapshot (JSON) from a file, or stdin with "-"
pub fn read_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        let file = File::open(path)?;
        let snapshot = serde_json::from_reader(BufReader::new(file))?;
        Ok(snapshot)
    }
}

fn read_from_stdin() -> anyhow::Result<Snapshot> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    Ok(serde_json::from_slice(&buffer)?)
}

/// Organization tax config override, or the documented default.
pub fn read_config(path: Option<&Path>) -> anyhow::Result<TaxConfig> {
    match path {
        Some(path) => {
            let file = File::open(path)?;
            Ok(serde_json::from_reader(BufReader::new(file))?)
        }
        None => Ok(TaxConfig::default()),
    }
}

/// Reporting year: flag wins, then the snapshot's own, then today's.
pub fn resolve_reference_year(flag: Option<i32>, snapshot: &Snapshot) -> i32 {
    flag.or(snapshot.reference_year)
        .unwrap_or_else(|| chrono::Local::now().year())
}
