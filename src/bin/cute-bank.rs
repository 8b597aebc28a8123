use std::{io, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use cute_bank::{console::run_with_store, storage::LedgerStore};
use tracing_subscriber::EnvFilter;

/// Interactive bank account manager.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding `accounts.csv` and the transaction histories.
    #[arg(long, env = "CUTE_BANK_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let store = LedgerStore::new(args.data_dir);

    let stdin = io::stdin();
    let outcome = run_with_store(&store, stdin.lock(), &mut io::stdout())?;
    if !outcome.issues.is_empty() {
        eprintln!(
            "Saved with {} problem(s), see the log above.",
            outcome.issues.len()
        );
    }
    Ok(())
}
