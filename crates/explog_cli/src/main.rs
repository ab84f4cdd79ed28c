//! Command-line caller for the experiment ledger.
//!
//! Each run opens the ledger database, performs one operation as `--caller`,
//! and prints the result plus any emitted events as JSON.

mod cli;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    cli::execute(cli)
}
