//! rowmap command-line tool
//!
//! Usage:
//!   rowmap --schema schema.json --config db.json get User alice
//!   rowmap --schema schema.json save User '{"Username": "bob"}'
//!
//! Prints the result as JSON on stdout; logs go to stderr.

use anyhow::Result;
use clap::Parser;
use rowmap_cli::{Args, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    println!("{}", run(&args)?);
    Ok(())
}
