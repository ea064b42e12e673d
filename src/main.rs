//! # atm-engine
//! Seeds the sample branch registry, applies an operations csv file and
//! prints the resulting account summaries to output.
//!
//! ## Input format
//! csv with columns `op`, `card`, `account`, `amount`, `dest`
//!
//! ```csv
//! op,card,account,amount,dest
//! deposit,12345678,savings,500,
//! transfer,12345678,savings,100,87654321
//! ```
//!
//! Log verbosity follows `RUST_LOG`; logs go to stderr so stdout stays
//! machine-readable.

#![deny(missing_docs)]

use std::{
    env,
    fs::File,
    io::{self, BufReader},
};

use anyhow::Context;
use atm_engine::{
    clock::{Clock, SystemClock},
    csv,
    engine::Engine,
    registry::AccountRegistry,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // CLI handle
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        return Err(anyhow::Error::msg(
            "expected exactly one path to an operations csv file",
        ));
    }

    let clock = SystemClock;
    let registry = AccountRegistry::sample(clock.now());
    let engine = Engine::new(&registry, clock);

    let file = File::open(&args[1]).context("access input file")?;
    csv::apply_script(BufReader::new(file), &engine).context("improper content of file")?;

    csv::write_summaries(io::stdout().lock(), &engine.summaries())
        .context("failed to save output")?;

    Ok(())
}
