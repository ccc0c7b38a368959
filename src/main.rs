//! Hestia CLI — run a command script against a fresh simulation.
//!
//! Reads the input script, processes it line by line, and writes the
//! complete response text to the output file.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hestia::run_script;

#[derive(Parser)]
#[command(name = "hestia", about = "Deterministic smart-home command simulator")]
struct Args {
    /// Input script: one tab-separated command per line.
    input: PathBuf,

    /// Output file for the response text.
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let input = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let output = run_script(&input);

    fs::write(&args.output, output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok(())
}
