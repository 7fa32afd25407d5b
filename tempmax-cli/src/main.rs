//! Binary crate for the `tempmax` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive form entry
//! - Human-friendly output formatting

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod interactive;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cmd = cli::Cli::parse();
    logging::init_subscriber(cmd.verbosity(), cmd.no_color);
    cmd.run().await
}
