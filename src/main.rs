//! seqtrace CLI entry point

use clap::Parser;
use seqtrace::cli::{Cli, Commands};
use seqtrace::core::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Initialize logging (stderr keeps diagram output clean)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("SEQTRACE_LOG"))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trace(args) => seqtrace::cli::trace::run(args),
        Commands::Extract(args) => seqtrace::cli::extract::run(args),
        Commands::Index(args) => seqtrace::cli::index::run(args),
    }
}
