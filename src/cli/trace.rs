//! Trace command implementation
//!
//! Provides the `seqtrace trace` CLI command: trace an entry method and
//! print the result as a Mermaid diagram, a plain tree or JSON.
//!
//! @module cli/trace

use crate::cli::{SnapshotArgs, TraceOptions};
use crate::core::error::Result;
use crate::trace::{create_renderer, trace_sequence, MethodId, OutputFormat};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    seqtrace trace -a ./ast com.acme.Api.get()
    seqtrace trace -a ./ast -p com.acme -d 5 'com.acme.Orders.place(com.acme.Order)'
    seqtrace trace -a ./ast --hide-conditionals -o flow.mmd com.acme.Api.get()
    seqtrace trace -a ./ast --json com.acme.Api.get()")]
pub struct TraceArgs {
    /// Entry method, e.g. com.acme.Api.get(java.lang.String)
    pub entry: String,

    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    #[command(flatten)]
    pub options: TraceOptions,

    /// Draw only the frames of alt/loop/opt blocks, not the calls inside
    #[arg(long)]
    pub hide_conditionals: bool,

    /// Do not draw what happens inside each callee
    #[arg(long)]
    pub hide_chains: bool,

    /// Output the trace tree as JSON
    #[arg(long)]
    pub json: bool,

    /// Output a plain indented tree
    #[arg(long, conflicts_with = "json")]
    pub plain: bool,

    /// Write the output to a file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl TraceArgs {
    /// Determine the output format from args
    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.plain {
            OutputFormat::Plain
        } else {
            OutputFormat::Mermaid
        }
    }
}

/// Run the trace command
pub fn run(args: TraceArgs) -> Result<()> {
    let entry = MethodId::new(args.entry.as_str());

    let mut config = args.snapshots.load_config()?;
    args.options.apply(&mut config, &entry);
    if args.hide_conditionals {
        config.trace.hide_details_in_conditionals = true;
    }
    if args.hide_chains {
        config.trace.hide_details_in_chain_expression = true;
    }

    let index = args.snapshots.open_index(&config)?;
    let result = trace_sequence(&index, &config.trace_config(), &entry)?;

    let format = args.output_format();
    let renderer = create_renderer(format, &config.render_config(), Some(&index));
    let text = renderer.render(&result);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &text)?;
            info!(file = %path.display(), format = %format, "Wrote trace");
            eprintln!("Wrote {} output to {}", renderer.format_name(), path.display());
        }
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
