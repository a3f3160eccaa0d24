//! Extract command implementation
//!
//! Provides the `seqtrace extract` CLI command: trace an entry method and
//! print the merged sources of every in-scope type the trace reaches.
//!
//! @module cli/extract

use crate::cli::{SnapshotArgs, TraceOptions};
use crate::core::error::Result;
use crate::trace::{collect_sources, merge_sources, trace_sequence, ExtractRules, MethodId};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    seqtrace extract -a ./ast com.acme.Api.get()          Merged sources to stdout
    seqtrace extract -a ./ast --list com.acme.Api.get()   Just the file list
    seqtrace extract -a ./ast -u com.acme.Api.get()       Only the methods the trace reaches
    seqtrace extract -a ./ast -o context.txt com.acme.Api.get()")]
pub struct ExtractArgs {
    /// Entry method, e.g. com.acme.Api.get(java.lang.String)
    pub entry: String,

    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    #[command(flatten)]
    pub options: TraceOptions,

    /// List involved types and files instead of printing sources
    #[arg(long)]
    pub list: bool,

    /// Output the file list as JSON
    #[arg(long)]
    pub json: bool,

    /// Cut out methods the trace never reaches (fields and imports stay)
    #[arg(short = 'u', long)]
    pub used_only: bool,

    /// Drop import statements
    #[arg(long)]
    pub no_imports: bool,

    /// With --used-only, drop constructors the trace does not reach
    #[arg(long, requires = "used_only")]
    pub no_constructors: bool,

    /// Write the output to a file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ExtractArgs {
    fn rules(&self) -> ExtractRules {
        ExtractRules {
            only_used_methods: self.used_only,
            include_imports: !self.no_imports,
            include_constructors: !self.no_constructors,
        }
    }
}

/// Run the extract command
pub fn run(args: ExtractArgs) -> Result<()> {
    let entry = MethodId::new(args.entry.as_str());

    let mut config = args.snapshots.load_config()?;
    args.options.apply(&mut config, &entry);

    let index = args.snapshots.open_index(&config)?;
    let trace_config = config.trace_config();
    let result = trace_sequence(&index, &trace_config, &entry)?;
    let units = collect_sources(&index, &result, &trace_config.base_packages);

    let text = if args.json {
        serde_json::to_string_pretty(&units)?
    } else if args.list {
        let mut out = String::new();
        for unit in &units {
            out.push_str(&format!(
                "{}\t{}\t{}\n",
                unit.type_fqn,
                unit.path.display(),
                unit.methods.join(",")
            ));
        }
        out
    } else {
        let merged = merge_sources(&units, &args.rules())?;
        info!(files = merged.files, lines = merged.lines, "Merged trace sources");
        merged.content
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &text)?;
            eprintln!("Wrote {} source units to {}", units.len(), path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
