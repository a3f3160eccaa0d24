//! Index command implementation
//!
//! Provides the `seqtrace index` CLI command: build the snapshot index
//! (refreshing its manifest) and report what it contains.
//!
//! @module cli/index

use crate::cli::SnapshotArgs;
use crate::core::error::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    /// Ignore the manifest and rescan every snapshot
    #[arg(short = 'f', long)]
    pub rebuild: bool,

    /// List every indexed type with its snapshot file
    #[arg(long)]
    pub types: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct IndexReport {
    root: String,
    #[serde(flatten)]
    stats: crate::trace::IndexStats,
    elapsed_ms: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    type_names: Vec<IndexedType>,
}

#[derive(Serialize)]
struct IndexedType {
    name: String,
    snapshot: Option<PathBuf>,
}

/// Run the index command
pub fn run(args: IndexArgs) -> Result<()> {
    let config = args.snapshots.load_config()?;
    let mut index = args.snapshots.open_index(&config)?;

    let start = Instant::now();
    if args.rebuild {
        index.rebuild()?;
    } else {
        index.load_or_build()?;
    }
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let report = IndexReport {
        root: index.root().display().to_string(),
        stats: index.stats(),
        elapsed_ms,
        type_names: if args.types {
            index
                .type_names()
                .into_iter()
                .map(|name| IndexedType {
                    snapshot: index.snapshot_path(&name),
                    name,
                })
                .collect()
        } else {
            vec![]
        },
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Index: {}", report.root);
    println!("{} in {:.1}ms", report.stats, report.elapsed_ms);
    for entry in &report.type_names {
        match &entry.snapshot {
            Some(path) => println!("  {}\t{}", entry.name, path.display()),
            None => println!("  {}", entry.name),
        }
    }
    Ok(())
}
