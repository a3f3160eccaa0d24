//! CLI command definitions and handlers

pub mod extract;
pub mod index;
pub mod trace;

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::trace::{MethodId, TypeIndex};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const LONG_ABOUT: &str = r#"
Sequence traces from resolved AST snapshots.

seqtrace reads a directory of per-file AST snapshots (JSON, produced by an
external semantic parser), walks the call graph from an entry method and
renders what it finds as a Mermaid sequence diagram.

QUICK START:
    1. seqtrace index -a ./ast                    Check the snapshots load
    2. seqtrace trace -a ./ast com.acme.Api.get() Draw a sequence diagram
    3. seqtrace extract -a ./ast com.acme.Api.get()
                                                  Gather the involved sources

METHOD IDS:
    com.acme.orders.OrderService.place(com.acme.orders.Order,int)
    com.acme.orders.OrderService.place()        Any overload

CONFIGURATION:
    $SEQTRACE_HOME/config.toml (or the platform config dir) holds defaults
    for depth, scope packages and filters. Command-line flags win.

LOGGING:
    SEQTRACE_LOG=debug seqtrace trace ...        Logs go to stderr
"#;

/// Sequence traces from resolved AST snapshots
#[derive(Parser, Debug)]
#[command(name = "seqtrace")]
#[command(author, version)]
#[command(about = "Sequence traces from resolved AST snapshots")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trace an entry method and render a sequence diagram
    #[command(visible_alias = "t")]
    Trace(trace::TraceArgs),

    /// Collect the source files involved in a trace
    #[command(visible_alias = "x")]
    Extract(extract::ExtractArgs),

    /// Build or inspect the snapshot index
    #[command(visible_alias = "i")]
    Index(index::IndexArgs),
}

// =============================================================================
// SHARED ARGUMENTS
// =============================================================================

/// Where snapshots and configuration come from
#[derive(Args, Debug, Clone, Default)]
pub struct SnapshotArgs {
    /// Directory of AST snapshot files
    #[arg(short = 'a', long, value_name = "DIR")]
    pub ast_dir: Option<PathBuf>,

    /// Configuration file (default: $SEQTRACE_HOME/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Neither read nor write the index manifest in the snapshot directory
    #[arg(long)]
    pub no_manifest: bool,
}

impl SnapshotArgs {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    /// Snapshot directory from the flag, else from the config file
    pub fn resolve_ast_dir(&self, config: &Config) -> Result<PathBuf> {
        self.ast_dir
            .clone()
            .or_else(|| config.ast_dir.clone())
            .ok_or_else(|| Error::ConfigError {
                message: "No snapshot directory: pass --ast-dir or set ast_dir in the config file"
                    .to_string(),
            })
    }

    /// Unbuilt index over the resolved snapshot directory
    pub fn open_index(&self, config: &Config) -> Result<TypeIndex> {
        let index = TypeIndex::new(self.resolve_ast_dir(config)?);
        Ok(if self.no_manifest {
            index.without_manifest()
        } else {
            index
        })
    }
}

/// Depth, scope and filter overrides
#[derive(Args, Debug, Clone, Default)]
pub struct TraceOptions {
    /// Package prefix to trace into (repeatable, default: the entry's package)
    #[arg(short = 'p', long = "package", value_name = "PREFIX")]
    pub packages: Vec<String>,

    /// Maximum number of method bodies to enter
    #[arg(short = 'd', long, value_name = "N")]
    pub depth: Option<u32>,

    /// Exclude types by name or prefix (repeatable)
    #[arg(long = "exclude-type", value_name = "PREFIX")]
    pub exclude_types: Vec<String>,

    /// Exclude methods by simple name (repeatable)
    #[arg(long = "exclude-method", value_name = "NAME")]
    pub exclude_methods: Vec<String>,

    /// Skip getters/setters that have their counterpart
    #[arg(long)]
    pub accessors: bool,

    /// Do not exclude JDK and common framework types
    #[arg(long)]
    pub no_std_filter: bool,
}

impl TraceOptions {
    /// Merge the flags into a loaded configuration
    pub fn apply(&self, config: &mut Config, entry: &MethodId) {
        if !self.packages.is_empty() {
            config.trace.packages = self.packages.clone();
        }
        if config.trace.packages.is_empty() {
            config.trace.packages = entry_package(entry).into_iter().collect();
        }
        if let Some(depth) = self.depth {
            config.trace.depth = depth;
        }
        config.filter.excluded_types.extend(self.exclude_types.iter().cloned());
        config
            .filter
            .excluded_methods
            .extend(self.exclude_methods.iter().cloned());
        if self.accessors {
            config.filter.accessor_pairing = true;
        }
        if self.no_std_filter {
            config.filter.standard_library = false;
        }
    }
}

/// Package of the entry's owning type, if it has one
fn entry_package(entry: &MethodId) -> Option<String> {
    let type_fqn = crate::trace::strip_generics(entry.type_fqn());
    type_fqn
        .rfind('.')
        .map(|dot| type_fqn[..dot].to_string())
        .filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_trace_command() {
        let cli = Cli::try_parse_from([
            "seqtrace", "trace", "-a", "/ast", "-p", "com.acme", "-d", "4", "--json",
            "com.acme.Api.get()",
        ])
        .unwrap();
        match cli.command {
            Commands::Trace(args) => {
                assert_eq!(args.entry, "com.acme.Api.get()");
                assert_eq!(args.snapshots.ast_dir, Some(PathBuf::from("/ast")));
                assert_eq!(args.options.depth, Some(4));
                assert!(args.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_options_override_config() {
        let mut config = Config::default();
        config.trace.packages = vec!["org.old".to_string()];
        let options = TraceOptions {
            packages: vec!["com.acme".to_string()],
            depth: Some(7),
            exclude_methods: vec!["log".to_string()],
            accessors: true,
            ..Default::default()
        };
        options.apply(&mut config, &MethodId::new("com.acme.Api.get()"));

        assert_eq!(config.trace.packages, vec!["com.acme"]);
        assert_eq!(config.trace.depth, 7);
        assert_eq!(config.filter.excluded_methods, vec!["log"]);
        assert!(config.filter.accessor_pairing);
    }

    #[test]
    fn test_scope_defaults_to_entry_package() {
        let mut config = Config::default();
        TraceOptions::default().apply(&mut config, &MethodId::new("com.acme.web.Api.get()"));
        assert_eq!(config.trace.packages, vec!["com.acme.web"]);

        let mut bare = Config::default();
        TraceOptions::default().apply(&mut bare, &MethodId::new("Api.get()"));
        assert!(bare.trace.packages.is_empty());
    }

    #[test]
    fn test_no_manifest_flag_leaves_snapshot_dir_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from([
            "seqtrace",
            "index",
            "--no-manifest",
            "-a",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Index(args) = cli.command else {
            panic!("expected index command");
        };
        let index = args.snapshots.open_index(&Config::default()).unwrap();
        index.load_or_build().unwrap();
        assert!(index.is_empty());
        assert!(!index.manifest_path().exists());
    }

    #[test]
    fn test_missing_ast_dir_is_config_error() {
        let args = SnapshotArgs::default();
        let err = args.resolve_ast_dir(&Config::default()).unwrap_err();
        assert!(matches!(err, Error::ConfigError { .. }));
    }
}
