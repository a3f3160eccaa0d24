//! Configuration management

use crate::core::error::{Error, Result};
use crate::trace::{DefaultTraceFilter, SequenceOutputConfig, DEFAULT_DEPTH};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshot directory used when `--ast-dir` is not given
    pub ast_dir: Option<PathBuf>,
    pub trace: TraceConfig,
    pub filter: FilterConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Maximum number of method bodies entered below the entry point
    pub depth: u32,
    /// Package prefixes to trace into
    pub packages: Vec<String>,
    /// Omit calls inside alt/loop/opt frames
    pub hide_details_in_conditionals: bool,
    /// Omit callee internals under each call
    pub hide_details_in_chain_expression: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Start from the built-in JDK/framework exclusions
    pub standard_library: bool,
    /// Type names or prefixes to exclude
    pub excluded_types: Vec<String>,
    /// Method names to exclude
    pub excluded_methods: Vec<String>,
    /// Skip getters/setters that have their counterpart
    pub accessor_pairing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Filter applied while drawing; the trace filter when absent
    pub filter: Option<FilterConfig>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            packages: vec![],
            hide_details_in_conditionals: false,
            hide_details_in_chain_expression: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            standard_library: true,
            excluded_types: vec![],
            excluded_methods: vec![],
            accessor_pairing: false,
        }
    }
}

impl FilterConfig {
    /// Build the filter described by this section
    pub fn build(&self) -> DefaultTraceFilter {
        let base = if self.standard_library {
            DefaultTraceFilter::standard_library()
        } else {
            DefaultTraceFilter::new()
        };
        base.exclude_types(self.excluded_types.iter().cloned())
            .exclude_methods(self.excluded_methods.iter().cloned())
            .with_accessor_pairing(self.accessor_pairing)
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigError {
            message: format!("Cannot read {}: {}", path.display(), e),
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = Self::seqtrace_home()?;
        Ok(home.join("config.toml"))
    }

    /// Get the seqtrace home directory
    pub fn seqtrace_home() -> Result<PathBuf> {
        // Check SEQTRACE_HOME env var first
        if let Ok(home) = std::env::var("SEQTRACE_HOME") {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("dev", "seqtrace", "seqtrace")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine seqtrace home directory".to_string(),
            })
    }

    /// Options used to build traces
    pub fn trace_config(&self) -> SequenceOutputConfig {
        SequenceOutputConfig {
            depth: self.trace.depth,
            base_packages: self.trace.packages.clone(),
            hide_details_in_conditionals: self.trace.hide_details_in_conditionals,
            hide_details_in_chain_expression: self.trace.hide_details_in_chain_expression,
            filter: Arc::new(self.filter.build()),
        }
    }

    /// Options used to render traces
    pub fn render_config(&self) -> SequenceOutputConfig {
        let config = self.trace_config();
        match &self.render.filter {
            Some(filter) => config.with_filter(Arc::new(filter.build())),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{MethodId, TraceFilter};

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.trace.depth, DEFAULT_DEPTH);
        assert!(config.filter.standard_library);
        assert!(config.ast_dir.is_none());

        let trace = config.trace_config();
        assert!(trace.base_packages.is_empty());
        assert!(trace.filter.should_exclude_call("java.util.List", "add", None));
    }

    #[test]
    fn test_parse_sections() {
        let config: Config = toml::from_str(
            r#"
            ast_dir = "/data/ast"

            [trace]
            depth = 5
            packages = ["com.acme"]
            hide_details_in_conditionals = true

            [filter]
            standard_library = false
            excluded_types = ["com.acme.util."]
            excluded_methods = ["log"]
            "#,
        )
        .unwrap();

        assert_eq!(config.ast_dir, Some(PathBuf::from("/data/ast")));
        let trace = config.trace_config();
        assert_eq!(trace.depth, 5);
        assert!(trace.hide_details_in_conditionals);
        assert!(!trace.hide_details_in_chain_expression);
        assert!(trace.in_scope(&MethodId::new("com.acme.Orders.place()")));
        assert!(trace.filter.should_exclude_call("com.acme.util.Strings", "trim", None));
        assert!(trace.filter.should_exclude_call("com.acme.Orders", "log", None));
        assert!(!trace.filter.should_exclude_call("java.util.List", "add", None));
    }

    #[test]
    fn test_render_filter_override() {
        let config: Config = toml::from_str(
            r#"
            [render.filter]
            excluded_types = ["com.acme.audit."]
            "#,
        )
        .unwrap();

        let trace = config.trace_config();
        let render = config.render_config();
        assert!(!trace.filter.should_exclude_call("com.acme.audit.Log", "write", None));
        assert!(render.filter.should_exclude_call("com.acme.audit.Log", "write", None));
        assert!(render.filter.should_exclude_call("java.lang.String", "trim", None));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[trace]\ndepth = 2\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().trace.depth, 2);

        std::fs::write(&path, "[trace\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::TomlParse(_))));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load_from(&missing), Err(Error::ConfigError { .. })));
    }
}
