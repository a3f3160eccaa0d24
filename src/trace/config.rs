//! Sequence Output Configuration
//!
//! Per-trace options shared by the tracer and the renderers. The tracer and
//! a renderer may be given different configurations, which lets the render
//! step hide calls the trace still followed.
//!
//! @module trace/config

use std::sync::Arc;

use super::filter::{DefaultTraceFilter, TraceFilter};
use super::method_id::MethodId;

/// Default recursion depth
pub const DEFAULT_DEPTH: u32 = 3;

/// Options for one trace or render
#[derive(Debug, Clone)]
pub struct SequenceOutputConfig {
    /// Number of method bodies the trace may enter below the entry point
    pub depth: u32,
    /// Package prefixes in scope. An empty list puts nothing in scope.
    pub base_packages: Vec<String>,
    pub hide_details_in_conditionals: bool,
    pub hide_details_in_chain_expression: bool,
    pub filter: Arc<dyn TraceFilter>,
}

impl Default for SequenceOutputConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            base_packages: Vec::new(),
            hide_details_in_conditionals: false,
            hide_details_in_chain_expression: false,
            filter: Arc::new(DefaultTraceFilter::standard_library()),
        }
    }
}

impl SequenceOutputConfig {
    /// Default options scoped to the given package prefixes
    pub fn for_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_packages: packages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn TraceFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn hide_conditionals(mut self, hide: bool) -> Self {
        self.hide_details_in_conditionals = hide;
        self
    }

    pub fn hide_chain_details(mut self, hide: bool) -> Self {
        self.hide_details_in_chain_expression = hide;
        self
    }

    /// Whether a method's owning type falls under a scope prefix
    pub fn in_scope(&self, method_id: &MethodId) -> bool {
        self.type_in_scope(method_id.type_fqn())
    }

    pub fn type_in_scope(&self, type_fqn: &str) -> bool {
        self.base_packages
            .iter()
            .any(|prefix| !prefix.is_empty() && type_fqn.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_prefixes() {
        let config = SequenceOutputConfig::for_packages(["com.acme"]);
        assert!(config.in_scope(&MethodId::new("com.acme.orders.Service.run()")));
        assert!(!config.in_scope(&MethodId::new("org.other.Service.run()")));
    }

    #[test]
    fn test_empty_scope_contains_nothing() {
        let config = SequenceOutputConfig::default();
        assert!(!config.in_scope(&MethodId::new("com.acme.Service.run()")));
        let blank = SequenceOutputConfig::for_packages([""]);
        assert!(!blank.type_in_scope("com.acme.Service"));
    }
}
