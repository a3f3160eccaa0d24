//! Trace Filter
//!
//! Decides which methods and call edges are followed while tracing and
//! which calls are drawn while rendering. Filters are pure predicates over
//! names plus read-only index lookups.
//!
//! @module trace/filter

use std::collections::BTreeSet;
use std::fmt::Debug;

use super::index::TypeIndex;
use super::method_id::{strip_generics, MethodId};

// =============================================================================
// TRAIT
// =============================================================================

/// Exclusion policy for traced methods and call edges
pub trait TraceFilter: Send + Sync + Debug {
    /// Whether tracing should stop at this method
    fn should_exclude(&self, method_id: &MethodId, index: Option<&TypeIndex>) -> bool;

    /// Whether a call edge to `callee_type.method_name` should be dropped
    fn should_exclude_call(
        &self,
        callee_type: &str,
        method_name: &str,
        index: Option<&TypeIndex>,
    ) -> bool;
}

/// Filter that excludes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl TraceFilter for AllowAll {
    fn should_exclude(&self, _method_id: &MethodId, _index: Option<&TypeIndex>) -> bool {
        false
    }

    fn should_exclude_call(&self, _: &str, _: &str, _: Option<&TypeIndex>) -> bool {
        false
    }
}

// =============================================================================
// DEFAULT FILTER
// =============================================================================

/// Type prefixes that are almost never interesting in a sequence diagram
const STANDARD_LIBRARY_PREFIXES: &[&str] = &[
    "java.",
    "javax.",
    "jakarta.",
    "kotlin.",
    "scala.",
    "sun.",
    "com.sun.",
    "org.slf4j.",
    "org.apache.logging.",
    "org.apache.commons.",
    "org.springframework.",
    "com.fasterxml.jackson.",
    "lombok.",
];

/// Method names that only add noise
const STANDARD_LIBRARY_METHODS: &[&str] = &["toString", "hashCode", "equals"];

/// Exclusion by type name prefix, by method name, and optionally by
/// accessor pairing
#[derive(Debug, Clone, Default)]
pub struct DefaultTraceFilter {
    excluded_types: BTreeSet<String>,
    excluded_methods: BTreeSet<String>,
    accessor_pairing: bool,
}

impl DefaultTraceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter preloaded with JDK and common framework noise
    pub fn standard_library() -> Self {
        Self::new()
            .exclude_types(STANDARD_LIBRARY_PREFIXES.iter().copied())
            .exclude_methods(STANDARD_LIBRARY_METHODS.iter().copied())
    }

    /// Exclude types equal to or starting with any of the given names
    pub fn exclude_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_types
            .extend(types.into_iter().map(Into::into).filter(|s| !s.is_empty()));
        self
    }

    /// Exclude methods by simple name, in any type
    pub fn exclude_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_methods
            .extend(methods.into_iter().map(Into::into).filter(|s| !s.is_empty()));
        self
    }

    /// Skip a getter or setter when its counterpart exists on the same type
    pub fn with_accessor_pairing(mut self, enabled: bool) -> Self {
        self.accessor_pairing = enabled;
        self
    }

    fn is_type_excluded(&self, type_fqn: &str) -> bool {
        let type_fqn = strip_generics(type_fqn);
        self.excluded_types
            .iter()
            .any(|prefix| type_fqn.starts_with(prefix.as_str()))
    }

    fn is_paired_accessor(&self, type_fqn: &str, method_name: &str, index: &TypeIndex) -> bool {
        let counterparts = accessor_counterparts(method_name);
        if counterparts.is_empty() {
            return false;
        }
        let Some(data) = index.get(type_fqn) else {
            return false;
        };
        counterparts
            .iter()
            .any(|other| data.has_method(type_fqn, other))
    }
}

impl TraceFilter for DefaultTraceFilter {
    fn should_exclude(&self, method_id: &MethodId, index: Option<&TypeIndex>) -> bool {
        self.should_exclude_call(method_id.type_fqn(), method_id.method_name(), index)
    }

    fn should_exclude_call(
        &self,
        callee_type: &str,
        method_name: &str,
        index: Option<&TypeIndex>,
    ) -> bool {
        if self.is_type_excluded(callee_type) {
            return true;
        }
        if self.excluded_methods.contains(method_name) {
            return true;
        }
        match index {
            Some(index) if self.accessor_pairing => {
                self.is_paired_accessor(callee_type, method_name, index)
            }
            _ => false,
        }
    }
}

/// Names of the other half of an accessor pair: `getX`/`isX` <-> `setX`
fn accessor_counterparts(method_name: &str) -> Vec<String> {
    let property = |prefix: &str| {
        method_name
            .strip_prefix(prefix)
            .filter(|rest| rest.chars().next().map(char::is_uppercase).unwrap_or(false))
    };

    if let Some(rest) = property("get").or_else(|| property("is")) {
        vec![format!("set{}", rest)]
    } else if let Some(rest) = property("set") {
        vec![format!("get{}", rest), format!("is{}", rest)]
    } else {
        Vec::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
