//! Method Identifiers
//!
//! A method is identified by `typeFqn.methodName(paramType1,paramType2)`.
//! The owning type is everything before the last `.` that precedes the
//! first `(`. Identifiers without parentheses are treated as a bare type
//! name with no method part.
//!
//! @module trace/method_id

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Innermost generic argument list
static GENERIC_ARGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").expect("valid regex"));

// =============================================================================
// METHOD ID
// =============================================================================

/// Fully-qualified method identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(String);

impl MethodId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Build `type.method()` for a call site that carries no resolved signature
    pub fn from_parts(type_fqn: &str, method_name: &str) -> Self {
        Self(format!("{}.{}()", type_fqn, method_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Byte offset of the `.` separating type and method, if any
    fn split_point(&self) -> Option<usize> {
        let paren = self.0.find('(')?;
        self.0[..paren].rfind('.')
    }

    /// Owning type FQN, generics included
    pub fn type_fqn(&self) -> &str {
        match (self.0.find('('), self.split_point()) {
            (None, _) => &self.0,
            (Some(_), Some(dot)) => &self.0[..dot],
            (Some(_), None) => "",
        }
    }

    /// `methodName(params)`, empty for malformed ids
    pub fn method_signature(&self) -> &str {
        match (self.0.find('('), self.split_point()) {
            (None, _) => "",
            (Some(_), Some(dot)) => &self.0[dot + 1..],
            (Some(_), None) => &self.0,
        }
    }

    /// Simple method name without parameter list
    pub fn method_name(&self) -> &str {
        let sig = self.method_signature();
        match sig.find('(') {
            Some(paren) => &sig[..paren],
            None => sig,
        }
    }

    /// Parameter types as written, empty when the id has `()` or no list at all
    pub fn parameter_types(&self) -> Vec<&str> {
        let sig = self.method_signature();
        let (Some(open), Some(close)) = (sig.find('('), sig.rfind(')')) else {
            return Vec::new();
        };
        if close <= open {
            return Vec::new();
        }
        split_top_level(&sig[open + 1..close])
    }

    /// Whether the id names a method at all
    pub fn has_method(&self) -> bool {
        !self.method_name().is_empty()
    }

    /// Identity used for path-local cycle detection.
    ///
    /// Drops the parameter list so `B.m()` from an unresolved call site and
    /// `B.m(int)` from a declaration collide.
    pub fn visit_key(&self) -> String {
        format!("{}.{}", strip_generics(self.type_fqn()), self.method_name())
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MethodId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MethodId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// NAME HELPERS
// =============================================================================

/// Remove generic arguments: `a.Box<a.T>` -> `a.Box`,
/// `a.Outer<T>.Inner<U>` -> `a.Outer.Inner`
pub fn strip_generics(type_fqn: &str) -> String {
    let mut out = type_fqn.to_string();
    while GENERIC_ARGS.is_match(&out) {
        out = GENERIC_ARGS.replace_all(&out, "").into_owned();
    }
    out
}

/// Last segment of a (possibly generic) type FQN
pub fn simple_class_name(type_fqn: &str) -> String {
    let base = strip_generics(type_fqn);
    match base.rfind('.') {
        Some(dot) => base[dot + 1..].to_string(),
        None => base,
    }
}

/// Identifier safe for use as a Mermaid participant id
pub fn safe_mermaid_id(name: &str) -> String {
    name.replace('.', "_")
        .replace(['(', ')', '<', '>'], "")
        .replace(',', "__")
        .replace(' ', "")
}

/// Split a comma-separated list, ignoring commas nested inside `<...>`
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = list[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_type_and_method() {
        let id = MethodId::new("com.acme.OrderService.place(com.acme.Order,int)");
        assert_eq!(id.type_fqn(), "com.acme.OrderService");
        assert_eq!(id.method_signature(), "place(com.acme.Order,int)");
        assert_eq!(id.method_name(), "place");
        assert_eq!(id.parameter_types(), vec!["com.acme.Order", "int"]);
    }

    #[test]
    fn test_generic_parameters_are_not_split() {
        let id = MethodId::new("a.Repo.save(java.util.Map<java.lang.String,a.Item>,int)");
        assert_eq!(id.type_fqn(), "a.Repo");
        assert_eq!(
            id.parameter_types(),
            vec!["java.util.Map<java.lang.String,a.Item>", "int"]
        );
    }

    #[test]
    fn test_malformed_id_is_a_bare_type() {
        let id = MethodId::new("com.acme.OrderService");
        assert_eq!(id.type_fqn(), "com.acme.OrderService");
        assert_eq!(id.method_signature(), "");
        assert!(!id.has_method());
    }

    #[test]
    fn test_method_without_type() {
        let id = MethodId::new("run()");
        assert_eq!(id.type_fqn(), "");
        assert_eq!(id.method_name(), "run");
        assert!(id.parameter_types().is_empty());
    }

    #[test]
    fn test_visit_key_ignores_parameters_and_generics() {
        let declared = MethodId::new("a.Box<a.T>.get(int)");
        let called = MethodId::from_parts("a.Box", "get");
        assert_eq!(declared.visit_key(), called.visit_key());
        assert_eq!(called.visit_key(), "a.Box.get");

        let member = MethodId::new("a.Outer<K>.Inner<V>.put(V)");
        assert_eq!(member.visit_key(), "a.Outer.Inner.put");
    }

    #[test]
    fn test_name_helpers() {
        assert_eq!(strip_generics("java.util.List<a.B>"), "java.util.List");
        assert_eq!(strip_generics("a.Map<a.K, java.util.List<a.V>>"), "a.Map");
        assert_eq!(strip_generics("a.Outer<T>.Inner<U>"), "a.Outer.Inner");
        assert_eq!(simple_class_name("com.acme.Order<T>"), "Order");
        assert_eq!(simple_class_name("Order"), "Order");
        assert_eq!(safe_mermaid_id("com.acme.Box<T>"), "com_acme_BoxT");
        assert_eq!(safe_mermaid_id("a.f(x,y)"), "a_fx__y");
    }
}
