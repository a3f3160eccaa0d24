//! JSON output renderer
//!
//! Serializes the full trace tree for:
//! - Tooling integration
//! - Downstream consumers that do their own drawing
//!
//! @module trace/output/json

use super::{DiagramRenderer, TraceResult};

// =============================================================================
// RENDERER IMPLEMENTATION
// =============================================================================

/// JSON renderer for machine-readable output
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    /// Create a new JSON renderer with pretty printing
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Create a compact JSON renderer (no pretty printing)
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn to_json<T: serde::Serialize>(&self, value: &T) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramRenderer for JsonRenderer {
    fn render(&self, result: &TraceResult) -> String {
        self.to_json(result)
    }

    fn format_name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::method_id::MethodId;
    use crate::trace::types::{DiagramNode, Interaction};

    fn sample() -> TraceResult {
        let call = Interaction {
            caller: "a.A".to_string(),
            callee: "b.B".to_string(),
            callee_variable: Some("b".to_string()),
            callee_instance_id: None,
            method_name: "bar".to_string(),
            method_signature: None,
            arguments: vec!["x".to_string()],
            return_type: None,
            line: 4,
            assigned_to: None,
            next_chained_call: None,
            internal_calls: vec![],
        };
        TraceResult::new(MethodId::new("a.A.foo()"), vec![DiagramNode::Interaction(call)])
    }

    #[test]
    fn test_json_is_tagged_and_parses_back() {
        let json = JsonRenderer::compact().render(&sample());
        assert!(json.contains(r#""node":"interaction""#));
        assert!(json.contains(r#""entry_point":"a.A.foo()""#));
        assert!(!json.contains("internal_calls"));

        let back: TraceResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_pretty_output() {
        let json = JsonRenderer::new().render(&sample());
        assert!(json.contains('\n'));
        assert_eq!(JsonRenderer::new().format_name(), "json");
    }
}
