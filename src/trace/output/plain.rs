//! Plain text output renderer
//!
//! Indented call tree without any markup, for:
//! - Piping to other tools
//! - Log files
//!
//! @module trace/output/plain

use super::{DiagramRenderer, TraceResult};
use crate::trace::config::SequenceOutputConfig;
use crate::trace::method_id::simple_class_name;
use crate::trace::types::{ControlFlowFragment, DiagramNode, FragmentKind, FragmentPart, Interaction};

// =============================================================================
// PLAIN TEXT RENDERER
// =============================================================================

/// Plain text tree renderer
pub struct PlainRenderer {
    config: SequenceOutputConfig,
}

impl PlainRenderer {
    pub fn new(config: SequenceOutputConfig) -> Self {
        Self { config }
    }

    fn push_nodes(&self, output: &mut String, nodes: &[DiagramNode], level: usize) {
        for node in nodes {
            match node {
                DiagramNode::Interaction(i) => self.push_interaction(output, i, level),
                DiagramNode::Fragment(f) => self.push_fragment(output, f, level, true),
            }
        }
    }

    fn push_interaction(&self, output: &mut String, i: &Interaction, level: usize) {
        if self.config.filter.should_exclude_call(&i.callee, &i.method_name, None) {
            return;
        }
        output.push_str(&format!(
            "{}{} -> {}.{}({})  [line {}]\n",
            "  ".repeat(level),
            simple_class_name(&i.caller),
            simple_class_name(&i.callee),
            i.method_name,
            i.arguments.join(", "),
            i.line
        ));
        if !self.config.hide_details_in_chain_expression {
            self.push_nodes(output, &i.internal_calls, level + 1);
        }
        if let Some(next) = &i.next_chained_call {
            self.push_interaction(output, next, level + 1);
        }
    }

    fn push_fragment(&self, output: &mut String, f: &ControlFlowFragment, level: usize, first: bool) {
        let tag = match (f.kind, first) {
            (FragmentKind::Loop, _) => "loop",
            (FragmentKind::Optional, _) => "opt",
            (FragmentKind::Alternative, true) => "alt",
            (FragmentKind::Alternative, false) => "else",
        };
        output.push_str(&format!(
            "{}[{}] {}  (lines {}-{})\n",
            "  ".repeat(level),
            tag,
            f.condition,
            f.start_line,
            f.end_line
        ));
        if !self.config.hide_details_in_conditionals {
            for part in f.parts_in_order() {
                match part {
                    FragmentPart::Call(i) => self.push_interaction(output, i, level + 1),
                    FragmentPart::Block(nested) => self.push_fragment(output, nested, level + 1, true),
                }
            }
        }
        for alternative in &f.alternatives {
            self.push_fragment(output, alternative, level, false);
        }
    }
}

impl DiagramRenderer for PlainRenderer {
    fn render(&self, result: &TraceResult) -> String {
        let mut output = String::new();

        output.push_str(&format!("TRACE: {}\n", result.entry_point));
        output.push_str(&format!(
            "Found: {} interactions (depth {})\n",
            result.interaction_count(),
            self.config.depth
        ));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        if result.is_empty() {
            output.push_str("(no traceable calls)\n");
        } else {
            self.push_nodes(&mut output, &result.nodes, 0);
        }
        output
    }

    fn format_name(&self) -> &'static str {
        "plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::method_id::MethodId;
    use crate::trace::test_support::{call, control, method, type_file, SnapshotDir};
    use crate::trace::tracer::trace_sequence;

    #[test]
    fn test_plain_tree() {
        let dir = SnapshotDir::new();
        dir.write(
            "A.json",
            type_file(
                "a",
                "A",
                vec![method(
                    "f",
                    1,
                    vec![call("a.B", "g", 2), control("while", "more", 3, vec![call("a.B", "h", 4)])],
                )],
            ),
        );
        dir.write("B.json", type_file("a", "B", vec![method("g", 1, vec![call("a.C", "k", 2)])]));
        let config = SequenceOutputConfig::for_packages(["a"]).with_depth(2);
        let index = dir.index();
        let result = trace_sequence(&index, &config, &MethodId::new("a.A.f()")).unwrap();

        let text = PlainRenderer::new(config).render(&result);
        assert!(text.starts_with("TRACE: a.A.f()\n"));
        assert!(text.contains("A -> B.g()  [line 2]"));
        assert!(text.contains("  B -> C.k()  [line 2]"));
        assert!(text.contains("[loop] more  (lines 3-4)"));
        assert!(text.contains("  A -> B.h()  [line 4]"));
    }

    #[test]
    fn test_nested_fragment_keeps_source_order() {
        let dir = SnapshotDir::new();
        dir.write(
            "A.json",
            type_file(
                "a",
                "A",
                vec![method(
                    "f",
                    1,
                    vec![control(
                        "while",
                        "more",
                        2,
                        vec![
                            control("if", "ready", 3, vec![call("a.B", "inner", 4)]),
                            call("a.B", "after", 6),
                        ],
                    )],
                )],
            ),
        );
        let config = SequenceOutputConfig::for_packages(["a"]).with_depth(1);
        let index = dir.index();
        let result = trace_sequence(&index, &config, &MethodId::new("a.A.f()")).unwrap();

        let text = PlainRenderer::new(config).render(&result);
        let opt = text.find("[opt] ready").unwrap();
        let inner = text.find("B.inner()").unwrap();
        let after = text.find("B.after()").unwrap();
        assert!(opt < inner && inner < after, "{}", text);
        assert!(text.contains("    A -> B.inner()  [line 4]"));
        assert!(text.contains("  A -> B.after()  [line 6]"));
    }

    #[test]
    fn test_empty_trace() {
        let result = TraceResult::new(MethodId::new("a.A.f()"), vec![]);
        let text = PlainRenderer::new(SequenceOutputConfig::default()).render(&result);
        assert!(text.contains("(no traceable calls)"));
    }
}
