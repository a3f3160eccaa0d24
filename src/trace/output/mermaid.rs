//! Mermaid sequence diagram renderer
//!
//! Walks a trace tree and emits Mermaid `sequenceDiagram` text.
//!
//! A callee is activated only when something is drawn beneath it: its
//! internal calls (unless chain details are hidden) or the next link of a
//! fluent chain. Chain links are drawn from the previous callee so the
//! chain grows along one lifeline. Control-flow fragments become
//! `alt`/`else`, `loop` and `opt` frames closed by `end`.
//!
//! The render-time filter is applied again here, so a diagram can hide
//! calls that the trace still followed.
//!
//! @module trace/output/mermaid

use std::collections::{HashMap, HashSet};

use super::{DiagramRenderer, TraceResult};
use crate::trace::ast::Annotation;
use crate::trace::config::SequenceOutputConfig;
use crate::trace::index::TypeIndex;
use crate::trace::method_id::{safe_mermaid_id, simple_class_name, strip_generics, MethodId};
use crate::trace::types::{
    ControlFlowFragment, DiagramNode, FragmentKind, FragmentPart, Interaction,
};

/// Name of the external actor that invokes the entry point
const ACTOR: &str = "User";

const INDENT: &str = "  ";

// =============================================================================
// OUTPUT BUFFER
// =============================================================================

/// Diagram text under construction.
///
/// Declarations are collected separately and hoisted above the body.
#[derive(Debug, Default)]
struct MermaidOutput {
    declarations: Vec<String>,
    declared: HashSet<String>,
    body: Vec<String>,
    level: usize,
    activations: HashMap<String, usize>,
}

impl MermaidOutput {
    fn actor(&mut self, id: &str, display: &str) {
        if self.declared.insert(id.to_string()) {
            if id == display {
                self.declarations.push(format!("actor {}", id));
            } else {
                self.declarations.push(format!("actor {} as {}", id, display));
            }
        }
    }

    fn participant(&mut self, id: &str, display: &str) {
        if self.declared.insert(id.to_string()) {
            self.declarations
                .push(format!("participant {} as {}", id, display));
        }
    }

    fn line(&mut self, text: &str) {
        self.body
            .push(format!("{}{}", INDENT.repeat(self.level), text));
    }

    fn call(&mut self, from: &str, to: &str, label: &str) {
        self.line(&format!("{}->>{}: {}", from, to, label));
    }

    fn note(&mut self, id: &str, text: &str) {
        self.line(&format!("Note over {}: {}", id, text));
    }

    fn activate(&mut self, id: &str) {
        self.line(&format!("activate {}", id));
        *self.activations.entry(id.to_string()).or_default() += 1;
        self.level += 1;
    }

    fn deactivate(&mut self, id: &str) {
        let Some(count) = self.activations.get_mut(id).filter(|c| **c > 0) else {
            return;
        };
        *count -= 1;
        self.level = self.level.saturating_sub(1);
        self.line(&format!("deactivate {}", id));
    }

    fn open(&mut self, keyword: &str, label: &str) {
        self.line(&labelled(keyword, label));
        self.level += 1;
    }

    fn separator(&mut self, keyword: &str, label: &str) {
        let line = labelled(keyword, label);
        self.level = self.level.saturating_sub(1);
        self.line(&line);
        self.level += 1;
    }

    fn close(&mut self) {
        self.level = self.level.saturating_sub(1);
        self.line("end");
    }

    fn finish(self) -> String {
        let mut out = String::from("sequenceDiagram\n");
        for line in self.declarations.iter().chain(&self.body) {
            out.push_str(INDENT);
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

fn labelled(keyword: &str, label: &str) -> String {
    let label = sanitize(label);
    if label.is_empty() {
        keyword.to_string()
    } else {
        format!("{} {}", keyword, label)
    }
}

// =============================================================================
// RENDERER
// =============================================================================

/// Mermaid sequence diagram renderer
pub struct MermaidRenderer<'a> {
    config: SequenceOutputConfig,
    index: Option<&'a TypeIndex>,
}

impl<'a> MermaidRenderer<'a> {
    pub fn new(config: SequenceOutputConfig) -> Self {
        Self {
            config,
            index: None,
        }
    }

    /// Look up annotations and consult index-aware filters while rendering
    pub fn with_index(mut self, index: &'a TypeIndex) -> Self {
        self.index = Some(index);
        self
    }

    fn is_excluded(&self, interaction: &Interaction) -> bool {
        self.config.filter.should_exclude_call(
            &interaction.callee,
            &interaction.method_name,
            self.index,
        )
    }

    /// Whether rendering `nodes` would draw anything
    fn draws_any(&self, nodes: &[DiagramNode]) -> bool {
        nodes.iter().any(|node| match node {
            DiagramNode::Interaction(i) => !self.is_excluded(i),
            DiagramNode::Fragment(_) => true,
        })
    }

    fn render_nodes(&self, out: &mut MermaidOutput, caller_id: &str, nodes: &[DiagramNode]) {
        for node in nodes {
            match node {
                DiagramNode::Interaction(interaction) => {
                    self.render_interaction(out, caller_id, interaction)
                }
                DiagramNode::Fragment(fragment) => {
                    self.render_fragment(out, caller_id, fragment, true)
                }
            }
        }
    }

    fn render_interaction(&self, out: &mut MermaidOutput, caller_id: &str, interaction: &Interaction) {
        if self.is_excluded(interaction) {
            return;
        }
        let callee_type = strip_generics(&interaction.callee);
        let callee_id = safe_mermaid_id(&callee_type);

        out.participant(&callee_id, &callee_type);
        out.call(caller_id, &callee_id, &call_label(interaction));
        self.method_notes(out, &callee_id, &interaction.callee_method_id());

        let show_internal = !self.config.hide_details_in_chain_expression
            && self.draws_any(&interaction.internal_calls);
        let next = interaction
            .next_chained_call
            .as_deref()
            .filter(|next| !self.is_excluded(next));

        if !show_internal && next.is_none() {
            return;
        }
        out.activate(&callee_id);
        if show_internal {
            self.render_nodes(out, &callee_id, &interaction.internal_calls);
        }
        if let Some(next) = next {
            self.render_interaction(out, &callee_id, next);
        }
        out.deactivate(&callee_id);
    }

    /// Draw a fragment. Alternatives of an `alt` continue its frame as
    /// `else` separators; only the frame opener emits `end`.
    fn render_fragment(
        &self,
        out: &mut MermaidOutput,
        caller_id: &str,
        fragment: &ControlFlowFragment,
        opens_frame: bool,
    ) {
        let opens_frame = opens_frame || fragment.kind != FragmentKind::Alternative;
        match (fragment.kind, opens_frame) {
            (FragmentKind::Loop, _) => out.open("loop", &fragment.condition),
            (FragmentKind::Optional, _) => out.open("opt", &fragment.condition),
            (FragmentKind::Alternative, true) => out.open("alt", &fragment.condition),
            (FragmentKind::Alternative, false) => out.separator("else", &fragment.condition),
        }

        if !self.config.hide_details_in_conditionals {
            for part in fragment.parts_in_order() {
                match part {
                    FragmentPart::Call(interaction) => {
                        self.render_interaction(out, caller_id, interaction)
                    }
                    FragmentPart::Block(nested) => self.render_fragment(out, caller_id, nested, true),
                }
            }
        }

        for alternative in &fragment.alternatives {
            self.render_fragment(out, caller_id, alternative, false);
        }

        if opens_frame {
            out.close();
        }
    }

    /// Annotation notes for a type and method, when an index is attached
    fn type_notes(&self, out: &mut MermaidOutput, id: &str, type_fqn: &str) {
        let Some(data) = self.index.and_then(|index| index.get(type_fqn)) else {
            return;
        };
        if let Some(decl) = data.find_type(type_fqn) {
            for annotation in &decl.annotations {
                out.note(id, &format_annotation(annotation));
            }
        }
    }

    fn method_notes(&self, out: &mut MermaidOutput, id: &str, method_id: &MethodId) {
        let Some(data) = self.index.and_then(|index| index.get(method_id.type_fqn())) else {
            return;
        };
        if let Some(method) = data.find_method(method_id) {
            for annotation in &method.annotations {
                out.note(id, &format_annotation(annotation));
            }
        }
    }
}

impl DiagramRenderer for MermaidRenderer<'_> {
    fn render(&self, result: &TraceResult) -> String {
        let mut out = MermaidOutput::default();
        let entry = &result.entry_point;
        let entry_type = strip_generics(entry.type_fqn());
        let entry_id = safe_mermaid_id(&entry_type);

        let actor_id = actor_id(result);
        out.actor(&actor_id, ACTOR);
        out.participant(&entry_id, &entry_type);
        out.call(&actor_id, &entry_id, &format!("{}()", entry.method_name()));
        self.type_notes(&mut out, &entry_id, &entry_type);
        self.method_notes(&mut out, &entry_id, entry);

        out.activate(&entry_id);
        self.render_nodes(&mut out, &entry_id, &result.nodes);
        out.deactivate(&entry_id);

        out.finish()
    }

    fn format_name(&self) -> &'static str {
        "mermaid"
    }
}

/// Id for the actor that cannot clash with a participant of the trace
fn actor_id(result: &TraceResult) -> String {
    let mut ids = HashSet::new();
    ids.insert(safe_mermaid_id(&strip_generics(result.entry_point.type_fqn())));
    collect_ids(&result.nodes, &mut ids);

    let mut id = ACTOR.to_string();
    while ids.contains(&id) {
        id.push('_');
    }
    id
}

fn collect_ids(nodes: &[DiagramNode], ids: &mut HashSet<String>) {
    for node in nodes {
        match node {
            DiagramNode::Interaction(i) => collect_interaction_ids(i, ids),
            DiagramNode::Fragment(f) => collect_fragment_ids(f, ids),
        }
    }
}

fn collect_interaction_ids(interaction: &Interaction, ids: &mut HashSet<String>) {
    ids.insert(safe_mermaid_id(&strip_generics(&interaction.callee)));
    collect_ids(&interaction.internal_calls, ids);
    if let Some(next) = &interaction.next_chained_call {
        collect_interaction_ids(next, ids);
    }
}

fn collect_fragment_ids(fragment: &ControlFlowFragment, ids: &mut HashSet<String>) {
    for part in fragment.parts_in_order() {
        match part {
            FragmentPart::Call(i) => collect_interaction_ids(i, ids),
            FragmentPart::Block(nested) => collect_fragment_ids(nested, ids),
        }
    }
    for alternative in &fragment.alternatives {
        collect_fragment_ids(alternative, ids);
    }
}

/// Render a trace as Mermaid text
pub fn render_mermaid(result: &TraceResult, config: &SequenceOutputConfig) -> String {
    MermaidRenderer::new(config.clone()).render(result)
}

// =============================================================================
// LABELS
// =============================================================================

/// `[assigned = ]method(args)[ : Return]`
fn call_label(interaction: &Interaction) -> String {
    let args: Vec<String> = interaction
        .arguments
        .iter()
        .map(|a| simplify_argument(a))
        .collect();
    let mut label = format!("{}({})", interaction.method_name, args.join(", "));
    if let Some(var) = interaction.assigned_to.as_deref().filter(|v| !v.is_empty()) {
        label = format!("{} = {}", var, label);
    }
    if let Some(ret) = interaction
        .return_type
        .as_deref()
        .filter(|r| !r.is_empty() && *r != "void")
    {
        label.push_str(" : ");
        label.push_str(&simple_class_name(ret));
    }
    sanitize(&label)
}

/// Shorten an argument expression for display.
///
/// Qualified paths keep their last segment, a trailing `()` is dropped and
/// `getFoo` becomes `foo`. Anything that is not a plain dotted path is kept.
pub fn simplify_argument(arg: &str) -> String {
    let arg = arg.trim();
    let path = arg.strip_suffix("()").unwrap_or(arg);

    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
        && !path.starts_with(|c: char| c.is_ascii_digit());
    if !is_path {
        return arg.to_string();
    }

    let last = path.rsplit('.').next().unwrap_or(path);
    match last.strip_prefix("get") {
        Some(rest) if rest.starts_with(char::is_uppercase) => {
            let mut chars = rest.chars();
            chars
                .next()
                .map(|first| first.to_lowercase().chain(chars).collect())
                .unwrap_or_default()
        }
        _ => last.to_string(),
    }
}

fn format_annotation(annotation: &Annotation) -> String {
    if annotation.arguments.is_empty() {
        return format!("@{}", annotation.name);
    }
    let args: Vec<String> = annotation
        .arguments
        .iter()
        .map(|(key, value)| {
            if key == "value" {
                value.clone()
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect();
    sanitize(&format!("@{}({})", annotation.name, args.join(", ")))
}

/// Keep a label on one line and free of Mermaid statement separators
fn sanitize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(';', ",")
        .replace('#', "#35;")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::filter::DefaultTraceFilter;
    use crate::trace::test_support::{call, chain, control, if_else, method, type_file, SnapshotDir};
    use crate::trace::tracer::trace_sequence;
    use serde_json::json;
    use std::sync::Arc;

    fn config(depth: u32) -> SequenceOutputConfig {
        SequenceOutputConfig::for_packages(["a", "b", "c", "d"]).with_depth(depth)
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().map(str::trim).collect()
    }

    /// Every activate is matched by a deactivate and every frame is closed
    fn assert_balanced(text: &str) {
        let mut active: HashMap<&str, i32> = HashMap::new();
        let mut frames = 0i32;
        for line in lines(text) {
            if let Some(id) = line.strip_prefix("activate ") {
                *active.entry(id).or_default() += 1;
            } else if let Some(id) = line.strip_prefix("deactivate ") {
                *active.entry(id).or_default() -= 1;
                assert!(active[id] >= 0, "deactivate without activate: {}", id);
            } else if ["alt", "loop", "opt"].iter().any(|k| line.split(' ').next() == Some(*k)) {
                frames += 1;
            } else if line == "end" {
                frames -= 1;
            }
        }
        assert!(active.values().all(|c| *c == 0), "unbalanced activations:\n{}", text);
        assert_eq!(frames, 0, "unclosed frames:\n{}", text);
    }

    /// a.A.foo -> b.B.bar -> c.C.baz -> d.D.qux
    fn chain_dir() -> SnapshotDir {
        let dir = SnapshotDir::new();
        dir.write("A.json", type_file("a", "A", vec![method("foo", 1, vec![call("b.B", "bar", 2)])]));
        dir.write("B.json", type_file("b", "B", vec![method("bar", 1, vec![call("c.C", "baz", 2)])]));
        dir.write("C.json", type_file("c", "C", vec![method("baz", 1, vec![call("d.D", "qux", 2)])]));
        dir.write("D.json", type_file("d", "D", vec![method("qux", 1, vec![])]));
        dir
    }

    fn render(dir: &SnapshotDir, trace_config: &SequenceOutputConfig, entry: &str) -> String {
        let index = dir.index();
        let result = trace_sequence(&index, trace_config, &MethodId::new(entry)).unwrap();
        render_mermaid(&result, trace_config)
    }

    #[test]
    fn test_depth_two_example() {
        let text = render(&chain_dir(), &config(2), "a.A.foo()");
        let expected = "\
sequenceDiagram
  actor User
  participant a_A as a.A
  participant b_B as b.B
  participant c_C as c.C
  User->>a_A: foo()
  activate a_A
    a_A->>b_B: bar()
    activate b_B
      b_B->>c_C: baz()
    deactivate b_B
  deactivate a_A
";
        assert_eq!(text, expected);
        assert!(!text.contains("d_D"));
        assert!(!text.contains("activate c_C"));
    }

    #[test]
    fn test_depth_zero_renders_entry_only() {
        let text = render(&chain_dir(), &config(0), "a.A.foo()");
        assert!(text.contains("User->>a_A: foo()"));
        assert!(!text.contains("->>b_B"));
        assert_balanced(&text);
    }

    #[test]
    fn test_render_filter_hides_traced_calls() {
        let dir = chain_dir();
        let index = dir.index();
        let result = trace_sequence(&index, &config(3), &MethodId::new("a.A.foo()")).unwrap();

        let hide_c = config(3).with_filter(Arc::new(DefaultTraceFilter::new().exclude_types(["c."])));
        let text = MermaidRenderer::new(hide_c).render(&result);

        assert!(text.contains("a_A->>b_B: bar()"));
        assert!(!text.contains("c_C"));
        assert!(!text.contains("d_D"));
        // b_B has nothing visible beneath it any more
        assert!(!text.contains("activate b_B"));
        assert_balanced(&text);
    }

    #[test]
    fn test_chain_grows_one_lifeline() {
        let dir = SnapshotDir::new();
        dir.write(
            "A.json",
            type_file(
                "a",
                "A",
                vec![method("f", 1, vec![chain(vec![("a.Q", "from"), ("a.Q", "where"), ("a.R", "list")], 2)])],
            ),
        );
        let text = render(&dir, &config(1), "a.A.f()");
        let body = lines(&text);

        let first = body.iter().position(|l| *l == "a_A->>a_Q: from()").unwrap();
        assert_eq!(body[first + 1], "activate a_Q");
        assert_eq!(body[first + 2], "a_Q->>a_Q: where()");
        assert_eq!(body[first + 3], "activate a_Q");
        assert_eq!(body[first + 4], "a_Q->>a_R: list()");
        assert!(!text.contains("activate a_R"));
        assert_balanced(&text);
    }

    #[test]
    fn test_alternatives_share_one_frame() {
        let dir = SnapshotDir::new();
        dir.write(
            "A.json",
            type_file(
                "a",
                "A",
                vec![method(
                    "f",
                    1,
                    vec![if_else(
                        "x > 0",
                        2,
                        vec![call("a.B", "pos", 3)],
                        vec![
                            ("else_if", "x < 0", 4, vec![call("a.B", "neg", 5)]),
                            ("else", "", 6, vec![call("a.B", "zero", 7)]),
                        ],
                    )],
                )],
            ),
        );
        let text = render(&dir, &config(1), "a.A.f()");
        let body = lines(&text);

        let alt = body.iter().position(|l| *l == "alt x > 0").unwrap();
        assert_eq!(
            &body[alt..alt + 7],
            &[
                "alt x > 0",
                "a_A->>a_B: pos()",
                "else x < 0",
                "a_A->>a_B: neg()",
                "else",
                "a_A->>a_B: zero()",
                "end"
            ]
        );
        assert_eq!(body.iter().filter(|l| **l == "end").count(), 1);
        assert_balanced(&text);
    }

    #[test]
    fn test_loop_and_opt_frames_with_nesting() {
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
                        "for_each",
                        "item : items",
                        2,
                        vec![
                            call("a.B", "check", 3),
                            control("if", "item.ok()", 4, vec![call("a.B", "ship", 5)]),
                        ],
                    )],
                )],
            ),
        );
        let text = render(&dir, &config(1), "a.A.f()");
        let body = lines(&text);

        let start = body.iter().position(|l| *l == "loop item : items").unwrap();
        assert_eq!(
            &body[start..start + 6],
            &["loop item : items", "a_A->>a_B: check()", "opt item.ok()", "a_A->>a_B: ship()", "end", "end"]
        );
        assert_balanced(&text);
    }

    #[test]
    fn test_hidden_conditional_details() {
        let dir = SnapshotDir::new();
        dir.write(
            "A.json",
            type_file(
                "a",
                "A",
                vec![method("f", 1, vec![control("while", "running", 2, vec![call("a.B", "poll", 3)])])],
            ),
        );
        let index = dir.index();
        let result = trace_sequence(&index, &config(1), &MethodId::new("a.A.f()")).unwrap();
        let text = render_mermaid(&result, &config(1).hide_conditionals(true));

        assert!(text.contains("loop running"));
        assert!(!text.contains("poll"));
        assert_balanced(&text);
    }

    #[test]
    fn test_hidden_chain_details_skip_internal_calls() {
        let dir = chain_dir();
        let index = dir.index();
        let result = trace_sequence(&index, &config(3), &MethodId::new("a.A.foo()")).unwrap();
        let text = render_mermaid(&result, &config(3).hide_chain_details(true));

        assert!(text.contains("a_A->>b_B: bar()"));
        assert!(!text.contains("c_C"));
        assert!(!text.contains("activate b_B"));
    }

    #[test]
    fn test_call_label_and_annotations() {
        let dir = SnapshotDir::new();
        let mut site = call("a.Repo", "save", 2);
        site["arguments"] = json!(["order.getCustomer()", "com.acme.Status.ACTIVE", "a + 1"]);
        site["assigned_to"] = json!("saved");
        site["return_type"] = json!("com.acme.Order");
        let mut entry = type_file("a", "A", vec![method("f", 1, vec![site])]);
        entry["types"][0]["annotations"] = json!([{ "name": "Service" }]);
        dir.write("A.json", entry);

        let mut repo_method = method("save", 1, vec![]);
        repo_method["annotations"] = json!([{ "name": "Transactional", "arguments": [["value", "REQUIRED"]] }]);
        dir.write("Repo.json", type_file("a", "Repo", vec![repo_method]));

        let index = dir.index();
        let result = trace_sequence(&index, &config(1), &MethodId::new("a.A.f()")).unwrap();
        let text = MermaidRenderer::new(config(1)).with_index(&index).render(&result);

        assert!(text.contains("a_A->>a_Repo: saved = save(customer, ACTIVE, a + 1) : Order"));
        assert!(text.contains("Note over a_A: @Service"));
        assert!(text.contains("Note over a_Repo: @Transactional(REQUIRED)"));
    }

    #[test]
    fn test_participants_declared_once_at_top() {
        let dir = SnapshotDir::new();
        dir.write(
            "A.json",
            type_file("a", "A", vec![method("f", 1, vec![call("a.B", "g", 2), call("a.B", "h", 3)])]),
        );
        let text = render(&dir, &config(1), "a.A.f()");
        let body = lines(&text);

        assert_eq!(body[0], "sequenceDiagram");
        assert_eq!(body.iter().filter(|l| l.starts_with("participant a_B")).count(), 1);
        let last_decl = body.iter().rposition(|l| l.starts_with("participant")).unwrap();
        let first_call = body.iter().position(|l| l.contains("->>")).unwrap();
        assert!(last_decl < first_call);
    }

    #[test]
    fn test_actor_id_avoids_participant_named_user() {
        let dir = SnapshotDir::new();
        dir.write(
            "User.json",
            type_file("", "User", vec![method("login", 1, vec![call("Auth", "check", 2)])]),
        );
        let config = SequenceOutputConfig::for_packages(["User", "Auth"]).with_depth(2);
        let index = dir.index();
        let result = trace_sequence(&index, &config, &MethodId::new("User.login()")).unwrap();

        let text = render_mermaid(&result, &config);
        assert!(text.contains("  actor User_ as User\n"), "{}", text);
        assert!(text.contains("  participant User as User\n"));
        assert!(text.contains("User_->>User: login()"));
        assert!(text.contains("User->>Auth: check()"));
    }

    #[test]
    fn test_simplify_argument() {
        assert_eq!(simplify_argument("order.getCustomer()"), "customer");
        assert_eq!(simplify_argument("com.acme.Status.ACTIVE"), "ACTIVE");
        assert_eq!(simplify_argument("request"), "request");
        assert_eq!(simplify_argument("getaway"), "getaway");
        assert_eq!(simplify_argument("1.5"), "1.5");
        assert_eq!(simplify_argument("\"a.b\""), "\"a.b\"");
        assert_eq!(simplify_argument("map.get(key)"), "map.get(key)");
    }
}
