//! Source Extraction
//!
//! Collects the types a trace touches and gathers their source files into
//! a single document, the smallest body of code that explains the entry
//! point.
//!
//! Files are copied whole by default. With `ExtractRules::only_used_methods`
//! the declarations of methods the trace never reached are cut out using the
//! line ranges recorded in the snapshots; fields, type headers and imports
//! stay.
//!
//! @module trace/sources

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::ast::TypeAstData;
use super::index::TypeIndex;
use super::method_id::strip_generics;
use super::types::{ControlFlowFragment, DiagramNode, Interaction, TraceResult};
use crate::core::error::Result;

// =============================================================================
// TYPES
// =============================================================================

/// A type and the source file that declares it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUnit {
    pub type_fqn: String,
    pub path: PathBuf,
    /// Methods of this type that appear in the trace
    pub methods: Vec<String>,
    /// Line ranges of every method declared in the file
    #[serde(skip)]
    pub spans: Vec<MethodSpan>,
}

/// Where a method declaration sits in its source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpan {
    pub type_fqn: String,
    pub name: String,
    /// 1-based, inclusive; 0 when the parser recorded no position
    pub start_line: u32,
    pub end_line: u32,
    /// Reached by the trace
    pub used: bool,
    pub constructor: bool,
}

/// What `merge_sources` keeps of each file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractRules {
    /// Drop methods the trace did not reach
    pub only_used_methods: bool,
    pub include_imports: bool,
    /// Keep constructors even when they are not in the trace
    pub include_constructors: bool,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            only_used_methods: false,
            include_imports: true,
            include_constructors: true,
        }
    }
}

/// Concatenated sources of a trace
#[derive(Debug, Clone, Serialize)]
pub struct MergedSource {
    pub files: usize,
    pub lines: usize,
    pub content: String,
}

// =============================================================================
// COLLECTION
// =============================================================================

/// Methods reached by the trace, grouped by owning type.
///
/// The entry method is included; generic arguments are dropped from types.
pub fn involved_methods(result: &TraceResult) -> BTreeMap<String, BTreeSet<String>> {
    let mut methods: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let entry = &result.entry_point;
    let entry_type = strip_generics(entry.type_fqn());
    if !entry_type.is_empty() {
        let names = methods.entry(entry_type).or_default();
        if entry.has_method() {
            names.insert(entry.method_name().to_string());
        }
    }
    collect_nodes(&result.nodes, &mut methods);
    methods
}

/// Types reached by the trace, entry type included
pub fn involved_types(result: &TraceResult) -> BTreeSet<String> {
    involved_methods(result).into_keys().collect()
}

fn collect_nodes(nodes: &[DiagramNode], out: &mut BTreeMap<String, BTreeSet<String>>) {
    for node in nodes {
        match node {
            DiagramNode::Interaction(i) => collect_interaction(i, out),
            DiagramNode::Fragment(f) => collect_fragment(f, out),
        }
    }
}

fn collect_interaction(i: &Interaction, out: &mut BTreeMap<String, BTreeSet<String>>) {
    out.entry(strip_generics(&i.callee))
        .or_default()
        .insert(i.method_name.clone());
    collect_nodes(&i.internal_calls, out);
    if let Some(next) = &i.next_chained_call {
        collect_interaction(next, out);
    }
}

fn collect_fragment(f: &ControlFlowFragment, out: &mut BTreeMap<String, BTreeSet<String>>) {
    for i in f.condition_interactions.iter().chain(&f.content_interactions) {
        collect_interaction(i, out);
    }
    for nested in f.nested_fragments.iter().chain(&f.alternatives) {
        collect_fragment(nested, out);
    }
}

/// Source files for the involved types inside `scope`.
///
/// An empty scope accepts every type. Types missing from the index are
/// skipped; a file declaring several involved types is listed once.
pub fn collect_sources(index: &TypeIndex, result: &TraceResult, scope: &[String]) -> Vec<SourceUnit> {
    let involved = involved_methods(result);
    let mut by_path: HashMap<PathBuf, usize> = HashMap::new();
    let mut units: Vec<SourceUnit> = Vec::new();

    for (type_fqn, methods) in &involved {
        let in_scope = scope.is_empty()
            || scope
                .iter()
                .any(|prefix| !prefix.is_empty() && type_fqn.starts_with(prefix.as_str()));
        if !in_scope {
            debug!(type_fqn = %type_fqn, "Outside scope, not extracted");
            continue;
        }
        let Some(data) = index.get(type_fqn) else {
            warn!(type_fqn = %type_fqn, "No snapshot for involved type");
            continue;
        };
        if let Some(&existing) = by_path.get(&data.absolute_path) {
            let unit = &mut units[existing];
            unit.methods.extend(methods.iter().cloned());
            unit.methods.sort();
            unit.methods.dedup();
            continue;
        }
        by_path.insert(data.absolute_path.clone(), units.len());
        units.push(SourceUnit {
            type_fqn: type_fqn.clone(),
            path: data.absolute_path.clone(),
            methods: methods.iter().cloned().collect(),
            spans: method_spans(&data, &involved),
        });
    }

    info!(entry = %result.entry_point, files = units.len(), "Collected trace sources");
    units
}

/// Line ranges of every method in a snapshot, marked against the trace
fn method_spans(data: &TypeAstData, involved: &BTreeMap<String, BTreeSet<String>>) -> Vec<MethodSpan> {
    let mut spans = Vec::new();
    for (type_fqn, decl) in data.type_decls() {
        let used = involved.get(&type_fqn);
        for method in &decl.methods {
            spans.push(MethodSpan {
                type_fqn: type_fqn.clone(),
                name: method.name.clone(),
                start_line: method.start_line,
                end_line: method.end_line.max(method.start_line),
                used: used.map(|names| names.contains(&method.name)).unwrap_or(false),
                constructor: method.name == decl.name || method.name == "<init>",
            });
        }
    }
    spans
}

/// Apply `rules` to one source file
pub fn slice_source(text: &str, unit: &SourceUnit, rules: &ExtractRules) -> String {
    let dropped: Vec<(u32, u32)> = if rules.only_used_methods {
        unit.spans
            .iter()
            .filter(|s| s.start_line > 0 && !s.used)
            .filter(|s| !(s.constructor && rules.include_constructors))
            .map(|s| (s.start_line, s.end_line))
            .collect()
    } else {
        Vec::new()
    };

    let mut out = String::with_capacity(text.len());
    for (idx, line) in text.lines().enumerate() {
        let number = idx as u32 + 1;
        if dropped.iter().any(|(start, end)| (*start..=*end).contains(&number)) {
            continue;
        }
        if !rules.include_imports && line.trim_start().starts_with("import ") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Read source files, apply `rules` and join them under per-file headers.
///
/// Unreadable files are skipped with a warning.
pub fn merge_sources(units: &[SourceUnit], rules: &ExtractRules) -> Result<MergedSource> {
    let mut content = String::new();
    let mut files = 0;

    for unit in units {
        let text = match std::fs::read_to_string(&unit.path) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %unit.path.display(), error = %e, "Skipping unreadable source");
                continue;
            }
        };
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!(
            "// ===== {} ({}) =====\n",
            unit.type_fqn,
            unit.path.display()
        ));
        let sliced = slice_source(&text, unit, rules);
        debug!(
            file = %unit.path.display(),
            kept = sliced.lines().count(),
            total = text.lines().count(),
            "Sliced source"
        );
        content.push_str(&sliced);
        files += 1;
    }

    Ok(MergedSource {
        files,
        lines: content.lines().count(),
        content,
    })
}

// =============================================================================
// TESTS
// =============================================================================
