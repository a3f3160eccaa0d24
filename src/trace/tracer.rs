//! Sequence Tracer
//!
//! Walks the call graph from an entry method and builds the trace tree.
//!
//! Depth is consumed only when the walk enters a callee's body. Fluent
//! chain links and control-flow fragments are expanded at the depth of the
//! method that contains them. Cycle detection is path-local: a method is
//! skipped only while it is already on the current call path, so sibling
//! calls to the same method are each expanded.
//!
//! @module trace/tracer

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::ast::CallSite;
use super::config::SequenceOutputConfig;
use super::index::TypeIndex;
use super::method_id::{strip_generics, MethodId};
use super::types::{ControlFlowFragment, DiagramNode, Interaction, TraceResult};
use crate::core::error::Result;

// =============================================================================
// CONTEXT
// =============================================================================

/// Mutable state of one trace call
#[derive(Debug, Default)]
struct TraceContext {
    /// Visit keys of the methods on the current call path
    path: HashSet<String>,
    methods_entered: usize,
}

/// Fragment member borrowed for in-place expansion
enum FragmentPart<'f> {
    Call(&'f mut Interaction),
    Block(&'f mut ControlFlowFragment),
}

// =============================================================================
// TRACER
// =============================================================================

/// Builds `TraceResult`s against a shared type index
#[derive(Debug, Clone, Copy)]
pub struct SequenceTracer<'a> {
    index: &'a TypeIndex,
    config: &'a SequenceOutputConfig,
}

impl<'a> SequenceTracer<'a> {
    pub fn new(index: &'a TypeIndex, config: &'a SequenceOutputConfig) -> Self {
        Self { index, config }
    }

    /// Trace an entry method.
    ///
    /// Builds the index first if needed; a missing snapshot directory is the
    /// only error. Data gaps end their branch and leave the rest intact.
    pub fn trace(&self, entry: &MethodId) -> Result<TraceResult> {
        self.index.load_or_build()?;

        let mut ctx = TraceContext::default();
        let nodes = self.trace_method(entry, self.config.depth, &mut ctx);
        let result = TraceResult::new(entry.clone(), nodes);

        info!(
            entry = %entry,
            depth = self.config.depth,
            methods = ctx.methods_entered,
            interactions = result.interaction_count(),
            "Trace complete"
        );
        Ok(result)
    }

    /// Nodes for one method body, or nothing when the method is a boundary
    fn trace_method(&self, id: &MethodId, depth: u32, ctx: &mut TraceContext) -> Vec<DiagramNode> {
        if depth == 0 {
            return Vec::new();
        }
        let key = id.visit_key();
        if ctx.path.contains(&key) {
            debug!(method = %id, "Already on the call path, stopping");
            return Vec::new();
        }
        if !self.config.in_scope(id) {
            debug!(method = %id, "Outside scope, stopping");
            return Vec::new();
        }
        if self.config.filter.should_exclude(id, Some(self.index)) {
            debug!(method = %id, "Excluded by filter, stopping");
            return Vec::new();
        }

        let type_fqn = strip_generics(id.type_fqn());
        let Some(data) = self.index.get(&type_fqn) else {
            warn!(type_fqn = %type_fqn, method = %id, "Type not in index, stopping");
            return Vec::new();
        };
        let Some(method) = data.find_method(id) else {
            warn!(method = %id, "Method not declared in snapshot, stopping");
            return Vec::new();
        };

        let keep = |site: &CallSite| self.keep_call_site(site);
        let interactions = data
            .call_sites(method)
            .into_iter()
            .filter(|site| !site.chain_continuation && keep(*site))
            .filter_map(|site| Interaction::from_call_site(&type_fqn, site))
            .map(DiagramNode::Interaction);
        let fragments = data.control_blocks(method).into_iter().map(|block| {
            DiagramNode::Fragment(ControlFlowFragment::from_block(
                &type_fqn,
                &method.name,
                block,
                &keep,
            ))
        });

        let mut nodes: Vec<DiagramNode> = interactions.chain(fragments).collect();
        if nodes.is_empty() {
            return nodes;
        }
        nodes.sort_by_key(DiagramNode::start_line);

        ctx.path.insert(key.clone());
        ctx.methods_entered += 1;
        for node in &mut nodes {
            self.expand_node(node, depth, ctx);
        }
        ctx.path.remove(&key);

        nodes
    }

    /// Resolved and not filtered out
    fn keep_call_site(&self, site: &CallSite) -> bool {
        let (Some(callee), Some(name)) = (site.callee_type.as_deref(), site.method_name.as_deref())
        else {
            warn!(line = site.line, "Unresolved call site, skipping branch");
            return false;
        };
        !self
            .config
            .filter
            .should_exclude_call(callee, name, Some(self.index))
    }

    fn expand_node(&self, node: &mut DiagramNode, depth: u32, ctx: &mut TraceContext) {
        match node {
            DiagramNode::Interaction(interaction) => {
                self.expand_interaction(interaction, depth, ctx)
            }
            DiagramNode::Fragment(fragment) => self.expand_fragment(fragment, depth, ctx),
        }
    }

    /// Recurse into the callee one level deeper; the chain stays at this depth
    fn expand_interaction(&self, interaction: &mut Interaction, depth: u32, ctx: &mut TraceContext) {
        let callee = interaction.callee_method_id();
        interaction.internal_calls = self.trace_method(&callee, depth.saturating_sub(1), ctx);

        if let Some(next) = interaction.next_chained_call.as_deref_mut() {
            self.expand_interaction(next, depth, ctx);
        }
    }

    /// Expand every member of a fragment in source order at the same depth
    fn expand_fragment(&self, fragment: &mut ControlFlowFragment, depth: u32, ctx: &mut TraceContext) {
        let mut parts: Vec<(u32, FragmentPart<'_>)> = Vec::new();
        parts.extend(
            fragment
                .condition_interactions
                .iter_mut()
                .map(|i| (i.line, FragmentPart::Call(i))),
        );
        parts.extend(
            fragment
                .content_interactions
                .iter_mut()
                .map(|i| (i.line, FragmentPart::Call(i))),
        );
        parts.extend(
            fragment
                .nested_fragments
                .iter_mut()
                .map(|f| (f.start_line, FragmentPart::Block(f))),
        );
        parts.extend(
            fragment
                .alternatives
                .iter_mut()
                .map(|f| (f.start_line, FragmentPart::Block(f))),
        );
        parts.sort_by_key(|(line, _)| *line);

        for (_, part) in parts {
            match part {
                FragmentPart::Call(interaction) => self.expand_interaction(interaction, depth, ctx),
                FragmentPart::Block(nested) => self.expand_fragment(nested, depth, ctx),
            }
        }
    }
}

/// Trace `entry` with `config` against `index`
pub fn trace_sequence(
    index: &TypeIndex,
    config: &SequenceOutputConfig,
    entry: &MethodId,
) -> Result<TraceResult> {
    SequenceTracer::new(index, config).trace(entry)
}

// =============================================================================
// TESTS
// =============================================================================
