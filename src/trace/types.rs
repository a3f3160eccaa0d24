//! Trace Data Structures
//!
//! The trace tree produced by the sequence tracer and consumed by renderers
//! and source extraction:
//! - `Interaction` - one call edge, optionally chained and expanded
//! - `ControlFlowFragment` - alt/loop/opt block with its own interactions
//! - `DiagramNode` - closed sum over the two, ordered by source line
//! - `TraceResult` - entry point plus top-level nodes
//!
//! @module trace/types

use serde::{Deserialize, Serialize};

use super::ast::{BlockKind, CallSite, ControlBlock};
use super::method_id::MethodId;

// =============================================================================
// INTERACTION
// =============================================================================

/// A call from one type to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Type owning the calling method
    pub caller: String,
    /// Resolved callee type
    pub callee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee_variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee_instance_id: Option<String>,
    pub method_name: String,
    /// Fully-qualified callee signature when the parser resolved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_signature: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Next link of a fluent chain, invoked on this call's result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chained_call: Option<Box<Interaction>>,
    /// Calls made inside the callee body, filled by the tracer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_calls: Vec<DiagramNode>,
}

impl Interaction {
    /// Convert a resolved call site. Returns `None` for unresolved bindings.
    ///
    /// Chain links take the previous link's callee as their caller.
    pub fn from_call_site(caller: &str, site: &CallSite) -> Option<Self> {
        let callee = site.callee_type.as_deref()?;
        let method_name = site.method_name.as_deref()?;
        if callee.is_empty() || method_name.is_empty() {
            return None;
        }
        let next_chained_call = site
            .next
            .as_deref()
            .and_then(|next| Self::from_call_site(callee, next))
            .map(Box::new);

        Some(Self {
            caller: caller.to_string(),
            callee: callee.to_string(),
            callee_variable: site.callee_variable.clone(),
            callee_instance_id: site.callee_instance_id.clone(),
            method_name: method_name.to_string(),
            method_signature: site.signature.clone(),
            arguments: site.arguments.clone(),
            return_type: site.return_type.clone(),
            line: site.line,
            assigned_to: site.assigned_to.clone(),
            next_chained_call,
            internal_calls: Vec::new(),
        })
    }

    /// Method id of the invoked method
    pub fn callee_method_id(&self) -> MethodId {
        match &self.method_signature {
            Some(sig) if MethodId::new(sig.as_str()).has_method() => MethodId::new(sig.as_str()),
            _ => MethodId::from_parts(&self.callee, &self.method_name),
        }
    }

    /// Number of links in the chain starting at this interaction
    pub fn chain_len(&self) -> usize {
        1 + self
            .next_chained_call
            .as_ref()
            .map(|n| n.chain_len())
            .unwrap_or(0)
    }
}

// =============================================================================
// CONTROL FLOW FRAGMENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FragmentKind {
    Alternative,
    Loop,
    Optional,
}

impl FragmentKind {
    fn from_block(block: &ControlBlock) -> Self {
        match block.kind {
            kind if kind.is_loop() => FragmentKind::Loop,
            BlockKind::If if block.alternatives.is_empty() => FragmentKind::Optional,
            _ => FragmentKind::Alternative,
        }
    }
}

/// A conditional or looping region of a method body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFlowFragment {
    pub kind: FragmentKind,
    /// Condition text, empty for a plain `else`
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub condition_interactions: Vec<Interaction>,
    #[serde(default)]
    pub content_interactions: Vec<Interaction>,
    /// Control blocks nested inside this fragment's body
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_fragments: Vec<ControlFlowFragment>,
    /// `else if` / `else` siblings continuing this frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<ControlFlowFragment>,
    pub start_line: u32,
    pub end_line: u32,
    pub caller_class: String,
    pub caller_method: String,
}

impl ControlFlowFragment {
    /// Convert a control block, keeping only call sites accepted by `keep`
    pub fn from_block<F>(caller_class: &str, caller_method: &str, block: &ControlBlock, keep: &F) -> Self
    where
        F: Fn(&CallSite) -> bool,
    {
        let convert = |calls: Vec<&CallSite>| -> Vec<Interaction> {
            calls
                .into_iter()
                .filter(|c| !c.chain_continuation && keep(*c))
                .filter_map(|c| Interaction::from_call_site(caller_class, c))
                .collect()
        };

        Self {
            kind: FragmentKind::from_block(block),
            condition: block.condition.clone(),
            condition_interactions: convert(block.condition_calls.iter().collect()),
            content_interactions: convert(block.body_calls()),
            nested_fragments: block
                .nested_blocks()
                .into_iter()
                .map(|b| Self::from_block(caller_class, caller_method, b, keep))
                .collect(),
            alternatives: block
                .alternatives
                .iter()
                .map(|b| Self::from_block(caller_class, caller_method, b, keep))
                .collect(),
            start_line: block.start_line,
            end_line: block.end_line,
            caller_class: caller_class.to_string(),
            caller_method: caller_method.to_string(),
        }
    }

    /// Condition calls, content calls and nested fragments merged by line.
    ///
    /// Alternatives are not included; they continue the frame after it.
    pub fn parts_in_order(&self) -> Vec<FragmentPart<'_>> {
        let mut parts: Vec<FragmentPart<'_>> = self
            .condition_interactions
            .iter()
            .chain(&self.content_interactions)
            .map(FragmentPart::Call)
            .chain(self.nested_fragments.iter().map(FragmentPart::Block))
            .collect();
        parts.sort_by_key(|part| part.start_line());
        parts
    }
}

/// Member of a fragment body
#[derive(Debug, Clone, Copy)]
pub enum FragmentPart<'a> {
    Call(&'a Interaction),
    Block(&'a ControlFlowFragment),
}

impl FragmentPart<'_> {
    pub fn start_line(&self) -> u32 {
        match self {
            FragmentPart::Call(i) => i.line,
            FragmentPart::Block(f) => f.start_line,
        }
    }
}

// =============================================================================
// DIAGRAM NODE
// =============================================================================

/// One element of a trace, in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum DiagramNode {
    Interaction(Interaction),
    Fragment(ControlFlowFragment),
}

impl DiagramNode {
    /// Source line used for program-order merging
    pub fn start_line(&self) -> u32 {
        match self {
            DiagramNode::Interaction(i) => i.line,
            DiagramNode::Fragment(f) => f.start_line,
        }
    }

    pub fn as_interaction(&self) -> Option<&Interaction> {
        match self {
            DiagramNode::Interaction(i) => Some(i),
            DiagramNode::Fragment(_) => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&ControlFlowFragment> {
        match self {
            DiagramNode::Interaction(_) => None,
            DiagramNode::Fragment(f) => Some(f),
        }
    }
}

// =============================================================================
// TRACE RESULT
// =============================================================================

/// Result of tracing one entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    pub entry_point: MethodId,
    pub nodes: Vec<DiagramNode>,
}

impl TraceResult {
    pub fn new(entry_point: MethodId, nodes: Vec<DiagramNode>) -> Self {
        Self { entry_point, nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total interactions in the tree, chain links and fragment contents included
    pub fn interaction_count(&self) -> usize {
        count_nodes(&self.nodes)
    }
}

fn count_nodes(nodes: &[DiagramNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            DiagramNode::Interaction(i) => count_interaction(i),
            DiagramNode::Fragment(f) => count_fragment(f),
        })
        .sum()
}

fn count_interaction(i: &Interaction) -> usize {
    1 + count_nodes(&i.internal_calls)
        + i.next_chained_call
            .as_deref()
            .map(count_interaction)
            .unwrap_or(0)
}

fn count_fragment(f: &ControlFlowFragment) -> usize {
    f.condition_interactions
        .iter()
        .chain(&f.content_interactions)
        .map(count_interaction)
        .sum::<usize>()
        + f.nested_fragments.iter().map(count_fragment).sum::<usize>()
        + f.alternatives.iter().map(count_fragment).sum::<usize>()
}

// =============================================================================
// TESTS
// =============================================================================
