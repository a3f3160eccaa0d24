//! seqtrace Trace - Sequence Traces from Resolved AST Snapshots
//!
//! This module turns per-type AST snapshots into call traces:
//! - Type index over snapshot files (built once, shared across traces)
//! - Pluggable filtering of traced methods and drawn calls
//! - Depth-bounded, cycle-safe call-graph walk with control-flow fragments
//! - Mermaid, plain and JSON renderers
//! - Source extraction for the types a trace touches
//!
//! @module trace

pub mod ast;
pub mod config;
pub mod filter;
pub mod index;
pub mod method_id;
pub mod output;
pub mod sources;
pub mod tracer;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// RE-EXPORTS: Snapshot Model (ast.rs)
// =============================================================================

pub use ast::{
    Annotation, AstNode, BlockKind, CallSite, ControlBlock, FieldDecl, MethodDecl, TypeAstData,
    TypeDecl,
};

// =============================================================================
// RE-EXPORTS: Trace Tree (types.rs)
// =============================================================================

pub use types::{
    ControlFlowFragment, DiagramNode, FragmentKind, FragmentPart, Interaction, TraceResult,
};

// =============================================================================
// RE-EXPORTS: Index (index.rs)
// =============================================================================

pub use index::{parse_snapshot, IndexStats, TypeIndex, MANIFEST_FILE};

// =============================================================================
// RE-EXPORTS: Filtering and Configuration
// =============================================================================

pub use config::{SequenceOutputConfig, DEFAULT_DEPTH};
pub use filter::{AllowAll, DefaultTraceFilter, TraceFilter};

// =============================================================================
// RE-EXPORTS: Tracing (tracer.rs)
// =============================================================================

pub use method_id::{safe_mermaid_id, simple_class_name, strip_generics, MethodId};
pub use tracer::{trace_sequence, SequenceTracer};

// =============================================================================
// RE-EXPORTS: Output and Extraction
// =============================================================================

pub use output::{
    create_renderer, render_mermaid, DiagramRenderer, JsonRenderer, MermaidRenderer, OutputFormat,
    PlainRenderer,
};
pub use sources::{
    collect_sources, involved_methods, involved_types, merge_sources, slice_source, ExtractRules,
    MergedSource, MethodSpan, SourceUnit,
};
