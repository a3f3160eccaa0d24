//! Renderers for trace results
//!
//! Provides multiple output formats for a `TraceResult`:
//! - Mermaid: sequence diagram text
//! - Plain: indented call tree (piping/logs)
//! - JSON: machine-readable trace tree (tooling integration)
//!
//! @module trace/output

pub mod json;
pub mod mermaid;
pub mod plain;

use super::config::SequenceOutputConfig;
use super::index::TypeIndex;
use super::types::TraceResult;

// =============================================================================
// TYPES
// =============================================================================

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Mermaid sequence diagram
    #[default]
    Mermaid,
    /// Plain indented tree
    Plain,
    /// JSON for machine consumption
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Mermaid => write!(f, "mermaid"),
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

// =============================================================================
// RENDERER TRAIT
// =============================================================================

/// Turns a trace tree into text
pub trait DiagramRenderer {
    /// Render the whole trace
    fn render(&self, result: &TraceResult) -> String;

    /// Short name of the produced format
    fn format_name(&self) -> &'static str;
}

// =============================================================================
// FACTORY FUNCTION
// =============================================================================

/// Create a renderer for the given output format.
///
/// `config` is the render-time configuration; its filter is applied again
/// while drawing, independently of the filter used to build the trace.
pub fn create_renderer<'a>(
    format: OutputFormat,
    config: &SequenceOutputConfig,
    index: Option<&'a TypeIndex>,
) -> Box<dyn DiagramRenderer + 'a> {
    match format {
        OutputFormat::Mermaid => {
            let renderer = mermaid::MermaidRenderer::new(config.clone());
            match index {
                Some(index) => Box::new(renderer.with_index(index)),
                None => Box::new(renderer),
            }
        }
        OutputFormat::Plain => Box::new(plain::PlainRenderer::new(config.clone())),
        OutputFormat::Json => Box::new(json::JsonRenderer::new()),
    }
}

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use json::JsonRenderer;
pub use mermaid::{render_mermaid, simplify_argument, MermaidRenderer};
pub use plain::PlainRenderer;
