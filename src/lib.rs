//! seqtrace - Sequence traces from resolved AST snapshots
//!
//! Walks the call graph of an already-parsed codebase from an entry method
//! and renders the bounded, cycle-safe result as a Mermaid sequence diagram,
//! or gathers the sources needed to explain it.

pub mod cli;
pub mod core;
pub mod trace;

pub use core::config::Config;
pub use core::error::{Error, Result};
