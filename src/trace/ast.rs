//! AST Snapshot Model
//!
//! Serialized per-file output of the external semantic parser. Each snapshot
//! holds the package, the source path and a tree of type declarations whose
//! method bodies are reduced to call sites and control blocks with every
//! callee already resolved to a fully-qualified type.
//!
//! Snapshots are immutable once parsed and shared through `Arc` by the
//! type index.
//!
//! @module trace/ast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::method_id::{strip_generics, MethodId};

// =============================================================================
// SNAPSHOT ROOT
// =============================================================================

/// Parsed data for one compilation unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAstData {
    /// Absolute path of the source file the snapshot was produced from
    pub absolute_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    /// Package (namespace) of the unit, empty for the default package
    #[serde(default)]
    pub package_name: String,
    #[serde(default)]
    pub imports: Vec<String>,
    /// Top-level type declarations
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

/// A class, interface, enum or record declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDecl {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    /// Member types, addressed as `Outer.Inner`
    pub types: Vec<TypeDecl>,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDecl {
    pub name: String,
    pub type_fqn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodDecl {
    pub name: String,
    pub parameter_types: Vec<String>,
    pub return_type: Option<String>,
    pub annotations: Vec<Annotation>,
    pub start_line: u32,
    pub end_line: u32,
    pub body: Vec<AstNode>,
}

/// Annotation with its literal argument texts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    pub name: String,
    pub arguments: Vec<(String, String)>,
}

// =============================================================================
// BODY NODES
// =============================================================================

/// Statement-level node inside a method body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum AstNode {
    Call(CallSite),
    Control(ControlBlock),
    /// Plain statement block (`{ ... }`, try bodies, lambda bodies)
    Block {
        #[serde(default)]
        children: Vec<AstNode>,
    },
}

/// A method invocation with its resolved binding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallSite {
    /// Resolved callee type, `None` when the parser could not bind it
    pub callee_type: Option<String>,
    pub method_name: Option<String>,
    /// Fully-qualified callee signature when resolvable
    pub signature: Option<String>,
    pub callee_variable: Option<String>,
    pub callee_instance_id: Option<String>,
    pub arguments: Vec<String>,
    pub return_type: Option<String>,
    pub line: u32,
    pub assigned_to: Option<String>,
    /// Set on links 2..n of a fluent chain when the parser also emits them
    /// as standalone statements
    pub chain_continuation: bool,
    /// Next link of a fluent chain (`a.b().c()`)
    pub next: Option<Box<CallSite>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    If,
    ElseIf,
    Else,
    For,
    ForEach,
    While,
    DoWhile,
}

impl BlockKind {
    pub fn is_loop(self) -> bool {
        matches!(
            self,
            BlockKind::For | BlockKind::ForEach | BlockKind::While | BlockKind::DoWhile
        )
    }
}

/// Branching or looping statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlBlock {
    pub kind: BlockKind,
    #[serde(default)]
    pub condition: String,
    /// Calls evaluated as part of the condition expression
    #[serde(default)]
    pub condition_calls: Vec<CallSite>,
    #[serde(default)]
    pub body: Vec<AstNode>,
    /// `else if` / `else` branches of an `if`
    #[serde(default)]
    pub alternatives: Vec<ControlBlock>,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
}

// =============================================================================
// QUERIES
// =============================================================================

impl TypeAstData {
    /// FQNs of every declared type, member types included
    pub fn type_fqns(&self) -> Vec<String> {
        self.type_decls().into_iter().map(|(fqn, _)| fqn).collect()
    }

    /// Every declared type with its FQN, outer types first
    pub fn type_decls(&self) -> Vec<(String, &TypeDecl)> {
        let mut out = Vec::new();
        for decl in &self.types {
            collect_decls(qualify(&self.package_name, &decl.name), decl, &mut out);
        }
        out
    }

    /// Find the declaration of `type_fqn` (generics ignored)
    pub fn find_type(&self, type_fqn: &str) -> Option<&TypeDecl> {
        let wanted = strip_generics(type_fqn);
        self.types
            .iter()
            .find_map(|decl| find_in(&qualify(&self.package_name, &decl.name), decl, &wanted))
    }

    /// Find the declaration node for a method.
    ///
    /// Matches by owning type and simple name; when the id carries a
    /// parameter list, an overload with matching parameter types wins.
    pub fn find_method(&self, id: &MethodId) -> Option<&MethodDecl> {
        let decl = self.find_type(id.type_fqn())?;
        let name = id.method_name();
        let params = id.parameter_types();

        let mut candidates = decl.methods.iter().filter(|m| m.name == name);
        let first = candidates.next()?;
        if params.is_empty() {
            return Some(first);
        }
        std::iter::once(first)
            .chain(candidates)
            .find(|m| parameters_match(&m.parameter_types, &params))
            .or(Some(first))
    }

    /// Direct call sites of a method body, not descending into control blocks
    pub fn call_sites<'a>(&self, method: &'a MethodDecl) -> Vec<&'a CallSite> {
        let mut out = Vec::new();
        collect_calls(&method.body, &mut out);
        out
    }

    /// Control blocks declared directly in a method body
    pub fn control_blocks<'a>(&self, method: &'a MethodDecl) -> Vec<&'a ControlBlock> {
        let mut out = Vec::new();
        collect_blocks(&method.body, &mut out);
        out
    }

    pub fn has_method(&self, type_fqn: &str, name: &str) -> bool {
        self.find_type(type_fqn)
            .map(|t| t.methods.iter().any(|m| m.name == name))
            .unwrap_or(false)
    }
}

impl ControlBlock {
    /// Call sites directly in this block's body
    pub fn body_calls(&self) -> Vec<&CallSite> {
        let mut out = Vec::new();
        collect_calls(&self.body, &mut out);
        out
    }

    /// Control blocks nested directly in this block's body
    pub fn nested_blocks(&self) -> Vec<&ControlBlock> {
        let mut out = Vec::new();
        collect_blocks(&self.body, &mut out);
        out
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

fn collect_decls<'a>(fqn: String, decl: &'a TypeDecl, out: &mut Vec<(String, &'a TypeDecl)>) {
    out.push((fqn.clone(), decl));
    for inner in &decl.types {
        collect_decls(format!("{}.{}", fqn, inner.name), inner, out);
    }
}

fn find_in<'a>(fqn: &str, decl: &'a TypeDecl, wanted: &str) -> Option<&'a TypeDecl> {
    if fqn == wanted {
        return Some(decl);
    }
    if !wanted.starts_with(fqn) {
        return None;
    }
    decl.types
        .iter()
        .find_map(|inner| find_in(&format!("{}.{}", fqn, inner.name), inner, wanted))
}

fn collect_calls<'a>(nodes: &'a [AstNode], out: &mut Vec<&'a CallSite>) {
    for node in nodes {
        match node {
            AstNode::Call(call) => out.push(call),
            AstNode::Block { children } => collect_calls(children, out),
            AstNode::Control(_) => {}
        }
    }
}

fn collect_blocks<'a>(nodes: &'a [AstNode], out: &mut Vec<&'a ControlBlock>) {
    for node in nodes {
        match node {
            AstNode::Control(block) => out.push(block),
            AstNode::Block { children } => collect_blocks(children, out),
            AstNode::Call(_) => {}
        }
    }
}

/// Compare declared parameter types against an id's list, accepting either
/// fully-qualified or simple names on both sides
fn parameters_match(declared: &[String], wanted: &[&str]) -> bool {
    declared.len() == wanted.len()
        && declared.iter().zip(wanted).all(|(d, w)| {
            let d = strip_generics(d);
            let w = strip_generics(w);
            d == w || d.ends_with(&format!(".{}", w)) || w.ends_with(&format!(".{}", d))
        })
}

// =============================================================================
// TESTS
// =============================================================================
