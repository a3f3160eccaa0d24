//! Snapshot fixtures shared by unit tests

use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

use super::index::TypeIndex;

/// Temporary snapshot directory
pub(crate) struct SnapshotDir {
    dir: TempDir,
}

impl SnapshotDir {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn write(&self, rel: &str, snapshot: Value) {
        self.write_raw(rel, &serde_json::to_string_pretty(&snapshot).unwrap());
    }

    pub(crate) fn write_raw(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub(crate) fn index(&self) -> TypeIndex {
        TypeIndex::new(self.dir.path())
    }

    /// Index built and ready for lookups
    pub(crate) fn built_index(&self) -> TypeIndex {
        let index = self.index();
        index.load_or_build().unwrap();
        index
    }
}

/// Snapshot for a single top-level type
pub(crate) fn type_file(package: &str, name: &str, methods: Vec<Value>) -> Value {
    let path = format!("/src/{}/{}.java", package.replace('.', "/"), name);
    json!({
        "absolute_path": path,
        "package_name": package,
        "types": [{ "name": name, "methods": methods }]
    })
}

pub(crate) fn method(name: &str, start_line: u32, body: Vec<Value>) -> Value {
    json!({ "name": name, "start_line": start_line, "body": body })
}

pub(crate) fn call(callee: &str, method: &str, line: u32) -> Value {
    json!({ "node": "call", "callee_type": callee, "method_name": method, "line": line })
}

/// Fluent chain `links[0].links[1]...` as one call node
pub(crate) fn chain(links: Vec<(&str, &str)>, line: u32) -> Value {
    let mut next: Option<Value> = None;
    for (callee, name) in links.into_iter().rev() {
        let mut link = call(callee, name, line);
        if let Some(n) = next.take() {
            link["next"] = n;
        }
        next = Some(link);
    }
    next.unwrap()
}

pub(crate) fn control(kind: &str, condition: &str, start_line: u32, body: Vec<Value>) -> Value {
    json!({
        "node": "control",
        "kind": kind,
        "condition": condition,
        "start_line": start_line,
        "end_line": start_line + 1,
        "body": body
    })
}

/// `if` with `else if` / `else` branches
pub(crate) fn if_else(
    condition: &str,
    start_line: u32,
    body: Vec<Value>,
    alternatives: Vec<(&str, &str, u32, Vec<Value>)>,
) -> Value {
    let mut node = control("if", condition, start_line, body);
    node["alternatives"] = Value::Array(
        alternatives
            .into_iter()
            .map(|(kind, cond, line, body)| {
                let mut alt = control(kind, cond, line, body);
                alt.as_object_mut().unwrap().remove("node");
                alt
            })
            .collect(),
    );
    node
}
