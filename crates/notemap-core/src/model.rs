//! Core data structures for the lineage graph

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What kind of data resource a snippet touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Table,
    View,
    File,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Table => "table",
            DataKind::View => "view",
            DataKind::File => "file",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, located piece of external state.
///
/// Two resources are the same entity iff kind, location and name are all
/// equal (exact, case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataResource {
    pub kind: DataKind,
    /// Database for tables and views, directory for files.
    pub location: String,
    pub name: String,
}

impl DataResource {
    pub fn new(kind: DataKind, location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            name: name.into(),
        }
    }

    pub fn table(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(DataKind::Table, location, name)
    }

    pub fn view(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(DataKind::View, location, name)
    }

    pub fn file(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(DataKind::File, location, name)
    }

    /// `kind:location:name`, with `\` and `:` escaped inside location and name
    /// so no two distinct resources share a canonical string.
    pub fn canonical(&self) -> String {
        format!(
            "{}:{}:{}",
            self.kind,
            escape_component(&self.location),
            escape_component(&self.name)
        )
    }
}

impl fmt::Display for DataResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn escape_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || c == ':' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Read/write facts the oracle reported for one snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFacts {
    /// Snippet identifier, unique within its notebook.
    pub id: String,
    pub read: BTreeSet<DataResource>,
    pub write: BTreeSet<DataResource>,
}

impl CellFacts {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            read: BTreeSet::new(),
            write: BTreeSet::new(),
        }
    }

    pub fn reads(mut self, resource: DataResource) -> Self {
        self.read.insert(resource);
        self
    }

    pub fn writes(mut self, resource: DataResource) -> Self {
        self.write.insert(resource);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }
}

/// Discriminates the two node families in the lineage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Cell,
    Data,
}

/// A single node in the lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    /// Content-derived id, unique across the whole graph.
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
}

/// Direction of the data flow an edge records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// data -> cell
    Reads,
    /// cell -> data
    Writes,
}

/// A directed edge, by node id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// The cells of one notebook, in extraction order. Used for visual grouping only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookRecord {
    pub id: String,
    /// Path relative to the scan root.
    pub path: PathBuf,
    pub cells: Vec<String>,
}
