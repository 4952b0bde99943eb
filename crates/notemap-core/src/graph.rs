//! Lineage graph wrapper using petgraph::StableDiGraph keyed by content-derived ids

use crate::id;
use crate::model::*;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// The lineage graph: cells and data resources joined by read/write edges.
///
/// Additive only: nodes and edges are inserted, never removed or changed, and
/// inserting a fact that is already present is a no-op. Merge order therefore
/// does not affect the final graph.
pub struct LineageGraph {
    inner: StableDiGraph<LineageNode, EdgeKind>,
    index: HashMap<String, NodeIndex>,
    notebooks: BTreeMap<String, NotebookRecord>,
}

impl std::fmt::Debug for LineageGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .field("notebook_count", &self.notebooks.len())
            .finish()
    }
}

impl LineageGraph {
    pub fn new() -> Self {
        LineageGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            notebooks: BTreeMap::new(),
        }
    }

    /// Incorporate one notebook's per-cell facts.
    ///
    /// `facts` must be in extraction order; that order becomes the notebook's
    /// cell sequence. Calling this again with the same facts changes nothing.
    pub fn merge(&mut self, notebook_id: &str, relative_path: &Path, facts: &[CellFacts]) {
        let record = self
            .notebooks
            .entry(notebook_id.to_string())
            .or_insert_with(|| NotebookRecord {
                id: notebook_id.to_string(),
                path: relative_path.to_path_buf(),
                cells: Vec::new(),
            });

        let mut new_cells = Vec::new();
        for fact in facts {
            let cell_id = id::cell_id(&fact.id, notebook_id);
            if !record.cells.contains(&cell_id) && !new_cells.contains(&cell_id) {
                new_cells.push(cell_id);
            }
        }
        record.cells.extend(new_cells);

        for fact in facts {
            let cell_id = id::cell_id(&fact.id, notebook_id);
            let cell = self.ensure_node(LineageNode {
                id: cell_id.clone(),
                kind: NodeKind::Cell,
                label: cell_id,
            });

            for resource in &fact.read {
                let data = self.ensure_data_node(resource);
                self.inner.update_edge(data, cell, EdgeKind::Reads);
            }
            for resource in &fact.write {
                let data = self.ensure_data_node(resource);
                self.inner.update_edge(cell, data, EdgeKind::Writes);
            }
        }

        tracing::debug!(
            "Merged notebook {} ({}): {} nodes, {} edges total",
            relative_path.display(),
            notebook_id,
            self.node_count(),
            self.edge_count()
        );
    }

    /// Merge by path alone, deriving the notebook id from it.
    pub fn merge_notebook(&mut self, relative_path: &Path, facts: &[CellFacts]) -> String {
        let notebook_id = id::notebook_id(relative_path);
        self.merge(&notebook_id, relative_path, facts);
        notebook_id
    }

    fn ensure_data_node(&mut self, resource: &DataResource) -> NodeIndex {
        let label = resource.canonical();
        self.ensure_node(LineageNode {
            id: id::generate(id::DATA_PREFIX, &label),
            kind: NodeKind::Data,
            label,
        })
    }

    fn ensure_node(&mut self, node: LineageNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let key = node.id.clone();
        let idx = self.inner.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&LineageNode> {
        self.index
            .get(id)
            .and_then(|&idx| self.inner.node_weight(idx))
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes.
    pub fn all_nodes(&self) -> impl Iterator<Item = &LineageNode> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Get all nodes of a specific kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &LineageNode> {
        self.all_nodes().filter(move |n| n.kind == kind)
    }

    /// Iterate over all edges as (edge, kind).
    pub fn all_edges(&self) -> impl Iterator<Item = (Edge, EdgeKind)> + '_ {
        self.inner.edge_indices().filter_map(move |idx| {
            let (source, target) = self.inner.edge_endpoints(idx)?;
            let kind = *self.inner.edge_weight(idx)?;
            Some((
                Edge {
                    source: self.inner.node_weight(source)?.id.clone(),
                    target: self.inner.node_weight(target)?.id.clone(),
                },
                kind,
            ))
        })
    }

    /// Check if a directed edge exists between two node ids.
    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => self.inner.find_edge(s, t).is_some(),
            _ => false,
        }
    }

    /// Notebook records ordered by notebook id.
    pub fn notebooks(&self) -> impl Iterator<Item = &NotebookRecord> {
        self.notebooks.values()
    }

    pub fn notebook(&self, notebook_id: &str) -> Option<&NotebookRecord> {
        self.notebooks.get(notebook_id)
    }

    pub fn notebook_count(&self) -> usize {
        self.notebooks.len()
    }
}

impl Default for LineageGraph {
    fn default() -> Self {
        Self::new()
    }
}
