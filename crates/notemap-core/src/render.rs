//! Graphviz DOT rendering of the lineage graph

use crate::graph::LineageGraph;
use crate::model::{Edge, NodeKind, NotebookRecord};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A notebook record lists a cell that was never registered as a node.
    #[error("notebook {notebook} references unknown cell node {cell}")]
    MissingCell { notebook: String, cell: String },

    #[error("failed to format graph: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Render the graph as a DOT digraph.
///
/// Data nodes, notebook clusters and edges are each emitted in sorted order so
/// the same graph always renders to the same text. Within a cluster the cells
/// follow extraction order.
pub fn render(graph: &LineageGraph) -> Result<String, RenderError> {
    let mut out = String::new();
    writeln!(out, "digraph lineage {{")?;
    writeln!(out, "  rankdir=LR;")?;
    writeln!(out, "  node [shape=box fontname=\"Helvetica\" fontsize=10];")?;

    let mut data: Vec<_> = graph.nodes_of_kind(NodeKind::Data).collect();
    data.sort_by(|a, b| a.id.cmp(&b.id));
    if !data.is_empty() {
        out.push('\n');
    }
    for node in data {
        writeln!(
            out,
            "  {} [shape=square label=\"{}\"];",
            dot_id(&node.id),
            escape_dot(&node.label)
        )?;
    }

    let mut notebooks: Vec<_> = graph.notebooks().collect();
    notebooks.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id)));
    for record in notebooks {
        out.push('\n');
        render_cluster(graph, record, &mut out)?;
    }

    let mut edges: Vec<Edge> = graph.all_edges().map(|(edge, _)| edge).collect();
    edges.sort();
    if !edges.is_empty() {
        out.push('\n');
    }
    for edge in edges {
        writeln!(out, "  {} -> {};", dot_id(&edge.source), dot_id(&edge.target))?;
    }

    writeln!(out, "}}")?;
    Ok(out)
}

fn render_cluster(
    graph: &LineageGraph,
    record: &NotebookRecord,
    out: &mut String,
) -> Result<(), RenderError> {
    let label = crate::id::portable_path(&record.path);
    writeln!(out, "  subgraph {} {{", dot_id(&format!("cluster_{}", record.id)))?;
    writeln!(out, "    label=\"{}\";", escape_dot(&label))?;
    writeln!(out, "    style=dashed;")?;

    for cell in &record.cells {
        let node = graph.node(cell).ok_or_else(|| RenderError::MissingCell {
            notebook: record.id.clone(),
            cell: cell.clone(),
        })?;
        writeln!(
            out,
            "    {} [label=\"{}\"];",
            dot_id(&node.id),
            escape_dot(&node.label)
        )?;
    }

    // Extraction order only; not a data dependency.
    if record.cells.len() > 1 {
        let chain = record
            .cells
            .iter()
            .map(|c| dot_id(c))
            .collect::<Vec<_>>()
            .join(" -> ");
        writeln!(out, "    {} [style=dotted arrowhead=none];", chain)?;
    }

    writeln!(out, "  }}")?;
    Ok(())
}

/// Bare identifiers pass through; anything else is quoted.
fn dot_id(id: &str) -> String {
    let mut chars = id.chars();
    let bare = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if bare {
        id.to_string()
    } else {
        format!("\"{}\"", escape_dot(id))
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
