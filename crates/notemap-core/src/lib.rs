//! Notemap Core: lineage data model, content-addressed ids, graph merge and rendering

pub mod graph;
pub mod id;
pub mod model;
pub mod render;


pub use graph::LineageGraph;
pub use id::{cell_id, data_id, generate, notebook_id, BOOK_PREFIX, DATA_PREFIX};
pub use model::{CellFacts, DataKind, DataResource, Edge, EdgeKind, LineageNode, NodeKind, NotebookRecord};
pub use render::{render, RenderError};
