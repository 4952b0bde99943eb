//! Notebook discovery, snippet extraction and concurrent analysis

pub mod coordinator;
pub mod discovery;
pub mod notebook;


pub use coordinator::{Coordinator, NotebookError, NotebookFailure, NotebookOutcome, ScanConfig, ScanReport};
pub use discovery::{discover, ScanError, ScanRoot, NOTEBOOK_EXTENSION};
pub use notebook::{Cell, CellType, ExtractionError, Notebook};
