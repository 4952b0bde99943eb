//! Content-addressed node identifiers

use crate::model::DataResource;
use std::path::{Component, Path};

/// Namespace for notebook-derived ids.
pub const BOOK_PREFIX: &str = "book";

/// Namespace for data-resource ids.
pub const DATA_PREFIX: &str = "data";

/// Encode `content` as base58 and prepend `prefix_`.
///
/// Base58 output is alphanumeric, so the id is always a valid bare DOT
/// identifier as long as `prefix` is.
pub fn generate(prefix: &str, content: &str) -> String {
    format!("{}_{}", prefix, bs58::encode(content.as_bytes()).into_string())
}

/// Id of a notebook, derived from its path relative to the scan root.
pub fn notebook_id(relative_path: &Path) -> String {
    generate(BOOK_PREFIX, &portable_path(relative_path))
}

/// Id of a data resource, derived from its canonical string.
pub fn data_id(resource: &DataResource) -> String {
    generate(DATA_PREFIX, &resource.canonical())
}

/// Id of a cell node. Includes the notebook id so equal snippet ids in
/// different notebooks stay distinct.
pub fn cell_id(snippet_id: &str, notebook_id: &str) -> String {
    format!("cell_{}_{}", snippet_id, notebook_id)
}

/// `/`-joined path components, independent of the host separator.
pub fn portable_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
