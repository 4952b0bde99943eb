//! Notebook parsing and snippet extraction

use notemap_ai::Snippet;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Kind assumed for code cells that carry no language tag.
pub const DEFAULT_CODE_KIND: &str = "python";

/// Prefix of a cell directive line, e.g. `%%sql`.
const DIRECTIVE_PREFIX: &str = "%%";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("cannot read notebook {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed notebook {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("notebook {path} has more than one cell with id {id}")]
    DuplicateCellId { path: PathBuf, id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

/// One notebook cell, with fragments already joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub cell_type: CellType,
    pub id: String,
    pub source: String,
    /// Language tag from editor metadata, if any.
    pub language: Option<String>,
}

impl Cell {
    fn directive(&self) -> Option<&str> {
        let rest = self.source.strip_prefix(DIRECTIVE_PREFIX)?;
        Some(rest.lines().next().unwrap_or(""))
    }

    /// Fence tag for the snippet: the directive name, else the language
    /// tag, else the default.
    pub fn kind(&self) -> String {
        match self.cell_type {
            CellType::Markdown => "md".to_string(),
            CellType::Raw => "raw".to_string(),
            CellType::Code => {
                if let Some(name) = self.directive().and_then(|d| d.split_whitespace().next()) {
                    return name.to_string();
                }
                self.language
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CODE_KIND.to_string())
            }
        }
    }

    /// Source with a leading directive line removed.
    pub fn body(&self) -> &str {
        if !self.source.starts_with(DIRECTIVE_PREFIX) {
            return &self.source;
        }
        match self.source.find('\n') {
            Some(newline) => &self.source[newline + 1..],
            None => "",
        }
    }

    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    pub fn to_snippet(&self) -> Snippet {
        Snippet {
            id: self.id.clone(),
            kind: self.kind(),
            source: self.body().to_string(),
        }
    }
}

/// A parsed notebook: its path and cells in document order.
#[derive(Debug, Clone)]
pub struct Notebook {
    pub path: PathBuf,
    pub cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct RawNotebook {
    cells: Vec<RawCell>,
}

#[derive(Deserialize)]
struct RawCell {
    cell_type: String,
    id: String,
    source: RawSource,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSource {
    Text(String),
    Fragments(Vec<String>),
}

#[derive(Deserialize, Default)]
struct RawMetadata {
    #[serde(default)]
    vscode: Option<RawVscode>,
}

#[derive(Deserialize)]
struct RawVscode {
    #[serde(rename = "languageId", default)]
    language_id: Option<String>,
}

impl Notebook {
    /// Read and parse a notebook file.
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let content = std::fs::read_to_string(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse notebook JSON. `path` is only used for error reporting.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ExtractionError> {
        let raw: RawNotebook =
            serde_json::from_str(content).map_err(|source| ExtractionError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let mut seen = HashSet::new();
        let mut cells = Vec::with_capacity(raw.cells.len());
        for raw_cell in raw.cells {
            if !seen.insert(raw_cell.id.clone()) {
                return Err(ExtractionError::DuplicateCellId {
                    path: path.to_path_buf(),
                    id: raw_cell.id,
                });
            }
            let cell_type = match raw_cell.cell_type.as_str() {
                "code" => CellType::Code,
                "markdown" => CellType::Markdown,
                _ => CellType::Raw,
            };
            let source = match raw_cell.source {
                RawSource::Text(text) => text,
                RawSource::Fragments(parts) => parts.concat(),
            };
            cells.push(Cell {
                cell_type,
                id: raw_cell.id,
                source,
                language: raw_cell.metadata.vscode.and_then(|v| v.language_id),
            });
        }

        Ok(Notebook {
            path: path.to_path_buf(),
            cells,
        })
    }

    /// Code cells in document order.
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }

    /// Snippets for every code cell, in document order.
    pub fn snippets(&self) -> Vec<Snippet> {
        self.code_cells().map(Cell::to_snippet).collect()
    }
}
