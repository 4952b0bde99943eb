//! Analysis oracle bridge: inferring read/write facts for code snippets

use notemap_core::{CellFacts, DataResource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// One executable cell, framed for the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Cell identifier, unique within its notebook.
    pub id: String,
    /// Language or directive kind used as the code fence tag.
    pub kind: String,
    /// Source with any leading directive line removed.
    pub source: String,
}

/// All snippets of one notebook, analysed in a single oracle call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Notebook the snippets came from (for logging).
    pub notebook: PathBuf,
    pub snippets: Vec<Snippet>,
}

/// Facts returned for a request.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    /// One entry per snippet the oracle reported on, in response order.
    pub facts: Vec<CellFacts>,
    /// Tokens used for this analysis, when the backend reports it.
    pub tokens_used: u32,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request to oracle failed: {0}")]
    Request(String),

    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle response does not match the expected schema: {0}")]
    SchemaViolation(String),

    #[error("oracle returned an empty response")]
    EmptyResponse,

    #[error("invalid oracle configuration: {0}")]
    Config(String),
}

impl OracleError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Request(_) | OracleError::Timeout(_) => true,
            OracleError::Status { status, .. } => *status == 429 || *status >= 500,
            OracleError::SchemaViolation(_)
            | OracleError::EmptyResponse
            | OracleError::Config(_) => false,
        }
    }
}

/// Oracle trait for different analysis backends
#[async_trait::async_trait]
pub trait AnalysisOracle: Send + Sync {
    /// Infer reads and writes for every snippet in the request.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, OracleError>;

    /// Get provider name
    fn name(&self) -> &str;
}

/// Wire format of an oracle answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RwResponse {
    pub rw: Vec<RwEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RwEntry {
    pub id: String,
    #[serde(default)]
    pub read: Vec<DataResource>,
    #[serde(default)]
    pub write: Vec<DataResource>,
}

impl From<RwEntry> for CellFacts {
    fn from(entry: RwEntry) -> Self {
        CellFacts {
            id: entry.id,
            read: entry.read.into_iter().collect::<BTreeSet<_>>(),
            write: entry.write.into_iter().collect::<BTreeSet<_>>(),
        }
    }
}

/// Validate and decode an oracle answer.
///
/// `rw` and each entry's `id` are required; `read`/`write` default to empty.
/// Resource kinds outside table/view/file are rejected. Entries repeating an
/// id are folded into one.
pub fn parse_response(content: &str) -> Result<Vec<CellFacts>, OracleError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    let response: RwResponse = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| OracleError::SchemaViolation(e.to_string()))?;

    let mut facts: Vec<CellFacts> = Vec::with_capacity(response.rw.len());
    for entry in response.rw {
        let entry = CellFacts::from(entry);
        match facts.iter_mut().find(|f| f.id == entry.id) {
            Some(existing) => {
                existing.read.extend(entry.read);
                existing.write.extend(entry.write);
            }
            None => facts.push(entry),
        }
    }
    Ok(facts)
}

/// Some backends wrap JSON mode output in a markdown fence anyway.
fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
