//! Fixture provider answering from recorded oracle responses

use super::super::bridge::{parse_response, AnalysisOracle, AnalysisRequest, AnalysisResult, OracleError};
use notemap_core::CellFacts;
use std::collections::HashMap;
use std::path::Path;

/// Offline oracle. Answers with the stored facts for every requested snippet
/// id it knows, and nothing for the rest.
pub struct FixtureProvider {
    facts: HashMap<String, CellFacts>,
}

impl FixtureProvider {
    pub fn new(facts: impl IntoIterator<Item = CellFacts>) -> Self {
        Self {
            facts: facts.into_iter().map(|f| (f.id.clone(), f)).collect(),
        }
    }

    /// Load from a document in the oracle response format.
    pub fn from_json(content: &str) -> Result<Self, OracleError> {
        Ok(Self::new(parse_response(content)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, OracleError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OracleError::Config(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[async_trait::async_trait]
impl AnalysisOracle for FixtureProvider {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, OracleError> {
        let facts = request
            .snippets
            .iter()
            .filter_map(|snippet| self.facts.get(&snippet.id).cloned())
            .collect();
        Ok(AnalysisResult {
            facts,
            tokens_used: 0,
        })
    }

    fn name(&self) -> &str {
        "Fixture"
    }
}
