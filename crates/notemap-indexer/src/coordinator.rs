//! Orchestrates concurrent notebook analysis and the single merge loop

use crate::discovery::{build_excludes, discover, ScanError, ScanRoot, DEFAULT_EXCLUDE};
use crate::notebook::{ExtractionError, Notebook};
use notemap_ai::{analyze_with_retry, AnalysisOracle, AnalysisRequest, OracleError, RetryPolicy, Snippet};
use notemap_core::{CellFacts, LineageGraph};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum notebooks in flight at once.
    pub workers: usize,
    /// Per-attempt oracle timeout.
    pub oracle_timeout: Duration,
    pub retry: RetryPolicy,
    /// Glob patterns, relative to the scan root, skipped during discovery.
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            oracle_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            exclude: vec![DEFAULT_EXCLUDE.to_string()],
        }
    }
}

/// Why one notebook produced no facts. Never aborts the scan.
#[derive(Debug, Error)]
pub enum NotebookError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("notebook worker failed: {0}")]
    Worker(String),
}

/// Result of processing one notebook.
#[derive(Debug)]
pub struct NotebookOutcome {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    /// Per-cell facts in extraction order.
    pub result: Result<Vec<CellFacts>, NotebookError>,
}

#[derive(Debug)]
pub struct NotebookFailure {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub error: NotebookError,
}

/// Merged graph plus what could not be merged.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub graph: LineageGraph,
    /// Relative paths of merged notebooks, sorted.
    pub merged: Vec<PathBuf>,
    /// Sorted by relative path.
    pub failures: Vec<NotebookFailure>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Coordinator {
    oracle: Arc<dyn AnalysisOracle>,
    config: ScanConfig,
}

impl Coordinator {
    pub fn new(oracle: Arc<dyn AnalysisOracle>, config: ScanConfig) -> Self {
        Coordinator { oracle, config }
    }

    /// Discover notebooks under `root` and analyse them concurrently.
    ///
    /// The root is validated before any work starts. Each notebook yields
    /// exactly one outcome on the returned channel, in completion order; the
    /// channel closes once all of them have been sent.
    pub async fn scan(&self, root: &Path) -> Result<mpsc::Receiver<NotebookOutcome>, ScanError> {
        let root = ScanRoot::resolve(root)?;
        let excludes = build_excludes(&self.config.exclude)?;

        let walk_root = root.clone();
        let notebooks = tokio::task::spawn_blocking(move || discover(&walk_root, &excludes))
            .await
            .map_err(|e| ScanError::Discovery(e.to_string()))?;

        if notebooks.is_empty() {
            warn!("No notebooks found under {}", root.path.display());
        } else {
            info!(
                "Found {} notebooks under {}, analysing with {} workers",
                notebooks.len(),
                root.path.display(),
                self.workers()
            );
        }

        let (tx, rx) = mpsc::channel(self.workers().min(notebooks.len().max(1)));
        let semaphore = Arc::new(Semaphore::new(self.workers()));

        for path in notebooks {
            let relative_path = root.relative(&path);
            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);
            let oracle = Arc::clone(&self.oracle);
            let timeout = self.config.oracle_timeout;
            let retry = self.config.retry.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                debug!("Processing notebook: {}", relative_path.display());

                let worker = tokio::spawn(process_notebook(path.clone(), oracle, timeout, retry));
                let result = match worker.await {
                    Ok(result) => result,
                    Err(e) => Err(NotebookError::Worker(e.to_string())),
                };

                let outcome = NotebookOutcome {
                    path,
                    relative_path,
                    result,
                };
                if tx.send(outcome).await.is_err() {
                    warn!("Scan receiver dropped before all notebooks finished");
                }
            });
        }

        Ok(rx)
    }

    /// Scan `root` and merge every successful notebook into one graph.
    ///
    /// Merging happens here, on the caller's task only, one notebook at a time.
    pub async fn build_graph(&self, root: &Path) -> Result<ScanReport, ScanError> {
        let mut outcomes = self.scan(root).await?;
        let mut report = ScanReport::default();

        while let Some(outcome) = outcomes.recv().await {
            match outcome.result {
                Ok(facts) => {
                    report.graph.merge_notebook(&outcome.relative_path, &facts);
                    report.merged.push(outcome.relative_path);
                }
                Err(error) => {
                    error!("Skipping notebook {}: {}", outcome.path.display(), error);
                    report.failures.push(NotebookFailure {
                        path: outcome.path,
                        relative_path: outcome.relative_path,
                        error,
                    });
                }
            }
        }

        report.merged.sort();
        report
            .failures
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        info!(
            "Merged {} notebooks ({} failed): {} nodes, {} edges",
            report.merged.len(),
            report.failures.len(),
            report.graph.node_count(),
            report.graph.edge_count()
        );
        Ok(report)
    }

    fn workers(&self) -> usize {
        self.config.workers.clamp(1, Semaphore::MAX_PERMITS)
    }
}

/// Extract one notebook and ask the oracle about all of its code cells at once.
async fn process_notebook(
    path: PathBuf,
    oracle: Arc<dyn AnalysisOracle>,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Vec<CellFacts>, NotebookError> {
    let open_path = path.clone();
    let notebook = tokio::task::spawn_blocking(move || Notebook::open(&open_path))
        .await
        .map_err(|e| NotebookError::Worker(e.to_string()))??;

    let snippets = notebook.snippets();
    if snippets.is_empty() {
        debug!("No code cells in {}", path.display());
        return Ok(Vec::new());
    }

    let request = AnalysisRequest {
        notebook: path.clone(),
        snippets,
    };
    let result = analyze_with_retry(oracle.as_ref(), &request, timeout, &retry).await?;
    Ok(align_facts(&path, &request.snippets, result.facts))
}

/// One entry per snippet, in snippet order. Snippets the oracle skipped get
/// empty facts; ids the oracle invented are dropped.
pub fn align_facts(notebook: &Path, snippets: &[Snippet], facts: Vec<CellFacts>) -> Vec<CellFacts> {
    let mut by_id: HashMap<String, CellFacts> =
        facts.into_iter().map(|f| (f.id.clone(), f)).collect();

    let aligned = snippets
        .iter()
        .map(|s| by_id.remove(&s.id).unwrap_or_else(|| CellFacts::new(s.id.clone())))
        .collect();

    for unknown in by_id.keys() {
        warn!(
            "Oracle reported unknown snippet id {} for {}; ignoring",
            unknown,
            notebook.display()
        );
    }
    aligned
}
