//! Integration tests for Notemap
//!
//! These drive discovery, analysis, merging and rendering together against
//! the fixture oracle, and run the built binary for exit-code behavior.

use notemap_ai::providers::fixture::FixtureProvider;
use notemap_ai::RetryPolicy;
use notemap_core::{cell_id, data_id, notebook_id, DataResource, NodeKind};
use notemap_indexer::{Coordinator, ScanConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

const FIXTURE: &str = r#"{
  "rw": [
    {"id": "load", "read": [{"kind": "table", "location": "warehouse", "name": "orders"}]},
    {"id": "save", "write": [{"kind": "file", "location": "/out", "name": "report.csv"}]},
    {"id": "stage", "read": [{"kind": "table", "location": "warehouse", "name": "orders"}],
                    "write": [{"kind": "view", "location": "warehouse", "name": "daily"}]}
  ]
}"#;

fn write_notebook(dir: &Path, relative: &str, cells: &[(&str, &str)]) -> PathBuf {
    let cells: Vec<_> = cells
        .iter()
        .map(|(id, source)| {
            json!({"cell_type": "code", "id": id, "metadata": {}, "source": source})
        })
        .collect();
    let content = json!({"cells": cells, "metadata": {}, "nbformat": 4, "nbformat_minor": 5});

    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content.to_string()).unwrap();
    path
}

fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("responses.json");
    std::fs::write(&path, FIXTURE).unwrap();
    path
}

fn coordinator() -> Coordinator {
    let oracle = FixtureProvider::from_json(FIXTURE).unwrap();
    let config = ScanConfig {
        workers: 2,
        retry: RetryPolicy::none(),
        ..ScanConfig::default()
    };
    Coordinator::new(Arc::new(oracle), config)
}

/// Two notebooks touching the same table share one data node
#[tokio::test]
async fn test_scan_directory_with_fixture_oracle() {
    let dir = TempDir::new().unwrap();
    write_notebook(dir.path(), "ingest.ipynb", &[("load", "df = spark.table('warehouse.orders')")]);
    write_notebook(
        dir.path(),
        "reports/daily.ipynb",
        &[("stage", "CREATE VIEW daily AS SELECT * FROM orders"), ("save", "df.to_csv('/out/report.csv')")],
    );

    let report = coordinator().build_graph(dir.path()).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(
        report.merged,
        vec![PathBuf::from("ingest.ipynb"), PathBuf::from("reports/daily.ipynb")]
    );

    let graph = &report.graph;
    assert_eq!(graph.nodes_of_kind(NodeKind::Data).count(), 3);
    assert_eq!(graph.nodes_of_kind(NodeKind::Cell).count(), 3);
    assert_eq!(graph.edge_count(), 4);

    let orders = data_id(&DataResource::table("warehouse", "orders"));
    let load = cell_id("load", &notebook_id(Path::new("ingest.ipynb")));
    let stage = cell_id("stage", &notebook_id(Path::new("reports/daily.ipynb")));
    assert!(graph.has_edge(&orders, &load));
    assert!(graph.has_edge(&orders, &stage));
}

#[tokio::test]
async fn test_rendering_is_stable_across_runs() {
    let dir = TempDir::new().unwrap();
    for i in 0..6 {
        write_notebook(
            dir.path(),
            &format!("nb{}.ipynb", i),
            &[("load", "x"), ("stage", "y"), ("save", "z")],
        );
    }

    let first = coordinator().build_graph(dir.path()).await.unwrap();
    let second = coordinator().build_graph(dir.path()).await.unwrap();
    assert_eq!(
        notemap_core::render(&first.graph).unwrap(),
        notemap_core::render(&second.graph).unwrap()
    );
}

#[test]
fn test_cli_renders_graph_to_stdout() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(dir.path());
    write_notebook(
        dir.path(),
        "etl.ipynb",
        &[("load", "df = read('orders')"), ("save", "df.to_csv('/out/report.csv')")],
    );

    let output = Command::new(env!("CARGO_BIN_EXE_notemap"))
        .arg(dir.path().join("etl.ipynb"))
        .args(["--provider", "fixture", "--fixture"])
        .arg(&fixture)
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute notemap");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("digraph lineage {"));
    assert!(stdout.contains("label=\"etl.ipynb\""));
    assert!(stdout.contains("label=\"table:warehouse:orders\""));
    assert!(stdout.contains("label=\"file:/out:report.csv\""));

    let book = notebook_id(Path::new("etl.ipynb"));
    let orders = data_id(&DataResource::table("warehouse", "orders"));
    assert!(stdout.contains(&format!("  {} -> {};", orders, cell_id("load", &book))));
}

#[test]
fn test_cli_writes_output_file_and_reports_failures() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(dir.path());
    let notebooks = dir.path().join("notebooks");
    write_notebook(&notebooks, "good.ipynb", &[("load", "x")]);
    std::fs::write(notebooks.join("broken.ipynb"), "{ not json").unwrap();
    let out = dir.path().join("lineage.dot");

    let output = Command::new(env!("CARGO_BIN_EXE_notemap"))
        .arg(&notebooks)
        .args(["--provider", "fixture", "--fixture"])
        .arg(&fixture)
        .arg("--output")
        .arg(&out)
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute notemap");

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.ipynb"));

    let dot = std::fs::read_to_string(&out).unwrap();
    assert!(dot.contains("label=\"good.ipynb\""));
    assert!(!dot.contains("broken.ipynb"));
}

#[test]
fn test_cli_rejects_invalid_path() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_notemap"))
        .arg(dir.path().join("missing"))
        .args(["--provider", "fixture", "--fixture"])
        .arg(write_fixture(dir.path()))
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute notemap");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_rejects_unknown_provider() {
    let dir = TempDir::new().unwrap();
    write_notebook(dir.path(), "a.ipynb", &[("load", "x")]);

    let output = Command::new(env!("CARGO_BIN_EXE_notemap"))
        .arg(dir.path())
        .args(["--provider", "carrier-pigeon"])
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute notemap");

    assert!(!output.status.success());
}

#[test]
fn test_cli_rejects_invalid_config_values() {
    let dir = TempDir::new().unwrap();
    write_notebook(dir.path(), "a.ipynb", &[("load", "x")]);
    let fixture = write_fixture(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_notemap"))
        .arg(dir.path())
        .args(["--provider", "fixture", "--fixture"])
        .arg(&fixture)
        .args(["--workers", "18446744073709551615"])
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute notemap");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scan.workers"), "stderr: {}", stderr);
    assert!(!stderr.contains("panicked"));
}
