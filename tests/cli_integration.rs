// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the lcdi CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const GRAPH: &str = r#"{
    "vertices": [
        {"v_id": 1, "name": "Supplier", "type": "SUPPLIER_SITE", "latitude": 45.46, "longitude": 9.19,
         "orders_by_carrier": {"c1": 4}, "total_orders": 4},
        {"v_id": 2, "name": "North hub", "type": "INTERMEDIATE", "latitude": 45.70, "longitude": 9.67,
         "avg_dwell_hours": 2.0, "orders_by_carrier": {"c1": 3}, "total_orders": 3},
        {"v_id": 3, "name": "South hub", "type": "INTERMEDIATE", "latitude": 45.13, "longitude": 10.02,
         "avg_dwell_hours": 4.0, "orders_by_carrier": {"c1": 1}, "total_orders": 1},
        {"v_id": 4, "name": "Plant", "type": "MANUFACTURER", "latitude": 48.14, "longitude": 11.58,
         "orders_by_carrier": {"c1": 4}, "total_orders": 4}
    ],
    "edges": [
        {"source": 1, "destination": 2, "distance_km": 45.0, "avg_transit_hours": 1.0,
         "orders_by_carrier": {"c1": 3}, "total_orders": 3},
        {"source": 1, "destination": 3, "distance_km": 75.0, "avg_transit_hours": 1.5,
         "orders_by_carrier": {"c1": 1}, "total_orders": 1},
        {"source": 2, "destination": 4, "distance_km": 350.0, "avg_transit_hours": 6.0,
         "orders_by_carrier": {"c1": 3}, "total_orders": 3},
        {"source": 3, "destination": 4, "distance_km": 380.0, "avg_transit_hours": 7.0,
         "orders_by_carrier": {"c1": 1}, "total_orders": 1}
    ]
}"#;

/// Temporary workspace holding a graph file and a cache directory
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("graph.json"), GRAPH).unwrap();
        fs::write(
            dir.path().join("lane.json"),
            r#"{"kind": "gamma", "shape": 4.0, "scale": 6.0}"#,
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// lcdi bound to this workspace's graph and cache directory
    fn lcdi(&self) -> Command {
        let mut cmd = Command::cargo_bin("lcdi").unwrap();
        cmd.env_remove("LCDI_CONFIG")
            .env_remove("RUST_LOG")
            .env("LCDI_GRAPH", self.path("graph.json"))
            .env("LCDI_CACHE_DIR", self.path("cache"))
            .env("NO_COLOR", "1");
        cmd
    }
}

fn estimate_args() -> Vec<&'static str> {
    vec![
        "estimate",
        "Supplier",
        "-C",
        "c1",
        "--order",
        "2025-04-01T00:00:00Z",
        "--shipment",
        "2025-04-01T06:00:00Z",
        "--event",
        "2025-04-01T06:00:00Z",
        "--at",
        "2025-04-01T08:00:00Z",
    ]
}

#[test]
fn test_paths_lists_weighted_routes() {
    let ws = Workspace::new();

    ws.lcdi()
        .args(["paths", "Supplier", "-C", "c1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 -> 2 -> 4"))
        .stdout(predicate::str::contains("1 -> 3 -> 4"))
        .stdout(predicate::str::contains("0.7500"));
}

#[test]
fn test_paths_json_and_cache_files() {
    let ws = Workspace::new();

    let output = ws
        .lcdi()
        .args(["--json", "paths", "1", "-C", "c1", "ghost"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["valid_carriers"], serde_json::json!(["c1"]));
    assert_eq!(result["paths"].as_array().unwrap().len(), 2);

    assert!(ws.path("cache").join("path_cache.json").exists());
    assert!(ws.path("cache").join("prob_cache.json").exists());
}

#[test]
fn test_no_cache_writes_nothing() {
    let ws = Workspace::new();

    ws.lcdi()
        .args(["--no-cache", "paths", "Supplier", "-C", "c1"])
        .assert()
        .success();

    assert!(!ws.path("cache").exists());
}

#[test]
fn test_unknown_vertex_fails() {
    let ws = Workspace::new();

    ws.lcdi()
        .args(["paths", "Nowhere", "-C", "c1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vertex not found"));
}

#[test]
fn test_missing_graph_fails() {
    let mut cmd = Command::cargo_bin("lcdi").unwrap();
    cmd.env_remove("LCDI_GRAPH")
        .args(["paths", "Supplier", "-C", "c1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--graph"));
}

#[test]
fn test_estimate_blends_both_branches() {
    let ws = Workspace::new();
    let lane = ws.path("lane.json");

    let output = ws
        .lcdi()
        .arg("--json")
        .args(estimate_args())
        .args(["--alpha", "0.5", "-d"])
        .arg(&lane)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["blend"]["computed"], "BOTH");
    assert_eq!(outcome["path_time"]["n_paths"], 2);

    let lower = outcome["blend"]["lower"].as_f64().unwrap();
    let upper = outcome["blend"]["upper"].as_f64().unwrap();
    assert!(lower > 0.0 && lower <= upper);
}

#[test]
fn test_estimate_uses_configured_alpha() {
    let ws = Workspace::new();
    let lane = ws.path("lane.json");

    ws.lcdi()
        .args(estimate_args())
        .arg("-d")
        .arg(&lane)
        .assert()
        .success()
        .stdout(predicate::str::contains("Remaining time"))
        .stdout(predicate::str::contains("path time"));
}

#[test]
fn test_estimate_rejects_unknown_distribution() {
    let ws = Workspace::new();
    let lane = ws.path("weibull.json");
    fs::write(&lane, r#"{"kind": "weibull", "k": 1.5}"#).unwrap();

    ws.lcdi()
        .args(estimate_args())
        .args(["--alpha", "0.5", "-d"])
        .arg(&lane)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported variant"));
}

#[test]
fn test_estimate_rejects_bad_time_sequence() {
    let ws = Workspace::new();
    let lane = ws.path("lane.json");

    ws.lcdi()
        .args([
            "estimate",
            "Supplier",
            "-C",
            "c1",
            "--order",
            "2025-04-02T00:00:00Z",
            "--shipment",
            "2025-04-02T06:00:00Z",
            "--event",
            "2025-04-01T06:00:00Z",
            "--at",
            "2025-04-02T08:00:00Z",
            "-d",
        ])
        .arg(&lane)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid time sequence"));
}

#[test]
fn test_check_clean_graph() {
    let ws = Workspace::new();

    ws.lcdi()
        .args(["check", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ok] acyclic"))
        .stdout(predicate::str::contains("[ok] flow conservation"));
}

#[test]
fn test_no_color_env_accepts_conventional_values() {
    let ws = Workspace::new();

    for value in ["1", "yes", "true"] {
        ws.lcdi()
            .env("NO_COLOR", value)
            .arg("check")
            .assert()
            .success()
            .stdout(predicate::str::contains("[ok] acyclic"))
            .stdout(predicate::str::contains("\u{1b}[").not());
    }

    ws.lcdi()
        .env("NO_COLOR", "0")
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}["));
}

#[test]
fn test_check_strict_fails_on_findings() {
    let ws = Workspace::new();
    let mut broken: serde_json::Value = serde_json::from_str(GRAPH).unwrap();
    broken["edges"][1]["orders_by_carrier"]["c1"] = serde_json::json!(2);
    fs::write(ws.path("graph.json"), broken.to_string()).unwrap();

    ws.lcdi()
        .args(["check", "--strict"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[FAIL] flow conservation"));
}

#[test]
fn test_export_dot_to_file() {
    let ws = Workspace::new();
    let out = ws.path("graph.dot");

    ws.lcdi()
        .args(["export", "--format", "dot", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported to"));

    let dot = fs::read_to_string(&out).unwrap();
    assert!(dot.starts_with("digraph supply_chain {"));
    assert!(dot.contains("\"1\" -> \"2\""));
}

#[test]
fn test_export_rejects_unknown_format() {
    let ws = Workspace::new();

    ws.lcdi()
        .args(["export", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown export format"));
}

#[test]
fn test_config_prints_values() {
    let ws = Workspace::new();

    ws.lcdi()
        .args(["config", "blend.tolerance"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0.01\n"));

    ws.lcdi()
        .env("LCDI__PATH_TIME__MAX_PATHS", "3")
        .args(["config", "path_time.max_paths"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    ws.lcdi()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[path_time]"));
}

#[test]
fn test_completions() {
    Command::cargo_bin("lcdi")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lcdi"));
}
