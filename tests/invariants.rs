// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for path extraction and probability weighting
//!
//! These tests verify critical invariants:
//! 1. Zero-volume carriers yield no paths
//! 2. Flow conservation on consistently built graphs
//! 3. Single-carrier probabilities sum to one
//! 4. Determinism with a warm cache
//! 5. Cycles are skipped, never followed

use lcdi_engine::cache::{CacheStore, PathCache};
use lcdi_engine::extraction::PathExtractionEngine;
use lcdi_engine::graph::SupplyChainGraph;
use lcdi_engine::session::SupplyChainSession;
use lcdi_engine::types::{Edge, GraphStore, ProbPath, Vertex, VertexRef, VertexType};
use proptest::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn orders(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs.iter().map(|(c, n)| ((*c).to_string(), *n)).collect()
}

fn make_vertex(id: u64, name: &str, vertex_type: VertexType, o: &[(&str, u64)]) -> Vertex {
    let orders_by_carrier = orders(o);
    Vertex {
        id,
        name: name.into(),
        vertex_type,
        latitude: 45.0,
        longitude: 9.0 + id as f64 * 0.1,
        avg_dwell_hours: 2.0,
        total_orders: orders_by_carrier.values().sum(),
        orders_by_carrier,
    }
}

fn make_edge(source: u64, destination: u64, o: &[(&str, u64)]) -> Edge {
    let orders_by_carrier = orders(o);
    Edge {
        source,
        destination,
        distance_km: 10.0,
        avg_transit_hours: 1.0,
        avg_traffic: 0.0,
        avg_weather: 0.0,
        total_orders: orders_by_carrier.values().sum(),
        orders_by_carrier,
    }
}

fn carriers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

/// A -> {B, C} -> D -> F; c2 only ever travels via B
fn scenario() -> SupplyChainGraph {
    SupplyChainGraph::from_store(GraphStore {
        vertices: vec![
            make_vertex(1, "A", VertexType::SupplierSite, &[("c1", 12), ("c2", 3)]),
            make_vertex(2, "B", VertexType::Intermediate, &[("c1", 7), ("c2", 3)]),
            make_vertex(3, "C", VertexType::Intermediate, &[("c1", 5)]),
            make_vertex(4, "D", VertexType::Intermediate, &[("c1", 12), ("c2", 3)]),
            make_vertex(5, "F", VertexType::Manufacturer, &[("c1", 12), ("c2", 3)]),
        ],
        edges: vec![
            make_edge(1, 2, &[("c1", 7), ("c2", 3)]),
            make_edge(1, 3, &[("c1", 5), ("c2", 0)]),
            make_edge(2, 4, &[("c1", 7), ("c2", 3)]),
            make_edge(3, 4, &[("c1", 5)]),
            make_edge(4, 5, &[("c1", 12), ("c2", 3)]),
        ],
    })
    .unwrap()
}

fn find<'a>(paths: &'a [ProbPath], carrier: &str, path: &[u64]) -> Option<&'a ProbPath> {
    paths.iter().find(|p| p.carrier == carrier && p.path == path)
}

// =============================================================================
// Invariant 1: Zero-volume carriers
// =============================================================================

#[test]
fn test_zero_volume_carriers_yield_empty_paths() {
    let session = SupplyChainSession::new(scenario());

    // C has no c2 volume at all
    let result = session
        .extract_paths(&VertexRef::from("C"), &carriers(&["c2", "dhl"]), false)
        .unwrap();

    assert!(result.paths.is_empty());
    assert!(result.valid_carriers.is_empty());
    assert_eq!(result.requested_carriers, carriers(&["c2", "dhl"]));
}

#[test]
fn test_include_zero_keeps_dead_routes() {
    let session = SupplyChainSession::new(scenario());

    let result = session
        .extract_paths(&VertexRef::from("A"), &carriers(&["c2"]), true)
        .unwrap();

    // Both structural paths, the one via C with probability zero
    assert_eq!(result.n_paths(), 2);
    assert_eq!(find(&result.paths, "c2", &[1, 3, 4, 5]).unwrap().probability, 0.0);
}

// =============================================================================
// Invariant 2: Flow conservation
// =============================================================================

#[test]
fn test_flow_conservation_on_scenario_graph() {
    let graph = scenario();

    assert!(graph.flow_violations().is_empty());
    assert!(graph.integrity_report().is_clean());
}

#[test]
fn test_flow_violation_is_reported() {
    let mut store = GraphStore {
        vertices: scenario().vertices().to_vec(),
        edges: scenario().edges().to_vec(),
    };
    store.edges[0].orders_by_carrier.insert("c1".into(), 6);
    let graph = SupplyChainGraph::from_store(store).unwrap();

    let violations = graph.flow_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].vertex, 1);
    assert_eq!(violations[0].carrier, "c1");
    assert_eq!(violations[0].at_vertex, 12);
    assert_eq!(violations[0].on_out_edges, 11);
}

// =============================================================================
// Invariant 3: Probabilities
// =============================================================================

#[test]
fn test_single_carrier_probabilities_sum_to_one() {
    let session = SupplyChainSession::new(scenario());

    let result = session
        .extract_paths(&VertexRef::from("A"), &carriers(&["c1"]), false)
        .unwrap();

    assert_eq!(result.n_paths(), 2);
    assert!((result.total_probability() - 1.0).abs() < 1e-9);
}

#[test]
fn test_concrete_scenario() {
    let session = SupplyChainSession::new(scenario());

    let result = session
        .extract_paths(&VertexRef::from("A"), &carriers(&["c1", "c2"]), false)
        .unwrap();

    assert_eq!(result.source, 1);
    assert_eq!(result.destination, 5);
    assert_eq!(result.valid_carriers, carriers(&["c1", "c2"]));

    let via_b = find(&result.paths, "c1", &[1, 2, 4, 5]).unwrap();
    let via_c = find(&result.paths, "c1", &[1, 3, 4, 5]).unwrap();
    assert!((via_b.probability - 7.0 / 12.0 * 12.0 / 15.0).abs() < 1e-9);
    assert!((via_c.probability - 5.0 / 12.0 * 12.0 / 15.0).abs() < 1e-9);

    let c2: Vec<_> = result.paths.iter().filter(|p| p.carrier == "c2").collect();
    assert_eq!(c2.len(), 1);
    assert_eq!(c2[0].path, vec![1, 2, 4, 5]);
    assert!((c2[0].probability - 3.0 / 15.0).abs() < 1e-9);

    assert!((result.total_probability() - 1.0).abs() < 1e-9);
}

#[test]
fn test_source_is_sink() {
    let session = SupplyChainSession::new(scenario());

    let result = session
        .extract_paths(&VertexRef::from(5u64), &carriers(&["c1"]), false)
        .unwrap();

    assert_eq!(result.n_paths(), 1);
    assert_eq!(result.paths[0].path, vec![5]);
    assert!((result.paths[0].probability - 1.0).abs() < 1e-12);
}

#[test]
fn test_unknown_vertex_fails_fast() {
    let session = SupplyChainSession::new(scenario());

    let err = session
        .extract_paths(&VertexRef::from("Z"), &carriers(&["c1"]), false)
        .unwrap_err();
    assert!(err.to_string().contains('Z'));
}

// =============================================================================
// Invariant 4: Determinism
// =============================================================================

#[test]
fn test_second_call_is_identical_and_does_no_new_work() {
    let session = SupplyChainSession::new(scenario());
    let vertex = VertexRef::from("A");
    let request = carriers(&["c1", "c2"]);

    let first = session.extract_paths(&vertex, &request, false).unwrap();
    let stats = session.cache_stats().unwrap();
    let second = session.extract_paths(&vertex, &request, false).unwrap();

    assert_eq!(first, second);
    assert_eq!(session.cache_stats().unwrap(), stats);
}

#[test]
fn test_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let vertex = VertexRef::from("A");
    let request = carriers(&["c1", "c2"]);

    let session = SupplyChainSession::with_store(scenario(), CacheStore::new(dir.path()));
    let first = session.extract_paths(&vertex, &request, false).unwrap();
    let stats = session.cache_stats().unwrap();
    session.finish(false);

    let restored = SupplyChainSession::with_store(scenario(), CacheStore::new(dir.path()));
    assert_eq!(restored.cache_stats().unwrap(), stats);

    let second = restored.extract_paths(&vertex, &request, false).unwrap();
    assert_eq!(restored.cache_stats().unwrap(), stats);
    assert_eq!(second.n_paths(), first.n_paths());
    for (a, b) in first.paths.iter().zip(&second.paths) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.carrier, b.carrier);
        assert!((a.probability - b.probability).abs() < 1e-12);
    }
}

#[test]
fn test_cache_of_other_graph_is_ignored() {
    let dir = TempDir::new().unwrap();

    let session = SupplyChainSession::with_store(scenario(), CacheStore::new(dir.path()));
    session
        .extract_paths(&VertexRef::from("A"), &carriers(&["c1"]), false)
        .unwrap();
    session.finish(false);

    let mut store = GraphStore {
        vertices: scenario().vertices().to_vec(),
        edges: scenario().edges().to_vec(),
    };
    store.vertices[0].avg_dwell_hours = 9.0;
    let changed = SupplyChainGraph::from_store(store).unwrap();

    let restored = SupplyChainSession::with_store(changed, CacheStore::new(dir.path()));
    let stats = restored.cache_stats().unwrap();
    assert_eq!(stats.path_entries, 0);
    assert_eq!(stats.probability_entries, 0);
}

// =============================================================================
// Invariant 5: Cycles
// =============================================================================

/// 1 -> 2 -> 3 -> 4 and 2 -> 4, with a back-edge 3 -> 2
fn cyclic() -> SupplyChainGraph {
    SupplyChainGraph::from_store(GraphStore {
        vertices: vec![
            make_vertex(1, "S", VertexType::SupplierSite, &[("c1", 2)]),
            make_vertex(2, "H1", VertexType::Intermediate, &[("c1", 2)]),
            make_vertex(3, "H2", VertexType::Intermediate, &[("c1", 1)]),
            make_vertex(4, "M", VertexType::Manufacturer, &[("c1", 2)]),
        ],
        edges: vec![
            make_edge(1, 2, &[("c1", 2)]),
            make_edge(2, 3, &[("c1", 1)]),
            make_edge(3, 2, &[]),
            make_edge(3, 4, &[("c1", 1)]),
            make_edge(2, 4, &[("c1", 1)]),
        ],
    })
    .unwrap()
}

#[test]
fn test_cycle_is_skipped() {
    let graph = cyclic();
    let mut cache = PathCache::new();
    let source = graph.index_of(1).unwrap();

    let paths = PathExtractionEngine::new(&graph, &mut cache).extract_paths(source, None);
    let mut ids: Vec<Vec<u64>> = paths.iter().map(|p| graph.ids_of(p)).collect();
    ids.sort();

    assert_eq!(ids, vec![vec![1, 2, 3, 4], vec![1, 2, 4]]);
}

#[test]
fn test_cycle_paths_are_weighted() {
    let session = SupplyChainSession::new(cyclic());

    let result = session
        .extract_paths(&VertexRef::from("S"), &carriers(&["c1"]), false)
        .unwrap();

    assert_eq!(result.n_paths(), 2);
    assert!((result.total_probability() - 1.0).abs() < 1e-9);
}

#[test]
fn test_cycle_is_reported_by_integrity_check() {
    let report = cyclic().integrity_report();

    assert_eq!(report.back_edges, vec![(3, 2)]);
    assert!(report.dead_ends.is_empty());
}

// =============================================================================
// Property tests
// =============================================================================

/// Random DAG on `n` vertices; edges only go from lower to higher ids, and
/// every vertex has an edge to the next one so the sink is always reachable
fn random_dag(n: u64, extra: &[(u64, u64)]) -> SupplyChainGraph {
    let mut vertices = vec![make_vertex(1, "v1", VertexType::SupplierSite, &[("c1", 1)])];
    for id in 2..n {
        vertices.push(make_vertex(id, &format!("v{id}"), VertexType::Intermediate, &[("c1", 1)]));
    }
    vertices.push(make_vertex(n, &format!("v{n}"), VertexType::Manufacturer, &[("c1", 1)]));

    let mut pairs: Vec<(u64, u64)> = (1..n).map(|id| (id, id + 1)).collect();
    for &(a, b) in extra {
        let (s, d) = (a.min(b), a.max(b));
        if s != d && !pairs.contains(&(s, d)) {
            pairs.push((s, d));
        }
    }
    let edges = pairs.into_iter().map(|(s, d)| make_edge(s, d, &[])).collect();

    SupplyChainGraph::from_store(GraphStore { vertices, edges }).unwrap()
}

/// Number of paths to the sink, counted backwards from it
fn count_paths(graph: &SupplyChainGraph, n: u64) -> u64 {
    let mut counts: BTreeMap<u64, u64> = BTreeMap::new();
    counts.insert(n, 1);
    for id in (1..n).rev() {
        let total = graph
            .edges()
            .iter()
            .filter(|e| e.source == id)
            .map(|e| counts[&e.destination])
            .sum();
        counts.insert(id, total);
    }
    counts[&1]
}

proptest! {
    #[test]
    fn prop_extracted_paths_are_simple_and_complete(
        n in 2u64..8,
        extra in prop::collection::vec((1u64..8, 1u64..8), 0..12),
    ) {
        let extra: Vec<(u64, u64)> = extra.into_iter().filter(|&(a, b)| a <= n && b <= n).collect();
        let graph = random_dag(n, &extra);
        let mut cache = PathCache::new();
        let source = graph.index_of(1).unwrap();

        let paths = PathExtractionEngine::new(&graph, &mut cache).extract_paths(source, None);
        prop_assert_eq!(paths.len() as u64, count_paths(&graph, n));

        for path in &paths {
            let ids = graph.ids_of(path);
            prop_assert_eq!(ids.first(), Some(&1));
            prop_assert_eq!(ids.last(), Some(&n));
            for pair in path.windows(2) {
                prop_assert!(graph.edge_between(pair[0], pair[1]).is_some());
            }
            let mut seen = ids.clone();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), ids.len());
        }

        let again = PathExtractionEngine::new(&graph, &mut cache).extract_paths(source, None);
        prop_assert_eq!(again, paths);
    }
}
