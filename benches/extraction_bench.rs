// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Path extraction and weighting on layered networks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lcdi_engine::cache::{PathCache, ProbabilityCache};
use lcdi_engine::extraction::PathExtractionEngine;
use lcdi_engine::graph::SupplyChainGraph;
use lcdi_engine::probability::PathProbabilityEngine;
use lcdi_engine::types::{Edge, GraphStore, Vertex, VertexType};
use std::collections::BTreeMap;

/// Supplier, `depth` layers of `width` hubs with full links between layers, manufacturer
fn layered(width: u64, depth: u64) -> SupplyChainGraph {
    let orders = |n: u64| -> BTreeMap<String, u64> { [("c1".to_string(), n)].into_iter().collect() };
    let vertex = |id: u64, vertex_type: VertexType, n: u64| Vertex {
        id,
        name: format!("v{id}"),
        vertex_type,
        latitude: 0.0,
        longitude: 0.0,
        avg_dwell_hours: 1.0,
        orders_by_carrier: orders(n),
        total_orders: n,
    };
    let edge = |source: u64, destination: u64, n: u64| Edge {
        source,
        destination,
        distance_km: 10.0,
        avg_transit_hours: 1.0,
        avg_traffic: 0.0,
        avg_weather: 0.0,
        orders_by_carrier: orders(n),
        total_orders: n,
    };

    let sink = width * depth + 1;
    let hub = |layer: u64, i: u64| 1 + layer * width + i;
    let mut vertices = vec![vertex(0, VertexType::SupplierSite, width)];
    let mut edges = Vec::new();

    for layer in 0..depth {
        for i in 0..width {
            vertices.push(vertex(hub(layer, i), VertexType::Intermediate, width));
            if layer == 0 {
                edges.push(edge(0, hub(0, i), 1));
            }
            if layer + 1 < depth {
                for j in 0..width {
                    edges.push(edge(hub(layer, i), hub(layer + 1, j), 1));
                }
            } else {
                edges.push(edge(hub(layer, i), sink, width));
            }
        }
    }
    vertices.push(vertex(sink, VertexType::Manufacturer, width));

    SupplyChainGraph::from_store(GraphStore { vertices, edges }).expect("valid layered graph")
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_paths");

    for (width, depth) in [(3, 4), (4, 5), (6, 4)] {
        let graph = layered(width, depth);
        let source = graph.index_of(0).expect("supplier");
        let label = format!("{width}x{depth}");

        group.bench_with_input(BenchmarkId::new("cold", &label), &graph, |b, g| {
            b.iter(|| {
                let mut cache = PathCache::new();
                black_box(PathExtractionEngine::new(g, &mut cache).extract_paths(source, None))
            });
        });

        let mut warm = PathCache::new();
        PathExtractionEngine::new(&graph, &mut warm).extract_paths(source, None);
        group.bench_with_input(BenchmarkId::new("warm", &label), &graph, |b, g| {
            b.iter(|| black_box(PathExtractionEngine::new(g, &mut warm).extract_paths(source, None)));
        });
    }

    group.finish();
}

fn bench_probabilities(c: &mut Criterion) {
    let graph = layered(4, 5);
    let source = graph.index_of(0).expect("supplier");
    let mut paths_cache = PathCache::new();
    let paths = PathExtractionEngine::new(&graph, &mut paths_cache).extract_paths(source, None);
    let carriers = vec!["c1".to_string()];

    c.bench_function("compute_probabilities 4x5", |b| {
        b.iter(|| {
            let mut cache = ProbabilityCache::new();
            black_box(
                PathProbabilityEngine::new(&graph, &mut cache)
                    .compute_probabilities(source, &carriers, &paths, false),
            )
        });
    });
}

criterion_group!(benches, bench_extraction, bench_probabilities);
criterion_main!(benches);
