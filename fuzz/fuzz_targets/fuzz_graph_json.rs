// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use lcdi_engine::cache::PathCache;
use lcdi_engine::extraction::PathExtractionEngine;
use lcdi_engine::graph::SupplyChainGraph;
use lcdi_engine::types::GraphStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(store) = serde_json::from_slice::<GraphStore>(data) else {
        return;
    };
    let Ok(graph) = SupplyChainGraph::from_store(store) else {
        return;
    };

    // Any accepted graph, cyclic or not, must extract without panicking
    let _ = graph.integrity_report();
    if graph.node_count() <= 12 {
        let mut cache = PathCache::new();
        let mut engine = PathExtractionEngine::new(&graph, &mut cache);
        for vertex in graph.vertices() {
            if let Some(idx) = graph.index_of(vertex.id) {
                let _ = engine.extract_paths(idx, None);
            }
        }
    }
});
