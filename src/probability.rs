// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Carrier routing probabilities of extracted paths

use crate::cache::ProbabilityCache;
use crate::graph::SupplyChainGraph;
use crate::types::{ProbPath, ProbPaths};
use petgraph::graph::NodeIndex;
use tracing::debug;

/// Weights paths by the share of a carrier's orders that followed them
pub struct PathProbabilityEngine<'a> {
    graph: &'a SupplyChainGraph,
    cache: &'a mut ProbabilityCache,
}

impl<'a> PathProbabilityEngine<'a> {
    /// Engine borrowing the session graph and cache
    pub fn new(graph: &'a SupplyChainGraph, cache: &'a mut ProbabilityCache) -> Self {
        Self { graph, cache }
    }

    /// Requested carriers with orders at `source`, in request order, without repeats
    #[must_use]
    pub fn valid_carriers(&self, source: NodeIndex, carriers: &[String]) -> Vec<String> {
        let mut valid: Vec<String> = Vec::with_capacity(carriers.len());
        for carrier in carriers {
            if self.graph.orders_at_vertex(source, carrier) > 0 && !valid.contains(carrier) {
                valid.push(carrier.clone());
            }
        }
        valid
    }

    /// Probability of every (path, carrier) pair, scaled by carrier volume at `source`
    ///
    /// `paths` must all start at `source`. Zero-probability pairs are dropped
    /// unless `include_zero` is set.
    pub fn compute_probabilities(
        &mut self,
        source: NodeIndex,
        carriers: &[String],
        paths: &[Vec<NodeIndex>],
        include_zero: bool,
    ) -> ProbPaths {
        let source_id = self.graph.vertex(source).id;
        let sink_id = self.graph.vertex(self.graph.sink()).id;
        let valid = self.valid_carriers(source, carriers);

        let mut result = ProbPaths::empty(source_id, sink_id, carriers);
        if paths.is_empty() || valid.is_empty() {
            debug!(
                "No weighted paths from {}: {} paths, {} valid carriers",
                source_id,
                paths.len(),
                valid.len()
            );
            return result;
        }

        let volume: u64 = valid
            .iter()
            .map(|c| self.graph.orders_at_vertex(source, c))
            .sum();

        for carrier in &valid {
            let stale = self
                .cache
                .get(carrier, source.index())
                .map_or(true, |cached| cached.len() != paths.len());
            if stale {
                let probabilities = paths
                    .iter()
                    .map(|path| self.path_probability(path, carrier))
                    .collect();
                self.cache.insert(carrier, source.index(), probabilities);
            }

            // Each carrier's probabilities sum to at most one; scale by its share.
            #[allow(clippy::cast_precision_loss)]
            let share = self.graph.orders_at_vertex(source, carrier) as f64 / volume as f64;
            let Some(cached) = self.cache.get(carrier, source.index()) else {
                continue;
            };

            for (path, &p) in paths.iter().zip(cached) {
                let probability = p * share;
                if probability > 0.0 || include_zero {
                    result.paths.push(ProbPath {
                        path: self.graph.ids_of(path),
                        probability,
                        carrier: carrier.clone(),
                    });
                }
            }
        }

        result.valid_carriers = valid;
        result
    }

    /// Product of the carrier's edge-to-vertex order ratios along `path`
    #[must_use]
    pub fn path_probability(&self, path: &[NodeIndex], carrier: &str) -> f64 {
        let mut probability = 1.0;
        for pair in path.windows(2) {
            let (v, u) = (pair[0], pair[1]);
            let at_vertex = self.graph.orders_at_vertex(v, carrier);
            let on_edge = self.graph.orders_on_edge(v, u, carrier);
            if at_vertex == 0 || on_edge == 0 {
                return 0.0;
            }
            #[allow(clippy::cast_precision_loss)]
            let ratio = on_edge as f64 / at_vertex as f64;
            probability *= ratio;
        }
        probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::PathExtractionEngine;
    use crate::cache::PathCache;
    use crate::types::{Edge, GraphStore, Vertex, VertexType};
    use std::collections::BTreeMap;

    fn orders(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(c, n)| ((*c).to_string(), *n)).collect()
    }

    fn vertex(id: u64, vertex_type: VertexType, o: &[(&str, u64)]) -> Vertex {
        let orders_by_carrier = orders(o);
        Vertex {
            id,
            name: format!("v{id}"),
            vertex_type,
            latitude: 0.0,
            longitude: 0.0,
            avg_dwell_hours: 0.0,
            total_orders: orders_by_carrier.values().sum(),
            orders_by_carrier,
        }
    }

    fn edge(source: u64, destination: u64, o: &[(&str, u64)]) -> Edge {
        let orders_by_carrier = orders(o);
        Edge {
            source,
            destination,
            distance_km: 0.0,
            avg_transit_hours: 0.0,
            avg_traffic: 0.0,
            avg_weather: 0.0,
            total_orders: orders_by_carrier.values().sum(),
            orders_by_carrier,
        }
    }

    /// 1 -> {2, 3} -> 4 with two carriers
    fn diamond() -> SupplyChainGraph {
        SupplyChainGraph::from_store(GraphStore {
            vertices: vec![
                vertex(1, VertexType::SupplierSite, &[("a", 4), ("b", 1)]),
                vertex(2, VertexType::Intermediate, &[("a", 3), ("b", 1)]),
                vertex(3, VertexType::Intermediate, &[("a", 1)]),
                vertex(4, VertexType::Manufacturer, &[("a", 4), ("b", 1)]),
            ],
            edges: vec![
                edge(1, 2, &[("a", 3), ("b", 1)]),
                edge(1, 3, &[("a", 1)]),
                edge(2, 4, &[("a", 3), ("b", 1)]),
                edge(3, 4, &[("a", 1)]),
            ],
        })
        .unwrap()
    }

    fn carriers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn weighted(g: &SupplyChainGraph, names: &[&str], include_zero: bool) -> ProbPaths {
        let mut paths_cache = PathCache::new();
        let mut prob_cache = ProbabilityCache::new();
        let source = g.index_of(1).unwrap();
        let paths = PathExtractionEngine::new(g, &mut paths_cache).extract_paths(source, None);
        PathProbabilityEngine::new(g, &mut prob_cache).compute_probabilities(
            source,
            &carriers(names),
            &paths,
            include_zero,
        )
    }

    #[test]
    fn test_single_carrier_sums_to_one() {
        let g = diamond();
        let result = weighted(&g, &["a"], false);

        assert_eq!(result.n_paths(), 2);
        assert!((result.total_probability() - 1.0).abs() < 1e-9);
        assert!((result.paths[0].probability - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_carriers_scaled_by_volume() {
        let g = diamond();
        let result = weighted(&g, &["a", "b"], false);

        // a: 4/5 of volume, b: 1/5 with only the path via 2
        let b_paths: Vec<_> = result.paths.iter().filter(|p| p.carrier == "b").collect();
        assert_eq!(b_paths.len(), 1);
        assert!((b_paths[0].probability - 0.2).abs() < 1e-9);
        assert!((result.total_probability() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_include_zero_keeps_dead_routes() {
        let g = diamond();
        let result = weighted(&g, &["b"], true);

        assert_eq!(result.n_paths(), 2);
        assert_eq!(result.paths[1].probability, 0.0);
    }

    #[test]
    fn test_unknown_carrier_gives_empty_result() {
        let g = diamond();
        let result = weighted(&g, &["zzz"], false);

        assert!(result.paths.is_empty());
        assert!(result.valid_carriers.is_empty());
        assert_eq!(result.requested_carriers, vec!["zzz".to_string()]);
    }

    #[test]
    fn test_valid_carriers_keep_request_order() {
        let g = diamond();
        let mut cache = ProbabilityCache::new();
        let engine = PathProbabilityEngine::new(&g, &mut cache);
        let source = g.index_of(1).unwrap();

        let valid = engine.valid_carriers(source, &carriers(&["b", "x", "a", "b"]));
        assert_eq!(valid, carriers(&["b", "a"]));
    }
}
