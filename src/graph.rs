// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Supply-chain graph model with petgraph backing for traversal

use crate::error::{EngineError, Result as EngineResult};
use crate::types::{Edge, GraphStore, Vertex, VertexId, VertexRef, VertexType};
use anyhow::{Context, Result};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};
use petgraph::Direction;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Immutable supply-chain graph for one estimation session
///
/// Node weights are ordinals into `store.vertices` and edge weights ordinals
/// into `store.edges`; node indices coincide with vertex ordinals.
#[derive(Debug)]
pub struct SupplyChainGraph {
    /// The underlying directed graph
    graph: DiGraph<usize, usize>,
    /// Map from vertex id to node index
    by_id: HashMap<VertexId, NodeIndex>,
    /// Map from vertex name to node index
    by_name: HashMap<String, NodeIndex>,
    /// The unique manufacturer vertex
    sink: NodeIndex,
    /// Content hash of the store
    fingerprint: String,
    /// The graph store (vertices and edges)
    store: GraphStore,
}

/// A vertex whose outgoing carrier orders do not add up
#[derive(Debug, Clone, PartialEq)]
pub struct FlowViolation {
    /// Vertex id
    pub vertex: VertexId,
    /// Carrier name
    pub carrier: String,
    /// Orders recorded at the vertex
    pub at_vertex: u64,
    /// Orders summed over outgoing edges
    pub on_out_edges: u64,
}

/// Data-integrity findings for a loaded graph
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    /// Back-edges found by a depth-first walk from every root
    pub back_edges: Vec<(VertexId, VertexId)>,
    /// Flow-conservation violations
    pub flow_violations: Vec<FlowViolation>,
    /// Vertices with no route to the sink
    pub dead_ends: Vec<VertexId>,
}

impl IntegrityReport {
    /// Whether nothing was found
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.back_edges.is_empty() && self.flow_violations.is_empty() && self.dead_ends.is_empty()
    }
}

impl SupplyChainGraph {
    /// Build a graph from a store, validating ids, endpoints and the sink
    pub fn from_store(store: GraphStore) -> EngineResult<Self> {
        let mut graph = DiGraph::with_capacity(store.vertices.len(), store.edges.len());
        let mut by_id = HashMap::with_capacity(store.vertices.len());
        let mut by_name = HashMap::with_capacity(store.vertices.len());

        for (ordinal, vertex) in store.vertices.iter().enumerate() {
            let idx = graph.add_node(ordinal);
            if by_id.insert(vertex.id, idx).is_some() {
                return Err(EngineError::InvalidIdentifier(format!(
                    "duplicate vertex id {}",
                    vertex.id
                )));
            }
            if by_name.insert(vertex.name.clone(), idx).is_some() {
                warn!("Duplicate vertex name '{}': lookups by name resolve to the last one", vertex.name);
            }
        }

        for (ordinal, edge) in store.edges.iter().enumerate() {
            let from = *by_id.get(&edge.source).ok_or_else(|| {
                EngineError::InvalidIdentifier(format!("edge source {} does not exist", edge.source))
            })?;
            let to = *by_id.get(&edge.destination).ok_or_else(|| {
                EngineError::InvalidIdentifier(format!(
                    "edge destination {} does not exist",
                    edge.destination
                ))
            })?;

            if graph.find_edge(from, to).is_some() {
                warn!("Duplicate edge {} -> {} ignored", edge.source, edge.destination);
                continue;
            }
            graph.add_edge(from, to, ordinal);
        }

        let mut sinks = store
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.vertex_type == VertexType::Manufacturer);
        let sink = match (sinks.next(), sinks.next()) {
            (Some((ordinal, _)), None) => NodeIndex::new(ordinal),
            (None, _) => return Err(EngineError::InvalidGraph("no MANUFACTURER vertex".into())),
            (Some(_), Some(_)) => {
                return Err(EngineError::InvalidGraph("more than one MANUFACTURER vertex".into()))
            }
        };

        let fingerprint = Self::compute_fingerprint(&store)?;
        debug!(
            "Built supply-chain graph: {} vertices, {} edges, fingerprint {}",
            graph.node_count(),
            graph.edge_count(),
            fingerprint
        );

        Ok(Self {
            graph,
            by_id,
            by_name,
            sink,
            fingerprint,
            store,
        })
    }

    /// Load a graph from a JSON graph file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let store: GraphStore = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Self::from_store(store).with_context(|| format!("Invalid graph in {}", path.display()))
    }

    /// Save the graph store to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn compute_fingerprint(store: &GraphStore) -> EngineResult<String> {
        let bytes = serde_json::to_vec(store)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let hash = hex::encode(hasher.finalize());
        Ok(hash[..16].to_string())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Resolve a vertex reference to its node index
    pub fn resolve(&self, vertex: &VertexRef) -> EngineResult<NodeIndex> {
        let found = match vertex {
            VertexRef::Id(id) => self.by_id.get(id),
            VertexRef::Name(name) => self.by_name.get(name),
        };
        found
            .copied()
            .ok_or_else(|| EngineError::vertex_not_found(vertex.to_string()))
    }

    /// Vertex at a node index
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not belong to this graph.
    #[must_use]
    pub fn vertex(&self, idx: NodeIndex) -> &Vertex {
        &self.store.vertices[self.graph[idx]]
    }

    /// Vertex by stable id
    #[must_use]
    pub fn vertex_by_id(&self, id: VertexId) -> Option<&Vertex> {
        self.by_id.get(&id).map(|&idx| self.vertex(idx))
    }

    /// Node index by stable id
    #[must_use]
    pub fn index_of(&self, id: VertexId) -> Option<NodeIndex> {
        self.by_id.get(&id).copied()
    }

    /// The unique sink (manufacturer)
    #[must_use]
    pub fn sink(&self) -> NodeIndex {
        self.sink
    }

    /// Out-neighbors in ascending ordinal order
    #[must_use]
    pub fn out_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    /// Edge between two vertices, if any
    #[must_use]
    pub fn edge_between(&self, from: NodeIndex, to: NodeIndex) -> Option<&Edge> {
        self.graph
            .find_edge(from, to)
            .map(|e: EdgeIndex| &self.store.edges[self.graph[e]])
    }

    /// Orders handled by `carrier` at a vertex
    #[must_use]
    pub fn orders_at_vertex(&self, idx: NodeIndex, carrier: &str) -> u64 {
        self.vertex(idx).orders_for(carrier)
    }

    /// Orders carried by `carrier` on the edge `from -> to` (zero if absent)
    #[must_use]
    pub fn orders_on_edge(&self, from: NodeIndex, to: NodeIndex, carrier: &str) -> u64 {
        self.edge_between(from, to).map_or(0, |e| e.orders_for(carrier))
    }

    /// Map node indices to vertex ids
    #[must_use]
    pub fn ids_of(&self, path: &[NodeIndex]) -> Vec<VertexId> {
        path.iter().map(|&idx| self.vertex(idx).id).collect()
    }

    /// Map vertex ids back to node indices
    pub fn indices_of(&self, path: &[VertexId]) -> EngineResult<Vec<NodeIndex>> {
        path.iter()
            .map(|id| {
                self.index_of(*id)
                    .ok_or_else(|| EngineError::vertex_not_found(format!("#{id}")))
            })
            .collect()
    }

    /// All vertices
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.store.vertices
    }

    /// All edges
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.store.edges
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Content hash identifying this graph; caches are only valid for it
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Flow-conservation violations over every non-sink vertex and carrier
    #[must_use]
    pub fn flow_violations(&self) -> Vec<FlowViolation> {
        let mut violations = Vec::new();

        for idx in self.graph.node_indices() {
            if idx == self.sink {
                continue;
            }
            let vertex = self.vertex(idx);
            let out = self.out_neighbors(idx);
            for (carrier, &at_vertex) in &vertex.orders_by_carrier {
                let on_out_edges: u64 = out
                    .iter()
                    .map(|&u| self.orders_on_edge(idx, u, carrier))
                    .sum();
                if on_out_edges != at_vertex {
                    violations.push(FlowViolation {
                        vertex: vertex.id,
                        carrier: carrier.clone(),
                        at_vertex,
                        on_out_edges,
                    });
                }
            }
        }

        violations
    }

    /// Walk the whole graph and collect back-edges, flow and reachability issues
    #[must_use]
    pub fn integrity_report(&self) -> IntegrityReport {
        let mut back_edges = Vec::new();
        depth_first_search(&self.graph, self.graph.node_indices(), |event| {
            if let DfsEvent::BackEdge(from, to) = event {
                back_edges.push((self.vertex(from).id, self.vertex(to).id));
            }
        });

        let reversed = petgraph::visit::Reversed(&self.graph);
        let mut reaches_sink = vec![false; self.graph.node_count()];
        let mut bfs = petgraph::visit::Bfs::new(reversed, self.sink);
        while let Some(idx) = bfs.next(reversed) {
            reaches_sink[idx.index()] = true;
        }
        let dead_ends = self
            .graph
            .node_indices()
            .filter(|idx| !reaches_sink[idx.index()])
            .map(|idx| self.vertex(idx).id)
            .collect();

        IntegrityReport {
            back_edges,
            flow_violations: self.flow_violations(),
            dead_ends,
        }
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Export to DOT format for Graphviz
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph supply_chain {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=rounded];\n\n");

        for vertex in &self.store.vertices {
            let shape = match vertex.vertex_type {
                VertexType::SupplierSite => "box",
                VertexType::Intermediate => "ellipse",
                VertexType::Manufacturer => "doubleoctagon",
            };
            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{}\", shape={}];\n",
                vertex.id, vertex.name, vertex.total_orders, shape
            ));
        }

        dot.push('\n');

        for edge in self.graph.edge_indices() {
            let Some((from, to)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            let e = &self.store.edges[self.graph[edge]];
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                self.vertex(from).id,
                self.vertex(to).id,
                e.total_orders
            ));
        }

        dot.push_str("}\n");
        dot
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.store).context("Failed to serialize graph to JSON")
    }
}
