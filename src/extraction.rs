// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Enumeration of all simple paths towards the sink
//!
//! A depth-first walk with tri-color marking fills the path cache bottom-up:
//! each vertex stores the continuations that lead from its successors to the
//! target, so later queries from any explored vertex are answered directly.

use crate::cache::{Continuations, PathCache};
use crate::error::EngineError;
use crate::graph::SupplyChainGraph;
use petgraph::graph::NodeIndex;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

struct Frame {
    vertex: NodeIndex,
    neighbors: Vec<NodeIndex>,
    next: usize,
    continuations: Continuations,
}

/// Path enumerator over one graph and its path cache
pub struct PathExtractionEngine<'a> {
    graph: &'a SupplyChainGraph,
    cache: &'a mut PathCache,
}

impl<'a> PathExtractionEngine<'a> {
    /// Engine borrowing the session graph and cache
    pub fn new(graph: &'a SupplyChainGraph, cache: &'a mut PathCache) -> Self {
        Self { graph, cache }
    }

    /// All simple paths from `source` to `target` (the sink when `None`)
    ///
    /// Every path starts with `source` and ends with `target`. Edges closing
    /// a cycle are reported and skipped.
    pub fn extract_paths(&mut self, source: NodeIndex, target: Option<NodeIndex>) -> Vec<Vec<NodeIndex>> {
        let target = target.unwrap_or_else(|| self.graph.sink());
        let t = target.index();

        if !self.cache.contains(t, t) {
            self.cache.insert(t, t, vec![Vec::new()]);
        }

        let needs_walk = self
            .cache
            .get(t, source.index())
            .map_or(true, Vec::is_empty);
        if needs_walk && source != target {
            self.walk(source, target);
        }

        let paths: Vec<Vec<NodeIndex>> = self
            .cache
            .get(t, source.index())
            .map(|conts| {
                conts
                    .iter()
                    .map(|cont| {
                        std::iter::once(source)
                            .chain(cont.iter().map(|&o| NodeIndex::new(o)))
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            "Extracted {} paths from {} to {}",
            paths.len(),
            self.graph.vertex(source).id,
            self.graph.vertex(target).id
        );
        paths
    }

    fn walk(&mut self, source: NodeIndex, target: NodeIndex) {
        let t = target.index();
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut stack = vec![self.open(source, &mut marks)];

        while let Some(frame) = stack.last_mut() {
            if frame.next == frame.neighbors.len() {
                let Some(done) = stack.pop() else { break };
                marks[done.vertex.index()] = Mark::Visited;
                self.cache.insert(t, done.vertex.index(), done.continuations);
                continue;
            }

            let neighbor = frame.neighbors[frame.next];
            let n = neighbor.index();

            if let Some(conts) = self.cache.get(t, n) {
                frame.continuations.extend(conts.iter().map(|cont| {
                    let mut extended = Vec::with_capacity(cont.len() + 1);
                    extended.push(n);
                    extended.extend_from_slice(cont);
                    extended
                }));
                frame.next += 1;
                continue;
            }

            match marks[n] {
                Mark::Visiting => {
                    let cycle = EngineError::GraphCycleDetected {
                        from: self.graph.vertex(frame.vertex).id,
                        to: self.graph.vertex(neighbor).id,
                    };
                    error!("{cycle}; skipping edge");
                    frame.next += 1;
                }
                Mark::Visited => frame.next += 1,
                Mark::Unvisited => {
                    let child = self.open(neighbor, &mut marks);
                    stack.push(child);
                }
            }
        }
    }

    fn open(&self, vertex: NodeIndex, marks: &mut [Mark]) -> Frame {
        marks[vertex.index()] = Mark::Visiting;
        Frame {
            vertex,
            neighbors: self.graph.out_neighbors(vertex),
            next: 0,
            continuations: Vec::new(),
        }
    }
}
