// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Estimation session: one immutable graph plus its DP caches

use crate::cache::{CacheStore, GraphCaches};
use crate::error::{EngineError, Result};
use crate::extraction::PathExtractionEngine;
use crate::graph::SupplyChainGraph;
use crate::probability::PathProbabilityEngine;
use crate::types::{ProbPaths, VertexRef};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Sizes of the session caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Path cache vertex entries
    pub path_entries: usize,
    /// Probability cache (carrier, source) entries
    pub probability_entries: usize,
}

/// Graph and caches shared by every request of a session
///
/// The cache lock is only taken for synchronous extraction work, never
/// across an `.await`.
#[derive(Debug)]
pub struct SupplyChainSession {
    graph: Arc<SupplyChainGraph>,
    caches: Mutex<GraphCaches>,
    store: Option<CacheStore>,
}

impl SupplyChainSession {
    /// Session with empty caches and no persistence
    #[must_use]
    pub fn new(graph: SupplyChainGraph) -> Self {
        let caches = GraphCaches::empty(graph.fingerprint());
        Self {
            graph: Arc::new(graph),
            caches: Mutex::new(caches),
            store: None,
        }
    }

    /// Session whose caches are restored from and persisted to `store`
    ///
    /// Unreadable cache files are logged and replaced with empty caches.
    #[must_use]
    pub fn with_store(graph: SupplyChainGraph, store: CacheStore) -> Self {
        let caches = match store.load(graph.fingerprint()) {
            Ok(caches) => caches,
            Err(e) => {
                warn!("Could not restore caches from {}: {e:#}", store.dir().display());
                GraphCaches::empty(graph.fingerprint())
            }
        };
        Self {
            graph: Arc::new(graph),
            caches: Mutex::new(caches),
            store: Some(store),
        }
    }

    /// The session graph
    #[must_use]
    pub fn graph(&self) -> &SupplyChainGraph {
        &self.graph
    }

    fn lock(&self) -> Result<MutexGuard<'_, GraphCaches>> {
        self.caches
            .lock()
            .map_err(|_| EngineError::Task("session cache lock poisoned".into()))
    }

    /// Probability-weighted paths from `vertex` to the sink for `carriers`
    pub fn extract_paths(
        &self,
        vertex: &VertexRef,
        carriers: &[String],
        include_zero: bool,
    ) -> Result<ProbPaths> {
        let source = self.graph.resolve(vertex)?;
        let mut caches = self.lock()?;
        let caches = &mut *caches;

        let paths = PathExtractionEngine::new(&self.graph, &mut caches.paths)
            .extract_paths(source, None);
        let weighted = PathProbabilityEngine::new(&self.graph, &mut caches.probabilities)
            .compute_probabilities(source, carriers, &paths, include_zero);

        debug!(
            "Session query {}: {} structural paths, {} weighted",
            vertex,
            paths.len(),
            weighted.n_paths()
        );
        Ok(weighted)
    }

    /// Current cache sizes
    pub fn cache_stats(&self) -> Result<CacheStats> {
        let caches = self.lock()?;
        Ok(CacheStats {
            path_entries: caches.paths.len(),
            probability_entries: caches.probabilities.len(),
        })
    }

    /// Persist the caches if a store is attached
    ///
    /// Best effort: failures are logged, never returned.
    pub fn finish(&self, force: bool) {
        let Some(store) = &self.store else {
            return;
        };
        let mut caches = match self.lock() {
            Ok(caches) => caches,
            Err(e) => {
                warn!("Skipping cache save: {e}");
                return;
            }
        };
        if let Err(e) = store.save(&mut caches, force) {
            warn!("Failed to save caches: {e:#}");
        }
    }
}
