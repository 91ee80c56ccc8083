// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Dynamic-programming caches for path extraction and path probabilities
//!
//! Both caches are keyed by vertex ordinals of one specific graph. They carry
//! the graph fingerprint so a cache built for another graph is never reused.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the persisted path cache
pub const PATH_CACHE_FILE: &str = "path_cache.json";
/// File name of the persisted probability cache
pub const PROB_CACHE_FILE: &str = "prob_cache.json";

/// Continuations from a vertex to a target, excluding the vertex itself
pub type Continuations = Vec<Vec<usize>>;

// =============================================================================
// Path cache
// =============================================================================

/// Per-target, per-vertex continuation buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathCache {
    buckets: BTreeMap<usize, BTreeMap<usize, Continuations>>,
    #[serde(skip)]
    updated: bool,
}

impl PathCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached continuations from `vertex` to `target`
    #[must_use]
    pub fn get(&self, target: usize, vertex: usize) -> Option<&Continuations> {
        self.buckets.get(&target).and_then(|b| b.get(&vertex))
    }

    /// Whether `vertex` has an entry for `target`
    #[must_use]
    pub fn contains(&self, target: usize, vertex: usize) -> bool {
        self.get(target, vertex).is_some()
    }

    /// Store the continuations of `vertex` towards `target`
    pub fn insert(&mut self, target: usize, vertex: usize, continuations: Continuations) {
        self.buckets
            .entry(target)
            .or_default()
            .insert(vertex, continuations);
        self.updated = true;
    }

    /// Total number of vertex entries across all targets
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(BTreeMap::len).sum()
    }

    /// Whether the cache holds no entry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether entries were added since the cache was loaded or saved
    #[must_use]
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    fn mark_saved(&mut self) {
        self.updated = false;
    }
}

// =============================================================================
// Probability cache
// =============================================================================

/// Per-carrier, per-source path probabilities (in path enumeration order)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityCache {
    carriers: BTreeMap<String, BTreeMap<usize, Vec<f64>>>,
    #[serde(skip)]
    updated: bool,
}

impl ProbabilityCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached probabilities of `carrier` from `source`
    #[must_use]
    pub fn get(&self, carrier: &str, source: usize) -> Option<&Vec<f64>> {
        self.carriers.get(carrier).and_then(|m| m.get(&source))
    }

    /// Store the probabilities of `carrier` from `source`
    pub fn insert(&mut self, carrier: &str, source: usize, probabilities: Vec<f64>) {
        self.carriers
            .entry(carrier.to_string())
            .or_default()
            .insert(source, probabilities);
        self.updated = true;
    }

    /// Total number of (carrier, source) entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.carriers.values().map(BTreeMap::len).sum()
    }

    /// Whether the cache holds no entry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether entries were added since the cache was loaded or saved
    #[must_use]
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    fn mark_saved(&mut self) {
        self.updated = false;
    }
}

// =============================================================================
// Session caches and their store
// =============================================================================

/// Both caches of one graph
#[derive(Debug, Clone, Default)]
pub struct GraphCaches {
    /// Fingerprint of the graph the caches belong to
    pub fingerprint: String,
    /// Path continuations
    pub paths: PathCache,
    /// Carrier probabilities
    pub probabilities: ProbabilityCache,
}

impl GraphCaches {
    /// Fresh caches for the graph with `fingerprint`
    #[must_use]
    pub fn empty(fingerprint: &str) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            ..Self::default()
        }
    }

    /// Whether either cache changed since it was loaded or saved
    #[must_use]
    pub fn is_updated(&self) -> bool {
        self.paths.is_updated() || self.probabilities.is_updated()
    }
}

#[derive(Serialize, Deserialize)]
struct CacheFile<T> {
    fingerprint: String,
    entries: T,
}

/// File-backed store for [`GraphCaches`]
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Store rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the cache files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load caches for the graph with `fingerprint`
    ///
    /// Missing files or caches built for another graph yield empty caches.
    pub fn load(&self, fingerprint: &str) -> Result<GraphCaches> {
        let mut caches = GraphCaches::empty(fingerprint);

        if let Some(paths) = self.read_file::<PathCache>(PATH_CACHE_FILE, fingerprint)? {
            caches.paths = paths;
        }
        if let Some(probs) = self.read_file::<ProbabilityCache>(PROB_CACHE_FILE, fingerprint)? {
            caches.probabilities = probs;
        }

        debug!(
            "Restored caches: {} path entries, {} probability entries",
            caches.paths.len(),
            caches.probabilities.len()
        );
        Ok(caches)
    }

    /// Persist caches; without `force`, only when something changed
    ///
    /// Returns whether anything was written.
    pub fn save(&self, caches: &mut GraphCaches, force: bool) -> Result<bool> {
        if !force && !caches.is_updated() {
            debug!("Caches unchanged, skipping save");
            return Ok(false);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;

        self.write_file(PATH_CACHE_FILE, &caches.fingerprint, &caches.paths)?;
        self.write_file(PROB_CACHE_FILE, &caches.fingerprint, &caches.probabilities)?;
        caches.paths.mark_saved();
        caches.probabilities.mark_saved();

        info!("Saved caches to {}", self.dir.display());
        Ok(true)
    }

    fn read_file<T: DeserializeOwned>(&self, name: &str, fingerprint: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: CacheFile<T> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if file.fingerprint != fingerprint {
            warn!(
                "Ignoring {}: built for graph {}, current graph is {}",
                path.display(),
                file.fingerprint,
                fingerprint
            );
            return Ok(None);
        }
        Ok(Some(file.entries))
    }

    fn write_file<T: Serialize>(&self, name: &str, fingerprint: &str, entries: &T) -> Result<()> {
        let path = self.dir.join(name);
        let file = CacheFile {
            fingerprint: fingerprint.to_string(),
            entries,
        };
        let content = serde_json::to_string(&file)
            .with_context(|| format!("Failed to serialize {name}"))?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}
