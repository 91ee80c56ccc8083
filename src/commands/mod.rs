// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod check;
pub mod completions;
pub mod config;
pub mod estimate;
pub mod export;
pub mod paths;

use anyhow::{Context, Result};
use lcdi_engine::cache::CacheStore;
use lcdi_engine::config::{self as engine_config, EngineConfig};
use lcdi_engine::graph::SupplyChainGraph;
use lcdi_engine::session::SupplyChainSession;
use std::path::PathBuf;
use tracing::debug;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Graph file
    pub graph: Option<PathBuf>,
    /// Configuration file
    pub config: Option<PathBuf>,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
    /// Do not read or write persisted caches
    pub no_cache: bool,
    /// Machine-readable output
    pub json: bool,
    /// Plain output
    pub no_color: bool,
}

impl GlobalOpts {
    /// Effective configuration, with the CLI cache directory applied
    pub fn load_config(&self) -> Result<EngineConfig> {
        let mut config = engine_config::load(self.config.as_deref())?;
        if let Some(dir) = &self.cache_dir {
            config.cache_dir.clone_from(dir);
        }
        Ok(config)
    }

    /// The graph named by `--graph`
    pub fn load_graph(&self) -> Result<SupplyChainGraph> {
        let path = self
            .graph
            .as_ref()
            .context("No graph file given; use --graph or LCDI_GRAPH")?;
        let graph = SupplyChainGraph::load(path)?;
        debug!(
            "Loaded {} vertices and {} edges from {}",
            graph.node_count(),
            graph.edge_count(),
            path.display()
        );
        Ok(graph)
    }

    /// Session over the graph, with persisted caches unless disabled
    pub fn open_session(&self, config: &EngineConfig) -> Result<SupplyChainSession> {
        let graph = self.load_graph()?;
        if self.no_cache {
            return Ok(SupplyChainSession::new(graph));
        }
        Ok(SupplyChainSession::with_store(graph, CacheStore::new(config.cache_dir.clone())))
    }

    /// Whether to emit ANSI colors on stdout
    pub fn color(&self) -> bool {
        !self.no_color && !self.json
    }
}
