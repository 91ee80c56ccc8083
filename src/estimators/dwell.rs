// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Dwell time at intermediate vertices

use crate::error::Result;
use crate::types::{TimeRange, Vertex};
use async_trait::async_trait;

/// Estimates how long a shipment stays at a vertex
#[async_trait]
pub trait DwellEstimator: Send + Sync {
    /// Dwell range in hours for `vertex` at the given confidence level
    async fn estimate(&self, vertex: &Vertex, confidence: f64) -> Result<TimeRange>;
}

/// Uses the recorded average dwell as a zero-width range
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoricalDwellEstimator;

#[async_trait]
impl DwellEstimator for HistoricalDwellEstimator {
    async fn estimate(&self, vertex: &Vertex, _confidence: f64) -> Result<TimeRange> {
        Ok(TimeRange::new(vertex.avg_dwell_hours, vertex.avg_dwell_hours))
    }
}
