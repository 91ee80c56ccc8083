// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Mixture of the path-time and transit-time estimates

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::estimators::{
    AlphaCalculator, AlphaInput, DistributionTransitTime, TransitTimeEstimator, TransitTimeInput,
};
use crate::path_time::{PathTimeAggregator, PathTimeInput};
use crate::pool::WorkerPool;
use crate::session::SupplyChainSession;
use crate::time::TimeSequence;
use crate::types::{PathTimeEstimate, TimeRange, TransitTimeEstimate};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Which estimates actually fed the blend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Branches {
    /// Transit time was skipped
    PathTime,
    /// Path time was skipped
    TransitTime,
    /// Both were computed
    Both,
}

impl Branches {
    /// Branches needed for `alpha` given `tolerance`
    #[must_use]
    pub fn for_alpha(alpha: f64, tolerance: f64) -> Self {
        if alpha < tolerance {
            Self::PathTime
        } else if alpha > 1.0 - tolerance {
            Self::TransitTime
        } else {
            Self::Both
        }
    }

    fn path_time(self) -> bool {
        matches!(self, Self::PathTime | Self::Both)
    }

    fn transit_time(self) -> bool {
        matches!(self, Self::TransitTime | Self::Both)
    }
}

/// Blended interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlendResult {
    /// Lower bound in hours
    pub lower: f64,
    /// Upper bound in hours
    pub upper: f64,
    /// Weight of the transit-time estimate
    pub alpha: f64,
    /// Tolerance the branches were chosen with
    pub tolerance: f64,
    /// Branches that were computed
    pub computed: Branches,
}

/// Everything produced by one blend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendOutcome {
    /// Weight of the transit-time estimate
    pub alpha: f64,
    /// Path-time estimate (empty if skipped)
    pub path_time: PathTimeEstimate,
    /// Transit-time estimate (empty if skipped)
    pub transit_time: TransitTimeEstimate,
    /// The blend
    pub blend: BlendResult,
}

/// `(1 - alpha) * pt + alpha * tt`, bound by bound
#[must_use]
pub fn blend_ranges(alpha: f64, pt: TimeRange, tt: TimeRange) -> TimeRange {
    TimeRange::new(
        (1.0 - alpha) * pt.lower + alpha * tt.lower,
        (1.0 - alpha) * pt.upper + alpha * tt.upper,
    )
}

/// Runs PT and TT and mixes them
pub struct MixtureBlender {
    aggregator: Arc<PathTimeAggregator>,
    transit: Arc<dyn TransitTimeEstimator>,
    pool: WorkerPool,
}

impl MixtureBlender {
    /// Blender over the given estimators; `pool` bounds concurrent branches
    #[must_use]
    pub fn new(
        aggregator: Arc<PathTimeAggregator>,
        transit: Arc<dyn TransitTimeEstimator>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            aggregator,
            transit,
            pool,
        }
    }

    /// Blender with default estimators for `config`
    pub fn from_config(session: Arc<SupplyChainSession>, config: &EngineConfig) -> Result<Self> {
        let aggregator = PathTimeAggregator::from_config(session, config)?;
        Ok(Self::new(
            Arc::new(aggregator),
            Arc::new(DistributionTransitTime::new(config.transit.confidence)),
            WorkerPool::new(config.blend.blend_workers),
        ))
    }

    /// Compute alpha with `calculator`, then [`Self::execute`]
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        calculator: &dyn AlphaCalculator,
        alpha_input: &AlphaInput,
        pt_input: &PathTimeInput,
        tt_input: &TransitTimeInput,
        times: &TimeSequence,
        parallel: bool,
        tolerance: f64,
    ) -> Result<BlendOutcome> {
        let alpha = calculator.calculate(alpha_input, times)?;
        debug!("Alpha {:?} = {:.4} (input {:.4})", alpha.kind, alpha.value, alpha.input);
        self.execute(alpha.value, pt_input, tt_input, times, parallel, tolerance)
            .await
    }

    /// Blend PT and TT with weight `alpha`, skipping a branch whose weight is negligible
    pub async fn execute(
        &self,
        alpha: f64,
        pt_input: &PathTimeInput,
        tt_input: &TransitTimeInput,
        times: &TimeSequence,
        parallel: bool,
        tolerance: f64,
    ) -> Result<BlendOutcome> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(EngineError::invalid_parameters(format!("alpha {alpha} outside [0, 1]")));
        }
        if !(0.0..0.5).contains(&tolerance) {
            return Err(EngineError::invalid_parameters(format!(
                "tolerance {tolerance} outside [0, 0.5)"
            )));
        }

        let computed = Branches::for_alpha(alpha, tolerance);
        debug!("Alpha {alpha:.4}, tolerance {tolerance}: computing {computed:?}");

        let (path_time, transit_time) = if parallel && computed == Branches::Both {
            self.both_in_parallel(pt_input, tt_input, times).await?
        } else {
            self.sequential(computed, pt_input, tt_input, times).await?
        };

        let range = blend_ranges(alpha, path_time.range(), transit_time.range());
        Ok(BlendOutcome {
            alpha,
            path_time,
            transit_time,
            blend: BlendResult {
                lower: range.lower,
                upper: range.upper,
                alpha,
                tolerance,
                computed,
            },
        })
    }

    async fn sequential(
        &self,
        computed: Branches,
        pt_input: &PathTimeInput,
        tt_input: &TransitTimeInput,
        times: &TimeSequence,
    ) -> Result<(PathTimeEstimate, TransitTimeEstimate)> {
        let path_time = if computed.path_time() {
            self.aggregator.estimate(pt_input, times).await?
        } else {
            PathTimeEstimate::empty()
        };
        let transit_time = if computed.transit_time() {
            self.transit.estimate(tt_input, times).await?
        } else {
            self.transit.empty()
        };
        Ok((path_time, transit_time))
    }

    async fn both_in_parallel(
        &self,
        pt_input: &PathTimeInput,
        tt_input: &TransitTimeInput,
        times: &TimeSequence,
    ) -> Result<(PathTimeEstimate, TransitTimeEstimate)> {
        let aggregator = Arc::clone(&self.aggregator);
        let (pt_input, pt_times) = (pt_input.clone(), *times);
        let pt = self
            .pool
            .spawn(async move { aggregator.estimate(&pt_input, &pt_times).await });

        let transit = Arc::clone(&self.transit);
        let (tt_input, tt_times) = (tt_input.clone(), *times);
        let tt = self
            .pool
            .spawn(async move { transit.estimate(&tt_input, &tt_times).await });

        let (pt, tt) = tokio::join!(pt, tt);
        Ok((pt??, tt??))
    }
}
