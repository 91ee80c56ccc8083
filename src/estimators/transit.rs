// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Graph-independent transit time (TT) from historical shipment durations

use crate::error::{EngineError, Result};
use crate::time::TimeSequence;
use crate::types::{TimeRange, TransitTimeEstimate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Gamma};
use tracing::debug;

/// Historical distribution of shipment durations in hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Distribution {
    /// Fitted gamma distribution
    Gamma {
        /// Shape parameter
        shape: f64,
        /// Scale parameter
        scale: f64,
        /// Location shift
        #[serde(default)]
        loc: f64,
    },
    /// Empirical sample
    Sample {
        /// Observed durations
        x: Vec<f64>,
        /// Precomputed mean, if known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mean: Option<f64>,
    },
}

impl Distribution {
    /// Parse from JSON; an unknown `kind` is an unsupported variant
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value.get("kind").and_then(serde_json::Value::as_str) {
            Some("gamma" | "sample") => Ok(serde_json::from_value(value)?),
            Some(other) => Err(EngineError::unsupported(format!("distribution kind '{other}'"))),
            None => Err(EngineError::invalid_parameters("distribution without 'kind'")),
        }
    }

    /// Mean duration
    pub fn mean(&self) -> Result<f64> {
        match self {
            Self::Gamma { shape, scale, loc } => Ok(shape * scale + loc),
            Self::Sample { mean: Some(m), .. } => Ok(*m),
            Self::Sample { x, mean: None } => {
                if x.is_empty() {
                    return Err(EngineError::invalid_parameters("empty sample"));
                }
                #[allow(clippy::cast_precision_loss)]
                let n = x.len() as f64;
                Ok(x.iter().sum::<f64>() / n)
            }
        }
    }

    /// Central interval holding `confidence` of the mass
    pub fn interval(&self, confidence: f64) -> Result<TimeRange> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(EngineError::invalid_parameters(format!(
                "confidence {confidence} outside (0, 1)"
            )));
        }
        let tail = (1.0 - confidence) / 2.0;

        match self {
            Self::Gamma { shape, scale, loc } => {
                if *scale <= 0.0 {
                    return Err(EngineError::invalid_parameters(format!("gamma scale {scale}")));
                }
                let gamma = Gamma::new(*shape, 1.0 / scale)
                    .map_err(|e| EngineError::invalid_parameters(format!("gamma: {e}")))?;
                Ok(TimeRange::new(
                    gamma.inverse_cdf(tail) + loc,
                    gamma.inverse_cdf(1.0 - tail) + loc,
                ))
            }
            Self::Sample { x, .. } => {
                let mut sorted = x.clone();
                sorted.sort_by(f64::total_cmp);
                Ok(TimeRange::new(
                    percentile(&sorted, tail)?,
                    percentile(&sorted, 1.0 - tail)?,
                ))
            }
        }
    }
}

/// Linear-interpolated quantile `q` in [0, 1] of sorted data
fn percentile(sorted: &[f64], q: f64) -> Result<f64> {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Err(EngineError::invalid_parameters("empty sample"));
    };
    #[allow(clippy::cast_precision_loss)]
    let rank = q * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let below = rank.floor() as usize;
    let above = (below + 1).min(sorted.len() - 1);
    let frac = rank - rank.floor();

    if below >= sorted.len() - 1 {
        return Ok(*last);
    }
    if rank <= 0.0 {
        return Ok(*first);
    }
    Ok(sorted[below] + (sorted[above] - sorted[below]) * frac)
}

/// Input of a transit-time estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitTimeInput {
    /// Historical shipment durations for the lane
    pub distribution: Distribution,
}

/// Estimates remaining transit time without looking at the graph
#[async_trait]
pub trait TransitTimeEstimator: Send + Sync {
    /// Remaining-time range at the estimation time of `times`
    async fn estimate(&self, input: &TransitTimeInput, times: &TimeSequence) -> Result<TransitTimeEstimate>;

    /// Zero-width result used when the branch is skipped
    fn empty(&self) -> TransitTimeEstimate;
}

/// Confidence interval of the distribution minus time already spent
#[derive(Debug, Clone, Copy)]
pub struct DistributionTransitTime {
    confidence: f64,
}

impl DistributionTransitTime {
    /// Estimator at `confidence`
    #[must_use]
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }
}

#[async_trait]
impl TransitTimeEstimator for DistributionTransitTime {
    async fn estimate(&self, input: &TransitTimeInput, times: &TimeSequence) -> Result<TransitTimeEstimate> {
        let total = input.distribution.interval(self.confidence)?;
        let elapsed = crate::time::hours_between(times.shipment_time(), times.shipment_estimation_time());
        let remaining = total.remaining_after(elapsed);

        debug!(
            "TT: total [{:.2}, {:.2}], elapsed {elapsed:.2}, remaining [{:.2}, {:.2}]",
            total.lower, total.upper, remaining.lower, remaining.upper
        );
        Ok(TransitTimeEstimate {
            lower: remaining.lower,
            upper: remaining.upper,
            confidence: self.confidence,
        })
    }

    fn empty(&self) -> TransitTimeEstimate {
        TransitTimeEstimate {
            lower: 0.0,
            upper: 0.0,
            confidence: self.confidence,
        }
    }
}
