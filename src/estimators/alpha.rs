// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Blend weight between path time and transit time

use crate::config::{AlphaKind, AlphaParams};
use crate::error::{EngineError, Result};
use crate::estimators::transit::Distribution;
use crate::time::{EstimationStage, TimeSequence};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Input of an alpha calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaInput {
    /// Historical shipment-time distribution of the lane
    pub distribution: Distribution,
}

/// Computed blend weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlphaValue {
    /// Weight of the transit-time estimate, in [0, 1]
    pub value: f64,
    /// Quantity the weight was derived from (tau for exp)
    pub input: f64,
    /// Calculator that produced it
    pub kind: AlphaKind,
}

/// Chooses how much the transit-time estimate counts
pub trait AlphaCalculator: Send + Sync {
    /// Weight for an order at `times`
    fn calculate(&self, input: &AlphaInput, times: &TimeSequence) -> Result<AlphaValue>;
}

/// Fixed weight
#[derive(Debug, Clone, Copy)]
pub struct ConstAlpha {
    value: f64,
}

impl ConstAlpha {
    /// Weight `value`, which must lie in [0, 1]
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::invalid_parameters(format!("alpha {value} outside [0, 1]")));
        }
        Ok(Self { value })
    }
}

impl AlphaCalculator for ConstAlpha {
    fn calculate(&self, _input: &AlphaInput, _times: &TimeSequence) -> Result<AlphaValue> {
        Ok(AlphaValue {
            value: self.value,
            input: self.value,
            kind: AlphaKind::Const,
        })
    }
}

/// `(1 - tau)^(1/w - 1)` where tau is elapsed over mean shipment time
#[derive(Debug, Clone, Copy)]
pub struct ExpAlpha {
    tt_weight: f64,
}

impl ExpAlpha {
    /// Calculator with transit-time weight `tt_weight` in [0, 1]
    pub fn new(tt_weight: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&tt_weight) {
            return Err(EngineError::invalid_parameters(format!(
                "tt_weight {tt_weight} outside [0, 1]"
            )));
        }
        Ok(Self { tt_weight })
    }

    #[allow(clippy::float_cmp)]
    fn curve(&self, tau: f64) -> f64 {
        let w = self.tt_weight;
        if w == 0.0 {
            return 0.0;
        }
        if tau == 1.0 && w == 1.0 {
            return 1.0;
        }
        (1.0 - tau).powf(1.0 / w - 1.0)
    }
}

impl AlphaCalculator for ExpAlpha {
    fn calculate(&self, input: &AlphaInput, times: &TimeSequence) -> Result<AlphaValue> {
        if times.stage() == EstimationStage::Dispatch {
            debug!("Estimating in {} stage, alpha = 1", EstimationStage::Dispatch);
            return Ok(AlphaValue {
                value: 1.0,
                input: 1.0,
                kind: AlphaKind::Exp,
            });
        }

        let mean = input.distribution.mean()?;
        if mean <= 0.0 {
            return Err(EngineError::invalid_parameters(format!("mean shipment time {mean}")));
        }
        let elapsed = crate::time::hours_between(times.shipment_time(), times.shipment_estimation_time());
        let tau = (elapsed / mean).min(1.0);
        let value = self.curve(tau);

        debug!("Exp alpha: tau {tau:.3}, weight {}, alpha {value:.3}", self.tt_weight);
        Ok(AlphaValue {
            value,
            input: tau,
            kind: AlphaKind::Exp,
        })
    }
}

/// Calculator selected by configuration
pub fn from_params(params: &AlphaParams) -> Result<Box<dyn AlphaCalculator>> {
    match params.kind {
        AlphaKind::Const => Ok(Box::new(ConstAlpha::new(params.value)?)),
        AlphaKind::Exp => Ok(Box::new(ExpAlpha::new(params.tt_weight)?)),
        AlphaKind::Markov => Err(EngineError::unsupported("alpha kind 'markov'")),
    }
}
