// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Order timelines and the estimation stage they imply

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional hours from `from` to `to` (negative if `to` is earlier)
#[must_use]
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let millis = (to - from).num_milliseconds() as f64;
    millis / 3_600_000.0
}

/// Advance `at` by fractional `hours`
#[must_use]
pub fn add_hours(at: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    #[allow(clippy::cast_possible_truncation)]
    let millis = (hours * 3_600_000.0).round() as i64;
    at + chrono::Duration::milliseconds(millis)
}

/// Where an order stands when it is estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimationStage {
    /// No carrier has picked the shipment up yet
    Dispatch,
    /// The shipment is on its way
    Shipment,
}

impl fmt::Display for EstimationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch => f.write_str("DISPATCH"),
            Self::Shipment => f.write_str("SHIPMENT"),
        }
    }
}

/// Validated timestamps of one order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSequence {
    order_time: DateTime<Utc>,
    shipment_time: DateTime<Utc>,
    event_time: DateTime<Utc>,
    estimation_time: DateTime<Utc>,
}

impl TimeSequence {
    /// Check ordering constraints and build the sequence
    pub fn new(
        order_time: DateTime<Utc>,
        shipment_time: DateTime<Utc>,
        event_time: DateTime<Utc>,
        estimation_time: DateTime<Utc>,
    ) -> Result<Self> {
        if estimation_time < event_time {
            return Err(EngineError::InvalidTimeSequence(format!(
                "estimation time {estimation_time} is earlier than event time {event_time}"
            )));
        }
        if event_time < order_time {
            return Err(EngineError::InvalidTimeSequence(format!(
                "event time {event_time} is earlier than order time {order_time}"
            )));
        }
        if shipment_time < order_time {
            return Err(EngineError::InvalidTimeSequence(format!(
                "shipment time {shipment_time} is earlier than order time {order_time}"
            )));
        }
        if event_time < shipment_time && shipment_time < estimation_time {
            return Err(EngineError::InvalidTimeSequence(format!(
                "shipment time {shipment_time} falls between event time {event_time} and estimation time {estimation_time}"
            )));
        }

        Ok(Self {
            order_time,
            shipment_time,
            event_time,
            estimation_time,
        })
    }

    /// When the order was placed
    #[must_use]
    pub fn order_time(&self) -> DateTime<Utc> {
        self.order_time
    }

    /// When the carrier picked the shipment up (or is expected to)
    #[must_use]
    pub fn shipment_time(&self) -> DateTime<Utc> {
        self.shipment_time
    }

    /// Last recorded event
    #[must_use]
    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    /// When the estimation is made
    #[must_use]
    pub fn estimation_time(&self) -> DateTime<Utc> {
        self.estimation_time
    }

    /// Event time, never before shipment starts
    #[must_use]
    pub fn shipment_event_time(&self) -> DateTime<Utc> {
        self.event_time.max(self.shipment_time)
    }

    /// Estimation time, never before shipment starts
    #[must_use]
    pub fn shipment_estimation_time(&self) -> DateTime<Utc> {
        self.estimation_time.max(self.shipment_time)
    }

    /// Hours the shipment has been travelling at estimation time
    #[must_use]
    pub fn elapsed_shipment_hours(&self) -> f64 {
        hours_between(self.shipment_time, self.estimation_time).max(0.0)
    }

    /// Dispatch until the shipment starts, shipment afterwards
    #[must_use]
    pub fn stage(&self) -> EstimationStage {
        if self.estimation_time < self.shipment_time {
            EstimationStage::Dispatch
        } else {
            EstimationStage::Shipment
        }
    }
}
