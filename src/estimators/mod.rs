// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Collaborators that put numbers on vertices, edges and whole shipments
//!
//! Each concern is a trait so the aggregator can run against remote services,
//! historical baselines or test doubles alike.

pub mod alpha;
pub mod dwell;
pub mod route;
pub mod traffic;
pub mod transit;
pub mod weather;

pub use alpha::{AlphaCalculator, AlphaInput, AlphaValue, ConstAlpha, ExpAlpha};
pub use dwell::{DwellEstimator, HistoricalDwellEstimator};
pub use route::{HistoricalRouteTimeModel, MapeRouteEstimator, RouteSegmentEstimator, RouteSegmentInput, RouteTimeModel};
pub use traffic::{TmiCalculator, TrafficClient, TrafficIndicator, TrafficIndicatorService, TransportMode};
pub use transit::{Distribution, DistributionTransitTime, TransitTimeEstimator, TransitTimeInput};
pub use weather::{WeatherClient, WeatherIndicator, WeatherIndicatorService, WmiCalculator};

use crate::geo::Coordinate;
use crate::types::{Edge, IndicatorValue, Vertex, VertexId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One edge of a path as seen at a simulated departure time
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentContext {
    /// Source vertex id
    pub source_id: VertexId,
    /// Destination vertex id
    pub destination_id: VertexId,
    /// Source position
    pub source: Coordinate,
    /// Destination position
    pub destination: Coordinate,
    /// Geodesic length of the edge
    pub distance_km: f64,
    /// Historical transit time of the edge
    pub avg_transit_hours: f64,
    /// When the estimation is made
    pub estimation_time: DateTime<Utc>,
    /// When the shipment is expected to leave the source
    pub departure_time: DateTime<Utc>,
}

impl SegmentContext {
    /// Context for `edge` between `source` and `destination`
    #[must_use]
    pub fn new(
        source: &Vertex,
        destination: &Vertex,
        edge: &Edge,
        estimation_time: DateTime<Utc>,
        departure_time: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source.id,
            destination_id: destination.id,
            source: Coordinate::new(source.latitude, source.longitude),
            destination: Coordinate::new(destination.latitude, destination.longitude),
            distance_km: edge.distance_km,
            avg_transit_hours: edge.avg_transit_hours,
            estimation_time,
            departure_time,
        }
    }

    /// Hours between the estimation and the departure
    #[must_use]
    pub fn lead_hours(&self) -> f64 {
        crate::time::hours_between(self.estimation_time, self.departure_time)
    }
}

/// Indicator value observed on one segment at its departure time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    /// Source vertex id
    pub source_id: VertexId,
    /// Destination vertex id
    pub destination_id: VertexId,
    /// Departure the indicator was requested for
    pub departure_time: DateTime<Utc>,
    /// Mode the segment was classified as (traffic only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_mode: Option<TransportMode>,
    /// Indicator value
    pub value: f64,
}

impl IndicatorRecord {
    /// Record of `value` on `segment`
    #[must_use]
    pub fn new(segment: &SegmentContext, value: f64) -> Self {
        Self {
            source_id: segment.source_id,
            destination_id: segment.destination_id,
            departure_time: segment.departure_time,
            transport_mode: None,
            value,
        }
    }

    /// Tag the record with the segment's transport mode
    #[must_use]
    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = Some(mode);
        self
    }

    /// Whether the segment was classified as road or rail
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.transport_mode.is_some_and(TransportMode::is_ground)
    }

    /// The value as fed to route estimation
    #[must_use]
    pub fn indicator(&self) -> IndicatorValue {
        IndicatorValue::computed(self.value)
    }
}
