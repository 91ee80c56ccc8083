// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Traffic indicator (TMI) for an edge at a departure time

use crate::config::TrafficParams;
use crate::error::Result;
use crate::estimators::{IndicatorRecord, SegmentContext};
use crate::geo::Coordinate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Transport mode inferred from a segment's speed and length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMode {
    /// Air freight
    Air,
    /// Sea freight
    Sea,
    /// Rail freight
    Rail,
    /// Road freight
    Road,
    /// No band matched
    Unknown,
}

impl TransportMode {
    /// Whether road traffic says anything about this mode
    #[must_use]
    pub fn is_ground(self) -> bool {
        matches!(self, Self::Rail | Self::Road)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Air => "AIR",
            Self::Sea => "SEA",
            Self::Rail => "RAIL",
            Self::Road => "ROAD",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Request sent to a traffic service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficQuery {
    /// Route start
    pub source: Coordinate,
    /// Route end
    pub destination: Coordinate,
    /// Departure time
    pub departure_time: DateTime<Utc>,
    /// Mode to route for
    pub transport_mode: TransportMode,
}

/// Road travel times reported by a traffic service
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TrafficReport {
    /// Road distance in km
    pub distance_km: f64,
    /// Travel time with current traffic
    pub travel_time_hours: f64,
    /// Travel time on empty roads
    pub no_traffic_travel_time_hours: f64,
}

/// Remote source of road travel times
#[async_trait]
pub trait TrafficClient: Send + Sync {
    /// Travel times for `query`
    async fn traffic(&self, query: &TrafficQuery) -> Result<TrafficReport>;
}

/// Produces the traffic indicator of a segment
#[async_trait]
pub trait TrafficIndicator: Send + Sync {
    /// Indicator for `segment`, tagged with its transport mode; `None` when skipped
    async fn traffic_indicator(&self, segment: &SegmentContext) -> Result<Option<IndicatorRecord>>;
}

/// Turns road travel times into the relative traffic delay
#[derive(Debug, Clone)]
pub struct TmiCalculator {
    params: TrafficParams,
}

impl TmiCalculator {
    /// Calculator with the configured mode bands
    #[must_use]
    pub fn new(params: TrafficParams) -> Self {
        Self { params }
    }

    /// Classify by average speed and geodesic distance; first match wins
    #[must_use]
    pub fn transport_mode(&self, distance_km: f64, hours: f64) -> TransportMode {
        let speed = distance_km / hours;
        let p = &self.params;

        let mode = if p.air.matches(speed, distance_km) {
            TransportMode::Air
        } else if p.sea.matches(speed, distance_km) {
            TransportMode::Sea
        } else if p.rail.matches(speed, distance_km) {
            TransportMode::Rail
        } else if p.road.matches(speed, distance_km) {
            TransportMode::Road
        } else {
            TransportMode::Unknown
        };
        debug!("Speed {speed:.1} km/h over {distance_km:.1} km classified as {mode}");
        mode
    }

    /// `(with - without) / without` for ground modes, zero otherwise
    #[must_use]
    pub fn calculate(&self, distance_km: f64, hours: f64, report: &TrafficReport) -> f64 {
        self.ratio(self.transport_mode(distance_km, hours), report)
    }

    /// Relative delay of `report` for an already classified segment
    #[must_use]
    pub fn ratio(&self, mode: TransportMode, report: &TrafficReport) -> f64 {
        if !mode.is_ground() {
            return 0.0;
        }

        let without = report.no_traffic_travel_time_hours;
        let with = report.travel_time_hours;
        if without <= 0.0 {
            warn!("Travel time without traffic is {without}, cannot compute TMI");
            return 0.0;
        }
        if with < without {
            warn!("Travel time with traffic {with} below free-flow time {without}, cannot compute TMI");
            return 0.0;
        }
        (with - without) / without
    }
}

/// Traffic indicator backed by a [`TrafficClient`]
pub struct TrafficIndicatorService<C> {
    client: C,
    calculator: TmiCalculator,
    use_service: bool,
    max_timedelta_hours: f64,
}

impl<C: TrafficClient> TrafficIndicatorService<C> {
    /// Service configured from `params`
    pub fn new(client: C, params: TrafficParams) -> Self {
        Self {
            client,
            use_service: params.use_service,
            max_timedelta_hours: params.max_timedelta_hours,
            calculator: TmiCalculator::new(params),
        }
    }
}

#[async_trait]
impl<C: TrafficClient> TrafficIndicator for TrafficIndicatorService<C> {
    async fn traffic_indicator(&self, segment: &SegmentContext) -> Result<Option<IndicatorRecord>> {
        if !self.use_service {
            return Ok(None);
        }
        if segment.lead_hours() > self.max_timedelta_hours {
            debug!(
                "Departure {} too far past estimation time, skipping TMI for {} -> {}",
                segment.departure_time, segment.source_id, segment.destination_id
            );
            return Ok(None);
        }

        let query = TrafficQuery {
            source: segment.source,
            destination: segment.destination,
            departure_time: segment.departure_time,
            transport_mode: TransportMode::Road,
        };
        let report = self.client.traffic(&query).await?;
        let mode = self
            .calculator
            .transport_mode(segment.distance_km, segment.avg_transit_hours);
        let value = self.calculator.ratio(mode, &report);

        debug!("TMI {} -> {} ({mode}): {value}", segment.source_id, segment.destination_id);
        Ok(Some(IndicatorRecord::new(segment, value).with_mode(mode)))
    }
}
