// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Weather indicator (WMI) sampled along an edge

use crate::config::{TemperatureScoring, WeatherParams};
use crate::error::Result;
use crate::estimators::{IndicatorRecord, SegmentContext};
use crate::geo::{self, Coordinate};
use crate::time::add_hours;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// One waypoint to look up
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherQuery {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
    /// When the shipment is expected there
    pub timestamp: DateTime<Utc>,
}

/// Forecast for one waypoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherReport {
    /// Comma-separated condition codes
    pub weather_codes: String,
    /// Temperature in degrees Celsius
    pub temperature_celsius: f64,
}

/// Remote source of forecasts
#[async_trait]
pub trait WeatherClient: Send + Sync {
    /// One entry per query; `None` where the service had no answer
    async fn weather(&self, queries: &[WeatherQuery]) -> Result<Vec<Option<WeatherReport>>>;
}

/// Produces the weather indicator of a segment
#[async_trait]
pub trait WeatherIndicator: Send + Sync {
    /// Indicator for `segment`; `None` when skipped
    async fn weather_indicator(&self, segment: &SegmentContext) -> Result<Option<IndicatorRecord>>;
}

/// Scores the worst condition and the worst temperature seen on a route
#[derive(Debug, Clone)]
pub struct WmiCalculator {
    scores: BTreeMap<String, f64>,
    temperature: TemperatureScoring,
}

impl WmiCalculator {
    /// Calculator with the configured score table
    #[must_use]
    pub fn new(scores: BTreeMap<String, f64>, temperature: TemperatureScoring) -> Self {
        Self { scores, temperature }
    }

    /// Highest score among known codes (zero when none is known)
    #[must_use]
    pub fn condition_score<'a>(&self, codes: impl IntoIterator<Item = &'a str>) -> f64 {
        let mut best: Option<f64> = None;
        for code in codes {
            match self.scores.get(code) {
                Some(&score) => best = Some(best.map_or(score, |b| b.max(score))),
                None => warn!("Unknown weather code '{code}'"),
            }
        }
        best.unwrap_or(0.0)
    }

    /// Highest temperature score (zero for no readings)
    #[must_use]
    pub fn temperature_score(&self, temperatures: &[f64]) -> f64 {
        temperatures
            .iter()
            .map(|&t| self.temperature.score(t))
            .fold(0.0, f64::max)
    }

    /// Worse of the two scores
    #[must_use]
    pub fn calculate<'a>(&self, codes: impl IntoIterator<Item = &'a str>, temperatures: &[f64]) -> f64 {
        self.condition_score(codes).max(self.temperature_score(temperatures))
    }
}

/// Weather indicator backed by a [`WeatherClient`]
pub struct WeatherIndicatorService<C> {
    client: C,
    calculator: WmiCalculator,
    use_service: bool,
    max_timedelta_hours: f64,
    step_km: f64,
    max_points: usize,
}

impl<C: WeatherClient> WeatherIndicatorService<C> {
    /// Service configured from `params`
    pub fn new(client: C, params: WeatherParams) -> Self {
        Self {
            client,
            calculator: WmiCalculator::new(params.scores, params.temperature),
            use_service: params.use_service,
            max_timedelta_hours: params.max_timedelta_hours,
            step_km: params.step_km,
            max_points: params.max_points,
        }
    }

    /// Points every `step_km` along the initial bearing, endpoints included
    ///
    /// Returns the waypoints, the step actually used and the total distance.
    #[must_use]
    pub fn waypoints(&self, source: Coordinate, destination: Coordinate) -> (Vec<Coordinate>, f64, f64) {
        let total = geo::distance_km(source, destination);
        let mut step = self.step_km;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut n = if step > 0.0 { (total / step).floor() as usize } else { 0 };

        if n + 2 > self.max_points {
            n = self.max_points.saturating_sub(2);
            #[allow(clippy::cast_precision_loss)]
            let divisor = (n + 1) as f64;
            step = total / divisor;
        }

        let bearing = geo::bearing_deg(source, destination);
        let mut points = Vec::with_capacity(n + 2);
        points.push(source);
        for i in 1..=n {
            #[allow(clippy::cast_precision_loss)]
            let along = i as f64 * step;
            points.push(geo::destination(source, bearing, along));
        }
        points.push(destination);

        (points, step, total)
    }
}

#[async_trait]
impl<C: WeatherClient> WeatherIndicator for WeatherIndicatorService<C> {
    async fn weather_indicator(&self, segment: &SegmentContext) -> Result<Option<IndicatorRecord>> {
        if !self.use_service {
            return Ok(None);
        }
        if segment.avg_transit_hours <= 0.0 {
            warn!(
                "Average transit time {} on {} -> {}, cannot compute WMI",
                segment.avg_transit_hours, segment.source_id, segment.destination_id
            );
            return Ok(None);
        }
        if segment.lead_hours() > self.max_timedelta_hours {
            debug!(
                "Departure {} too far past estimation time, skipping WMI for {} -> {}",
                segment.departure_time, segment.source_id, segment.destination_id
            );
            return Ok(None);
        }

        let (points, step, total) = self.waypoints(segment.source, segment.destination);
        debug!(
            "{} waypoints every {step:.1} km over {total:.1} km for {} -> {}",
            points.len(),
            segment.source_id,
            segment.destination_id
        );

        // Each waypoint is reached in proportion to its distance along the edge.
        let last = points.len() - 1;
        let queries: Vec<WeatherQuery> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                #[allow(clippy::cast_precision_loss)]
                let along = if i == last { total } else { i as f64 * step };
                let offset = if total > 0.0 {
                    along / total * segment.avg_transit_hours
                } else {
                    0.0
                };
                WeatherQuery {
                    latitude: p.latitude,
                    longitude: p.longitude,
                    timestamp: add_hours(segment.departure_time, offset),
                }
            })
            .collect();

        let reports: Vec<WeatherReport> = self
            .client
            .weather(&queries)
            .await?
            .into_iter()
            .flatten()
            .collect();
        if reports.is_empty() {
            warn!("No usable weather data for {} -> {}", segment.source_id, segment.destination_id);
            return Ok(None);
        }

        let codes: BTreeSet<&str> = reports
            .iter()
            .flat_map(|r| r.weather_codes.split(','))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        let temperatures: Vec<f64> = reports.iter().map(|r| r.temperature_celsius).collect();

        let value = self.calculator.calculate(codes, &temperatures);
        debug!("WMI {} -> {}: {value}", segment.source_id, segment.destination_id);
        Ok(Some(IndicatorRecord::new(segment, value)))
    }
}
