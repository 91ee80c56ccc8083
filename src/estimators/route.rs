// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Travel time along a single edge

use crate::error::Result;
use crate::estimators::SegmentContext;
use crate::types::{Edge, IndicatorValue, TimeRange};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

/// Everything known about an edge when its travel time is estimated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegmentInput {
    /// Source latitude
    pub latitude_source: f64,
    /// Source longitude
    pub longitude_source: f64,
    /// Destination latitude
    pub latitude_destination: f64,
    /// Destination longitude
    pub longitude_destination: f64,
    /// Geodesic distance in km
    pub distance: f64,
    /// Historical transit time in hours
    pub avg_oti: f64,
    /// Historical traffic indicator
    pub avg_tmi: f64,
    /// Current traffic indicator
    pub tmi: IndicatorValue,
    /// Historical weather indicator
    pub avg_wmi: f64,
    /// Current weather indicator
    pub wmi: IndicatorValue,
}

impl RouteSegmentInput {
    /// Combine a segment with the indicators observed for it
    #[must_use]
    pub fn new(segment: &SegmentContext, edge: &Edge, tmi: IndicatorValue, wmi: IndicatorValue) -> Self {
        Self {
            latitude_source: segment.source.latitude,
            longitude_source: segment.source.longitude,
            latitude_destination: segment.destination.latitude,
            longitude_destination: segment.destination.longitude,
            distance: edge.distance_km,
            avg_oti: edge.avg_transit_hours,
            avg_tmi: edge.avg_traffic,
            tmi,
            avg_wmi: edge.avg_weather,
            wmi,
        }
    }

    /// Whether both live indicators are available
    #[must_use]
    pub fn indicators_computed(&self) -> bool {
        self.tmi.computed && self.wmi.computed
    }
}

/// Estimates the travel-time range of an edge
#[async_trait]
pub trait RouteSegmentEstimator: Send + Sync {
    /// Range in hours at the given confidence level
    async fn estimate(&self, segment: &RouteSegmentInput, confidence: f64) -> Result<TimeRange>;
}

/// Point prediction of an edge's travel time
#[async_trait]
pub trait RouteTimeModel: Send + Sync {
    /// Predicted hours
    async fn predict(&self, segment: &RouteSegmentInput) -> Result<f64>;
}

/// Predicts the historical average
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoricalRouteTimeModel;

#[async_trait]
impl RouteTimeModel for HistoricalRouteTimeModel {
    async fn predict(&self, segment: &RouteSegmentInput) -> Result<f64> {
        Ok(segment.avg_oti)
    }
}

/// Widens a model prediction by its mean absolute percentage error
#[derive(Debug, Clone)]
pub struct MapeRouteEstimator<M> {
    model: M,
    mape: f64,
    use_model: bool,
}

impl<M: RouteTimeModel> MapeRouteEstimator<M> {
    /// Estimator around `model`
    pub fn new(model: M, mape: f64, use_model: bool) -> Self {
        Self { model, mape, use_model }
    }

    async fn point_estimate(&self, segment: &RouteSegmentInput) -> f64 {
        if !self.use_model {
            return segment.avg_oti;
        }
        if !segment.indicators_computed() {
            debug!("Traffic or weather missing, using historical transit time {}", segment.avg_oti);
            return segment.avg_oti;
        }
        match self.model.predict(segment).await {
            Ok(hours) => hours,
            Err(e) => {
                warn!("Route-time model failed, using historical transit time: {e}");
                segment.avg_oti
            }
        }
    }
}

#[async_trait]
impl<M: RouteTimeModel> RouteSegmentEstimator for MapeRouteEstimator<M> {
    async fn estimate(&self, segment: &RouteSegmentInput, confidence: f64) -> Result<TimeRange> {
        let hours = self.point_estimate(segment).await;
        let spread = confidence * self.mape;
        Ok(TimeRange::new((hours * (1.0 - spread)).max(0.0), hours * (1.0 + spread)))
    }
}
