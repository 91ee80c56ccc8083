// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Probability-weighted remaining time over graph paths (PT)
//!
//! Every selected path is walked on its own task: dwell at intermediate
//! vertices and travel along edges are accumulated while a simulated clock
//! advances by the midpoint of each contribution. Paths that fail are dropped
//! and the survivors' probabilities rescaled.

use crate::clients::{HttpRouteTimeModel, HttpTrafficClient, HttpWeatherClient, Unconfigured};
use crate::config::{EngineConfig, PathTimeParams};
use crate::error::{EngineError, Result};
use crate::estimators::{
    DwellEstimator, HistoricalDwellEstimator, HistoricalRouteTimeModel, IndicatorRecord,
    MapeRouteEstimator, RouteSegmentEstimator, RouteSegmentInput, SegmentContext, TrafficIndicator,
    TrafficIndicatorService, WeatherIndicator, WeatherIndicatorService,
};
use crate::pool::WorkerPool;
use crate::session::SupplyChainSession;
use crate::time::{add_hours, hours_between, TimeSequence};
use crate::types::{
    IndicatorValue, PathTime, PathTimeEstimate, ProbPath, TimeRange, Vertex, VertexRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Which shipment to estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTimeInput {
    /// Current vertex of the shipment
    pub vertex: VertexRef,
    /// Carriers that may handle it
    pub carriers: Vec<String>,
}

impl PathTimeInput {
    /// Input for `vertex` and `carriers`
    pub fn new(vertex: impl Into<VertexRef>, carriers: &[&str]) -> Self {
        Self {
            vertex: vertex.into(),
            carriers: carriers.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// External estimators used while walking a path
#[derive(Clone)]
pub struct Collaborators {
    /// Dwell at intermediate vertices
    pub dwell: Arc<dyn DwellEstimator>,
    /// Travel along an edge
    pub route: Arc<dyn RouteSegmentEstimator>,
    /// Traffic indicator
    pub traffic: Arc<dyn TrafficIndicator>,
    /// Weather indicator
    pub weather: Arc<dyn WeatherIndicator>,
}

impl Collaborators {
    /// Default collaborators for `config`
    ///
    /// Services without an endpoint are stand-ins that always report
    /// unavailability, which the aggregator treats as "not computed".
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let timeout = config.call_timeout();

        let traffic: Arc<dyn TrafficIndicator> = match &config.traffic.endpoint {
            Some(url) => Arc::new(TrafficIndicatorService::new(
                HttpTrafficClient::new(url, timeout)?,
                config.traffic.clone(),
            )),
            None => {
                if config.traffic.use_service {
                    warn!("Traffic service enabled without an endpoint");
                }
                Arc::new(TrafficIndicatorService::new(
                    Unconfigured("traffic service"),
                    config.traffic.clone(),
                ))
            }
        };

        let weather: Arc<dyn WeatherIndicator> = match &config.weather.endpoint {
            Some(url) => Arc::new(WeatherIndicatorService::new(
                HttpWeatherClient::new(url, timeout)?,
                config.weather.clone(),
            )),
            None => {
                if config.weather.use_service {
                    warn!("Weather service enabled without an endpoint");
                }
                Arc::new(WeatherIndicatorService::new(
                    Unconfigured("weather service"),
                    config.weather.clone(),
                ))
            }
        };

        let route: Arc<dyn RouteSegmentEstimator> = match &config.route.endpoint {
            Some(url) if config.route.use_model => Arc::new(MapeRouteEstimator::new(
                HttpRouteTimeModel::new(url, timeout)?,
                config.route.mape,
                true,
            )),
            _ => Arc::new(MapeRouteEstimator::new(
                HistoricalRouteTimeModel,
                config.route.mape,
                config.route.use_model,
            )),
        };

        Ok(Self {
            dwell: Arc::new(HistoricalDwellEstimator),
            route,
            traffic,
            weather,
        })
    }
}

/// State shared by all path tasks of one aggregator
struct PathWalker {
    session: Arc<SupplyChainSession>,
    collaborators: Collaborators,
    confidence: f64,
    ext_data_min_probability: f64,
    timeout: Duration,
}

impl PathWalker {
    async fn call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| EngineError::Timeout(self.timeout))?
    }

    async fn indicator(
        &self,
        name: &str,
        segment: &SegmentContext,
        fut: impl Future<Output = Result<Option<IndicatorRecord>>>,
    ) -> Option<IndicatorRecord> {
        match self.call(fut).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "{name} indicator unavailable for {} -> {}: {e}",
                    segment.source_id, segment.destination_id
                );
                None
            }
        }
    }

    async fn vertex_time(
        &self,
        vertex: &Vertex,
        event_time: DateTime<Utc>,
        cursor: DateTime<Utc>,
        first: bool,
    ) -> Result<TimeRange> {
        if !vertex.vertex_type.has_dwell() {
            return Ok(TimeRange::zero());
        }

        let range = self
            .call(self.collaborators.dwell.estimate(vertex, self.confidence))
            .await?;
        if first {
            let elapsed = hours_between(event_time, cursor);
            debug!("Vertex {} already held for {elapsed:.2} h", vertex.id);
            return Ok(range.remaining_after(elapsed));
        }
        Ok(range)
    }

    async fn walk(
        &self,
        prob_path: ProbPath,
        event_time: DateTime<Utc>,
        estimation_time: DateTime<Utc>,
    ) -> Result<PathTime> {
        let graph = self.session.graph();
        let nodes = graph.indices_of(&prob_path.path)?;
        let Some(&last) = nodes.last() else {
            return Err(EngineError::PathComputation {
                path: prob_path.path,
                reason: "empty path".into(),
            });
        };

        let fetch_external = prob_path.probability >= self.ext_data_min_probability;
        let mut total = TimeRange::zero();
        let mut cursor = estimation_time;
        let (mut first_traffic, mut first_weather) = (0.0, 0.0);
        let mut traffic_records = Vec::new();
        let mut weather_records = Vec::new();

        for (i, pair) in nodes.windows(2).enumerate() {
            let (s, d) = (pair[0], pair[1]);
            let (source, destination) = (graph.vertex(s), graph.vertex(d));

            let dwell = self.vertex_time(source, event_time, cursor, i == 0).await?;
            total.lower += dwell.lower;
            total.upper += dwell.upper;
            cursor = add_hours(cursor, dwell.midpoint());

            let edge = graph.edge_between(s, d).ok_or_else(|| EngineError::PathComputation {
                path: prob_path.path.clone(),
                reason: format!("no edge {} -> {}", source.id, destination.id),
            })?;
            let segment = SegmentContext::new(source, destination, edge, estimation_time, cursor);

            let (traffic, weather) = if fetch_external {
                let traffic = self
                    .indicator("Traffic", &segment, self.collaborators.traffic.traffic_indicator(&segment))
                    .await;
                let weather = self
                    .indicator("Weather", &segment, self.collaborators.weather.weather_indicator(&segment))
                    .await;
                (traffic, weather)
            } else {
                (None, None)
            };
            let tmi = traffic
                .as_ref()
                .map_or_else(IndicatorValue::not_computed, IndicatorRecord::indicator);
            let wmi = weather
                .as_ref()
                .map_or_else(IndicatorValue::not_computed, IndicatorRecord::indicator);
            if i == 0 {
                first_traffic = tmi.value;
                first_weather = wmi.value;
            }
            // Road traffic says nothing about air or sea legs
            traffic_records.extend(traffic.filter(IndicatorRecord::is_ground));
            weather_records.extend(weather);

            let input = RouteSegmentInput::new(&segment, edge, tmi, wmi);
            let travel = self
                .call(self.collaborators.route.estimate(&input, self.confidence))
                .await?;
            total.lower += travel.lower;
            total.upper += travel.upper;
            cursor = add_hours(cursor, travel.midpoint());
        }

        let dwell = self
            .vertex_time(graph.vertex(last), event_time, cursor, nodes.len() == 1)
            .await?;
        total.lower += dwell.lower;
        total.upper += dwell.upper;

        Ok(PathTime {
            prob_path,
            lower: total.lower,
            upper: total.upper,
            traffic: first_traffic,
            weather: first_weather,
            traffic_records,
            weather_records,
        })
    }
}

/// Computes PT for shipments located in one session's graph
pub struct PathTimeAggregator {
    walker: Arc<PathWalker>,
    params: PathTimeParams,
    pool: WorkerPool,
}

impl PathTimeAggregator {
    /// Aggregator over `session` using `collaborators`
    #[must_use]
    pub fn new(
        session: Arc<SupplyChainSession>,
        collaborators: Collaborators,
        params: PathTimeParams,
        pool: WorkerPool,
        timeout: Duration,
    ) -> Self {
        let walker = PathWalker {
            session,
            collaborators,
            confidence: params.confidence,
            ext_data_min_probability: params.ext_data_min_probability,
            timeout,
        };
        Self {
            walker: Arc::new(walker),
            params,
            pool,
        }
    }

    /// Aggregator with default collaborators and pool for `config`
    pub fn from_config(session: Arc<SupplyChainSession>, config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(
            session,
            Collaborators::from_config(config)?,
            config.path_time.clone(),
            WorkerPool::new(config.blend.path_workers),
            config.call_timeout(),
        ))
    }

    /// The session the aggregator reads from
    #[must_use]
    pub fn session(&self) -> &SupplyChainSession {
        &self.walker.session
    }

    /// PT for an order described by `times`
    pub async fn estimate(&self, input: &PathTimeInput, times: &TimeSequence) -> Result<PathTimeEstimate> {
        self.estimate_remaining_time(input, times.shipment_event_time(), times.shipment_estimation_time())
            .await
    }

    /// PT from the shipment's current vertex, as seen at `estimation_time`
    pub async fn estimate_remaining_time(
        &self,
        input: &PathTimeInput,
        event_time: DateTime<Utc>,
        estimation_time: DateTime<Utc>,
    ) -> Result<PathTimeEstimate> {
        let weighted = self
            .walker
            .session
            .extract_paths(&input.vertex, &input.carriers, false)?;
        debug!(
            "{} weighted paths from {} for carriers {:?}",
            weighted.n_paths(),
            input.vertex,
            weighted.valid_carriers
        );

        let selected = self.select_paths(weighted.paths);
        if selected.is_empty() {
            warn!(
                "No path from {} reaches probability {}",
                input.vertex, self.params.min_path_probability
            );
            return Ok(PathTimeEstimate::empty());
        }

        Ok(self.evaluate_paths(selected, event_time, estimation_time).await)
    }

    /// Drop unlikely paths, keep the most likely ones, renormalize if anything was dropped
    #[must_use]
    pub fn select_paths(&self, paths: Vec<ProbPath>) -> Vec<ProbPath> {
        let extracted = paths.len();
        let mut kept: Vec<ProbPath> = paths
            .into_iter()
            .filter(|p| p.probability >= self.params.min_path_probability)
            .collect();
        if kept.is_empty() {
            return kept;
        }

        if kept.len() > self.params.max_paths {
            kept.sort_by(|a, b| b.probability.total_cmp(&a.probability));
            kept.truncate(self.params.max_paths);
            debug!("Kept the {} most likely paths", self.params.max_paths);
        }

        if kept.len() < extracted {
            let mass: f64 = kept.iter().map(|p| p.probability).sum();
            if mass > 0.0 {
                for p in &mut kept {
                    p.probability /= mass;
                }
            }
        }
        kept
    }

    /// Estimate every path concurrently and combine the survivors
    pub async fn evaluate_paths(
        &self,
        paths: Vec<ProbPath>,
        event_time: DateTime<Utc>,
        estimation_time: DateTime<Utc>,
    ) -> PathTimeEstimate {
        let handles: Vec<_> = paths
            .into_iter()
            .map(|prob_path| {
                let walker = Arc::clone(&self.walker);
                let fallback = prob_path.clone();
                let handle = self.pool.spawn(async move {
                    walker.walk(prob_path, event_time, estimation_time).await
                });
                (fallback, handle)
            })
            .collect();

        let mut succeeded: Vec<PathTime> = Vec::with_capacity(handles.len());
        let mut failed_probability = 0.0;
        for (prob_path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join) => Err(EngineError::from(join)),
            };
            match outcome {
                Ok(path_time) => {
                    debug!(
                        "Path {:?}: p={:.4}, [{:.2}, {:.2}] h",
                        path_time.prob_path.path,
                        path_time.prob_path.probability,
                        path_time.lower,
                        path_time.upper
                    );
                    succeeded.push(path_time);
                }
                Err(e) => {
                    error!("Failed to estimate path {:?}: {e}", prob_path.path);
                    failed_probability += prob_path.probability;
                }
            }
        }

        combine(succeeded, failed_probability)
    }
}

/// Rescale survivors by the failed mass and take probability-weighted sums
fn combine(mut succeeded: Vec<PathTime>, failed_probability: f64) -> PathTimeEstimate {
    if succeeded.is_empty() {
        warn!("No path could be estimated");
        return PathTimeEstimate::empty();
    }

    if failed_probability > 0.0 {
        let remaining = 1.0 - failed_probability;
        if remaining <= 0.0 {
            warn!("Failed paths carry all probability mass");
            return PathTimeEstimate::empty();
        }
        for p in &mut succeeded {
            p.prob_path.probability /= remaining;
        }
    }

    let mut estimate = PathTimeEstimate {
        n_paths: succeeded.len(),
        ..PathTimeEstimate::empty()
    };
    for p in &succeeded {
        let w = p.prob_path.probability;
        estimate.lower += w * p.lower;
        estimate.upper += w * p.upper;
        estimate.avg_traffic += w * p.traffic;
        estimate.avg_weather += w * p.weather;
        merge_records(&mut estimate.traffic_records, &p.traffic_records);
        merge_records(&mut estimate.weather_records, &p.weather_records);
    }
    estimate.paths = succeeded;
    estimate
}

/// Append records not seen yet; paths sharing a leg report it once
fn merge_records(into: &mut Vec<IndicatorRecord>, from: &[IndicatorRecord]) {
    for record in from {
        if !into.contains(record) {
            into.push(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(source_id: u64, destination_id: u64, value: f64) -> IndicatorRecord {
        IndicatorRecord {
            source_id,
            destination_id,
            departure_time: Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap(),
            transport_mode: None,
            value,
        }
    }

    fn path_time(probability: f64, lower: f64, upper: f64) -> PathTime {
        PathTime {
            prob_path: ProbPath {
                path: vec![1, 2],
                probability,
                carrier: "dhl".into(),
            },
            lower,
            upper,
            traffic: 0.5,
            weather: 0.0,
            traffic_records: Vec::new(),
            weather_records: Vec::new(),
        }
    }

    #[test]
    fn test_combine_weights_bounds() {
        let estimate = combine(vec![path_time(0.25, 4.0, 8.0), path_time(0.75, 8.0, 12.0)], 0.0);

        assert_eq!(estimate.n_paths, 2);
        assert!((estimate.lower - 7.0).abs() < 1e-9);
        assert!((estimate.upper - 11.0).abs() < 1e-9);
        assert!((estimate.avg_traffic - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_combine_merges_shared_records() {
        let mut a = path_time(0.5, 1.0, 2.0);
        a.weather_records = vec![record(1, 2, 0.4), record(2, 5, 0.0)];
        let mut b = path_time(0.5, 1.0, 2.0);
        b.weather_records = vec![record(1, 2, 0.4), record(2, 6, 0.7)];

        let estimate = combine(vec![a, b], 0.0);

        let legs: Vec<(u64, u64)> = estimate
            .weather_records
            .iter()
            .map(|r| (r.source_id, r.destination_id))
            .collect();
        assert_eq!(legs, vec![(1, 2), (2, 5), (2, 6)]);
        assert!(estimate.traffic_records.is_empty());
    }

    #[test]
    fn test_combine_rescales_after_failures() {
        let estimate = combine(vec![path_time(0.5, 10.0, 10.0), path_time(0.2, 20.0, 20.0)], 0.3);

        let probs: Vec<f64> = estimate.paths.iter().map(|p| p.prob_path.probability).collect();
        assert!((probs[0] - 0.5 / 0.7).abs() < 1e-9);
        assert!((probs[1] - 0.2 / 0.7).abs() < 1e-9);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_input_json_round_trip() {
        for input in [PathTimeInput::new(12u64, &["dhl"]), PathTimeInput::new("Depot Torino", &["ups", "dhl"])] {
            let json = serde_json::to_string(&input).unwrap();
            let back: PathTimeInput = serde_json::from_str(&json).unwrap();
            assert_eq!(back, input);
        }
    }

    #[test]
    fn test_combine_without_survivors_is_empty() {
        assert!(combine(Vec::new(), 1.0).is_empty());
    }
}
