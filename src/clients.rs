// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! HTTP clients for the traffic, weather and route-time services

use crate::error::{EngineError, Result};
use crate::estimators::route::{RouteSegmentInput, RouteTimeModel};
use crate::estimators::traffic::{TrafficClient, TrafficQuery, TrafficReport};
use crate::estimators::weather::{WeatherClient, WeatherQuery, WeatherReport};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Shared JSON-over-HTTP plumbing
#[derive(Debug, Clone)]
struct JsonService {
    client: Client,
    base_url: String,
}

impl JsonService {
    fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::invalid_parameters(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = self.url(path);
        debug!("POST {url}");
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::unavailable(format!("{url}: {e}")))?
            .error_for_status()
            .map_err(|e| EngineError::unavailable(format!("{url}: {e}")))?;

        resp.json()
            .await
            .map_err(|e| EngineError::unavailable(format!("{url}: bad response: {e}")))
    }
}

// =============================================================================
// Traffic
// =============================================================================

/// Traffic service client
#[derive(Debug, Clone)]
pub struct HttpTrafficClient {
    service: JsonService,
}

impl HttpTrafficClient {
    /// Client for the service at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service: JsonService::new(base_url, timeout)?,
        })
    }
}

#[derive(Deserialize)]
struct TrafficResponse {
    #[serde(default)]
    error: bool,
    #[serde(flatten)]
    report: Option<TrafficReport>,
}

#[async_trait]
impl TrafficClient for HttpTrafficClient {
    async fn traffic(&self, query: &TrafficQuery) -> Result<TrafficReport> {
        let resp: TrafficResponse = self.service.post("/traffic", query).await?;
        match resp.report {
            Some(report) if !resp.error => Ok(report),
            _ => Err(EngineError::unavailable("traffic service reported an error")),
        }
    }
}

// =============================================================================
// Weather
// =============================================================================

/// Weather service client
#[derive(Debug, Clone)]
pub struct HttpWeatherClient {
    service: JsonService,
}

impl HttpWeatherClient {
    /// Client for the service at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service: JsonService::new(base_url, timeout)?,
        })
    }
}

#[derive(Serialize)]
struct WeatherRequest<'a> {
    requests: &'a [WeatherQuery],
}

#[derive(Deserialize)]
struct WeatherResult {
    #[serde(default)]
    error: bool,
    #[serde(flatten)]
    report: Option<WeatherReport>,
}

#[async_trait]
impl WeatherClient for HttpWeatherClient {
    async fn weather(&self, queries: &[WeatherQuery]) -> Result<Vec<Option<WeatherReport>>> {
        let results: Vec<Option<WeatherResult>> = self
            .service
            .post("/weather", &WeatherRequest { requests: queries })
            .await?;

        Ok(results
            .into_iter()
            .map(|r| r.filter(|r| !r.error).and_then(|r| r.report))
            .collect())
    }
}

// =============================================================================
// Route-time model
// =============================================================================

/// Route-time model served over HTTP
#[derive(Debug, Clone)]
pub struct HttpRouteTimeModel {
    service: JsonService,
}

impl HttpRouteTimeModel {
    /// Client for the model at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service: JsonService::new(base_url, timeout)?,
        })
    }
}

#[derive(Serialize)]
struct RouteTimeRequest<'a> {
    batch: [&'a RouteSegmentInput; 1],
}

#[derive(Deserialize)]
struct RouteTimePrediction {
    time: f64,
}

#[derive(Deserialize)]
struct RouteTimeResponse {
    batch: Vec<RouteTimePrediction>,
}

#[async_trait]
impl RouteTimeModel for HttpRouteTimeModel {
    async fn predict(&self, segment: &RouteSegmentInput) -> Result<f64> {
        let resp: RouteTimeResponse = self
            .service
            .post("/route-time", &RouteTimeRequest { batch: [segment] })
            .await?;

        resp.batch
            .first()
            .map(|p| p.time)
            .ok_or_else(|| EngineError::unavailable("route-time model returned no prediction"))
    }
}

// =============================================================================
// Unconfigured services
// =============================================================================

/// Stand-in for a service without an endpoint; every call is unavailable
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured(pub &'static str);

#[async_trait]
impl TrafficClient for Unconfigured {
    async fn traffic(&self, _query: &TrafficQuery) -> Result<TrafficReport> {
        Err(EngineError::unavailable(format!("{} has no endpoint", self.0)))
    }
}

#[async_trait]
impl WeatherClient for Unconfigured {
    async fn weather(&self, _queries: &[WeatherQuery]) -> Result<Vec<Option<WeatherReport>>> {
        Err(EngineError::unavailable(format!("{} has no endpoint", self.0)))
    }
}

#[async_trait]
impl RouteTimeModel for Unconfigured {
    async fn predict(&self, _segment: &RouteSegmentInput) -> Result<f64> {
        Err(EngineError::unavailable(format!("{} has no endpoint", self.0)))
    }
}
