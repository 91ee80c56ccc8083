// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `LCDI__SECTION__KEY` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory for persisted DP caches
    pub cache_dir: PathBuf,
    /// Upper bound for any single collaborator call
    pub external_call_timeout_secs: u64,
    /// Path-time aggregation
    pub path_time: PathTimeParams,
    /// Route segment estimation
    pub route: RouteParams,
    /// Traffic indicator
    pub traffic: TrafficParams,
    /// Weather indicator
    pub weather: WeatherParams,
    /// Transit-time estimation
    pub transit: TransitParams,
    /// Blend weight
    pub alpha: AlphaParams,
    /// Mixture blending and worker pools
    pub blend: BlendParams,
}

/// Path filtering and per-path estimation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTimeParams {
    /// Paths below this probability are dropped
    pub min_path_probability: f64,
    /// At most this many paths are estimated
    pub max_paths: usize,
    /// Paths below this probability skip traffic and weather lookups
    pub ext_data_min_probability: f64,
    /// Confidence level handed to the dwell and route estimators
    pub confidence: f64,
}

/// Route-time model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteParams {
    /// Mean absolute percentage error of the model
    pub mape: f64,
    /// Ask the model; otherwise use historical transit times
    pub use_model: bool,
    /// Endpoint of the route-time model service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Inclusive numeric interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Lower end
    pub min: f64,
    /// Upper end
    pub max: f64,
}

impl Band {
    /// New band
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies in the band
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Speed and distance a transport mode typically shows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeBands {
    /// Average speed in km/h
    pub speed_km_h: Band,
    /// Geodesic distance in km
    pub distance_km: Band,
}

impl ModeBands {
    /// Whether a segment with this speed and distance fits the mode
    #[must_use]
    pub fn matches(&self, speed_km_h: f64, distance_km: f64) -> bool {
        self.speed_km_h.contains(speed_km_h) && self.distance_km.contains(distance_km)
    }
}

/// Traffic indicator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficParams {
    /// Query the traffic service at all
    pub use_service: bool,
    /// Departures further than this past the estimation time are skipped
    pub max_timedelta_hours: f64,
    /// Endpoint of the traffic service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Air freight
    pub air: ModeBands,
    /// Sea freight
    pub sea: ModeBands,
    /// Rail freight
    pub rail: ModeBands,
    /// Road freight
    pub road: ModeBands,
}

/// How extreme temperatures translate into a score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureScoring {
    /// Below this, cold starts to count
    pub comfort_min_c: f64,
    /// Above this, heat starts to count
    pub comfort_max_c: f64,
    /// Temperature scoring 1.0 on the cold side
    pub cold_limit_c: f64,
    /// Temperature scoring 1.0 on the hot side
    pub hot_limit_c: f64,
}

impl TemperatureScoring {
    /// Score in [0, 1]
    #[must_use]
    pub fn score(&self, celsius: f64) -> f64 {
        if celsius < self.comfort_min_c {
            ((self.comfort_min_c - celsius) / (self.comfort_min_c - self.cold_limit_c)).clamp(0.0, 1.0)
        } else if celsius > self.comfort_max_c {
            ((celsius - self.comfort_max_c) / (self.hot_limit_c - self.comfort_max_c)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Weather indicator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherParams {
    /// Query the weather service at all
    pub use_service: bool,
    /// Departures further than this past the estimation time are skipped
    pub max_timedelta_hours: f64,
    /// Distance between interpolated waypoints
    pub step_km: f64,
    /// Waypoints per segment, endpoints included
    pub max_points: usize,
    /// Endpoint of the weather service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Score per weather code
    pub scores: BTreeMap<String, f64>,
    /// Temperature scoring
    pub temperature: TemperatureScoring,
}

/// Transit-time settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitParams {
    /// Confidence level of the interval
    pub confidence: f64,
}

/// How the blend weight is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaKind {
    /// Fixed weight
    Const,
    /// Weight grows with elapsed shipment time
    Exp,
    /// Markov-chain weight (not available in this engine)
    Markov,
}

/// Blend weight settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaParams {
    /// Calculator to use
    pub kind: AlphaKind,
    /// Weight for [`AlphaKind::Const`]
    pub value: f64,
    /// Transit-time weight for [`AlphaKind::Exp`]
    pub tt_weight: f64,
}

/// Blending and concurrency settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendParams {
    /// Weights this close to 0 or 1 skip the other branch
    pub tolerance: f64,
    /// Run both branches concurrently
    pub parallel: bool,
    /// Concurrent per-path tasks
    pub path_workers: usize,
    /// Concurrent blend branches
    pub blend_workers: usize,
}

fn default_weather_scores() -> BTreeMap<String, f64> {
    [
        ("clear", 0.0),
        ("cloudy", 0.05),
        ("fog", 0.4),
        ("drizzle", 0.2),
        ("rain", 0.4),
        ("heavy_rain", 0.7),
        ("freezing_rain", 0.85),
        ("snow", 0.7),
        ("heavy_snow", 0.9),
        ("hail", 0.8),
        ("thunderstorm", 0.9),
        ("hurricane", 1.0),
    ]
    .into_iter()
    .map(|(code, score)| (code.to_string(), score))
    .collect()
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "hyperpolymath", "lcdi")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: project_dirs()
                .map(|d| d.cache_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("~/.cache/lcdi")),
            external_call_timeout_secs: 10,
            path_time: PathTimeParams {
                min_path_probability: 0.05,
                max_paths: 10,
                ext_data_min_probability: 0.1,
                confidence: 0.95,
            },
            route: RouteParams {
                mape: 0.15,
                use_model: false,
                endpoint: None,
            },
            traffic: TrafficParams {
                use_service: false,
                max_timedelta_hours: 24.0,
                endpoint: None,
                air: ModeBands {
                    speed_km_h: Band::new(400.0, 1000.0),
                    distance_km: Band::new(500.0, 20_000.0),
                },
                sea: ModeBands {
                    speed_km_h: Band::new(10.0, 50.0),
                    distance_km: Band::new(300.0, 25_000.0),
                },
                rail: ModeBands {
                    speed_km_h: Band::new(40.0, 120.0),
                    distance_km: Band::new(50.0, 3000.0),
                },
                road: ModeBands {
                    speed_km_h: Band::new(15.0, 110.0),
                    distance_km: Band::new(0.0, 3000.0),
                },
            },
            weather: WeatherParams {
                use_service: false,
                max_timedelta_hours: 72.0,
                step_km: 50.0,
                max_points: 10,
                endpoint: None,
                scores: default_weather_scores(),
                temperature: TemperatureScoring {
                    comfort_min_c: 0.0,
                    comfort_max_c: 30.0,
                    cold_limit_c: -20.0,
                    hot_limit_c: 45.0,
                },
            },
            transit: TransitParams { confidence: 0.95 },
            alpha: AlphaParams {
                kind: AlphaKind::Exp,
                value: 0.5,
                tt_weight: 0.5,
            },
            blend: BlendParams {
                tolerance: 0.01,
                parallel: true,
                path_workers: 8,
                blend_workers: 2,
            },
        }
    }
}

impl EngineConfig {
    /// Per-call timeout for collaborators
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Default location of the configuration file
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from defaults, an optional file and the environment
///
/// An explicit `path` must exist; the default path is used only if present.
pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
    let defaults = config::Config::try_from(&EngineConfig::default())
        .context("Failed to build default configuration")?;
    let mut builder = config::Config::builder().add_source(defaults);

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_config_path().filter(|p| p.exists()) {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LCDI")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let loaded = builder
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;
    Ok(loaded)
}
