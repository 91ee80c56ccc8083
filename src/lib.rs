// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! LCDI engine library - supply-chain path engine and delivery-time estimator
//!
//! This crate enumerates the routes a shipment can still take through a
//! multi-echelon distribution network, weights them by historical carrier
//! routing, and turns them into a probability-weighted remaining-time range
//! that is finally blended with an independent transit-time estimate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blend;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod estimators;
pub mod extraction;
pub mod geo;
pub mod graph;
pub mod path_time;
pub mod pool;
pub mod probability;
pub mod session;
pub mod time;

/// Core data types of the supply-chain graph and its estimates
pub mod types {
    pub use crate::estimators::IndicatorRecord;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::fmt;

    /// Stable vertex identifier as stored in the graph file
    pub type VertexId = u64;

    /// Ordered vertex ids, source first, sink last
    pub type Path = Vec<VertexId>;

    // =========================================================================
    // Vertices
    // =========================================================================

    /// Role of a vertex in the distribution network
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum VertexType {
        /// Supplier site where shipments originate
        SupplierSite,
        /// Hub, warehouse or any other intermediate location
        Intermediate,
        /// The manufacturer; unique sink of the graph
        Manufacturer,
    }

    impl VertexType {
        /// Whether shipments dwell at this kind of vertex
        #[must_use]
        pub fn has_dwell(self) -> bool {
            matches!(self, Self::Intermediate)
        }
    }

    impl fmt::Display for VertexType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = match self {
                Self::SupplierSite => "SUPPLIER_SITE",
                Self::Intermediate => "INTERMEDIATE",
                Self::Manufacturer => "MANUFACTURER",
            };
            f.write_str(s)
        }
    }

    /// Location in the supply-chain graph
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Vertex {
        /// Stable identifier
        #[serde(rename = "v_id")]
        pub id: VertexId,
        /// Display name (unique within a graph)
        pub name: String,
        /// Vertex role
        #[serde(rename = "type")]
        pub vertex_type: VertexType,
        /// Latitude in degrees
        pub latitude: f64,
        /// Longitude in degrees
        pub longitude: f64,
        /// Historical average dwell time in hours
        #[serde(default)]
        pub avg_dwell_hours: f64,
        /// Orders that passed through this vertex, by carrier
        #[serde(default)]
        pub orders_by_carrier: BTreeMap<String, u64>,
        /// Orders that passed through this vertex
        #[serde(default)]
        pub total_orders: u64,
    }

    impl Vertex {
        /// Orders handled by `carrier` at this vertex
        #[must_use]
        pub fn orders_for(&self, carrier: &str) -> u64 {
            self.orders_by_carrier.get(carrier).copied().unwrap_or(0)
        }
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Route segment between two vertices
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Edge {
        /// Source vertex id
        pub source: VertexId,
        /// Destination vertex id
        pub destination: VertexId,
        /// Geodesic distance in kilometres
        #[serde(default)]
        pub distance_km: f64,
        /// Historical average transit time in hours
        #[serde(default)]
        pub avg_transit_hours: f64,
        /// Historical average traffic indicator
        #[serde(default)]
        pub avg_traffic: f64,
        /// Historical average weather indicator
        #[serde(default)]
        pub avg_weather: f64,
        /// Orders that travelled this edge, by carrier
        #[serde(default)]
        pub orders_by_carrier: BTreeMap<String, u64>,
        /// Orders that travelled this edge
        #[serde(default)]
        pub total_orders: u64,
    }

    impl Edge {
        /// Orders carried by `carrier` on this edge
        #[must_use]
        pub fn orders_for(&self, carrier: &str) -> u64 {
            self.orders_by_carrier.get(carrier).copied().unwrap_or(0)
        }
    }

    /// Serialized form of a supply-chain graph
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct GraphStore {
        /// All vertices
        #[serde(default)]
        pub vertices: Vec<Vertex>,
        /// All edges
        #[serde(default)]
        pub edges: Vec<Edge>,
    }

    /// How a caller names a vertex
    ///
    /// Serialized untagged: a JSON number is an id, a string a name.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum VertexRef {
        /// By stable id
        Id(VertexId),
        /// By display name
        Name(String),
    }

    impl VertexRef {
        /// Parse a CLI argument: numeric means id, anything else a name
        #[must_use]
        pub fn parse(raw: &str) -> Self {
            raw.parse::<VertexId>()
                .map_or_else(|_| Self::Name(raw.to_string()), Self::Id)
        }
    }

    impl From<VertexId> for VertexRef {
        fn from(id: VertexId) -> Self {
            Self::Id(id)
        }
    }

    impl From<&str> for VertexRef {
        fn from(name: &str) -> Self {
            Self::Name(name.to_string())
        }
    }

    impl fmt::Display for VertexRef {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Id(id) => write!(f, "#{id}"),
                Self::Name(name) => write!(f, "'{name}'"),
            }
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// A path weighted by the probability that a carrier's shipment takes it
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ProbPath {
        /// Vertex ids, source first
        pub path: Path,
        /// Probability in [0, 1]
        pub probability: f64,
        /// Carrier the probability refers to
        pub carrier: String,
    }

    /// Result of a probability-weighted path extraction
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ProbPaths {
        /// Source vertex id
        pub source: VertexId,
        /// Destination (sink) vertex id
        pub destination: VertexId,
        /// Carriers asked for
        pub requested_carriers: Vec<String>,
        /// Requested carriers with volume at the source
        pub valid_carriers: Vec<String>,
        /// Weighted paths
        pub paths: Vec<ProbPath>,
    }

    impl ProbPaths {
        /// Empty result that still echoes the request
        #[must_use]
        pub fn empty(source: VertexId, destination: VertexId, requested: &[String]) -> Self {
            Self {
                source,
                destination,
                requested_carriers: requested.to_vec(),
                valid_carriers: Vec::new(),
                paths: Vec::new(),
            }
        }

        /// Sum of path probabilities
        #[must_use]
        pub fn total_probability(&self) -> f64 {
            self.paths.iter().map(|p| p.probability).sum()
        }

        /// Number of weighted paths
        #[must_use]
        pub fn n_paths(&self) -> usize {
            self.paths.len()
        }
    }

    // =========================================================================
    // Estimates
    // =========================================================================

    /// Closed interval of hours
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct TimeRange {
        /// Lower bound in hours
        pub lower: f64,
        /// Upper bound in hours
        pub upper: f64,
    }

    impl TimeRange {
        /// Create a range
        #[must_use]
        pub fn new(lower: f64, upper: f64) -> Self {
            Self { lower, upper }
        }

        /// Zero-width range at zero
        #[must_use]
        pub fn zero() -> Self {
            Self::default()
        }

        /// Midpoint of the range
        #[must_use]
        pub fn midpoint(&self) -> f64 {
            (self.lower + self.upper) / 2.0
        }

        /// Shift both bounds down by `hours`, flooring at zero
        #[must_use]
        pub fn remaining_after(&self, hours: f64) -> Self {
            Self {
                lower: (self.lower - hours).max(0.0),
                upper: (self.upper - hours).max(0.0),
            }
        }
    }

    /// Value reported by an external indicator service
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct IndicatorValue {
        /// Indicator value (zero when not computed)
        pub value: f64,
        /// Whether the service actually produced the value
        pub computed: bool,
    }

    impl IndicatorValue {
        /// A computed value
        #[must_use]
        pub fn computed(value: f64) -> Self {
            Self { value, computed: true }
        }

        /// The soft-zero value used when a service is skipped or unavailable
        #[must_use]
        pub fn not_computed() -> Self {
            Self::default()
        }
    }

    /// Duration estimate for a single weighted path
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PathTime {
        /// The weighted path (probability after renormalization)
        #[serde(flatten)]
        pub prob_path: ProbPath,
        /// Lower bound in hours
        pub lower: f64,
        /// Upper bound in hours
        pub upper: f64,
        /// Traffic indicator on the first edge
        pub traffic: f64,
        /// Weather indicator on the first edge
        pub weather: f64,
        /// Traffic indicators of the road and rail segments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub traffic_records: Vec<IndicatorRecord>,
        /// Weather indicators of the segments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub weather_records: Vec<IndicatorRecord>,
    }

    /// Probability-weighted remaining time over graph paths (PT)
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct PathTimeEstimate {
        /// Lower bound in hours
        pub lower: f64,
        /// Upper bound in hours
        pub upper: f64,
        /// Number of paths that contributed
        pub n_paths: usize,
        /// Weighted traffic indicator of the first edges
        pub avg_traffic: f64,
        /// Weighted weather indicator of the first edges
        pub avg_weather: f64,
        /// Per-path breakdown
        #[serde(default)]
        pub paths: Vec<PathTime>,
        /// Distinct traffic records of the contributing paths
        #[serde(default)]
        pub traffic_records: Vec<IndicatorRecord>,
        /// Distinct weather records of the contributing paths
        #[serde(default)]
        pub weather_records: Vec<IndicatorRecord>,
    }

    impl PathTimeEstimate {
        /// The explicit empty result for sparse or zero-flow data
        #[must_use]
        pub fn empty() -> Self {
            Self::default()
        }

        /// Whether no path contributed
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.n_paths == 0
        }

        /// Bounds as a range
        #[must_use]
        pub fn range(&self) -> TimeRange {
            TimeRange::new(self.lower, self.upper)
        }
    }

    /// Non-graph transit-time estimate (TT)
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct TransitTimeEstimate {
        /// Lower bound in hours
        pub lower: f64,
        /// Upper bound in hours
        pub upper: f64,
        /// Confidence level of the interval
        pub confidence: f64,
    }

    impl TransitTimeEstimate {
        /// Bounds as a range
        #[must_use]
        pub fn range(&self) -> TimeRange {
            TimeRange::new(self.lower, self.upper)
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{EngineError, Result};
    pub use crate::types::*;
}

#[cfg(test)]
mod tests {
    use super::types::VertexRef;

    #[test]
    fn test_vertex_ref_json_forms() {
        assert_eq!(serde_json::to_string(&VertexRef::Id(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&VertexRef::from("Hub Milano")).unwrap(), "\"Hub Milano\"");

        let id: VertexRef = serde_json::from_str("42").unwrap();
        assert_eq!(id, VertexRef::Id(42));
        let name: VertexRef = serde_json::from_str("\"42a\"").unwrap();
        assert_eq!(name, VertexRef::Name("42a".into()));
    }
}
