// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for the path engine and estimators

use crate::types::VertexId;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A vertex reference did not resolve
    #[error("vertex not found: {0}")]
    VertexNotFound(String),

    /// An identifier was malformed or referenced something that cannot exist
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The graph contains a back-edge
    #[error("cycle detected on edge {from} -> {to}")]
    GraphCycleDetected {
        /// Source of the back-edge
        from: VertexId,
        /// Target of the back-edge
        to: VertexId,
    },

    /// The graph violates a structural rule (e.g. no unique sink)
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Duration computation for one path failed
    #[error("path computation failed for {path:?}: {reason}")]
    PathComputation {
        /// The failing path
        path: Vec<VertexId>,
        /// Underlying cause
        reason: String,
    },

    /// An external collaborator returned an error or no usable data
    #[error("external service unavailable: {0}")]
    ExternalUnavailable(String),

    /// An external collaborator did not answer in time
    #[error("external call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A tagged input variant is not handled; a logic defect, not bad data
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),

    /// Timestamps of a shipment are out of order
    #[error("invalid time sequence: {0}")]
    InvalidTimeSequence(String),

    /// Estimation parameters are out of range
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A spawned task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a vertex-not-found error
    pub fn vertex_not_found(what: impl Into<String>) -> Self {
        Self::VertexNotFound(what.into())
    }

    /// Create an external-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ExternalUnavailable(msg.into())
    }

    /// Create an invalid-parameters error
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// Create an unsupported-variant error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedVariant(msg.into())
    }

    /// Whether the caller can degrade instead of failing the request
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::ExternalUnavailable(_) | Self::Timeout(_))
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
