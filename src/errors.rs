// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for infrastructure operations
//!
//! Everything in here is an *infrastructure* failure: the broker or a store
//! could not be reached, a payload could not be encoded, a conditional save
//! lost a race. These are retryable by broker redelivery. Domain failures
//! (missing survey, blank text, unknown ids) are never errors of this type;
//! they travel as a [`crate::validation::ViolationReport`].

use thiserror::Error;

/// Errors that can occur in infrastructure operations
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// NATS connection error
    #[error("NATS connection error: {0}")]
    NatsConnection(String),

    /// NATS publish error
    #[error("NATS publish error: {0}")]
    NatsPublish(String),

    /// NATS subscribe / consumer error
    #[error("NATS subscribe error: {0}")]
    NatsSubscribe(String),

    /// Key-value or document store error
    #[error("Store error: {0}")]
    Store(String),

    /// Conditional save found a different version than the one loaded
    #[error("Concurrency conflict on {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Create-only write found a record under the key
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Id cannot be used as a subject token or store key
    #[error("Invalid id: {0}")]
    InvalidId(#[from] crate::domain::IdError),

    /// The consumer drove its stage machine through a forbidden transition
    #[error("Pipeline stage error: {0}")]
    Stage(#[from] crate::pipeline::TransitionError),
}

impl InfrastructureError {
    /// Whether this failure came from a lost optimistic-concurrency race
    ///
    /// Conflicts are resolved by reloading and running the command again.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            InfrastructureError::ConcurrencyConflict { .. } | InfrastructureError::AlreadyExists(_)
        )
    }
}

/// Result type for infrastructure operations
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

impl From<async_nats::Error> for InfrastructureError {
    fn from(err: async_nats::Error) -> Self {
        InfrastructureError::NatsConnection(err.to_string())
    }
}

impl From<serde_json::Error> for InfrastructureError {
    fn from(err: serde_json::Error) -> Self {
        InfrastructureError::Serialization(err.to_string())
    }
}
