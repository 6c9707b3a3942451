// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS client abstraction for the authoring pipeline
//!
//! Every publish goes through JetStream and carries a `Nats-Msg-Id` header,
//! so a publish repeated after a crash is dropped by the stream's duplicate
//! window instead of being stored twice.

use async_nats::{jetstream, Client, ConnectOptions, HeaderMap};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{InfrastructureError, InfrastructureResult};

/// Header JetStream uses for publish deduplication
pub const MSG_ID_HEADER: &str = "Nats-Msg-Id";

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "survey-authoring".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// NATS client wrapper with a JetStream context
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    /// Connect with the given configuration
    pub async fn connect(config: &NatsConfig) -> InfrastructureResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout)
            .request_timeout(Some(config.request_timeout));

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| InfrastructureError::NatsConnection(e.to_string()))?;

        info!(servers = ?config.servers, "Connected to NATS");

        let jetstream = jetstream::new(client.clone());
        Ok(Self { client, jetstream })
    }

    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Get the underlying NATS client for advanced operations
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Publish `message` as JSON and wait for the stream's ack
    pub async fn publish_with_id<T>(&self, subject: &str, message: &T, msg_id: &str) -> InfrastructureResult<()>
    where
        T: Serialize,
    {
        publish_with_id(&self.jetstream, subject, message, msg_id).await
    }
}

/// Publish `message` as JSON under `msg_id` and wait for the stream's ack
pub async fn publish_with_id<T>(
    jetstream: &jetstream::Context,
    subject: &str,
    message: &T,
    msg_id: &str,
) -> InfrastructureResult<()>
where
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;

    let mut headers = HeaderMap::new();
    headers.insert(MSG_ID_HEADER, msg_id);

    let ack = jetstream
        .publish_with_headers(subject.to_string(), headers, payload.into())
        .await
        .map_err(|e| InfrastructureError::NatsPublish(e.to_string()))?;

    let ack = ack
        .await
        .map_err(|e| InfrastructureError::NatsPublish(e.to_string()))?;

    debug!(subject, msg_id, sequence = ack.sequence, duplicate = ack.duplicate, "Published");
    Ok(())
}
