// Copyright (c) 2025 - Cowboy AI, Inc.
//! Command Producer
//!
//! Publishes command envelopes to the captured subject of their survey. The
//! broker ack only means the command is queued; the outcome arrives later
//! on the stored or rejected subject.

use async_nats::jetstream;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

use crate::commands::CommandEnvelope;
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::nats::publish_with_id;
use crate::subjects::subjects;

/// Subject a command is published on
pub fn subject_for(envelope: &CommandEnvelope) -> String {
    subjects::captured(envelope.command.target(), envelope.survey_id().as_str())
}

/// Subject for `envelope`, refusing survey ids that would not be one token
fn checked_subject(envelope: &CommandEnvelope) -> InfrastructureResult<String> {
    envelope.survey_id().token()?;
    Ok(subject_for(envelope))
}

/// Inbound side of the pipeline
#[async_trait]
pub trait CommandProducer: Send + Sync {
    async fn publish(&self, envelope: &CommandEnvelope) -> InfrastructureResult<()>;
}

/// Publishes commands on JetStream, deduplicated by command id
#[derive(Clone)]
pub struct NatsCommandProducer {
    jetstream: jetstream::Context,
}

impl NatsCommandProducer {
    pub fn new(jetstream: jetstream::Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl CommandProducer for NatsCommandProducer {
    async fn publish(&self, envelope: &CommandEnvelope) -> InfrastructureResult<()> {
        let subject = checked_subject(envelope)?;
        publish_with_id(&self.jetstream, &subject, envelope, &envelope.command_id.to_string()).await?;

        info!(
            command_id = %envelope.command_id,
            correlation_id = %envelope.correlation_id,
            subject = %subject,
            "Command queued"
        );
        Ok(())
    }
}

/// Keeps published commands in memory
#[derive(Debug, Default)]
pub struct RecordingProducer {
    published: Mutex<Vec<(String, CommandEnvelope)>>,
}

impl RecordingProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(subject, envelope)` pairs in publish order
    pub fn published(&self) -> Vec<(String, CommandEnvelope)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandProducer for RecordingProducer {
    async fn publish(&self, envelope: &CommandEnvelope) -> InfrastructureResult<()> {
        let subject = checked_subject(envelope)?;
        self.published
            .lock()
            .map_err(|e| InfrastructureError::NatsPublish(e.to_string()))?
            .push((subject, envelope.clone()));
        Ok(())
    }
}
