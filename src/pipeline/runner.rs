// Copyright (c) 2025 - Cowboy AI, Inc.
//! JetStream Command Loop
//!
//! Pulls commands from the durable consumer and settles each message:
//!
//! | Result                         | Ack                 |
//! |--------------------------------|---------------------|
//! | stored or rejected             | `ack`               |
//! | infrastructure error           | `Nak` (redeliver)   |
//! | payload is not a command       | `Term` (never retry)|

use async_nats::jetstream::{self, consumer::PullConsumer};
use chrono::Utc;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::consumer::{MutationConsumer, Processed};
use crate::commands::CommandEnvelope;
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::jetstream::Delivery;

/// How a message is settled with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Nak,
    Term,
}

impl Disposition {
    /// Settlement for a processed (or failed) command
    pub fn for_result(result: &InfrastructureResult<Processed>) -> Self {
        match result {
            Ok(_) => Disposition::Ack,
            Err(_) => Disposition::Nak,
        }
    }
}

/// Decode a command payload
pub fn decode(payload: &[u8]) -> InfrastructureResult<CommandEnvelope> {
    serde_json::from_slice(payload).map_err(|e| InfrastructureError::Deserialization(e.to_string()))
}

/// Counters kept by the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub stored: u64,
    pub rejected: u64,
    pub failed: u64,
    pub terminated: u64,
}

impl RunStats {
    pub fn total(&self) -> u64 {
        self.stored + self.rejected + self.failed + self.terminated
    }
}

/// Feeds JetStream messages into a [`MutationConsumer`]
pub struct CommandRunner {
    consumer: PullConsumer,
    pipeline: MutationConsumer,
}

impl CommandRunner {
    pub fn new(consumer: PullConsumer, pipeline: MutationConsumer) -> Self {
        Self { consumer, pipeline }
    }

    /// Run until the message stream ends
    pub async fn run(&self) -> InfrastructureResult<RunStats> {
        // One message per pull; the consumer allows a single ack pending anyway
        let messages = self
            .consumer
            .stream()
            .max_messages_per_batch(1)
            .messages()
            .await
            .map_err(|e| InfrastructureError::NatsSubscribe(e.to_string()))?;

        tokio::pin!(messages);

        let mut stats = RunStats::default();

        while let Some(message) = messages.next().await {
            match message {
                Ok(msg) => self.handle(msg, &mut stats).await,
                Err(e) => {
                    stats.failed += 1;
                    error!(error = %e, "Error receiving message");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }

            if stats.total() % 100 == 0 {
                info!(
                    stored = stats.stored,
                    rejected = stats.rejected,
                    failed = stats.failed,
                    terminated = stats.terminated,
                    "Statistics"
                );
            }
        }

        warn!("Message stream ended");
        Ok(stats)
    }

    async fn handle(&self, msg: jetstream::Message, stats: &mut RunStats) {
        debug!(subject = %msg.subject, "Received message");

        let envelope = match decode(&msg.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                stats.terminated += 1;
                error!(subject = %msg.subject, error = %e, "Undecodable command, terminating");
                settle(&msg, Disposition::Term).await;
                return;
            }
        };

        let delivery = match Delivery::from_message(&msg, Utc::now()) {
            Ok(delivery) => delivery,
            Err(e) => {
                stats.failed += 1;
                error!(error = %e, "Message has no JetStream metadata");
                settle(&msg, Disposition::Nak).await;
                return;
            }
        };

        let command_id = envelope.command_id;
        let result = self.pipeline.process(envelope, delivery).await;
        let disposition = Disposition::for_result(&result);

        match &result {
            Ok(processed) if processed.outcome.is_rejected() => stats.rejected += 1,
            Ok(_) => stats.stored += 1,
            Err(e) => {
                stats.failed += 1;
                error!(command_id = %command_id, error = %e, "Command failed, requesting redelivery");
            }
        }

        settle(&msg, disposition).await;
    }
}

async fn settle(msg: &jetstream::Message, disposition: Disposition) {
    let result = match disposition {
        Disposition::Ack => msg.ack().await,
        Disposition::Nak => msg.ack_with(jetstream::AckKind::Nak(None)).await,
        Disposition::Term => msg.ack_with(jetstream::AckKind::Term).await,
    };

    if let Err(e) = result {
        error!(disposition = ?disposition, error = %e, "Failed to settle message");
    }
}
