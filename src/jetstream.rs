// Copyright (c) 2025 - Cowboy AI, Inc.

//! JetStream configuration and setup for survey authoring
//!
//! Two streams carry all authoring traffic:
//!
//! - **AUTHORING_COMMANDS**: `authoring.{question,answer}.captured.<survey>`.
//!   On arrival the stream rewrites each subject to
//!   `authoring.<target>.captured.<partition>.<survey>`, where the partition
//!   is a hash of the survey id. One consumer per partition, each with a
//!   single command in flight, keeps per-survey order while surveys in
//!   different partitions are processed in parallel.
//! - **AUTHORING_EVENTS**: stored-state snapshots and rejections.
//!
//! The transform is part of the stream config, so changing the partition
//! count of an existing stream means recreating it.
//!
//! Both streams keep a duplicate window so a publish carrying a
//! `Nats-Msg-Id` seen within the window is dropped by the server.
//!
//! # Example
//!
//! ```rust,no_run
//! use survey_authoring::jetstream::{JetStreamConfig, create_stream};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = async_nats::connect("nats://localhost:4222").await?;
//!     let jetstream = async_nats::jetstream::new(client);
//!
//!     let stream = create_stream(&jetstream, JetStreamConfig::commands()).await?;
//!
//!     Ok(())
//! }
//! ```

use async_nats::jetstream::{self, consumer::PullConsumer, stream::Stream};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::subjects::subjects;

/// Partitions of the command stream unless configured otherwise
pub const DEFAULT_PARTITIONS: u16 = 8;

/// Configuration for one authoring stream
#[derive(Debug, Clone)]
pub struct JetStreamConfig {
    pub stream_name: String,

    /// Subjects this stream will capture
    pub subjects: Vec<String>,

    /// Maximum age of messages
    pub max_age: Duration,

    /// Maximum bytes stored in stream (default: 1GB)
    pub max_bytes: i64,

    /// Where the server keeps the stream
    pub storage: StorageType,

    /// Replica count; above 1 only on a cluster
    pub replicas: usize,

    pub retention: RetentionPolicy,

    /// Window in which a repeated `Nats-Msg-Id` is dropped
    pub duplicate_window: Duration,

    /// Hash captured subjects into this many partitions by survey id
    pub partitions: Option<u16>,
}

impl JetStreamConfig {
    /// Inbound command stream, partitioned by survey
    pub fn commands() -> Self {
        Self {
            stream_name: "AUTHORING_COMMANDS".to_string(),
            subjects: subjects::partitioned_command_subjects(),
            max_age: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
            partitions: Some(DEFAULT_PARTITIONS),
            ..Self::default()
        }
    }

    /// Outbound stored-state and rejection stream
    pub fn events() -> Self {
        Self {
            stream_name: "AUTHORING_EVENTS".to_string(),
            subjects: subjects::all_outbound(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.stream_name = name.into();
        self
    }

    pub fn with_partitions(mut self, partitions: u16) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Partition numbers consumers must cover; empty when unpartitioned
    pub fn partition_numbers(&self) -> std::ops::Range<u16> {
        0..self.partitions.unwrap_or(0)
    }
}

impl Default for JetStreamConfig {
    fn default() -> Self {
        Self {
            stream_name: "AUTHORING_EVENTS".to_string(),
            subjects: vec!["authoring.>".to_string()],
            max_age: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            max_bytes: 1024 * 1024 * 1024,                   // 1 GB
            storage: StorageType::File,
            replicas: 1,
            retention: RetentionPolicy::Limits,
            duplicate_window: Duration::from_secs(2 * 60),
            partitions: None,
        }
    }
}

/// Stream storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Survives server restarts
    File,
    /// Lost on restart; tests and scratch streams
    Memory,
}

/// When the server may discard stream messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep until `max_age` or `max_bytes` is hit
    Limits,
    /// Keep while some consumer still needs the message
    Interest,
    /// Drop once acknowledged
    WorkQueue,
}

/// Where and how often a command was delivered
///
/// Attached to every processed command and carried into rejection events so
/// an operator can find the original message in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub subject: String,

    /// Sequence of the message in the command stream
    pub stream_sequence: u64,

    /// Delivery attempt, starting at 1
    pub delivered: i64,

    pub received_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(subject: impl Into<String>, stream_sequence: u64, delivered: i64, received_at: DateTime<Utc>) -> Self {
        Self {
            subject: subject.into(),
            stream_sequence,
            delivered,
            received_at,
        }
    }

    /// Metadata of a JetStream message
    pub fn from_message(message: &jetstream::Message, received_at: DateTime<Utc>) -> InfrastructureResult<Self> {
        let info = message
            .info()
            .map_err(|e| InfrastructureError::NatsSubscribe(e.to_string()))?;

        Ok(Self {
            subject: message.subject.to_string(),
            stream_sequence: info.stream_sequence,
            delivered: info.delivered,
            received_at,
        })
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivered > 1
    }
}

/// Create the stream if it does not exist
///
/// Idempotent; an existing stream is returned as-is.
pub async fn create_stream(
    jetstream: &jetstream::Context,
    config: JetStreamConfig,
) -> InfrastructureResult<Stream> {
    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    let retention = match config.retention {
        RetentionPolicy::Limits => jetstream::stream::RetentionPolicy::Limits,
        RetentionPolicy::Interest => jetstream::stream::RetentionPolicy::Interest,
        RetentionPolicy::WorkQueue => jetstream::stream::RetentionPolicy::WorkQueue,
    };

    let subject_transform = config.partitions.map(|partitions| {
        let (source, destination) = subjects::partition_transform(partitions);
        jetstream::stream::SubjectTransform { source, destination }
    });

    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: config.subjects,
        max_age: config.max_age,
        max_bytes: config.max_bytes,
        storage,
        num_replicas: config.replicas,
        retention,
        duplicate_window: config.duplicate_window,
        subject_transform,
        ..Default::default()
    };

    let stream = jetstream
        .get_or_create_stream(stream_config)
        .await
        .map_err(|e| InfrastructureError::NatsConnection(e.to_string()))?;

    info!(stream = %config.stream_name, partitions = ?config.partitions, "Stream ready");
    Ok(stream)
}

/// Pull consumer configuration for the mutation consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Durable name (survives restarts)
    pub name: String,

    /// Filter subjects; empty means every subject of the stream
    pub filter_subjects: Vec<String>,

    /// Maximum unacknowledged messages in flight
    ///
    /// 1 means one command at a time, which is what keeps per-survey order.
    pub max_ack_pending: i64,

    /// Delivery attempts before the server gives up on a message
    pub max_deliver: i64,

    /// How long the server waits for an ack before redelivering
    pub ack_wait: Duration,
}

impl ConsumerConfig {
    /// Durable consumer for one partition of the command stream
    pub fn for_partition(&self, partition: u16) -> Self {
        Self {
            name: format!("{}-{partition}", self.name),
            filter_subjects: vec![subjects::partition_filter(partition)],
            ..self.clone()
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            name: "authoring-mutations".to_string(),
            filter_subjects: Vec::new(),
            max_ack_pending: 1,
            max_deliver: 10,
            ack_wait: Duration::from_secs(30),
        }
    }
}

/// Get the durable pull consumer, creating it when missing
pub async fn ensure_pull_consumer(stream: &Stream, config: &ConsumerConfig) -> InfrastructureResult<PullConsumer> {
    if let Ok(consumer) = stream.get_consumer::<jetstream::consumer::pull::Config>(&config.name).await {
        info!(consumer = %config.name, "Found existing consumer");
        return Ok(consumer);
    }

    info!(consumer = %config.name, "Consumer not found, creating");
    let consumer = stream
        .create_consumer(jetstream::consumer::pull::Config {
            durable_name: Some(config.name.clone()),
            filter_subjects: config.filter_subjects.clone(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            deliver_policy: jetstream::consumer::DeliverPolicy::All,
            max_ack_pending: config.max_ack_pending,
            max_deliver: config.max_deliver,
            ack_wait: config.ack_wait,
            ..Default::default()
        })
        .await
        .map_err(|e| InfrastructureError::NatsSubscribe(e.to_string()))?;

    Ok(consumer)
}
