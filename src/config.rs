// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment-driven configuration
//!
//! | Variable                          | Default                   |
//! |-----------------------------------|---------------------------|
//! | `NATS_URL`                        | `nats://localhost:4222`   |
//! | `NATS_CLIENT_NAME`                | `survey-authoring`        |
//! | `AUTHORING_COMMAND_STREAM`        | `AUTHORING_COMMANDS`      |
//! | `AUTHORING_EVENT_STREAM`          | `AUTHORING_EVENTS`        |
//! | `AUTHORING_CONSUMER`              | `authoring-mutations`     |
//! | `AUTHORING_PARTITIONS`            | `8`                       |
//! | `AUTHORING_SURVEY_BUCKET`         | `surveys`                 |
//! | `AUTHORING_ANSWER_BUCKET`         | `answers`                 |
//! | `AUTHORING_MAX_CONFLICT_RETRIES`  | `3`                       |
//! | `AUTHORING_MAX_DELIVER`           | `10`                      |
//! | `AUTHORING_ANSWER_RETENTION`      | `cascade`                 |

use std::fmt;
use std::str::FromStr;

use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::jetstream::{ConsumerConfig, JetStreamConfig};
use crate::nats::NatsConfig;

/// What happens to a question's answers when the question is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerRetention {
    /// Delete them once the survey save has succeeded
    #[default]
    Cascade,
    /// Leave them in the answer store
    Orphan,
}

impl FromStr for AnswerRetention {
    type Err = InfrastructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(AnswerRetention::Cascade),
            "orphan" => Ok(AnswerRetention::Orphan),
            other => Err(InfrastructureError::Configuration(format!(
                "unknown answer retention '{other}', expected 'cascade' or 'orphan'"
            ))),
        }
    }
}

impl fmt::Display for AnswerRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerRetention::Cascade => write!(f, "cascade"),
            AnswerRetention::Orphan => write!(f, "orphan"),
        }
    }
}

/// Pipeline tuning that does not depend on the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Reload-and-retry attempts after a lost conditional save
    pub max_conflict_retries: u32,
    pub answer_retention: AnswerRetention,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            answer_retention: AnswerRetention::Cascade,
        }
    }
}

/// Complete configuration of the authoring consumer
#[derive(Debug, Clone)]
pub struct AuthoringConfig {
    pub nats: NatsConfig,
    pub command_stream: JetStreamConfig,
    pub event_stream: JetStreamConfig,
    pub consumer: ConsumerConfig,
    pub survey_bucket: String,
    pub answer_bucket: String,
    pub pipeline: PipelineConfig,
}

impl Default for AuthoringConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig::default(),
            command_stream: JetStreamConfig::commands(),
            event_stream: JetStreamConfig::events(),
            consumer: ConsumerConfig::default(),
            survey_bucket: "surveys".to_string(),
            answer_bucket: "answers".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AuthoringConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> InfrastructureResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> InfrastructureResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("NATS_URL") {
            config.nats.servers = url.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(name) = lookup("NATS_CLIENT_NAME") {
            config.nats.name = name;
        }
        if let Some(name) = lookup("AUTHORING_COMMAND_STREAM") {
            config.command_stream = config.command_stream.with_name(name);
        }
        if let Some(name) = lookup("AUTHORING_EVENT_STREAM") {
            config.event_stream = config.event_stream.with_name(name);
        }
        if let Some(name) = lookup("AUTHORING_CONSUMER") {
            config.consumer.name = name;
        }
        if let Some(partitions) = lookup("AUTHORING_PARTITIONS") {
            let partitions: u16 = parse("AUTHORING_PARTITIONS", &partitions)?;
            if partitions == 0 {
                return Err(InfrastructureError::Configuration(
                    "AUTHORING_PARTITIONS must be at least 1".to_string(),
                ));
            }
            config.command_stream = config.command_stream.with_partitions(partitions);
        }
        if let Some(bucket) = lookup("AUTHORING_SURVEY_BUCKET") {
            config.survey_bucket = bucket;
        }
        if let Some(bucket) = lookup("AUTHORING_ANSWER_BUCKET") {
            config.answer_bucket = bucket;
        }
        if let Some(retries) = lookup("AUTHORING_MAX_CONFLICT_RETRIES") {
            config.pipeline.max_conflict_retries = parse("AUTHORING_MAX_CONFLICT_RETRIES", &retries)?;
        }
        if let Some(max_deliver) = lookup("AUTHORING_MAX_DELIVER") {
            config.consumer.max_deliver = parse("AUTHORING_MAX_DELIVER", &max_deliver)?;
        }
        if let Some(retention) = lookup("AUTHORING_ANSWER_RETENTION") {
            config.pipeline.answer_retention = retention.parse()?;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> InfrastructureResult<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| InfrastructureError::Configuration(format!("{key}='{value}': {e}")))
}
