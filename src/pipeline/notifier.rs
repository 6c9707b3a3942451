// Copyright (c) 2025 - Cowboy AI, Inc.
//! Notification Producer
//!
//! Publishes stored-state snapshots and rejections. Subjects come from the
//! event itself (see [`AuthoringEvent::route`]) and the event id doubles as
//! the JetStream dedup id, so a command reprocessed after a crash does not
//! publish the same snapshot twice within the duplicate window.
//!
//! A rejection of a command whose survey id is not a usable subject token is
//! published under [`UNADDRESSABLE_SURVEY`] instead of the id.

use async_nats::jetstream;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::events::AuthoringEvent;
use crate::nats::publish_with_id;
use crate::subjects::SubjectBuilder;

/// Subject token used for survey ids that cannot be one
pub const UNADDRESSABLE_SURVEY: &str = "_unaddressable";

/// Subject an event is published on
pub fn subject_for(event: &AuthoringEvent) -> String {
    let (aggregate, operation) = event.route();
    let survey = event.survey_id().token().unwrap_or(UNADDRESSABLE_SURVEY);
    SubjectBuilder::new(aggregate)
        .operation(operation)
        .survey(survey)
        .build()
}

/// Outbound side of the pipeline
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: &AuthoringEvent) -> InfrastructureResult<()>;
}

/// Publishes events as JSON on JetStream
#[derive(Clone)]
pub struct NatsNotifier {
    jetstream: jetstream::Context,
}

impl NatsNotifier {
    pub fn new(jetstream: jetstream::Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn publish(&self, event: &AuthoringEvent) -> InfrastructureResult<()> {
        let subject = subject_for(event);
        publish_with_id(&self.jetstream, &subject, event, &event.event_id().to_string()).await?;
        debug!(subject = %subject, event_type = event.event_type_name(), "Notified");
        Ok(())
    }
}

/// Keeps published events in memory
///
/// Can be armed to fail the next publishes, to exercise the broker
/// redelivery path.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<AuthoringEvent>>,
    failures: Mutex<u32>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` publishes with a publish error
    pub fn fail_next(&self, count: u32) {
        if let Ok(mut failures) = self.failures.lock() {
            *failures = count;
        }
    }

    /// Every event published so far, in order
    pub fn events(&self) -> Vec<AuthoringEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<AuthoringEvent> {
        self.events().pop()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, event: &AuthoringEvent) -> InfrastructureResult<()> {
        if let Ok(mut failures) = self.failures.lock() {
            if *failures > 0 {
                *failures -= 1;
                return Err(InfrastructureError::NatsPublish("broker unavailable".to_string()));
            }
        }

        self.events
            .lock()
            .map_err(|e| InfrastructureError::NatsPublish(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}
