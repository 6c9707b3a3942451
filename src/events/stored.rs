// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stored-State and Rejection Events
//!
//! Stored-state events carry a complete snapshot, never a delta. Consumers that
//! need to know what changed diff consecutive snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commands::CommandEnvelope;
use crate::domain::{derive_entity_id, Answer, QuestionId, Survey, SurveyId};
use crate::jetstream::Delivery;
use crate::validation::ViolationReport;

/// Current schema version of every event in this module
pub const EVENT_VERSION: u32 = 1;

/// Event id for the `kind` event caused by `command_id`
///
/// Deterministic, so a redelivered command republishes under the same id and
/// JetStream's duplicate window drops the copy.
pub fn event_id_for(command_id: Uuid, kind: &str) -> Uuid {
    let seed = derive_entity_id(command_id);
    Uuid::new_v5(&crate::domain::ids::ENTITY_NAMESPACE, format!("{seed}:{kind}").as_bytes())
}

/// Survey document after a successful question mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyStored {
    pub event_version: u32,
    pub event_id: Uuid,
    pub survey_id: SurveyId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    /// Command that produced this state
    pub causation_id: Uuid,
    /// Full post-mutation snapshot, including its store version
    pub survey: Survey,
}

impl SurveyStored {
    pub fn new(envelope: &CommandEnvelope, survey: Survey, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_version: EVENT_VERSION,
            event_id: event_id_for(envelope.command_id, "survey_stored"),
            survey_id: survey.id.clone(),
            timestamp,
            correlation_id: envelope.correlation_id,
            causation_id: envelope.command_id,
            survey,
        }
    }
}

/// Answer set of one question after a successful answer mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswersStored {
    pub event_version: u32,
    pub event_id: Uuid,
    pub survey_id: SurveyId,
    pub question_id: QuestionId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    pub answers: Vec<Answer>,
}

impl AnswersStored {
    pub fn new(
        envelope: &CommandEnvelope,
        survey_id: SurveyId,
        question_id: QuestionId,
        answers: Vec<Answer>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_version: EVENT_VERSION,
            event_id: event_id_for(envelope.command_id, "answers_stored"),
            survey_id,
            question_id,
            timestamp,
            correlation_id: envelope.correlation_id,
            causation_id: envelope.command_id,
            answers,
        }
    }
}

/// A command dropped for data reasons, for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRejected {
    pub event_version: u32,
    pub event_id: Uuid,
    pub survey_id: SurveyId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    /// The command exactly as received
    pub command: CommandEnvelope,
    pub violations: ViolationReport,
    pub delivery: Delivery,
}

impl CommandRejected {
    pub fn new(
        envelope: CommandEnvelope,
        violations: ViolationReport,
        delivery: Delivery,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_version: EVENT_VERSION,
            event_id: event_id_for(envelope.command_id, "command_rejected"),
            survey_id: envelope.survey_id().clone(),
            timestamp,
            correlation_id: envelope.correlation_id,
            causation_id: envelope.command_id,
            command: envelope,
            violations,
            delivery,
        }
    }
}
