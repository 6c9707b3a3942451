// Copyright (c) 2025 - Cowboy AI, Inc.
//! Authoring Event Envelope
//!
//! One enum over every outbound event so a downstream consumer can subscribe
//! to `authoring.>` and decode whatever arrives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stored::{AnswersStored, CommandRejected, SurveyStored};
use crate::domain::SurveyId;
use crate::subjects::{AggregateType, Operation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "event", rename_all = "snake_case")]
pub enum AuthoringEvent {
    SurveyStored(SurveyStored),
    AnswersStored(AnswersStored),
    CommandRejected(CommandRejected),
}

impl AuthoringEvent {
    pub fn event_id(&self) -> Uuid {
        match self {
            AuthoringEvent::SurveyStored(e) => e.event_id,
            AuthoringEvent::AnswersStored(e) => e.event_id,
            AuthoringEvent::CommandRejected(e) => e.event_id,
        }
    }

    pub fn survey_id(&self) -> &SurveyId {
        match self {
            AuthoringEvent::SurveyStored(e) => &e.survey_id,
            AuthoringEvent::AnswersStored(e) => &e.survey_id,
            AuthoringEvent::CommandRejected(e) => &e.survey_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AuthoringEvent::SurveyStored(e) => e.timestamp,
            AuthoringEvent::AnswersStored(e) => e.timestamp,
            AuthoringEvent::CommandRejected(e) => e.timestamp,
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        match self {
            AuthoringEvent::SurveyStored(e) => e.correlation_id,
            AuthoringEvent::AnswersStored(e) => e.correlation_id,
            AuthoringEvent::CommandRejected(e) => e.correlation_id,
        }
    }

    /// Name used in logs and as the event type
    pub fn event_type_name(&self) -> &'static str {
        match self {
            AuthoringEvent::SurveyStored(_) => "SurveyStored",
            AuthoringEvent::AnswersStored(_) => "AnswersStored",
            AuthoringEvent::CommandRejected(_) => "CommandRejected",
        }
    }

    /// Subject segments this event is published under
    pub fn route(&self) -> (AggregateType, Operation) {
        match self {
            AuthoringEvent::SurveyStored(_) => (AggregateType::Survey, Operation::Stored),
            AuthoringEvent::AnswersStored(_) => (AggregateType::Answer, Operation::Stored),
            AuthoringEvent::CommandRejected(_) => (AggregateType::Command, Operation::Rejected),
        }
    }
}

impl From<SurveyStored> for AuthoringEvent {
    fn from(event: SurveyStored) -> Self {
        AuthoringEvent::SurveyStored(event)
    }
}

impl From<AnswersStored> for AuthoringEvent {
    fn from(event: AnswersStored) -> Self {
        AuthoringEvent::AnswersStored(event)
    }
}

impl From<CommandRejected> for AuthoringEvent {
    fn from(event: CommandRejected) -> Self {
        AuthoringEvent::CommandRejected(event)
    }
}
