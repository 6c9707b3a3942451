// Copyright (c) 2025 - Cowboy AI, Inc.
//! Survey Authoring Commands
//!
//! Commands express author intent and can be rejected by validation. They
//! carry only what is needed to identify the target and the new value, never
//! derived state.
//!
//! # Envelope
//!
//! ```text
//! CommandEnvelope { command_id, correlation_id, issued_at, command }
//! ```
//!
//! `command_id` is the idempotency token: the producer mints it once (UUID v7)
//! and every redelivery of the message carries the same value. Entities created
//! by a command take their id from it (see [`crate::domain::ids`]).
//!
//! # Time Handling
//!
//! `issued_at` is set by the producer. Domain logic never reads the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::{AnswerId, QuestionId, SurveyId};

/// Append a new question to a survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddQuestion {
    pub survey_id: SurveyId,
    pub text: String,
}

/// Replace the text of an existing question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuestion {
    pub survey_id: SurveyId,
    pub question_id: QuestionId,
    pub text: String,
}

/// Remove a question from a survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteQuestion {
    pub survey_id: SurveyId,
    pub question_id: QuestionId,
}

/// Create an answer record for a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAnswer {
    pub survey_id: SurveyId,
    pub question_id: QuestionId,
    pub text: String,
}

/// Replace the text of an existing answer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAnswer {
    pub survey_id: SurveyId,
    pub answer_id: AnswerId,
    pub text: String,
}

/// Delete an answer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAnswer {
    pub survey_id: SurveyId,
    pub answer_id: AnswerId,
}

/// All mutations the pipeline accepts, tagged by action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    AddQuestion(AddQuestion),
    UpdateQuestion(UpdateQuestion),
    DeleteQuestion(DeleteQuestion),
    AddAnswer(AddAnswer),
    UpdateAnswer(UpdateAnswer),
    DeleteAnswer(DeleteAnswer),
}

/// What a command does, independent of its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
}

/// Which kind of entity a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Question,
    Answer,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Question => write!(f, "question"),
            Target::Answer => write!(f, "answer"),
        }
    }
}

impl Command {
    /// Survey the command belongs to (the partition key)
    pub fn survey_id(&self) -> &SurveyId {
        match self {
            Command::AddQuestion(c) => &c.survey_id,
            Command::UpdateQuestion(c) => &c.survey_id,
            Command::DeleteQuestion(c) => &c.survey_id,
            Command::AddAnswer(c) => &c.survey_id,
            Command::UpdateAnswer(c) => &c.survey_id,
            Command::DeleteAnswer(c) => &c.survey_id,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Command::AddQuestion(_) | Command::AddAnswer(_) => Action::Create,
            Command::UpdateQuestion(_) | Command::UpdateAnswer(_) => Action::Update,
            Command::DeleteQuestion(_) | Command::DeleteAnswer(_) => Action::Delete,
        }
    }

    pub fn target(&self) -> Target {
        match self {
            Command::AddQuestion(_) | Command::UpdateQuestion(_) | Command::DeleteQuestion(_) => {
                Target::Question
            }
            Command::AddAnswer(_) | Command::UpdateAnswer(_) | Command::DeleteAnswer(_) => {
                Target::Answer
            }
        }
    }

    /// Existing answer record the command addresses, if any
    pub fn answer_id(&self) -> Option<&AnswerId> {
        match self {
            Command::UpdateAnswer(c) => Some(&c.answer_id),
            Command::DeleteAnswer(c) => Some(&c.answer_id),
            _ => None,
        }
    }
}

/// A command plus its idempotency token and tracing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Idempotency token, stable across redeliveries
    pub command_id: Uuid,

    /// Correlation ID for request tracing
    pub correlation_id: Uuid,

    /// When the producer accepted the command
    pub issued_at: DateTime<Utc>,

    pub command: Command,
}

impl CommandEnvelope {
    /// Wrap a command with explicit metadata
    pub fn new(
        command_id: Uuid,
        correlation_id: Uuid,
        issued_at: DateTime<Utc>,
        command: Command,
    ) -> Self {
        Self {
            command_id,
            correlation_id,
            issued_at,
            command,
        }
    }

    pub fn survey_id(&self) -> &SurveyId {
        self.command.survey_id()
    }
}

impl fmt::Display for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on survey {} ({})",
            self.command.action(),
            self.command.target(),
            self.command.survey_id(),
            self.command_id
        )
    }
}
