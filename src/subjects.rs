// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for survey authoring
//!
//! # Subject Pattern
//!
//! ```text
//! authoring.{aggregate}.{operation}.{survey_id}
//! ```
//!
//! The trailing survey id is the partition key: every command for one survey
//! lands on the same subject, and JetStream preserves publish order within it.
//!
//! # Partitions
//!
//! The command stream rewrites every captured subject on arrival, inserting a
//! partition number hashed from the survey id:
//!
//! ```text
//! authoring.question.captured.s-1  →  authoring.question.captured.3.s-1
//! authoring.answer.captured.s-1    →  authoring.answer.captured.3.s-1
//! ```
//!
//! Questions and answers of one survey always share a partition. Each
//! partition has its own consumer, so surveys in different partitions are
//! processed in parallel while one survey is still handled in order.
//!
//! | Subject                                   | Direction | Payload            |
//! |-------------------------------------------|-----------|--------------------|
//! | `authoring.question.captured.<survey>`    | inbound   | `CommandEnvelope`  |
//! | `authoring.answer.captured.<survey>`      | inbound   | `CommandEnvelope`  |
//! | `authoring.survey.stored.<survey>`        | outbound  | `SurveyStored`     |
//! | `authoring.answer.stored.<survey>`        | outbound  | `AnswersStored`    |
//! | `authoring.command.rejected.<survey>`     | outbound  | `CommandRejected`  |
//!
//! # Examples
//!
//! ```rust
//! use survey_authoring::subjects::{SubjectBuilder, AggregateType, Operation};
//!
//! let subject = SubjectBuilder::new(AggregateType::Question)
//!     .operation(Operation::Captured)
//!     .survey("s-1")
//!     .build();
//! assert_eq!(subject, "authoring.question.captured.s-1");
//!
//! let filter = SubjectBuilder::new(AggregateType::Question)
//!     .operation(Operation::Captured)
//!     .build();
//! assert_eq!(filter, "authoring.question.captured.*");
//! ```

use std::fmt;

use crate::commands::Target;

/// Root namespace for all authoring subjects
pub const AUTHORING_ROOT: &str = "authoring";

/// Authoring aggregate types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateType {
    /// Survey documents
    Survey,
    /// Questions nested in a survey
    Question,
    /// Standalone answer records
    Answer,
    /// Commands themselves (rejections)
    Command,
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateType::Survey => write!(f, "survey"),
            AggregateType::Question => write!(f, "question"),
            AggregateType::Answer => write!(f, "answer"),
            AggregateType::Command => write!(f, "command"),
        }
    }
}

impl From<Target> for AggregateType {
    fn from(target: Target) -> Self {
        match target {
            Target::Question => AggregateType::Question,
            Target::Answer => AggregateType::Answer,
        }
    }
}

/// Authoring operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A command was accepted by the producer and queued
    Captured,
    /// A mutation was persisted
    Stored,
    /// A command was dropped with a violation report
    Rejected,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Captured => write!(f, "captured"),
            Operation::Stored => write!(f, "stored"),
            Operation::Rejected => write!(f, "rejected"),
        }
    }
}

/// Builder for authoring NATS subjects
#[derive(Debug, Clone)]
pub struct SubjectBuilder {
    aggregate: AggregateType,
    operation: Option<Operation>,
    survey_id: Option<String>,
}

impl SubjectBuilder {
    pub fn new(aggregate: AggregateType) -> Self {
        Self {
            aggregate,
            operation: None,
            survey_id: None,
        }
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Set the partition key
    pub fn survey(mut self, survey_id: impl AsRef<str>) -> Self {
        self.survey_id = Some(survey_id.as_ref().to_string());
        self
    }

    /// Build the subject
    ///
    /// Without an operation this is `authoring.{aggregate}.>`; without a
    /// survey id the last token is the single-token wildcard `*`.
    pub fn build(self) -> String {
        let Some(operation) = self.operation else {
            return self.build_wildcard();
        };

        match self.survey_id.as_deref() {
            Some(survey_id) => format!(
                "{}.{}.{}.{}",
                AUTHORING_ROOT, self.aggregate, operation, survey_id
            ),
            None => format!("{}.{}.{}.*", AUTHORING_ROOT, self.aggregate, operation),
        }
    }

    /// `authoring.{aggregate}.>`
    pub fn build_wildcard(&self) -> String {
        format!("{}.{}.>", AUTHORING_ROOT, self.aggregate)
    }

    /// `authoring.>`
    pub fn build_all() -> String {
        format!("{}.>", AUTHORING_ROOT)
    }
}

/// Convenience functions for common subject patterns
pub mod subjects {
    use super::*;

    /// Inbound subject for a command targeting `target` on `survey_id`
    pub fn captured(target: Target, survey_id: &str) -> String {
        SubjectBuilder::new(target.into())
            .operation(Operation::Captured)
            .survey(survey_id)
            .build()
    }

    pub fn survey_stored(survey_id: &str) -> String {
        SubjectBuilder::new(AggregateType::Survey)
            .operation(Operation::Stored)
            .survey(survey_id)
            .build()
    }

    pub fn answer_stored(survey_id: &str) -> String {
        SubjectBuilder::new(AggregateType::Answer)
            .operation(Operation::Stored)
            .survey(survey_id)
            .build()
    }

    pub fn command_rejected(survey_id: &str) -> String {
        SubjectBuilder::new(AggregateType::Command)
            .operation(Operation::Rejected)
            .survey(survey_id)
            .build()
    }

    /// Every inbound command subject
    pub fn all_captured() -> Vec<String> {
        vec![
            SubjectBuilder::new(AggregateType::Question)
                .operation(Operation::Captured)
                .build(),
            SubjectBuilder::new(AggregateType::Answer)
                .operation(Operation::Captured)
                .build(),
        ]
    }

    /// Every outbound event subject
    pub fn all_outbound() -> Vec<String> {
        vec![
            SubjectBuilder::new(AggregateType::Survey)
                .operation(Operation::Stored)
                .build(),
            SubjectBuilder::new(AggregateType::Answer)
                .operation(Operation::Stored)
                .build(),
            SubjectBuilder::new(AggregateType::Command)
                .operation(Operation::Rejected)
                .build(),
        ]
    }

    pub fn all_authoring_events() -> String {
        SubjectBuilder::build_all()
    }

    /// Subjects of a partitioned command stream: what producers publish, and
    /// what the stream stores after inserting the partition token
    pub fn partitioned_command_subjects() -> Vec<String> {
        vec![
            format!("{AUTHORING_ROOT}.*.{}.*", Operation::Captured),
            format!("{AUTHORING_ROOT}.*.{}.*.*", Operation::Captured),
        ]
    }

    /// Stream transform `(source, destination)` that partitions commands
    /// into `partitions` buckets by survey id
    pub fn partition_transform(partitions: u16) -> (String, String) {
        (
            format!("{AUTHORING_ROOT}.*.{}.*", Operation::Captured),
            format!(
                "{AUTHORING_ROOT}.{{{{wildcard(1)}}}}.{}.{{{{partition({partitions},2)}}}}.{{{{wildcard(2)}}}}",
                Operation::Captured
            ),
        )
    }

    /// Consumer filter for the commands of one partition
    pub fn partition_filter(partition: u16) -> String {
        format!("{AUTHORING_ROOT}.*.{}.{partition}.*", Operation::Captured)
    }

    /// Consumer filter for the commands of one survey, whatever its partition
    pub fn survey_commands(survey_id: &str) -> String {
        format!("{AUTHORING_ROOT}.*.{}.*.{survey_id}", Operation::Captured)
    }
}
