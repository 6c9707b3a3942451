// Copyright (c) 2025 - Cowboy AI, Inc.
//! Survey Aggregate and Answer Records
//!
//! A [`Survey`] owns its ordered list of [`Question`]s; both are saved as one
//! document. [`Answer`]s are standalone records that point back at a survey
//! and a question but are stored and versioned on their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{AnswerId, QuestionId, SurveyId};

/// Number of question deletions remembered per survey
pub const REMOVED_HISTORY: usize = 64;

/// A question nested inside a survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
}

impl Question {
    pub fn new(id: impl Into<QuestionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Record of a question removed by a delete command
///
/// Saved in the same document as the question list, so the removal and its
/// record are one write. A redelivered delete finds its own record here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedQuestion {
    pub question_id: QuestionId,
    pub command_id: Uuid,
}

/// Record of an answer removed by a delete command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedAnswer {
    pub answer: Answer,
    pub command_id: Uuid,
}

fn is_zero(version: &u64) -> bool {
    *version == 0
}

/// Survey aggregate root
///
/// # Invariants
/// - A published survey is immutable
/// - Question ids are unique within the survey
/// - `version` only ever grows; it is assigned by the store on save and is
///   never part of the stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub id: SurveyId,
    pub author: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub published: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Most recent question deletions, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<RemovedQuestion>,
    /// Store version observed when this copy was loaded
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u64,
}

impl Survey {
    /// Create an unpublished, empty survey
    pub fn new(id: impl Into<SurveyId>) -> Self {
        Self {
            id: id.into(),
            author: None,
            create_date: None,
            title: None,
            published: false,
            questions: Vec::new(),
            removed: Vec::new(),
            version: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>, created: DateTime<Utc>) -> Self {
        self.author = Some(author.into());
        self.create_date = Some(created);
        self
    }

    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = questions;
        self
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    /// Number of questions carrying `id`
    pub fn count_question(&self, id: &QuestionId) -> usize {
        self.questions.iter().filter(|q| &q.id == id).count()
    }

    /// True when exactly one question carries `id`
    pub fn has_unique_question(&self, id: &QuestionId) -> bool {
        self.count_question(id) == 1
    }

    /// Current position of the question with `id`
    pub fn position_of(&self, id: &QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| &q.id == id)
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    /// Remember that `command_id` removed `question_id`
    ///
    /// Only the last [`REMOVED_HISTORY`] removals are kept.
    pub fn record_removal(&mut self, question_id: QuestionId, command_id: Uuid) {
        self.removed.push(RemovedQuestion {
            question_id,
            command_id,
        });
        if self.removed.len() > REMOVED_HISTORY {
            let excess = self.removed.len() - REMOVED_HISTORY;
            self.removed.drain(..excess);
        }
    }

    /// Question removed by `command_id`, if that removal is still remembered
    pub fn removed_by(&self, command_id: Uuid) -> Option<&QuestionId> {
        self.removed
            .iter()
            .find(|r| r.command_id == command_id)
            .map(|r| &r.question_id)
    }

    /// Copy as written to a store: the version lives in the store, not the document
    pub fn to_document(&self) -> Survey {
        Survey {
            version: 0,
            ..self.clone()
        }
    }
}

/// Standalone answer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub text: String,
    pub survey_id: SurveyId,
    pub question_id: QuestionId,
}

impl Answer {
    pub fn new(
        id: impl Into<AnswerId>,
        text: impl Into<String>,
        survey_id: impl Into<SurveyId>,
        question_id: impl Into<QuestionId>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            survey_id: survey_id.into(),
            question_id: question_id.into(),
        }
    }

    /// Whether this answer belongs to `survey_id`
    pub fn belongs_to(&self, survey_id: &SurveyId) -> bool {
        &self.survey_id == survey_id
    }
}
