// Copyright (c) 2025 - Cowboy AI, Inc.
//! Command Validation
//!
//! Validation runs in two phases:
//!
//! ```text
//! pre-checks (id usable, survey exists,
//!             not published)                  → short-circuit, one message
//! per-action rules                            → accumulate, every message
//! ```
//!
//! Pre-checks cannot be accumulated with entity rules because there is no
//! aggregate to check those rules against. Entity rules are independent of
//! each other and all run, in a fixed order, so an update with both a bad id
//! and blank text reports both.
//!
//! Every function here is pure: no I/O, no clock.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::commands::{
    AddAnswer, AddQuestion, Command, DeleteAnswer, DeleteQuestion, UpdateAnswer, UpdateQuestion,
};
use crate::domain::{Answer, QuestionId, Survey, SurveyId};

pub const QUESTION_TEXT_EMPTY_ON_ADD: &str = "Question text can not be empty.";
pub const QUESTION_TEXT_EMPTY: &str = "Question text can't be null or empty.";
pub const QUESTION_ID_INVALID: &str = "Question id is not valid.";
pub const ANSWER_TEXT_EMPTY: &str = "Answer text can't be null or empty.";
pub const ANSWER_ID_INVALID: &str = "Answer id is not valid.";
pub const SURVEY_ID_INVALID: &str = "Survey id is not valid.";

pub fn survey_not_found(survey_id: &SurveyId) -> String {
    format!("Survey with id [{}] could not be found", survey_id)
}

pub fn survey_already_published(survey_id: &SurveyId) -> String {
    format!("Survey [{}] is already published", survey_id)
}

/// Ordered, non-empty list of human-readable validation failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationReport(Vec<String>);

impl ViolationReport {
    /// Build a report; `None` when there is nothing to report
    pub fn from_messages(messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self(messages))
        }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the report holds no messages
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.0.iter().any(|m| m == message)
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// The survey id must be usable as a subject token before anything is loaded
pub fn check_survey_id(survey_id: &SurveyId) -> Result<(), ViolationReport> {
    if !survey_id.is_valid() {
        return Err(ViolationReport::single(SURVEY_ID_INVALID));
    }
    Ok(())
}

/// Fatal pre-checks: the id must be usable, the survey must exist and must
/// not be published
pub fn check_survey<'a>(
    survey_id: &SurveyId,
    survey: Option<&'a Survey>,
) -> Result<&'a Survey, ViolationReport> {
    check_survey_id(survey_id)?;
    let survey = survey.ok_or_else(|| ViolationReport::single(survey_not_found(survey_id)))?;
    if survey.published {
        return Err(ViolationReport::single(survey_already_published(survey_id)));
    }
    Ok(survey)
}

fn check_question_id(survey: &Survey, question_id: &QuestionId, violations: &mut Vec<String>) {
    if !question_id.is_valid() || !survey.has_unique_question(question_id) {
        violations.push(QUESTION_ID_INVALID.to_string());
    }
}

fn check_answer_record(survey: &Survey, answer: Option<&Answer>, violations: &mut Vec<String>) {
    let valid = answer.map(|a| a.belongs_to(&survey.id)).unwrap_or(false);
    if !valid {
        violations.push(ANSWER_ID_INVALID.to_string());
    }
}

pub fn validate_add_question(command: &AddQuestion, _survey: &Survey) -> Vec<String> {
    let mut violations = Vec::new();
    if is_blank(&command.text) {
        violations.push(QUESTION_TEXT_EMPTY_ON_ADD.to_string());
    }
    violations
}

pub fn validate_update_question(command: &UpdateQuestion, survey: &Survey) -> Vec<String> {
    let mut violations = Vec::new();
    check_question_id(survey, &command.question_id, &mut violations);
    if is_blank(&command.text) {
        violations.push(QUESTION_TEXT_EMPTY.to_string());
    }
    violations
}

pub fn validate_delete_question(command: &DeleteQuestion, survey: &Survey) -> Vec<String> {
    let mut violations = Vec::new();
    check_question_id(survey, &command.question_id, &mut violations);
    violations
}

pub fn validate_add_answer(command: &AddAnswer, survey: &Survey) -> Vec<String> {
    let mut violations = Vec::new();
    check_question_id(survey, &command.question_id, &mut violations);
    if is_blank(&command.text) {
        violations.push(ANSWER_TEXT_EMPTY.to_string());
    }
    violations
}

pub fn validate_update_answer(
    command: &UpdateAnswer,
    survey: &Survey,
    answer: Option<&Answer>,
) -> Vec<String> {
    let mut violations = Vec::new();
    check_answer_record(survey, answer, &mut violations);
    if is_blank(&command.text) {
        violations.push(ANSWER_TEXT_EMPTY.to_string());
    }
    violations
}

pub fn validate_delete_answer(
    _command: &DeleteAnswer,
    survey: &Survey,
    answer: Option<&Answer>,
) -> Vec<String> {
    let mut violations = Vec::new();
    check_answer_record(survey, answer, &mut violations);
    violations
}

/// Per-action rules against an already pre-checked survey
///
/// `answer` is the stored record named by the command (update/delete answer);
/// it is ignored for every other action.
pub fn validate(command: &Command, survey: &Survey, answer: Option<&Answer>) -> Vec<String> {
    match command {
        Command::AddQuestion(c) => validate_add_question(c, survey),
        Command::UpdateQuestion(c) => validate_update_question(c, survey),
        Command::DeleteQuestion(c) => validate_delete_question(c, survey),
        Command::AddAnswer(c) => validate_add_answer(c, survey),
        Command::UpdateAnswer(c) => validate_update_answer(c, survey, answer),
        Command::DeleteAnswer(c) => validate_delete_answer(c, survey, answer),
    }
}

/// Pre-checks followed by the per-action rules
pub fn validate_command<'a>(
    command: &Command,
    survey: Option<&'a Survey>,
    answer: Option<&Answer>,
) -> Result<&'a Survey, ViolationReport> {
    let survey = check_survey(command.survey_id(), survey)?;
    match ViolationReport::from_messages(validate(command, survey, answer)) {
        Some(report) => Err(report),
        None => Ok(survey),
    }
}
