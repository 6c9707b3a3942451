// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Mutation Handlers
//!
//! Handlers take the loaded state and a validated command and return the new
//! state. They never touch a store or the broker.
//!
//! ```text
//! apply(Survey, Option<Answer>, CommandEnvelope) → Result<Mutation, MutationError>
//! ```
//!
//! # Rules
//! - Add derives the new id from the command token; if an entity with that id
//!   already exists the command was applied before and nothing changes
//! - Update replaces text in place, the id is kept
//! - Delete locates the entity by id first, then removes that position and
//!   records which command removed it
//!
//! # Replay
//!
//! A delete that already ran cannot be validated again: its entity is gone.
//! [`replay`] recognises such a command from the removal record it left
//! behind and rebuilds the same outcome without changing the survey, so the
//! side effects that follow the save run again.

use crate::commands::{
    AddAnswer, AddQuestion, Command, CommandEnvelope, DeleteQuestion, UpdateAnswer, UpdateQuestion,
};
use crate::domain::{Answer, AnswerId, DeletedAnswer, Question, QuestionId, Survey};
use crate::validation;

/// Mutation could not be applied to the loaded state
///
/// Validation rules out every case below; seeing one means the command was
/// applied without being validated against this exact state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("question {0} is not present in the survey")]
    QuestionNotFound(QuestionId),

    #[error("answer {0} is not present")]
    AnswerNotFound(AnswerId),
}

impl MutationError {
    /// Message as reported on the rejection channel
    pub fn violation(&self) -> &'static str {
        match self {
            MutationError::QuestionNotFound(_) => validation::QUESTION_ID_INVALID,
            MutationError::AnswerNotFound(_) => validation::ANSWER_ID_INVALID,
        }
    }
}

/// Outcome of a question command: the survey document to save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyMutation {
    pub survey: Survey,
    /// False when the command had already been applied
    pub changed: bool,
    /// Question removed by a delete, for answer retention
    pub removed: Option<QuestionId>,
}

/// Outcome of an answer command: the record operation to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerChange {
    Inserted(Answer),
    Updated(Answer),
    Deleted(Answer),
    /// Add redelivered after its record was already stored
    AlreadyApplied(Answer),
}

impl AnswerChange {
    pub fn answer(&self) -> &Answer {
        match self {
            AnswerChange::Inserted(a)
            | AnswerChange::Updated(a)
            | AnswerChange::Deleted(a)
            | AnswerChange::AlreadyApplied(a) => a,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Questions(SurveyMutation),
    Answer(AnswerChange),
}

pub fn add_question(
    mut survey: Survey,
    command: &AddQuestion,
    command_id: uuid::Uuid,
) -> SurveyMutation {
    let id = QuestionId::for_command(command_id);
    if survey.question(&id).is_some() {
        return SurveyMutation {
            survey,
            changed: false,
            removed: None,
        };
    }

    survey.questions.push(Question::new(id, command.text.clone()));
    SurveyMutation {
        survey,
        changed: true,
        removed: None,
    }
}

pub fn update_question(
    mut survey: Survey,
    command: &UpdateQuestion,
) -> Result<SurveyMutation, MutationError> {
    let position = survey
        .position_of(&command.question_id)
        .ok_or_else(|| MutationError::QuestionNotFound(command.question_id.clone()))?;

    survey.questions[position] = Question::new(command.question_id.clone(), command.text.clone());
    Ok(SurveyMutation {
        survey,
        changed: true,
        removed: None,
    })
}

pub fn delete_question(
    mut survey: Survey,
    command: &DeleteQuestion,
    command_id: uuid::Uuid,
) -> Result<SurveyMutation, MutationError> {
    let position = survey
        .position_of(&command.question_id)
        .ok_or_else(|| MutationError::QuestionNotFound(command.question_id.clone()))?;

    let removed = survey.questions.remove(position);
    survey.record_removal(removed.id.clone(), command_id);
    Ok(SurveyMutation {
        survey,
        changed: true,
        removed: Some(removed.id),
    })
}

/// `existing` is the record already stored under the derived id, if any
pub fn add_answer(command: &AddAnswer, command_id: uuid::Uuid, existing: Option<Answer>) -> AnswerChange {
    if let Some(answer) = existing {
        return AnswerChange::AlreadyApplied(answer);
    }

    AnswerChange::Inserted(Answer::new(
        AnswerId::for_command(command_id),
        command.text.clone(),
        command.survey_id.clone(),
        command.question_id.clone(),
    ))
}

pub fn update_answer(command: &UpdateAnswer, existing: Option<Answer>) -> Result<AnswerChange, MutationError> {
    let mut answer = existing.ok_or_else(|| MutationError::AnswerNotFound(command.answer_id.clone()))?;
    answer.text = command.text.clone();
    Ok(AnswerChange::Updated(answer))
}

pub fn delete_answer(answer_id: &AnswerId, existing: Option<Answer>) -> Result<AnswerChange, MutationError> {
    existing
        .map(AnswerChange::Deleted)
        .ok_or_else(|| MutationError::AnswerNotFound(answer_id.clone()))
}

/// Apply a validated command to the state loaded for it
///
/// `answer` is the record the command addresses: the stored answer for
/// update/delete, or whatever is already stored under the derived id for add.
pub fn apply(
    envelope: &CommandEnvelope,
    survey: Survey,
    answer: Option<Answer>,
) -> Result<Mutation, MutationError> {
    let mutation = match &envelope.command {
        Command::AddQuestion(c) => Mutation::Questions(add_question(survey, c, envelope.command_id)),
        Command::UpdateQuestion(c) => Mutation::Questions(update_question(survey, c)?),
        Command::DeleteQuestion(c) => Mutation::Questions(delete_question(survey, c, envelope.command_id)?),
        Command::AddAnswer(c) => Mutation::Answer(add_answer(c, envelope.command_id, answer)),
        Command::UpdateAnswer(c) => Mutation::Answer(update_answer(c, answer)?),
        Command::DeleteAnswer(c) => Mutation::Answer(delete_answer(&c.answer_id, answer)?),
    };
    Ok(mutation)
}

/// Outcome of a delete that already ran, rebuilt from its removal record
///
/// `deleted` is the answer removal recorded under the command's answer id.
/// Returns `None` for every command that has not run before.
pub fn replay(envelope: &CommandEnvelope, survey: &Survey, deleted: Option<&DeletedAnswer>) -> Option<Mutation> {
    match &envelope.command {
        Command::DeleteQuestion(c) => {
            let removed = survey.removed_by(envelope.command_id)?;
            (removed == &c.question_id).then(|| {
                Mutation::Questions(SurveyMutation {
                    survey: survey.clone(),
                    changed: false,
                    removed: Some(c.question_id.clone()),
                })
            })
        }
        Command::DeleteAnswer(c) => {
            let deleted = deleted?;
            let matches = deleted.command_id == envelope.command_id
                && deleted.answer.id == c.answer_id
                && deleted.answer.belongs_to(&survey.id);
            matches.then(|| Mutation::Answer(AnswerChange::Deleted(deleted.answer.clone())))
        }
        _ => None,
    }
}
