// Copyright (c) 2025 - Cowboy AI, Inc.
//! Authoring Service
//!
//! Write calls build a command envelope and queue it; they return as soon as
//! the broker has the command. Read calls go straight to the stores.
//!
//! ```text
//! add_question ──► CommandEnvelope ──► CommandProducer ──► captured subject
//! get_question ◄── SurveyStore / AnswerStore
//! ```
//!
//! Ids that cannot be used as subject tokens and blank text are refused at
//! ingress with the same messages the pipeline would report. Everything else
//! is checked by the pipeline against the state it loads when the command is
//! processed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::{
    AddAnswer, AddQuestion, Command, CommandEnvelope, DeleteAnswer, DeleteQuestion, UpdateAnswer,
    UpdateQuestion,
};
use crate::domain::{Answer, AnswerId, Question, QuestionId, Survey, SurveyId};
use crate::errors::InfrastructureError;
use crate::producer::CommandProducer;
use crate::store::{AnswerStore, SurveyStore};
use crate::validation::{self, ViolationReport};

/// Service layer result type
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service layer errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Request refused for data reasons
    #[error("Invalid request: {0}")]
    Invalid(ViolationReport),

    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl ServiceError {
    pub fn violations(&self) -> Option<&ViolationReport> {
        match self {
            ServiceError::Invalid(report) => Some(report),
            ServiceError::Infrastructure(_) => None,
        }
    }
}

/// Proof that a command was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReceipt {
    /// Matches `causation_id` of the resulting stored or rejected event
    pub command_id: Uuid,
}

/// A question, optionally with its answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub question: Question,
    /// Present only when answers were requested
    pub answers: Option<Vec<Answer>>,
}

/// Write and read entry point for authors
#[derive(Clone)]
pub struct AuthoringService {
    producer: Arc<dyn CommandProducer>,
    surveys: Arc<dyn SurveyStore>,
    answers: Arc<dyn AnswerStore>,
}

/// Entity checks made before a command is queued, reported together
#[derive(Default)]
struct Ingress(Vec<String>);

impl Ingress {
    fn question(mut self, id: &QuestionId) -> Self {
        if !id.is_valid() {
            self.0.push(validation::QUESTION_ID_INVALID.to_string());
        }
        self
    }

    fn answer(mut self, id: &AnswerId) -> Self {
        if !id.is_valid() {
            self.0.push(validation::ANSWER_ID_INVALID.to_string());
        }
        self
    }

    fn text(mut self, text: &str, message: &str) -> Self {
        if text.trim().is_empty() {
            self.0.push(message.to_string());
        }
        self
    }

    /// The survey id is a pre-check and is reported alone
    fn check(self, survey_id: &SurveyId) -> ServiceResult<()> {
        validation::check_survey_id(survey_id).map_err(ServiceError::Invalid)?;
        match ViolationReport::from_messages(self.0) {
            Some(report) => Err(ServiceError::Invalid(report)),
            None => Ok(()),
        }
    }
}

impl AuthoringService {
    pub fn new(
        producer: Arc<dyn CommandProducer>,
        surveys: Arc<dyn SurveyStore>,
        answers: Arc<dyn AnswerStore>,
    ) -> Self {
        Self {
            producer,
            surveys,
            answers,
        }
    }

    async fn enqueue(&self, command: Command) -> ServiceResult<CommandReceipt> {
        let command_id = Uuid::now_v7();
        let envelope = CommandEnvelope::new(command_id, command_id, Utc::now(), command);
        self.producer.publish(&envelope).await?;
        Ok(CommandReceipt { command_id })
    }

    pub async fn add_question(&self, survey_id: SurveyId, text: String) -> ServiceResult<CommandReceipt> {
        Ingress::default()
            .text(&text, validation::QUESTION_TEXT_EMPTY_ON_ADD)
            .check(&survey_id)?;
        self.enqueue(Command::AddQuestion(AddQuestion { survey_id, text }))
            .await
    }

    pub async fn update_question(
        &self,
        survey_id: SurveyId,
        question_id: QuestionId,
        text: String,
    ) -> ServiceResult<CommandReceipt> {
        Ingress::default()
            .question(&question_id)
            .text(&text, validation::QUESTION_TEXT_EMPTY)
            .check(&survey_id)?;
        self.enqueue(Command::UpdateQuestion(UpdateQuestion {
            survey_id,
            question_id,
            text,
        }))
        .await
    }

    pub async fn delete_question(&self, survey_id: SurveyId, question_id: QuestionId) -> ServiceResult<CommandReceipt> {
        Ingress::default().question(&question_id).check(&survey_id)?;
        self.enqueue(Command::DeleteQuestion(DeleteQuestion {
            survey_id,
            question_id,
        }))
        .await
    }

    pub async fn add_answer(
        &self,
        survey_id: SurveyId,
        question_id: QuestionId,
        text: String,
    ) -> ServiceResult<CommandReceipt> {
        Ingress::default()
            .question(&question_id)
            .text(&text, validation::ANSWER_TEXT_EMPTY)
            .check(&survey_id)?;
        self.enqueue(Command::AddAnswer(AddAnswer {
            survey_id,
            question_id,
            text,
        }))
        .await
    }

    pub async fn update_answer(
        &self,
        survey_id: SurveyId,
        answer_id: AnswerId,
        text: String,
    ) -> ServiceResult<CommandReceipt> {
        Ingress::default()
            .answer(&answer_id)
            .text(&text, validation::ANSWER_TEXT_EMPTY)
            .check(&survey_id)?;
        self.enqueue(Command::UpdateAnswer(UpdateAnswer {
            survey_id,
            answer_id,
            text,
        }))
        .await
    }

    pub async fn delete_answer(&self, survey_id: SurveyId, answer_id: AnswerId) -> ServiceResult<CommandReceipt> {
        Ingress::default().answer(&answer_id).check(&survey_id)?;
        self.enqueue(Command::DeleteAnswer(DeleteAnswer { survey_id, answer_id }))
            .await
    }

    /// Survey that passed the pre-checks
    async fn open_survey(&self, survey_id: &SurveyId) -> ServiceResult<Survey> {
        validation::check_survey_id(survey_id).map_err(ServiceError::Invalid)?;
        let loaded = self.surveys.find_by_id(survey_id).await?;
        let survey = validation::check_survey(survey_id, loaded.as_ref()).map_err(ServiceError::Invalid)?;
        Ok(survey.clone())
    }

    fn find_question(survey: &Survey, question_id: &QuestionId) -> ServiceResult<Question> {
        survey
            .question(question_id)
            .filter(|_| question_id.is_valid() && survey.has_unique_question(question_id))
            .cloned()
            .ok_or_else(|| ServiceError::Invalid(ViolationReport::single(validation::QUESTION_ID_INVALID)))
    }

    pub async fn get_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
        fetch_answers: bool,
    ) -> ServiceResult<QuestionView> {
        let survey = self.open_survey(survey_id).await?;
        let question = Self::find_question(&survey, question_id)?;

        let answers = if fetch_answers {
            Some(
                self.answers
                    .find_by_survey_and_question(survey_id, question_id)
                    .await?,
            )
        } else {
            None
        };

        Ok(QuestionView { question, answers })
    }

    pub async fn get_all_questions(&self, survey_id: &SurveyId) -> ServiceResult<Vec<Question>> {
        Ok(self.open_survey(survey_id).await?.questions)
    }

    pub async fn get_all_answers(&self, survey_id: &SurveyId, question_id: &QuestionId) -> ServiceResult<Vec<Answer>> {
        let survey = self.open_survey(survey_id).await?;
        Self::find_question(&survey, question_id)?;

        Ok(self
            .answers
            .find_by_survey_and_question(survey_id, question_id)
            .await?)
    }
}
