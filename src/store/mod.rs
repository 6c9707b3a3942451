// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aggregate and Answer Stores
//!
//! ```text
//! SurveyStore  : whole-document load and conditional save, keyed by survey id
//! AnswerStore  : independent answer records, keyed by answer id with a
//!                secondary lookup by (survey_id, question_id)
//! ```
//!
//! # Optimistic Concurrency
//!
//! A loaded [`Survey`] carries the store version it was read at. `save`
//! succeeds only if the stored version is still that one; otherwise it fails
//! with [`InfrastructureError::ConcurrencyConflict`] and the caller reloads.
//!
//! [`InfrastructureError::ConcurrencyConflict`]: crate::errors::InfrastructureError::ConcurrencyConflict

use async_trait::async_trait;

use crate::domain::{Answer, AnswerId, DeletedAnswer, QuestionId, Survey, SurveyId};
use crate::errors::InfrastructureResult;

pub mod kv;
pub mod memory;

pub use kv::{KvAnswerStore, KvSurveyStore};
pub use memory::{InMemoryAnswerStore, InMemorySurveyStore};

/// Survey document storage
#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Load a survey; `version` on the result is the stored version
    async fn find_by_id(&self, id: &SurveyId) -> InfrastructureResult<Option<Survey>>;

    /// Replace the stored document if it is still at `survey.version`
    ///
    /// # Returns
    ///
    /// The new version
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict` if the stored version moved on
    async fn save(&self, survey: &Survey) -> InfrastructureResult<u64>;

    /// Store a survey that does not exist yet
    ///
    /// Used for seeding; surveys are not created through the pipeline.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the id is taken
    async fn insert(&self, survey: &Survey) -> InfrastructureResult<u64>;
}

/// Answer record storage
///
/// Lists come back ordered by answer id.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Store a new record
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a record with the same id is stored
    async fn insert(&self, answer: &Answer) -> InfrastructureResult<()>;

    /// Store a record, replacing any previous one with the same id
    async fn save(&self, answer: &Answer) -> InfrastructureResult<()>;

    /// Remove a record; false if there was nothing to remove
    async fn delete_by_id(&self, id: &AnswerId) -> InfrastructureResult<bool>;

    async fn find_by_id(&self, id: &AnswerId) -> InfrastructureResult<Option<Answer>>;

    async fn find_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<Vec<Answer>>;

    /// Remove every record of a question; returns how many were removed
    async fn delete_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<usize>;

    /// Remember which command deleted an answer; written before the delete
    async fn record_deletion(&self, deleted: &DeletedAnswer) -> InfrastructureResult<()>;

    async fn find_deletion(&self, id: &AnswerId) -> InfrastructureResult<Option<DeletedAnswer>>;
}
