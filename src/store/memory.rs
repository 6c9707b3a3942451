// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory stores for tests and local development

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{AnswerStore, SurveyStore};
use crate::domain::{Answer, AnswerId, DeletedAnswer, QuestionId, Survey, SurveyId};
use crate::errors::{InfrastructureError, InfrastructureResult};

/// Surveys in a map; versions count saves starting at 1
#[derive(Debug, Default)]
pub struct InMemorySurveyStore {
    surveys: RwLock<HashMap<SurveyId, Survey>>,
}

impl InMemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `surveys`, each at version 1
    pub fn with_surveys(surveys: impl IntoIterator<Item = Survey>) -> Self {
        let surveys = surveys
            .into_iter()
            .map(|mut survey| {
                survey.version = 1;
                (survey.id.clone(), survey)
            })
            .collect();
        Self {
            surveys: RwLock::new(surveys),
        }
    }
}

#[async_trait]
impl SurveyStore for InMemorySurveyStore {
    async fn find_by_id(&self, id: &SurveyId) -> InfrastructureResult<Option<Survey>> {
        Ok(self.surveys.read().await.get(id).cloned())
    }

    async fn save(&self, survey: &Survey) -> InfrastructureResult<u64> {
        let mut surveys = self.surveys.write().await;

        let current = surveys.get(&survey.id).map(|s| s.version).unwrap_or(0);
        if current != survey.version {
            return Err(InfrastructureError::ConcurrencyConflict {
                key: survey.id.to_string(),
                expected: survey.version,
                actual: current,
            });
        }

        let mut stored = survey.clone();
        stored.version = current + 1;
        surveys.insert(stored.id.clone(), stored);
        Ok(current + 1)
    }

    async fn insert(&self, survey: &Survey) -> InfrastructureResult<u64> {
        let mut surveys = self.surveys.write().await;
        if surveys.contains_key(&survey.id) {
            return Err(InfrastructureError::AlreadyExists(survey.id.to_string()));
        }

        let mut stored = survey.clone();
        stored.version = 1;
        surveys.insert(stored.id.clone(), stored);
        Ok(1)
    }
}

/// Answers keyed by id
#[derive(Debug, Default)]
pub struct InMemoryAnswerStore {
    answers: RwLock<BTreeMap<AnswerId, Answer>>,
    deletions: RwLock<HashMap<AnswerId, DeletedAnswer>>,
}

impl InMemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: RwLock::new(answers.into_iter().map(|a| (a.id.clone(), a)).collect()),
            deletions: RwLock::default(),
        }
    }

    pub async fn len(&self) -> usize {
        self.answers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.answers.read().await.is_empty()
    }
}

#[async_trait]
impl AnswerStore for InMemoryAnswerStore {
    async fn insert(&self, answer: &Answer) -> InfrastructureResult<()> {
        let mut answers = self.answers.write().await;
        if answers.contains_key(&answer.id) {
            return Err(InfrastructureError::AlreadyExists(answer.id.to_string()));
        }
        answers.insert(answer.id.clone(), answer.clone());
        Ok(())
    }

    async fn save(&self, answer: &Answer) -> InfrastructureResult<()> {
        self.answers
            .write()
            .await
            .insert(answer.id.clone(), answer.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &AnswerId) -> InfrastructureResult<bool> {
        Ok(self.answers.write().await.remove(id).is_some())
    }

    async fn find_by_id(&self, id: &AnswerId) -> InfrastructureResult<Option<Answer>> {
        Ok(self.answers.read().await.get(id).cloned())
    }

    async fn find_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<Vec<Answer>> {
        Ok(self
            .answers
            .read()
            .await
            .values()
            .filter(|a| &a.survey_id == survey_id && &a.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn delete_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<usize> {
        let mut answers = self.answers.write().await;
        let before = answers.len();
        answers.retain(|_, a| !(&a.survey_id == survey_id && &a.question_id == question_id));
        Ok(before - answers.len())
    }

    async fn record_deletion(&self, deleted: &DeletedAnswer) -> InfrastructureResult<()> {
        self.deletions
            .write()
            .await
            .insert(deleted.answer.id.clone(), deleted.clone());
        Ok(())
    }

    async fn find_deletion(&self, id: &AnswerId) -> InfrastructureResult<Option<DeletedAnswer>> {
        Ok(self.deletions.read().await.get(id).cloned())
    }
}
