// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for survey-authoring
//!
//! Deterministic ids and timestamps, seeded stores, and store wrappers that
//! count or sabotage saves.
//!
//! # Design Principles
//! - Command ids and timestamps are fixed constants
//! - Pipeline tests build their harness here, never by hand

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use survey_authoring::commands::{
    AddAnswer, AddQuestion, Command, CommandEnvelope, DeleteAnswer, DeleteQuestion, UpdateAnswer,
    UpdateQuestion,
};
use survey_authoring::config::PipelineConfig;
use survey_authoring::jetstream::Delivery;
use survey_authoring::pipeline::{MutationConsumer, RecordingNotifier};
use survey_authoring::store::{AnswerStore, InMemoryAnswerStore, InMemorySurveyStore, SurveyStore};
use survey_authoring::{
    Answer, AnswerId, DeletedAnswer, InfrastructureError, InfrastructureResult, Question, QuestionId, Survey,
    SurveyId,
};

// Fixed test UUIDs (UUID v7 format, but deterministic for testing)
pub const COMMAND_ID_1: &str = "01934f4a-0001-7000-8000-000000000001";
pub const COMMAND_ID_2: &str = "01934f4a-0002-7000-8000-000000000002";
pub const COMMAND_ID_3: &str = "01934f4a-0003-7000-8000-000000000003";

pub const CORRELATION_ID_1: &str = "01934f4a-c001-7000-8000-00000000c001";

pub const SURVEY_ID: &str = "survey-01";
pub const PUBLISHED_SURVEY_ID: &str = "survey-pub";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

/// Parse a fixed UUID from a constant string
pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("Invalid UUID in test fixture")
}

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

pub fn survey_id() -> SurveyId {
    SurveyId::from(SURVEY_ID)
}

/// S = [{a, "Q1"}]
pub fn single_question_survey() -> Survey {
    Survey::new(SURVEY_ID)
        .with_title("Onboarding")
        .with_author("author-1", fixed_timestamp())
        .with_questions(vec![Question::new("a", "Q1")])
}

pub fn three_question_survey() -> Survey {
    Survey::new(SURVEY_ID).with_questions(vec![
        Question::new("a", "Q1"),
        Question::new("b", "Q2"),
        Question::new("c", "Q3"),
    ])
}

pub fn published_survey() -> Survey {
    Survey::new(PUBLISHED_SURVEY_ID)
        .with_questions(vec![Question::new("a", "Q1")])
        .published()
}

pub fn envelope(command_id: &str, command: Command) -> CommandEnvelope {
    CommandEnvelope::new(
        parse_uuid(command_id),
        parse_uuid(CORRELATION_ID_1),
        fixed_timestamp(),
        command,
    )
}

pub fn delivery(stream_sequence: u64, delivered: i64) -> Delivery {
    Delivery::new(
        format!("authoring.question.captured.{SURVEY_ID}"),
        stream_sequence,
        delivered,
        fixed_timestamp(),
    )
}

pub fn add_question(survey: &str, text: &str) -> Command {
    Command::AddQuestion(AddQuestion {
        survey_id: SurveyId::from(survey),
        text: text.to_string(),
    })
}

pub fn update_question(survey: &str, question: &str, text: &str) -> Command {
    Command::UpdateQuestion(UpdateQuestion {
        survey_id: SurveyId::from(survey),
        question_id: QuestionId::from(question),
        text: text.to_string(),
    })
}

pub fn delete_question(survey: &str, question: &str) -> Command {
    Command::DeleteQuestion(DeleteQuestion {
        survey_id: SurveyId::from(survey),
        question_id: QuestionId::from(question),
    })
}

pub fn add_answer(survey: &str, question: &str, text: &str) -> Command {
    Command::AddAnswer(AddAnswer {
        survey_id: SurveyId::from(survey),
        question_id: QuestionId::from(question),
        text: text.to_string(),
    })
}

pub fn update_answer(survey: &str, answer: &str, text: &str) -> Command {
    Command::UpdateAnswer(UpdateAnswer {
        survey_id: SurveyId::from(survey),
        answer_id: AnswerId::from(answer),
        text: text.to_string(),
    })
}

pub fn delete_answer(survey: &str, answer: &str) -> Command {
    Command::DeleteAnswer(DeleteAnswer {
        survey_id: SurveyId::from(survey),
        answer_id: AnswerId::from(answer),
    })
}

/// One command of every kind against `survey`
pub fn every_command(survey: &str) -> Vec<Command> {
    vec![
        add_question(survey, "New question"),
        update_question(survey, "a", "Edited"),
        delete_question(survey, "a"),
        add_answer(survey, "a", "Yes"),
        update_answer(survey, "ans-1", "No"),
        delete_answer(survey, "ans-1"),
    ]
}

/// Survey store that counts save calls
pub struct CountingSurveyStore {
    inner: InMemorySurveyStore,
    saves: AtomicUsize,
}

impl CountingSurveyStore {
    pub fn new(inner: InMemorySurveyStore) -> Self {
        Self {
            inner,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurveyStore for CountingSurveyStore {
    async fn find_by_id(&self, id: &SurveyId) -> InfrastructureResult<Option<Survey>> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, survey: &Survey) -> InfrastructureResult<u64> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(survey).await
    }

    async fn insert(&self, survey: &Survey) -> InfrastructureResult<u64> {
        self.inner.insert(survey).await
    }
}

/// Survey store where another writer gets in first on the next `n` saves
///
/// The competing write appends a question titled "Concurrent", so a retried
/// command must keep it.
pub struct RacingSurveyStore {
    inner: InMemorySurveyStore,
    races: AtomicU32,
}

impl RacingSurveyStore {
    pub fn new(inner: InMemorySurveyStore, races: u32) -> Self {
        Self {
            inner,
            races: AtomicU32::new(races),
        }
    }
}

#[async_trait]
impl SurveyStore for RacingSurveyStore {
    async fn find_by_id(&self, id: &SurveyId) -> InfrastructureResult<Option<Survey>> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, survey: &Survey) -> InfrastructureResult<u64> {
        let race = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if race {
            if let Some(mut current) = self.inner.find_by_id(&survey.id).await? {
                let n = current.questions.len();
                current
                    .questions
                    .push(Question::new(format!("concurrent-{n}"), "Concurrent"));
                self.inner.save(&current).await?;
            }
        }

        self.inner.save(survey).await
    }

    async fn insert(&self, survey: &Survey) -> InfrastructureResult<u64> {
        self.inner.insert(survey).await
    }
}

/// Answer store whose next `n` bulk deletes fail before touching anything
pub struct FailingCascadeAnswerStore {
    inner: Arc<InMemoryAnswerStore>,
    failures: AtomicU32,
}

impl FailingCascadeAnswerStore {
    pub fn new(inner: Arc<InMemoryAnswerStore>, failures: u32) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl AnswerStore for FailingCascadeAnswerStore {
    async fn insert(&self, answer: &Answer) -> InfrastructureResult<()> {
        self.inner.insert(answer).await
    }

    async fn save(&self, answer: &Answer) -> InfrastructureResult<()> {
        self.inner.save(answer).await
    }

    async fn delete_by_id(&self, id: &AnswerId) -> InfrastructureResult<bool> {
        self.inner.delete_by_id(id).await
    }

    async fn find_by_id(&self, id: &AnswerId) -> InfrastructureResult<Option<Answer>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<Vec<Answer>> {
        self.inner.find_by_survey_and_question(survey_id, question_id).await
    }

    async fn delete_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<usize> {
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(InfrastructureError::Store("answers bucket unavailable".to_string()));
        }
        self.inner.delete_by_survey_and_question(survey_id, question_id).await
    }

    async fn record_deletion(&self, deleted: &DeletedAnswer) -> InfrastructureResult<()> {
        self.inner.record_deletion(deleted).await
    }

    async fn find_deletion(&self, id: &AnswerId) -> InfrastructureResult<Option<DeletedAnswer>> {
        self.inner.find_deletion(id).await
    }
}

/// Consumer wired to in-memory stores and a recording notifier
pub struct Harness {
    pub surveys: Arc<dyn SurveyStore>,
    pub answers: Arc<InMemoryAnswerStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub consumer: MutationConsumer,
}

impl Harness {
    pub fn new(surveys: Arc<dyn SurveyStore>, answers: Vec<Answer>) -> Self {
        Self::with_config(surveys, answers, PipelineConfig::default())
    }

    pub fn with_config(surveys: Arc<dyn SurveyStore>, answers: Vec<Answer>, config: PipelineConfig) -> Self {
        let answers = Arc::new(InMemoryAnswerStore::with_answers(answers));
        let notifier = Arc::new(RecordingNotifier::new());
        let consumer = MutationConsumer::new(surveys.clone(), answers.clone(), notifier.clone(), config);
        Self {
            surveys,
            answers,
            notifier,
            consumer,
        }
    }

    /// Harness whose first `failures` answer cascades fail
    pub fn with_cascade_failures(surveys: Arc<dyn SurveyStore>, answers: Vec<Answer>, failures: u32) -> Self {
        let answers = Arc::new(InMemoryAnswerStore::with_answers(answers));
        let failing = Arc::new(FailingCascadeAnswerStore::new(answers.clone(), failures));
        let notifier = Arc::new(RecordingNotifier::new());
        let consumer = MutationConsumer::new(surveys.clone(), failing, notifier.clone(), PipelineConfig::default());
        Self {
            surveys,
            answers,
            notifier,
            consumer,
        }
    }

    /// Harness over `surveys` with no answers
    pub fn seeded(surveys: impl IntoIterator<Item = Survey>) -> Self {
        Self::new(Arc::new(InMemorySurveyStore::with_surveys(surveys)), Vec::new())
    }

    pub async fn survey(&self, id: &str) -> Survey {
        self.surveys
            .find_by_id(&SurveyId::from(id))
            .await
            .expect("store available")
            .expect("survey seeded")
    }
}
