// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS JetStream key-value stores
//!
//! # Layout
//!
//! ```text
//! surveys bucket : <survey_id>                   → Survey JSON (no version field)
//! answers bucket : ans.<answer_id>               → Answer JSON
//!                  idx.<survey_id>.<question_id> → JSON list of answer ids
//!                  del.<answer_id>               → DeletedAnswer JSON
//! ```
//!
//! Every key segment is a validated id token, so no id can split a key or
//! act as a wildcard. Lookups by id and by question are single-key reads;
//! nothing lists the bucket.
//!
//! The KV revision of a survey entry is its version. A conditional save is a
//! KV `update` against the revision the survey was loaded at, which the
//! server rejects with "wrong last sequence" if anyone wrote in between.
//! Create-only writes are an `update` against revision 0.
//!
//! # Answer Index
//!
//! The question index is written conditionally on its own revision. A new
//! answer is added to the index before its record is created, and a record
//! is deleted before it leaves the index, so an interrupted write can only
//! leave an index entry without a record. Reads skip such entries.

use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{AnswerStore, SurveyStore};
use crate::domain::{Answer, AnswerId, DeletedAnswer, QuestionId, Survey, SurveyId};
use crate::errors::{InfrastructureError, InfrastructureResult};

/// Attempts at a conditional index write before giving up
const INDEX_WRITE_ATTEMPTS: usize = 5;

/// Get a bucket, creating it when missing
pub async fn open_bucket(jetstream: &jetstream::Context, bucket: &str) -> InfrastructureResult<kv::Store> {
    if let Ok(store) = jetstream.get_key_value(bucket).await {
        return Ok(store);
    }

    let store = jetstream
        .create_key_value(kv::Config {
            bucket: bucket.to_string(),
            history: 1,
            ..Default::default()
        })
        .await
        .map_err(|e| InfrastructureError::Store(e.to_string()))?;

    info!(bucket, "Created key-value bucket");
    Ok(store)
}

fn is_revision_mismatch(message: &str) -> bool {
    message.contains("wrong last sequence")
}

fn is_existing_key(message: &str) -> bool {
    message.contains("already exists") || is_revision_mismatch(message)
}

/// Latest entry of `key`, delete markers included
async fn latest_entry(store: &kv::Store, key: &str) -> InfrastructureResult<Option<kv::Entry>> {
    store
        .entry(key)
        .await
        .map_err(|e| InfrastructureError::Store(e.to_string()))
}

/// Value of `key`, skipping delete markers
async fn live_entry(store: &kv::Store, key: &str) -> InfrastructureResult<Option<kv::Entry>> {
    Ok(latest_entry(store, key)
        .await?
        .filter(|e| e.operation == kv::Operation::Put))
}

/// Write `payload` under `key` only if the key has never been written
async fn create(store: &kv::Store, key: &str, payload: Vec<u8>) -> InfrastructureResult<u64> {
    store.update(key, payload.into(), 0).await.map_err(|e| {
        let message = e.to_string();
        if is_existing_key(&message) {
            InfrastructureError::AlreadyExists(key.to_string())
        } else {
            InfrastructureError::Store(message)
        }
    })
}

fn decode<T: serde::de::DeserializeOwned>(entry: &kv::Entry) -> InfrastructureResult<T> {
    serde_json::from_slice(&entry.value).map_err(|e| InfrastructureError::Deserialization(e.to_string()))
}

/// Surveys in a JetStream KV bucket
#[derive(Clone)]
pub struct KvSurveyStore {
    store: kv::Store,
}

impl KvSurveyStore {
    pub fn new(store: kv::Store) -> Self {
        Self { store }
    }

    pub async fn open(jetstream: &jetstream::Context, bucket: &str) -> InfrastructureResult<Self> {
        Ok(Self::new(open_bucket(jetstream, bucket).await?))
    }
}

#[async_trait]
impl SurveyStore for KvSurveyStore {
    async fn find_by_id(&self, id: &SurveyId) -> InfrastructureResult<Option<Survey>> {
        let Some(entry) = live_entry(&self.store, id.token()?).await? else {
            return Ok(None);
        };

        let mut survey: Survey = decode(&entry)?;
        survey.version = entry.revision;
        Ok(Some(survey))
    }

    async fn save(&self, survey: &Survey) -> InfrastructureResult<u64> {
        let key = survey.id.token()?;
        let payload = serde_json::to_vec(&survey.to_document())?;

        match self.store.update(key, payload.into(), survey.version).await {
            Ok(revision) => {
                debug!(survey_id = %survey.id, revision, "Saved survey");
                Ok(revision)
            }
            Err(e) if is_revision_mismatch(&e.to_string()) => {
                let actual = live_entry(&self.store, key)
                    .await?
                    .map(|entry| entry.revision)
                    .unwrap_or(0);
                Err(InfrastructureError::ConcurrencyConflict {
                    key: survey.id.to_string(),
                    expected: survey.version,
                    actual,
                })
            }
            Err(e) => Err(InfrastructureError::Store(e.to_string())),
        }
    }

    async fn insert(&self, survey: &Survey) -> InfrastructureResult<u64> {
        let payload = serde_json::to_vec(&survey.to_document())?;
        create(&self.store, survey.id.token()?, payload).await
    }
}

/// Answer records in a JetStream KV bucket
#[derive(Clone)]
pub struct KvAnswerStore {
    store: kv::Store,
}

impl KvAnswerStore {
    pub fn new(store: kv::Store) -> Self {
        Self { store }
    }

    pub async fn open(jetstream: &jetstream::Context, bucket: &str) -> InfrastructureResult<Self> {
        Ok(Self::new(open_bucket(jetstream, bucket).await?))
    }

    fn record_key(id: &AnswerId) -> InfrastructureResult<String> {
        Ok(format!("ans.{}", id.token()?))
    }

    fn index_key(survey_id: &SurveyId, question_id: &QuestionId) -> InfrastructureResult<String> {
        Ok(format!("idx.{}.{}", survey_id.token()?, question_id.token()?))
    }

    fn deletion_key(id: &AnswerId) -> InfrastructureResult<String> {
        Ok(format!("del.{}", id.token()?))
    }

    /// Index contents and the revision to write it back against
    async fn read_index(&self, key: &str) -> InfrastructureResult<(Vec<AnswerId>, u64)> {
        match latest_entry(&self.store, key).await? {
            Some(entry) if entry.operation == kv::Operation::Put => Ok((decode(&entry)?, entry.revision)),
            Some(entry) => Ok((Vec::new(), entry.revision)),
            None => Ok((Vec::new(), 0)),
        }
    }

    /// Apply `edit` to the question index; `edit` returns false for no change
    async fn edit_index<F>(&self, survey_id: &SurveyId, question_id: &QuestionId, edit: F) -> InfrastructureResult<()>
    where
        F: Fn(&mut Vec<AnswerId>) -> bool + Send + Sync,
    {
        let key = Self::index_key(survey_id, question_id)?;
        let mut expected = 0;

        for attempt in 1..=INDEX_WRITE_ATTEMPTS {
            let (mut ids, revision) = self.read_index(&key).await?;
            expected = revision;
            if !edit(&mut ids) {
                return Ok(());
            }

            let payload = serde_json::to_vec(&ids)?;
            match self.store.update(&key, payload.into(), revision).await {
                Ok(_) => return Ok(()),
                Err(e) if is_revision_mismatch(&e.to_string()) => {
                    debug!(key = %key, attempt, "Index moved on, rereading");
                }
                Err(e) => return Err(InfrastructureError::Store(e.to_string())),
            }
        }

        let actual = latest_entry(&self.store, &key)
            .await?
            .map(|entry| entry.revision)
            .unwrap_or(0);
        Err(InfrastructureError::ConcurrencyConflict { key, expected, actual })
    }

    async fn load(&self, id: &AnswerId) -> InfrastructureResult<Option<Answer>> {
        match live_entry(&self.store, &Self::record_key(id)?).await? {
            Some(entry) => decode(&entry).map(Some),
            None => Ok(None),
        }
    }

    async fn delete_record(&self, id: &AnswerId) -> InfrastructureResult<()> {
        self.store
            .delete(Self::record_key(id)?)
            .await
            .map_err(|e| InfrastructureError::Store(e.to_string()))
    }

    /// Records listed in the question index that are still stored
    async fn indexed_answers(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<Vec<Answer>> {
        let (ids, _) = self.read_index(&Self::index_key(survey_id, question_id)?).await?;

        let mut answers = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(&id).await? {
                Some(answer) if &answer.survey_id == survey_id && &answer.question_id == question_id => {
                    answers.push(answer)
                }
                Some(_) => warn!(answer_id = %id, "Indexed answer belongs to another question"),
                None => debug!(answer_id = %id, "Skipping index entry without a record"),
            }
        }
        answers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(answers)
    }
}

#[async_trait]
impl AnswerStore for KvAnswerStore {
    async fn insert(&self, answer: &Answer) -> InfrastructureResult<()> {
        let key = Self::record_key(&answer.id)?;
        let payload = serde_json::to_vec(answer)?;

        self.edit_index(&answer.survey_id, &answer.question_id, |ids| add_id(ids, &answer.id))
            .await?;

        create(&self.store, &key, payload).await.map_err(|e| match e {
            InfrastructureError::AlreadyExists(_) => InfrastructureError::AlreadyExists(answer.id.to_string()),
            other => other,
        })?;
        Ok(())
    }

    async fn save(&self, answer: &Answer) -> InfrastructureResult<()> {
        let key = Self::record_key(&answer.id)?;
        let payload = serde_json::to_vec(answer)?;

        self.edit_index(&answer.survey_id, &answer.question_id, |ids| add_id(ids, &answer.id))
            .await?;

        self.store
            .put(key, payload.into())
            .await
            .map_err(|e| InfrastructureError::Store(e.to_string()))?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &AnswerId) -> InfrastructureResult<bool> {
        let Some(answer) = self.load(id).await? else {
            return Ok(false);
        };

        self.delete_record(id).await?;
        self.edit_index(&answer.survey_id, &answer.question_id, |ids| remove_id(ids, id))
            .await?;
        Ok(true)
    }

    async fn find_by_id(&self, id: &AnswerId) -> InfrastructureResult<Option<Answer>> {
        self.load(id).await
    }

    async fn find_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<Vec<Answer>> {
        self.indexed_answers(survey_id, question_id).await
    }

    async fn delete_by_survey_and_question(
        &self,
        survey_id: &SurveyId,
        question_id: &QuestionId,
    ) -> InfrastructureResult<usize> {
        let answers = self.indexed_answers(survey_id, question_id).await?;
        for answer in &answers {
            self.delete_record(&answer.id).await?;
        }

        self.edit_index(survey_id, question_id, |ids| {
            let had = !ids.is_empty();
            ids.clear();
            had
        })
        .await?;
        Ok(answers.len())
    }

    async fn record_deletion(&self, deleted: &DeletedAnswer) -> InfrastructureResult<()> {
        let payload = serde_json::to_vec(deleted)?;
        self.store
            .put(Self::deletion_key(&deleted.answer.id)?, payload.into())
            .await
            .map_err(|e| InfrastructureError::Store(e.to_string()))?;
        Ok(())
    }

    async fn find_deletion(&self, id: &AnswerId) -> InfrastructureResult<Option<DeletedAnswer>> {
        match live_entry(&self.store, &Self::deletion_key(id)?).await? {
            Some(entry) => decode(&entry).map(Some),
            None => Ok(None),
        }
    }
}

fn add_id(ids: &mut Vec<AnswerId>, id: &AnswerId) -> bool {
    if ids.contains(id) {
        return false;
    }
    ids.push(id.clone());
    true
}

fn remove_id(ids: &mut Vec<AnswerId>, id: &AnswerId) -> bool {
    let before = ids.len();
    ids.retain(|existing| existing != id);
    ids.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_key_layout() {
        let answer = Answer::new("ans-1", "Yes", "s-1", "q-1");
        assert_eq!(KvAnswerStore::record_key(&answer.id).unwrap(), "ans.ans-1");
        assert_eq!(
            KvAnswerStore::index_key(&answer.survey_id, &answer.question_id).unwrap(),
            "idx.s-1.q-1"
        );
        assert_eq!(KvAnswerStore::deletion_key(&answer.id).unwrap(), "del.ans-1");
    }

    #[test]
    fn test_suffix_ids_get_distinct_keys() {
        let short = KvAnswerStore::record_key(&AnswerId::from("1")).unwrap();
        let long = KvAnswerStore::record_key(&AnswerId::from("x-1")).unwrap();
        assert_ne!(short, long);
        assert_eq!(short, "ans.1");
        assert_eq!(long, "ans.x-1");
    }

    #[test]
    fn test_unaddressable_ids_have_no_key() {
        assert!(matches!(
            KvAnswerStore::record_key(&AnswerId::from("a.b")),
            Err(InfrastructureError::InvalidId(_))
        ));
        assert!(matches!(
            KvAnswerStore::index_key(&SurveyId::from("s-1"), &QuestionId::from(">")),
            Err(InfrastructureError::InvalidId(_))
        ));
    }

    #[test]
    fn test_index_edits_report_changes() {
        let mut ids = vec![AnswerId::from("1")];
        assert!(!add_id(&mut ids, &AnswerId::from("1")));
        assert!(add_id(&mut ids, &AnswerId::from("x-1")));
        assert!(remove_id(&mut ids, &AnswerId::from("1")));
        assert!(!remove_id(&mut ids, &AnswerId::from("1")));
        assert_eq!(ids, vec![AnswerId::from("x-1")]);
    }

    #[test]
    fn test_server_error_classification() {
        assert!(is_revision_mismatch("nats: wrong last sequence: 4"));
        assert!(is_existing_key("key already exists"));
        assert!(!is_existing_key("timed out"));
    }
}
