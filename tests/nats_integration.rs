// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests against a live NATS server with JetStream enabled
//!
//! Ignored by default. Run with a local server:
//!
//! ```text
//! nats-server -js
//! cargo test --test nats_integration -- --ignored
//! ```

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use survey_authoring::jetstream::{create_stream, ensure_pull_consumer, ConsumerConfig, JetStreamConfig};
use survey_authoring::pipeline::{CommandRunner, NatsNotifier};
use survey_authoring::producer::NatsCommandProducer;
use survey_authoring::store::{AnswerStore, KvAnswerStore, KvSurveyStore, SurveyStore};
use survey_authoring::subjects::subjects;
use survey_authoring::{
    Answer, AnswerId, AuthoringEvent, AuthoringService, DeletedAnswer, InfrastructureError, MutationConsumer,
    NatsClient, NatsConfig, PipelineConfig, Question, QuestionId, Survey, SurveyId,
};

async fn connect() -> NatsClient {
    let servers = std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());
    let config = NatsConfig {
        servers: vec![servers],
        name: "survey-authoring-it".to_string(),
        ..Default::default()
    };
    NatsClient::connect(&config).await.expect("NATS server running")
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

#[tokio::test]
#[ignore = "requires a NATS server with JetStream"]
async fn test_stream_bootstrap_is_idempotent() {
    let client = connect().await;

    for config in [JetStreamConfig::commands(), JetStreamConfig::events()] {
        let mut first = create_stream(client.jetstream(), config.clone()).await.unwrap();
        let mut second = create_stream(client.jetstream(), config.clone()).await.unwrap();

        let first = first.info().await.unwrap();
        let second = second.info().await.unwrap();
        assert_eq!(first.config.name, config.stream_name);
        assert_eq!(first.config.name, second.config.name);
        assert_eq!(first.config.duplicate_window, config.duplicate_window);
        assert_eq!(first.config.subject_transform.is_some(), config.partitions.is_some());
    }
}

#[tokio::test]
#[ignore = "requires a NATS server with JetStream"]
async fn test_kv_survey_store_detects_stale_writes() {
    let client = connect().await;
    let store = KvSurveyStore::open(client.jetstream(), &unique("it-surveys")).await.unwrap();

    let survey = Survey::new("s-kv").with_questions(vec![Question::new("a", "Q1")]);
    store.insert(&survey).await.unwrap();

    // A second insert of the same key is a conflict, not an overwrite
    let duplicate = store.insert(&survey).await.unwrap_err();
    assert!(duplicate.is_conflict());

    let loaded = store.find_by_id(&SurveyId::from("s-kv")).await.unwrap().unwrap();
    assert!(loaded.version > 0);

    let mut first = loaded.clone();
    first.questions.push(Question::new("b", "Q2"));
    store.save(&first).await.unwrap();

    // Same base version, second writer loses
    let mut stale = loaded;
    stale.questions.push(Question::new("c", "Q3"));
    let err = store.save(&stale).await.unwrap_err();
    assert!(matches!(err, InfrastructureError::ConcurrencyConflict { .. }));

    let current = store.find_by_id(&SurveyId::from("s-kv")).await.unwrap().unwrap();
    assert_eq!(current.questions.len(), 2);
    assert_eq!(current.questions[1].text, "Q2");
}

#[tokio::test]
#[ignore = "requires a NATS server with JetStream"]
async fn test_kv_answer_store_scopes_by_question() {
    let client = connect().await;
    let store = KvAnswerStore::open(client.jetstream(), &unique("it-answers")).await.unwrap();

    for (id, question, text) in [("ans-2", "a", "No"), ("ans-1", "a", "Yes"), ("ans-3", "b", "Maybe")] {
        store.insert(&Answer::new(id, text, "s-kv", question)).await.unwrap();
    }

    let survey = SurveyId::from("s-kv");
    let answers = store
        .find_by_survey_and_question(&survey, &QuestionId::from("a"))
        .await
        .unwrap();
    let ids: Vec<_> = answers.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["ans-1", "ans-2"]);

    let removed = store
        .delete_by_survey_and_question(&survey, &QuestionId::from("a"))
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let left = store.find_by_id(&AnswerId::from("ans-3")).await.unwrap();
    assert_eq!(left.map(|a| a.text), Some("Maybe".to_string()));
}

#[tokio::test]
#[ignore = "requires a NATS server with JetStream"]
async fn test_kv_answer_ids_sharing_a_suffix_stay_apart() {
    let client = connect().await;
    let store = KvAnswerStore::open(client.jetstream(), &unique("it-answers")).await.unwrap();

    store.insert(&Answer::new("x-1", "Long", "s-kv", "a")).await.unwrap();
    store.insert(&Answer::new("1", "Short", "s-kv", "a")).await.unwrap();

    assert!(store.delete_by_id(&AnswerId::from("1")).await.unwrap());
    let kept = store.find_by_id(&AnswerId::from("x-1")).await.unwrap();
    assert_eq!(kept.map(|a| a.text), Some("Long".to_string()));
    assert!(store.find_by_id(&AnswerId::from("1")).await.unwrap().is_none());

    let deleted = DeletedAnswer {
        answer: Answer::new("1", "Short", "s-kv", "a"),
        command_id: Uuid::now_v7(),
    };
    store.record_deletion(&deleted).await.unwrap();
    assert_eq!(store.find_deletion(&AnswerId::from("1")).await.unwrap(), Some(deleted));

    let answers = store
        .find_by_survey_and_question(&SurveyId::from("s-kv"), &QuestionId::from("a"))
        .await
        .unwrap();
    assert_eq!(answers.len(), 1);
}

#[tokio::test]
#[ignore = "requires a NATS server with JetStream"]
async fn test_command_round_trip_through_broker() {
    let client = connect().await;
    let jetstream = client.jetstream().clone();

    let command_stream = create_stream(&jetstream, JetStreamConfig::commands()).await.unwrap();
    create_stream(&jetstream, JetStreamConfig::events()).await.unwrap();

    let surveys = Arc::new(KvSurveyStore::open(&jetstream, &unique("it-surveys")).await.unwrap());
    let answers = Arc::new(KvAnswerStore::open(&jetstream, &unique("it-answers")).await.unwrap());

    let survey_id = unique("s");
    surveys.insert(&Survey::new(survey_id.as_str())).await.unwrap();

    // Stored subjects carry the partition token, whichever partition the survey hashes to
    let consumer_config = ConsumerConfig {
        name: unique("it-mutations"),
        filter_subjects: vec![subjects::survey_commands(&survey_id)],
        ..Default::default()
    };
    let pull = ensure_pull_consumer(&command_stream, &consumer_config).await.unwrap();

    let pipeline = MutationConsumer::new(
        surveys.clone(),
        answers.clone(),
        Arc::new(NatsNotifier::new(jetstream.clone())),
        PipelineConfig::default(),
    );
    let runner = tokio::spawn(async move { CommandRunner::new(pull, pipeline).run().await });

    let mut stored = client.inner().subscribe(subjects::survey_stored(&survey_id)).await.unwrap();

    let service = AuthoringService::new(
        Arc::new(NatsCommandProducer::new(jetstream.clone())),
        surveys.clone(),
        answers,
    );
    let receipt = service
        .add_question(SurveyId::from(survey_id.as_str()), "How was it?".to_string())
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(message) = stored.next().await {
            let event: AuthoringEvent = serde_json::from_slice(&message.payload).unwrap();
            if event.survey_id().as_str() == survey_id {
                return event;
            }
        }
        panic!("subscription closed");
    })
    .await
    .expect("stored event within timeout");

    match event {
        AuthoringEvent::SurveyStored(e) => {
            assert_eq!(e.causation_id, receipt.command_id);
            assert_eq!(e.survey.questions.len(), 1);
            assert_eq!(e.survey.questions[0].text, "How was it?");
            assert_eq!(e.survey.questions[0].id, QuestionId::for_command(receipt.command_id));
        }
        other => panic!("unexpected event {other:?}"),
    }

    let questions = service
        .get_all_questions(&SurveyId::from(survey_id.as_str()))
        .await
        .unwrap();
    assert_eq!(questions.len(), 1);

    runner.abort();
}
