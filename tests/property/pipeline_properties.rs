// Copyright (c) 2025 - Cowboy AI, Inc.
//! Model-based properties of the full consumer
//!
//! A random sequence of question commands is run through the consumer and
//! through a plain `Vec` model side by side; after every command the stored
//! survey must equal the model.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use survey_authoring::commands::{Command, CommandEnvelope};
use survey_authoring::store::InMemorySurveyStore;
use survey_authoring::{QuestionId, Survey};

use crate::fixtures::{self, delivery, fixed_timestamp, CountingSurveyStore, Harness, SURVEY_ID};

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Update(prop::sample::Index, String),
    Delete(prop::sample::Index),
    /// Process the previous command again
    Redeliver,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[A-Za-z]{1,12}".prop_map(Op::Add),
        2 => (any::<prop::sample::Index>(), "[A-Za-z]{1,12}").prop_map(|(i, t)| Op::Update(i, t)),
        2 => any::<prop::sample::Index>().prop_map(Op::Delete),
        1 => Just(Op::Redeliver),
    ]
}

fn pick(model: &[(QuestionId, String)], index: &prop::sample::Index) -> String {
    if model.is_empty() {
        "missing".to_string()
    } else {
        index.get(model).0.to_string()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_consumer_matches_model(ops in prop::collection::vec(op_strategy(), 1..20)) {
        tokio_test::block_on(async {
            let store = Arc::new(CountingSurveyStore::new(InMemorySurveyStore::with_surveys([
                Survey::new(SURVEY_ID),
            ])));
            let harness = Harness::new(store.clone(), Vec::new());
            let mut rejected = 0usize;

            let mut model: Vec<(QuestionId, String)> = Vec::new();
            let mut applied_deletes: HashSet<Uuid> = HashSet::new();
            let mut last: Option<CommandEnvelope> = None;

            for (n, op) in ops.iter().enumerate() {
                let command_id = Uuid::from_u128(n as u128 + 1);
                let envelope = match op {
                    Op::Redeliver => match last.clone() {
                        Some(previous) => previous,
                        None => continue,
                    },
                    Op::Add(text) => CommandEnvelope::new(
                        command_id, command_id, fixed_timestamp(),
                        fixtures::add_question(SURVEY_ID, text),
                    ),
                    Op::Update(index, text) => CommandEnvelope::new(
                        command_id, command_id, fixed_timestamp(),
                        fixtures::update_question(SURVEY_ID, &pick(&model, index), text),
                    ),
                    Op::Delete(index) => CommandEnvelope::new(
                        command_id, command_id, fixed_timestamp(),
                        fixtures::delete_question(SURVEY_ID, &pick(&model, index)),
                    ),
                };

                let processed = harness
                    .consumer
                    .process(envelope.clone(), delivery(n as u64 + 1, 1))
                    .await
                    .unwrap();

                if processed.outcome.is_rejected() {
                    rejected += 1;
                }

                // Advance the model the way the rules say
                match &envelope.command {
                    Command::AddQuestion(c) => {
                        let id = QuestionId::for_command(envelope.command_id);
                        if !model.iter().any(|(q, _)| q == &id) {
                            model.push((id, c.text.clone()));
                        }
                        prop_assert!(!processed.outcome.is_rejected());
                    }
                    Command::UpdateQuestion(c) => {
                        match model.iter_mut().find(|(q, _)| q == &c.question_id) {
                            Some(entry) => {
                                entry.1 = c.text.clone();
                                prop_assert!(!processed.outcome.is_rejected());
                            }
                            None => prop_assert!(processed.outcome.is_rejected()),
                        }
                    }
                    Command::DeleteQuestion(c) => {
                        match model.iter().position(|(q, _)| q == &c.question_id) {
                            Some(position) => {
                                prop_assert!(!processed.outcome.is_rejected());
                                model.remove(position);
                                applied_deletes.insert(envelope.command_id);
                            }
                            // The same delete again republishes without changes
                            None if applied_deletes.contains(&envelope.command_id) => {
                                prop_assert!(!processed.outcome.is_rejected());
                            }
                            None => prop_assert!(processed.outcome.is_rejected()),
                        }
                    }
                    other => panic!("unexpected command {other:?}"),
                }

                let stored: Vec<(QuestionId, String)> = harness
                    .survey(SURVEY_ID)
                    .await
                    .questions
                    .into_iter()
                    .map(|q| (q.id, q.text))
                    .collect();
                prop_assert_eq!(&stored, &model);

                last = Some(envelope);
            }

            // Rejections never reach the store
            prop_assert!(store.saves() <= ops.len() - rejected);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
