// Copyright (c) 2025 - Cowboy AI, Inc.
//! Properties of the pure validation and mutation rules

use proptest::prelude::*;
use uuid::Uuid;

use survey_authoring::commands::{Command, CommandEnvelope};
use survey_authoring::mutation::{self, Mutation};
use survey_authoring::validation::{self, QUESTION_ID_INVALID, QUESTION_TEXT_EMPTY};
use survey_authoring::{Question, QuestionId, Survey};

use crate::fixtures::{self, fixed_timestamp, SURVEY_ID};

fn text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ?]{0,30}"
}

fn blank_strategy() -> impl Strategy<Value = String> {
    "[ \t]{0,4}"
}

fn survey_strategy(min: usize) -> impl Strategy<Value = Survey> {
    prop::collection::vec(text_strategy(), min..8).prop_map(|texts| {
        Survey::new(SURVEY_ID).with_questions(
            texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| Question::new(format!("q{i}"), text))
                .collect(),
        )
    })
}

fn envelope(command_id: u128, command: Command) -> CommandEnvelope {
    CommandEnvelope::new(
        Uuid::from_u128(command_id),
        Uuid::from_u128(command_id),
        fixed_timestamp(),
        command,
    )
}

/// Validate then apply, as the consumer does
fn run(survey: &Survey, envelope: &CommandEnvelope) -> Result<Survey, Vec<String>> {
    let survey = validation::validate_command(&envelope.command, Some(survey), None)
        .map_err(|report| report.into_messages())?
        .clone();

    match mutation::apply(envelope, survey, None) {
        Ok(Mutation::Questions(change)) => Ok(change.survey),
        Ok(Mutation::Answer(_)) => panic!("question command produced an answer change"),
        Err(e) => Err(vec![e.violation().to_string()]),
    }
}

proptest! {
    #[test]
    fn prop_add_grows_by_one_with_unique_id(
        survey in survey_strategy(0),
        text in text_strategy(),
        command_id in 1u128..,
    ) {
        let command = envelope(command_id, fixtures::add_question(SURVEY_ID, &text));
        let after = run(&survey, &command).unwrap();

        prop_assert_eq!(after.questions.len(), survey.questions.len() + 1);
        let added = after.questions.last().unwrap();
        prop_assert_eq!(&added.text, &text);
        prop_assert!(!added.id.as_str().is_empty());
        prop_assert!(survey.questions.iter().all(|q| q.id != added.id));
        prop_assert_eq!(&after.questions[..survey.questions.len()], &survey.questions[..]);
    }

    #[test]
    fn prop_update_changes_only_target_text(
        survey in survey_strategy(1),
        pick in any::<prop::sample::Index>(),
        text in text_strategy(),
    ) {
        let target = pick.get(&survey.questions).id.clone();
        let command = envelope(1, fixtures::update_question(SURVEY_ID, target.as_str(), &text));
        let after = run(&survey, &command).unwrap();

        prop_assert_eq!(after.questions.len(), survey.questions.len());
        for (before, now) in survey.questions.iter().zip(&after.questions) {
            prop_assert_eq!(&before.id, &now.id);
            if before.id == target {
                prop_assert_eq!(&now.text, &text);
            } else {
                prop_assert_eq!(&now.text, &before.text);
            }
        }
    }

    #[test]
    fn prop_delete_removes_exactly_that_id(
        survey in survey_strategy(1),
        pick in any::<prop::sample::Index>(),
    ) {
        let target = pick.get(&survey.questions).id.clone();
        let command = envelope(1, fixtures::delete_question(SURVEY_ID, target.as_str()));
        let after = run(&survey, &command).unwrap();

        prop_assert_eq!(after.questions.len(), survey.questions.len() - 1);
        prop_assert_eq!(after.count_question(&target), 0);

        let kept: Vec<_> = survey.questions.iter().filter(|q| q.id != target).cloned().collect();
        prop_assert_eq!(after.questions, kept);
    }

    #[test]
    fn prop_published_survey_rejects_every_command(
        survey in survey_strategy(0),
        which in 0usize..6,
    ) {
        let published = survey.published();
        let command = fixtures::every_command(SURVEY_ID).swap_remove(which);

        let report = validation::validate_command(&command, Some(&published), None).unwrap_err();
        prop_assert_eq!(report.messages(), &[format!("Survey [{SURVEY_ID}] is already published")]);
    }

    #[test]
    fn prop_invalid_id_and_blank_text_yield_two_messages(
        survey in survey_strategy(0),
        blank in blank_strategy(),
    ) {
        let command = fixtures::update_question(SURVEY_ID, "not-a-question", &blank);
        prop_assume!(!survey.questions.iter().any(|q| q.id == QuestionId::from("not-a-question")));

        let report = validation::validate_command(&command, Some(&survey), None).unwrap_err();
        prop_assert_eq!(report.len(), 2);
        prop_assert_eq!(report.messages(), &[QUESTION_ID_INVALID.to_string(), QUESTION_TEXT_EMPTY.to_string()]);
    }
}
