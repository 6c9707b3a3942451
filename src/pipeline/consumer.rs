// Copyright (c) 2025 - Cowboy AI, Inc.
//! Mutation Consumer
//!
//! Runs one command through the stage machine:
//!
//! ```text
//! 1. Load      survey by id, plus the answer record the command addresses
//! 2. Validate  pre-checks, then per-action rules (pure)
//! 3. Mutate    pure handler builds the new state
//! 4. Persist   conditional save; a lost race reloads and starts over
//! 5. Notify    publish the full post-mutation snapshot
//! ```
//!
//! A command that fails validation is published on the rejection subject and
//! counts as processed. Only infrastructure failures come back as `Err`,
//! which the runner turns into a broker redelivery.
//!
//! # Redelivery
//!
//! - Add derives its entity id from the command id, so a redelivered Add finds
//!   its own entity and re-publishes the snapshot without changing anything
//! - Delete leaves a removal record keyed by its command id. A redelivered
//!   Delete finds that record, skips validation, re-runs the answer cascade
//!   and re-publishes the snapshot
//! - Update writes the same text again and re-publishes

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::notifier::Notifier;
use super::stage::{Stage, StageTracker, Step};
use crate::commands::{Command, CommandEnvelope};
use crate::config::{AnswerRetention, PipelineConfig};
use crate::domain::{Answer, AnswerId, DeletedAnswer};
use crate::errors::InfrastructureResult;
use crate::events::{AnswersStored, AuthoringEvent, CommandRejected, SurveyStored};
use crate::jetstream::Delivery;
use crate::mutation::{self, AnswerChange, Mutation, SurveyMutation};
use crate::store::{AnswerStore, SurveyStore};
use crate::validation::{self, ViolationReport};

/// How a command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Persisted (or found already applied) and notified
    Stored(AuthoringEvent),
    /// Dropped with a violation report
    Rejected(CommandRejected),
}

impl Outcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    pub fn violations(&self) -> Option<&ViolationReport> {
        match self {
            Outcome::Rejected(event) => Some(&event.violations),
            Outcome::Stored(_) => None,
        }
    }
}

/// Result of processing one command
#[derive(Debug, Clone)]
pub struct Processed {
    pub outcome: Outcome,
    /// Stages visited, starting with `Received`
    pub stages: Vec<Stage>,
    /// Load-validate-mutate-save cycles run; above 1 after conflicts
    pub attempts: u32,
}

/// Loads, validates, mutates, persists and notifies
#[derive(Clone)]
pub struct MutationConsumer {
    surveys: Arc<dyn SurveyStore>,
    answers: Arc<dyn AnswerStore>,
    notifier: Arc<dyn Notifier>,
    config: PipelineConfig,
}

impl MutationConsumer {
    pub fn new(
        surveys: Arc<dyn SurveyStore>,
        answers: Arc<dyn AnswerStore>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            surveys,
            answers,
            notifier,
            config,
        }
    }

    /// Process one delivered command to completion
    pub async fn process(&self, envelope: CommandEnvelope, delivery: Delivery) -> InfrastructureResult<Processed> {
        let survey_id = envelope.survey_id().clone();
        let mut tracker = StageTracker::new();
        let mut attempts = 0u32;

        debug!(
            command_id = %envelope.command_id,
            survey_id = %survey_id,
            delivered = delivery.delivered,
            "Received {}",
            envelope
        );

        loop {
            attempts += 1;

            // Unaddressable ids are never used as store keys
            let loaded = if survey_id.is_valid() {
                self.surveys.find_by_id(&survey_id).await?
            } else {
                None
            };
            let answer = self.load_answer(&envelope).await?;
            let deleted = self.load_deletion(&envelope).await?;
            if tracker.current() == Stage::Received {
                tracker.advance(Step::Load)?;
            }

            let survey = match validation::check_survey(&survey_id, loaded.as_ref()) {
                Ok(survey) => survey.clone(),
                Err(report) => return self.reject(envelope, report, delivery, tracker, attempts).await,
            };

            let mutation = match mutation::replay(&envelope, &survey, deleted.as_ref()) {
                Some(replayed) => {
                    info!(
                        command_id = %envelope.command_id,
                        survey_id = %survey_id,
                        "Delete already applied, repeating its side effects"
                    );
                    tracker.advance(Step::Accept)?;
                    replayed
                }
                None => {
                    let violations = validation::validate(&envelope.command, &survey, answer.as_ref());
                    if let Some(report) = ViolationReport::from_messages(violations) {
                        return self.reject(envelope, report, delivery, tracker, attempts).await;
                    }
                    tracker.advance(Step::Accept)?;

                    match mutation::apply(&envelope, survey, answer) {
                        Ok(mutation) => mutation,
                        Err(e) => {
                            let report = ViolationReport::single(e.violation());
                            return self.reject(envelope, report, delivery, tracker, attempts).await;
                        }
                    }
                }
            };
            tracker.advance(Step::Mutate)?;

            let event = match self.persist(&envelope, mutation).await {
                Ok(event) => event,
                Err(e) if e.is_conflict() && attempts <= self.config.max_conflict_retries => {
                    warn!(
                        command_id = %envelope.command_id,
                        survey_id = %survey_id,
                        attempt = attempts,
                        error = %e,
                        "Conflict on save, reloading"
                    );
                    tracker.advance(Step::Conflict)?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracker.advance(Step::Persist)?;

            self.notifier.publish(&event).await?;
            tracker.advance(Step::Notify)?;

            info!(
                command_id = %envelope.command_id,
                survey_id = %survey_id,
                event_type = event.event_type_name(),
                attempts,
                "Command stored"
            );

            return Ok(Processed {
                outcome: Outcome::Stored(event),
                stages: tracker.into_history(),
                attempts,
            });
        }
    }

    /// Answer record the command addresses
    ///
    /// For AddAnswer this is whatever is stored under the derived id, which is
    /// how a redelivered add recognises its own record.
    async fn load_answer(&self, envelope: &CommandEnvelope) -> InfrastructureResult<Option<Answer>> {
        let id = match &envelope.command {
            Command::AddAnswer(_) => AnswerId::for_command(envelope.command_id),
            Command::UpdateAnswer(c) => c.answer_id.clone(),
            Command::DeleteAnswer(c) => c.answer_id.clone(),
            _ => return Ok(None),
        };
        if !id.is_valid() {
            return Ok(None);
        }
        self.answers.find_by_id(&id).await
    }

    /// Removal record left by an earlier run of this DeleteAnswer
    async fn load_deletion(&self, envelope: &CommandEnvelope) -> InfrastructureResult<Option<DeletedAnswer>> {
        match &envelope.command {
            Command::DeleteAnswer(c) if c.answer_id.is_valid() => self.answers.find_deletion(&c.answer_id).await,
            _ => Ok(None),
        }
    }

    async fn persist(&self, envelope: &CommandEnvelope, mutation: Mutation) -> InfrastructureResult<AuthoringEvent> {
        match mutation {
            Mutation::Questions(change) => self.persist_survey(envelope, change).await,
            Mutation::Answer(change) => self.persist_answer(envelope, change).await,
        }
    }

    async fn persist_survey(
        &self,
        envelope: &CommandEnvelope,
        change: SurveyMutation,
    ) -> InfrastructureResult<AuthoringEvent> {
        let SurveyMutation {
            mut survey,
            changed,
            removed,
        } = change;

        if changed {
            survey.version = self.surveys.save(&survey).await?;
            debug!(survey_id = %survey.id, version = survey.version, "Survey saved");
        } else {
            info!(
                command_id = %envelope.command_id,
                survey_id = %survey.id,
                "Command already applied, republishing snapshot"
            );
        }

        if let Some(question_id) = removed {
            if self.config.answer_retention == AnswerRetention::Cascade {
                let count = self
                    .answers
                    .delete_by_survey_and_question(&survey.id, &question_id)
                    .await?;
                debug!(survey_id = %survey.id, question_id = %question_id, count, "Removed answers of deleted question");
            }
        }

        Ok(SurveyStored::new(envelope, survey, Utc::now()).into())
    }

    async fn persist_answer(
        &self,
        envelope: &CommandEnvelope,
        change: AnswerChange,
    ) -> InfrastructureResult<AuthoringEvent> {
        match &change {
            AnswerChange::Inserted(answer) => self.answers.insert(answer).await?,
            AnswerChange::Updated(answer) => self.answers.save(answer).await?,
            AnswerChange::Deleted(answer) => {
                self.answers
                    .record_deletion(&DeletedAnswer {
                        answer: answer.clone(),
                        command_id: envelope.command_id,
                    })
                    .await?;
                self.answers.delete_by_id(&answer.id).await?;
            }
            AnswerChange::AlreadyApplied(answer) => {
                info!(
                    command_id = %envelope.command_id,
                    answer_id = %answer.id,
                    "Command already applied, republishing answers"
                );
            }
        }

        let answer = change.answer();
        let answers = self
            .answers
            .find_by_survey_and_question(&answer.survey_id, &answer.question_id)
            .await?;

        Ok(AnswersStored::new(
            envelope,
            answer.survey_id.clone(),
            answer.question_id.clone(),
            answers,
            Utc::now(),
        )
        .into())
    }

    async fn reject(
        &self,
        envelope: CommandEnvelope,
        report: ViolationReport,
        delivery: Delivery,
        mut tracker: StageTracker,
        attempts: u32,
    ) -> InfrastructureResult<Processed> {
        tracker.advance(Step::Reject)?;

        warn!(
            command_id = %envelope.command_id,
            survey_id = %envelope.survey_id(),
            violations = %report,
            "Command rejected"
        );

        let event = CommandRejected::new(envelope, report, delivery, Utc::now());
        self.notifier.publish(&event.clone().into()).await?;

        Ok(Processed {
            outcome: Outcome::Rejected(event),
            stages: tracker.into_history(),
            attempts,
        })
    }
}
