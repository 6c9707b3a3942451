// Copyright (c) 2025 - Cowboy AI, Inc.
//! Survey authoring mutation pipeline
//!
//! Authors edit a survey (an ordered list of questions, each with answers)
//! by sending commands. Commands are queued on NATS JetStream, then a
//! consumer loads the survey, validates the command, applies it, saves the
//! result and publishes the full post-mutation snapshot.
//!
//! ```text
//! AuthoringService → CommandProducer → authoring.{question,answer}.captured.<survey>
//!                                              ↓
//!                                      MutationConsumer
//!                                              ↓
//!              authoring.survey.stored / authoring.answer.stored / authoring.command.rejected
//! ```
//!
//! Domain logic (`validation`, `mutation`) is pure. Stores, the broker and the
//! clock sit behind the pipeline and service layers.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod jetstream;
pub mod mutation;
pub mod nats;
pub mod pipeline;
pub mod producer;
pub mod service;
pub mod store;
pub mod subjects;
pub mod validation;

// Re-export commonly used types
pub use commands::{Command, CommandEnvelope};
pub use config::{AnswerRetention, AuthoringConfig, PipelineConfig};
pub use domain::{Answer, AnswerId, DeletedAnswer, IdError, Question, QuestionId, Survey, SurveyId};
pub use errors::{InfrastructureError, InfrastructureResult};
pub use events::AuthoringEvent;
pub use nats::{NatsClient, NatsConfig};
pub use pipeline::{MutationConsumer, Outcome, Processed, Stage};
pub use service::{AuthoringService, CommandReceipt, ServiceError};
pub use validation::ViolationReport;
