// Copyright (c) 2025 - Cowboy AI, Inc.
//! Survey Authoring Domain Models
//!
//! - [`Survey`] - aggregate root holding the ordered question list
//! - [`Question`] - nested entity, addressed only by [`QuestionId`]
//! - [`Answer`] - standalone record linked to a survey and a question
//!
//! Identifier newtypes and the id assignment policy live in [`ids`].

pub mod ids;
pub mod survey;

pub use ids::{derive_entity_id, parse_id, AnswerId, IdError, QuestionId, SurveyId};
pub use survey::{Answer, DeletedAnswer, Question, RemovedQuestion, Survey};
