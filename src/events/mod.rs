// Copyright (c) 2025 - Cowboy AI, Inc.
//! Survey Authoring Events
//!
//! Events are immutable facts published after the pipeline finishes a command:
//!
//! ```text
//! question command  → SurveyStored     (full survey snapshot)
//! answer command    → AnswersStored    (full answer set of the question)
//! rejected command  → CommandRejected  (command + violations + delivery)
//! ```
//!
//! # Correlation and Causation
//!
//! - **correlation_id**: copied from the command envelope
//! - **causation_id**: the command id that produced the event
//!
//! # Event Versioning
//!
//! Every event carries `event_version`, starting at 1.

pub mod authoring;
pub mod stored;

pub use authoring::AuthoringEvent;
pub use stored::{event_id_for, AnswersStored, CommandRejected, SurveyStored, EVENT_VERSION};
