// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Survey Authoring
//!
//! ```text
//! Client Request
//!     ↓
//! AuthoringService (this module)
//!     ↓ writes                    ↓ reads
//! CommandProducer             SurveyStore / AnswerStore
//!     ↓
//! captured subject → pipeline
//! ```
//!
//! Writes never touch a store; they only queue a command. The caller learns
//! the outcome from the stored or rejected subject, matched by command id.

pub mod authoring;

pub use authoring::{AuthoringService, CommandReceipt, QuestionView, ServiceError, ServiceResult};
