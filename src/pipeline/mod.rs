// Copyright (c) 2025 - Cowboy AI, Inc.
//! Survey Mutation Pipeline
//!
//! ```text
//! captured subject → JetStream → CommandRunner → MutationConsumer
//!                                                   ↓ load / validate / mutate
//!                                                SurveyStore, AnswerStore
//!                                                   ↓
//!                                                Notifier → stored / rejected subject
//! ```
//!
//! Commands are processed one at a time per consumer. Everything between
//! load and save is synchronous and pure; only the stores and the notifier
//! suspend.

pub mod consumer;
pub mod notifier;
pub mod runner;
pub mod stage;

pub use consumer::{MutationConsumer, Outcome, Processed};
pub use notifier::{subject_for, NatsNotifier, Notifier, RecordingNotifier};
pub use runner::{decode, CommandRunner, Disposition, RunStats};
pub use stage::{Stage, StageTracker, StateMachine, Step, TransitionError, TransitionResult};
