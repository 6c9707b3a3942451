// Copyright (c) 2025 - Cowboy AI, Inc.
//! Identifier Value Objects and the Id Assignment Policy
//!
//! Surveys, questions and answers are addressed by opaque string ids. Ids
//! created by the pipeline are derived from the idempotency token of the
//! command that created the entity:
//!
//! ```text
//! entity_id = UUIDv5(ENTITY_NAMESPACE, command_id)
//! ```
//!
//! The command id is a UUID v7 minted by the producer, so derived ids are
//! globally unique, yet a redelivered command re-derives the *same* id and the
//! mutation step can recognise the entity it already created. Positions in the
//! question list are never identifiers.
//!
//! # Token Rules
//!
//! Ids become NATS subject tokens and KV key segments, so an id is only
//! usable when it is 1 to [`MAX_ID_LENGTH`] characters of ASCII letters,
//! digits, `-` or `_`. Wrapping never fails; [`parse_id`] and `is_valid`
//! tell callers whether an id may be addressed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Longest id accepted as a subject token
pub const MAX_ID_LENGTH: usize = 128;

/// Id is not usable as a subject token or key segment
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Id is empty")]
    Empty,

    #[error("Id exceeds maximum length of 128 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in id: {0:?}")]
    InvalidCharacter(char),
}

/// Check that `id` can be used as a subject token and key segment
pub fn parse_id(id: &str) -> Result<&str, IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong(id.len()));
    }
    if let Some(ch) = id.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-' && *ch != '_') {
        return Err(IdError::InvalidCharacter(ch));
    }
    Ok(id)
}

/// Namespace for ids derived from command tokens
pub const ENTITY_NAMESPACE: Uuid = Uuid::from_u128(0x5d1e_7a2c_0b9f_4c3e_8a61_27f4_90d3_c8b1);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The id as an addressable token
            pub fn token(&self) -> Result<&str, IdError> {
                parse_id(&self.0)
            }

            pub fn is_valid(&self) -> bool {
                self.token().is_ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Survey aggregate identifier (also the partition key)
    SurveyId
);

string_id!(
    /// Identifier of a question nested inside a survey
    QuestionId
);

string_id!(
    /// Identifier of a standalone answer record
    AnswerId
);

/// Derive the id of the entity created by `command_id`.
///
/// Deterministic: the same command always yields the same id.
pub fn derive_entity_id(command_id: Uuid) -> String {
    Uuid::new_v5(&ENTITY_NAMESPACE, command_id.as_bytes())
        .hyphenated()
        .to_string()
}

impl QuestionId {
    /// Id for the question created by `command_id`
    pub fn for_command(command_id: Uuid) -> Self {
        Self(derive_entity_id(command_id))
    }
}

impl AnswerId {
    /// Id for the answer created by `command_id`
    pub fn for_command(command_id: Uuid) -> Self {
        Self(derive_entity_id(command_id))
    }
}
