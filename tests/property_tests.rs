// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Entry Point
//!
//! Uses proptest to check the validation and mutation rules for arbitrary
//! surveys and command inputs.

mod fixtures;
mod property;
