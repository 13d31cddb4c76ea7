//! Integration tests - full translations through the public `Translator` API
//!
//! These tests verify that parsing, schema resolution, clause translation and
//! assembly work together against a realistic security-event schema.

mod common;
mod escalation_tests;
mod optional_match_tests;
mod path_translation_tests;
mod translation_scenarios;
