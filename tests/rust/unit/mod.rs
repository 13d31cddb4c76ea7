//! Unit tests - parser and schema loading through the public API
//!
//! These tests need no fixtures beyond temporary files.

mod parser_robustness_tests;
mod schema_loading_tests;
