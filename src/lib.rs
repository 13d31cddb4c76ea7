//! Kustograph - Cypher to KQL translation
//!
//! This crate turns graph pattern-matching queries into Kusto Query Language
//! through:
//! - A YAML/JSON schema mapping from graph labels onto event tables
//! - Cypher parsing and structural validation
//! - Direct lowering onto the native KQL graph operators
//! - Escalation of patterns with no direct lowering to an assisted translator

pub mod ast_visitor;
pub mod config;
pub mod graph_catalog;
pub mod kql_query_generator;
pub mod open_cypher_parser;
pub mod query_translator;

pub use config::TranslatorConfig;
pub use graph_catalog::SchemaMapping;
pub use query_translator::{
    PathOptions, Strategy, TranslationError, TranslationResult, Translator,
};
