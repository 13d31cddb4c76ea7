//! Cypher text in, KQL text (or an escalation) out.
//!
//! ```text
//! Parsed -> SchemaResolved -> ClausesTranslated -> Assembled -> Succeeded
//!    |            |                  |
//!    +------------+------------------+--> Rejected | Escalated
//! ```
//!
//! Parsing and structural validation come first, then every schema reference
//! is resolved into a [`TranslationContext`]. Relationship lengths are checked
//! next: an open-ended repetition stops here as an escalation, before any
//! text is produced.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::ast_visitor::StructuralValidator;
use crate::config::TranslatorConfig;
use crate::graph_catalog::SchemaMapping;
use crate::kql_query_generator::{check_path_lengths, generate_kql, TranslationContext};
use crate::open_cypher_parser::{ast::Query, parse_query};

pub mod confidence;
pub mod errors;
pub mod escalation;
pub mod options;
pub mod result;

pub use errors::{TranslationError, UnsupportedKind};
pub use escalation::{
    merge_assisted, resolve_escalation, AssistedResponse, AssistedTranslator, EscalationReason,
    EscalationRequest, SchemaContext,
};
pub use options::{PathEnumerationOptions, PathOptions};
pub use result::{Diagnostic, ExecutionHint, Severity, Strategy, TranslationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Parsed,
    SchemaResolved,
    ClausesTranslated,
    Assembled,
    Succeeded,
    Rejected,
    Escalated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parsed => "parsed",
            Phase::SchemaResolved => "schema-resolved",
            Phase::ClausesTranslated => "clauses-translated",
            Phase::Assembled => "assembled",
            Phase::Succeeded => "succeeded",
            Phase::Rejected => "rejected",
            Phase::Escalated => "escalated",
        };
        f.write_str(name)
    }
}

fn enter(phase: Phase) {
    log::debug!("Translation phase: {}", phase);
}

/// Translates queries against one schema mapping and configuration.
///
/// Holds no mutable state; share it freely across threads.
#[derive(Debug, Clone)]
pub struct Translator {
    schema: Arc<SchemaMapping>,
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(schema: Arc<SchemaMapping>, config: TranslatorConfig) -> Self {
        log::info!(
            "Translator ready: {} entities, schema {}",
            schema.entities().len(),
            schema.fingerprint()
        );
        Translator { schema, config }
    }

    pub fn schema(&self) -> &SchemaMapping {
        &self.schema
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn translate(&self, text: &str) -> Result<TranslationResult, TranslationError> {
        self.translate_with_options(text, &PathOptions::default())
    }

    pub fn translate_with_options(
        &self,
        text: &str,
        options: &PathOptions,
    ) -> Result<TranslationResult, TranslationError> {
        let query = parse_query(text).map_err(|err| {
            enter(Phase::Rejected);
            log::warn!("Rejected query: {}", err);
            TranslationError::from(err)
        })?;
        self.translate_query(&query, options)
    }

    /// Translates an already parsed query.
    pub fn translate_query(
        &self,
        query: &Query,
        options: &PathOptions,
    ) -> Result<TranslationResult, TranslationError> {
        self.run(query, options).inspect_err(|err| {
            enter(Phase::Rejected);
            log::warn!("Rejected query ({}): {}", err.kind(), err);
        })
    }

    /// Like [`translate`](Self::translate), with errors folded into a result
    /// whose strategy is `rejected`.
    pub fn translate_to_result(&self, text: &str) -> TranslationResult {
        self.translate_to_result_with_options(text, &PathOptions::default())
    }

    pub fn translate_to_result_with_options(
        &self,
        text: &str,
        options: &PathOptions,
    ) -> TranslationResult {
        match self.translate_with_options(text, options) {
            Ok(result) => result,
            Err(err) => TranslationResult::rejected(Diagnostic::error(
                format!("{}: {}", err.kind(), err),
                err.position(),
            )),
        }
    }

    fn run(&self, query: &Query, options: &PathOptions) -> Result<TranslationResult, TranslationError> {
        enter(Phase::Parsed);
        if let Some(violation) = StructuralValidator::validate(query).into_iter().next() {
            return Err(violation.into());
        }

        let ctx = TranslationContext::build(query, &self.schema, &self.config, options)?;
        enter(Phase::SchemaResolved);
        let base_confidence = confidence::confidence(
            ctx.approximations() + ctx.capped_searches(),
            ctx.fallbacks(),
        );

        if let Some((reason, detail)) = check_path_lengths(query, &self.config)? {
            enter(Phase::Escalated);
            let request = EscalationRequest {
                request_id: Uuid::new_v4(),
                reason,
                detail: detail.clone(),
                query: query.clone(),
                schema_context: SchemaContext::from_mapping(&self.schema),
                base_confidence,
            };
            log::info!(
                "Escalating request {} ({}): {}",
                request.request_id,
                reason.code(),
                detail
            );
            let diagnostics = vec![Diagnostic::info(format!(
                "escalated ({}): {}",
                reason.code(),
                detail
            ))];
            return Ok(TranslationResult::escalated(request, diagnostics));
        }

        let mut diagnostics = Vec::new();
        let mut hints = Vec::new();
        let text = generate_kql(query, &ctx, options, &mut diagnostics, &mut hints)?;
        enter(Phase::ClausesTranslated);

        if text.trim().is_empty() {
            return Err(TranslationError::TranslationAssembly(
                "generated query text is empty".to_string(),
            ));
        }
        enter(Phase::Assembled);

        if ctx.approximations() > 0 {
            diagnostics.push(Diagnostic::info(format!(
                "{} label(s) or relationship type(s) combine several entities; rows are unioned",
                ctx.approximations()
            )));
        }
        if ctx.fallbacks() > 0 {
            diagnostics.push(Diagnostic::info(format!(
                "{} schema name(s) matched only case-insensitively",
                ctx.fallbacks()
            )));
        }

        enter(Phase::Succeeded);
        log::debug!("Translated with confidence {:.3}", base_confidence);
        Ok(TranslationResult::direct(
            text,
            base_confidence,
            diagnostics,
            hints,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnboundedPathPolicy;
    use crate::kql_query_generator::context::tests::schema;

    fn translator(config: TranslatorConfig) -> Translator {
        Translator::new(Arc::new(schema()), config)
    }

    #[test]
    fn test_unbounded_path_escalates_before_generation() {
        let result = translator(TranslatorConfig::default())
            .translate("MATCH (a:Person)-[:KNOWS*]->(b:Person) RETURN b.name")
            .unwrap();
        assert_eq!(result.strategy, Strategy::Escalate);
        assert_eq!(result.confidence, 0.0);
        assert!(result.text.is_empty());
        let request = result.escalation.unwrap();
        assert_eq!(request.reason, EscalationReason::UnboundedPath);
        assert_eq!(request.base_confidence, 1.0);
        assert!(request
            .schema_context
            .relationship_types
            .contains(&"KNOWS".to_string()));
    }

    #[test]
    fn test_reject_policy_returns_error() {
        let config = TranslatorConfig {
            unbounded_path_policy: UnboundedPathPolicy::Reject,
            ..Default::default()
        };
        let err = translator(config)
            .translate("MATCH (a:Person)-[:KNOWS*]->(b:Person) RETURN b")
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported-pattern");
    }

    #[test]
    fn test_union_lowers_confidence() {
        let result = translator(TranslatorConfig::default())
            .translate("MATCH (u:User)-[:LOGGED_ON]->(d:Device) RETURN d.name")
            .unwrap();
        assert_eq!(result.strategy, Strategy::Direct);
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("rows are unioned")));
    }

    #[test]
    fn test_capped_shortest_path_lowers_confidence() {
        let translator = translator(TranslatorConfig::default());
        let capped = translator
            .translate("MATCH p = shortestPath((a:Person)-[:KNOWS*]-(b:Person)) WHERE a.name = 'Alice' RETURN p")
            .unwrap();
        assert_eq!(capped.strategy, Strategy::Direct);
        assert!((capped.confidence - 0.9).abs() < 1e-9);
        assert!(capped
            .diagnostics
            .iter()
            .any(|d| d.message.contains("capped at 10 hops")));

        let bounded = translator
            .translate("MATCH p = shortestPath((a:Person)-[:KNOWS*1..4]-(b:Person)) WHERE a.name = 'Alice' RETURN p")
            .unwrap();
        assert_eq!(bounded.confidence, 1.0);
    }

    #[test]
    fn test_case_insensitive_fallback_lowers_confidence() {
        let config = TranslatorConfig {
            case_insensitive_schema_fallback: true,
            ..Default::default()
        };
        let result = translator(config)
            .translate("MATCH (d:device) RETURN d.name")
            .unwrap();
        assert!((result.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_errors_fold_into_rejected_result() {
        let result = translator(TranslatorConfig::default()).translate_to_result("RETURN u.name");
        assert_eq!(result.strategy, Strategy::Rejected);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
        assert!(result.diagnostics[0].message.starts_with("unbound-identifier"));
        assert!(result.diagnostics[0].position.is_some());
    }

    #[test]
    fn test_translator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Translator>();
    }
}
