//! Hand-off to the assisted-translation collaborator.
//!
//! The translator never calls the collaborator itself. An escalated
//! [`TranslationResult`] carries a serializable [`EscalationRequest`]; the
//! caller forwards it wherever the collaborator runs and folds the answer back
//! in with [`merge_assisted`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Diagnostic, Strategy, TranslationResult};
use crate::graph_catalog::SchemaMapping;
use crate::open_cypher_parser::ast::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationReason {
    UnboundedPath,
    MultiTypeVariablePath,
}

impl EscalationReason {
    pub fn code(&self) -> &'static str {
        match self {
            EscalationReason::UnboundedPath => "unbounded-path",
            EscalationReason::MultiTypeVariablePath => "multi-type-variable-path",
        }
    }
}

/// Schema facts the collaborator needs to produce a compatible fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaContext {
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    pub labels: Vec<String>,
    pub relationship_types: Vec<String>,
}

impl SchemaContext {
    pub fn from_mapping(schema: &SchemaMapping) -> Self {
        SchemaContext {
            fingerprint: schema.fingerprint().to_string(),
            schema_name: schema.name().map(str::to_string),
            labels: schema.labels().map(str::to_string).collect(),
            relationship_types: schema.relationship_types().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscalationRequest {
    pub request_id: Uuid,
    pub reason: EscalationReason,
    pub detail: String,
    pub query: Query,
    pub schema_context: SchemaContext,
    /// Confidence of the parts that did resolve directly; the collaborator's
    /// own confidence is multiplied into it on merge.
    pub base_confidence: f64,
}

/// Answer from the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AssistedResponse {
    Fragment { text: String, confidence: f64 },
    Failure { message: String },
}

#[cfg_attr(test, mockall::automock)]
pub trait AssistedTranslator {
    fn translate(&self, request: &EscalationRequest) -> AssistedResponse;
}

/// Fold a collaborator answer into an escalated result.
///
/// A fragment turns the result into a direct translation whose confidence is
/// the product of the base confidence and the fragment's own; a failure turns
/// it into a rejection. Results that were not escalated come back unchanged
/// apart from a warning.
pub fn merge_assisted(mut result: TranslationResult, response: AssistedResponse) -> TranslationResult {
    let (request_id, base_confidence) = match &result.escalation {
        Some(request) => (request.request_id, request.base_confidence),
        None => {
            result.diagnostics.push(Diagnostic::warning(
                "assisted response ignored: result was not escalated",
                None,
            ));
            return result;
        }
    };

    match response {
        AssistedResponse::Fragment { text, confidence } => {
            let confidence = (base_confidence * confidence.clamp(0.0, 1.0)).clamp(0.0, 1.0);
            log::info!(
                "Merged assisted fragment for request {} (confidence {:.3})",
                request_id,
                confidence
            );
            result.text = text;
            result.strategy = Strategy::Direct;
            result.confidence = confidence;
            result.diagnostics.push(Diagnostic::info(format!(
                "fragment supplied by assisted translation for request {}",
                request_id
            )));
        }
        AssistedResponse::Failure { message } => {
            log::warn!("Assisted translation failed for request {}: {}", request_id, message);
            result.strategy = Strategy::Rejected;
            result.confidence = 0.0;
            result.diagnostics.push(Diagnostic::error(
                format!("assisted translation failed: {}", message),
                None,
            ));
        }
    }
    result
}

/// Ask `assistant` to finish an escalated result and merge its answer.
pub fn resolve_escalation(
    result: TranslationResult,
    assistant: &dyn AssistedTranslator,
) -> TranslationResult {
    let response = match (&result.strategy, &result.escalation) {
        (Strategy::Escalate, Some(request)) => assistant.translate(request),
        _ => return result,
    };
    merge_assisted(result, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_cypher_parser::parse_query;
    use crate::query_translator::result::Severity;

    fn escalated(base_confidence: f64) -> TranslationResult {
        let request = EscalationRequest {
            request_id: Uuid::new_v4(),
            reason: EscalationReason::UnboundedPath,
            detail: "relationship *".to_string(),
            query: parse_query("MATCH (a)-[:KNOWS*]->(b) RETURN b").unwrap(),
            schema_context: SchemaContext {
                fingerprint: "abc".to_string(),
                schema_name: None,
                labels: vec![],
                relationship_types: vec!["KNOWS".to_string()],
            },
            base_confidence,
        };
        TranslationResult::escalated(request, vec![])
    }

    #[test]
    fn test_merge_fragment_multiplies_confidence() {
        let merged = merge_assisted(
            escalated(0.9),
            AssistedResponse::Fragment {
                text: "Edges | take 1".to_string(),
                confidence: 0.5,
            },
        );
        assert_eq!(merged.strategy, Strategy::Direct);
        assert_eq!(merged.text, "Edges | take 1");
        assert!((merged.confidence - 0.45).abs() < 1e-9);
        assert_eq!(merged.diagnostics[0].severity, Severity::Info);
    }

    #[test]
    fn test_merge_failure_rejects() {
        let merged = merge_assisted(
            escalated(1.0),
            AssistedResponse::Failure {
                message: "no plan".to_string(),
            },
        );
        assert_eq!(merged.strategy, Strategy::Rejected);
        assert_eq!(merged.confidence, 0.0);
        assert!(merged.diagnostics[0].message.contains("no plan"));
    }

    #[test]
    fn test_merge_into_direct_result_is_noop() {
        let direct = TranslationResult::direct("print 1".to_string(), 1.0, vec![], vec![]);
        let merged = merge_assisted(
            direct,
            AssistedResponse::Fragment {
                text: "other".to_string(),
                confidence: 1.0,
            },
        );
        assert_eq!(merged.text, "print 1");
        assert_eq!(merged.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_resolve_escalation_calls_collaborator_once() {
        let mut assistant = MockAssistedTranslator::new();
        assistant
            .expect_translate()
            .withf(|request| request.reason == EscalationReason::UnboundedPath)
            .times(1)
            .returning(|_| AssistedResponse::Fragment {
                text: "G | graph-match (a)-[e*1..20]->(b) project b".to_string(),
                confidence: 0.8,
            });
        let resolved = resolve_escalation(escalated(1.0), &assistant);
        assert_eq!(resolved.strategy, Strategy::Direct);
        assert!((resolved.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_escalation_skips_direct_results() {
        let mut assistant = MockAssistedTranslator::new();
        assistant.expect_translate().times(0);
        let direct = TranslationResult::direct("print 1".to_string(), 1.0, vec![], vec![]);
        assert_eq!(resolve_escalation(direct.clone(), &assistant), direct);
    }

    #[test]
    fn test_request_serializes_reason_as_kebab_case() {
        let json = serde_json::to_value(escalated(1.0).escalation.unwrap()).unwrap();
        assert_eq!(json["reason"], "unbounded-path");
        assert_eq!(json["schema_context"]["fingerprint"], "abc");
        assert!(json["query"]["match_clause"].is_object());
    }
}
