use mockall::mock;

use kustograph::query_translator::{
    merge_assisted, resolve_escalation, AssistedResponse, AssistedTranslator, EscalationReason,
    EscalationRequest, Severity, Strategy,
};

use super::common::{security_schema, translator};

mock! {
    pub Assistant {}

    impl AssistedTranslator for Assistant {
        fn translate(&self, request: &EscalationRequest) -> AssistedResponse;
    }
}

const UNBOUNDED: &str = "MATCH (a:User)-[:KNOWS*]->(b:User) WHERE a.name = 'Alice' RETURN b.name";

#[test]
fn test_escalation_request_carries_query_and_schema() {
    let result = translator().translate(UNBOUNDED).unwrap();
    let request = result.escalation.as_ref().unwrap();
    assert_eq!(request.schema_context.fingerprint, security_schema().fingerprint());
    assert_eq!(request.schema_context.schema_name.as_deref(), Some("security_graph"));
    assert!(request.detail.contains("[:KNOWS*]"));
    assert!(request.query.where_clause.is_some());

    let json = serde_json::to_value(request).unwrap();
    assert_eq!(json["reason"], "unbounded-path");
    assert!(json["request_id"].is_string());
}

#[test]
fn test_each_escalation_gets_a_fresh_request_id() {
    let translator = translator();
    let first = translator.translate(UNBOUNDED).unwrap().escalation.unwrap();
    let second = translator.translate(UNBOUNDED).unwrap().escalation.unwrap();
    assert_ne!(first.request_id, second.request_id);
    assert_eq!(first.query, second.query);
}

#[test]
fn test_assisted_fragment_completes_the_translation() {
    let mut assistant = MockAssistant::new();
    assistant
        .expect_translate()
        .withf(|request| request.reason == EscalationReason::UnboundedPath)
        .times(1)
        .returning(|_| AssistedResponse::Fragment {
            text: "G | graph-match (a)-[e*1..50]->(b) project b_name = b.AccountName".to_string(),
            confidence: 0.7,
        });

    let escalated = translator().translate(UNBOUNDED).unwrap();
    let resolved = resolve_escalation(escalated, &assistant);
    assert_eq!(resolved.strategy, Strategy::Direct);
    assert!((resolved.confidence - 0.7).abs() < 1e-9);
    assert!(resolved.text.starts_with("G | graph-match"));
}

#[test]
fn test_assisted_failure_rejects() {
    let escalated = translator().translate(UNBOUNDED).unwrap();
    let merged = merge_assisted(
        escalated,
        AssistedResponse::Failure {
            message: "depth limit exceeded".to_string(),
        },
    );
    assert_eq!(merged.strategy, Strategy::Rejected);
    assert!(merged
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("depth limit exceeded")));
}

#[test]
fn test_assisted_response_wire_format() {
    let response: AssistedResponse = serde_json::from_str(
        r#"{"status": "fragment", "text": "print 1", "confidence": 0.5}"#,
    )
    .unwrap();
    assert_eq!(
        response,
        AssistedResponse::Fragment {
            text: "print 1".to_string(),
            confidence: 0.5,
        }
    );
}
