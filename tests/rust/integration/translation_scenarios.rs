use kustograph::query_translator::{EscalationReason, Severity, Strategy, UnsupportedKind};
use kustograph::{PathOptions, TranslationError, TranslatorConfig};

use super::common::{translator, translator_with};

#[test]
fn test_filtered_single_label_is_exact_table_query() {
    let result = translator()
        .translate("MATCH (u:User) WHERE u.age > 30 RETURN u.name LIMIT 10")
        .unwrap();
    assert_eq!(result.strategy, Strategy::Direct);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(
        result.text,
        "IdentityInfo\n| where Age > 30\n| project u_name = AccountName\n| take 10"
    );
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_bounded_path_within_ceiling_keeps_its_range() {
    let config = TranslatorConfig {
        max_path_depth: 5,
        ..Default::default()
    };
    let result = translator_with(config)
        .translate("MATCH (a:User)-[:KNOWS*1..3]->(b:User) RETURN b.name")
        .unwrap();
    assert_eq!(result.strategy, Strategy::Direct);
    assert!(result.text.contains("(a)-[_e0*1..3]->(b)"));
    assert!(result
        .text
        .contains("all(_e0, set_has_element(EdgeTypes, \"KNOWS\"))"));
    assert!(result.text.contains("project b_name = b.AccountName"));
}

#[test]
fn test_bounded_path_between_unlabeled_nodes() {
    let result = translator()
        .translate("MATCH (a)-[:KNOWS*1..3]->(b) RETURN b")
        .unwrap();
    assert_eq!(result.strategy, Strategy::Direct);
    assert!(result.text.contains("| graph-match (a)-[_e0*1..3]->(b)"));
    assert!(result
        .text
        .contains("all(_e0, set_has_element(EdgeTypes, \"KNOWS\"))"));
    assert!(result.text.ends_with("    project b"));
}

#[test]
fn test_wildcard_with_nothing_bound_is_rejected() {
    let result = translator().translate_to_result("RETURN *");
    assert_eq!(result.strategy, Strategy::Rejected);
    assert!(result.text.is_empty());
    assert_eq!(result.diagnostics[0].severity, Severity::Error);
    assert!(result.diagnostics[0].message.starts_with("unsupported-pattern"));
}

#[test]
fn test_unbounded_path_escalates() {
    let result = translator()
        .translate("MATCH (a:User)-[:KNOWS*]->(b:User) RETURN b.name")
        .unwrap();
    assert_eq!(result.strategy, Strategy::Escalate);
    let request = result.escalation.expect("escalation request");
    assert_eq!(request.reason, EscalationReason::UnboundedPath);
    assert_eq!(request.reason.code(), "unbounded-path");
    assert_eq!(request.schema_context.labels, vec!["Device", "Principal", "User"]);
}

#[test]
fn test_unmapped_label_names_the_label() {
    let err = translator().translate("MATCH (u:Ghost) RETURN u").unwrap_err();
    assert_eq!(err.kind(), "unresolved-schema-reference");
    assert!(err.to_string().contains("`Ghost`"));
    assert!(err.to_string().contains("mapped labels: Device, Principal, User"));
}

#[test]
fn test_return_without_binding_is_unbound_identifier() {
    let err = translator().translate("RETURN u.name").unwrap_err();
    match err {
        TranslationError::UnboundIdentifier { name, position } => {
            assert_eq!(name, "u");
            assert_eq!((position.line, position.column), (1, 8));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_anchored_shortest_path_uses_native_operator() {
    let result = translator()
        .translate(
            "MATCH p = shortestPath((a:User)-[:KNOWS*]-(b:User)) \
             WHERE a.name = 'Alice' AND b.name = 'Bob' RETURN p",
        )
        .unwrap();
    assert_eq!(result.strategy, Strategy::Direct);
    assert!(result
        .text
        .contains("| graph-shortest-paths output=any (a)-[_e0*1..10]-(b)"));
    assert!(result
        .text
        .contains("a.AccountName == \"Alice\" and b.AccountName == \"Bob\""));
    assert!(result.text.ends_with("project p = pack_array(a, _e0, b)"));
    assert!(result
        .diagnostics
        .iter()
        .all(|d| d.severity != Severity::Warning));
    assert!(result.hints.is_empty());
}

#[test]
fn test_translation_is_deterministic() {
    let translator = translator();
    let text = "MATCH (p:Principal)-[l:LOGGED_ON]->(d:Device) \
                WHERE d.os = 'Windows' RETURN p.name, count(d) AS devices ORDER BY devices DESC";
    let first = translator.translate(text).unwrap();
    let second = translator.translate(text).unwrap();
    assert_eq!(first.text, second.text);
    assert_eq!(first.confidence, second.confidence);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn test_skip_limit_order_does_not_matter() {
    let translator = translator();
    let a = translator
        .translate("MATCH (u:User) RETURN u.name ORDER BY u.name SKIP 5 LIMIT 10")
        .unwrap();
    let b = translator
        .translate("MATCH (u:User) RETURN u.name ORDER BY u.name LIMIT 10 SKIP 5")
        .unwrap();
    assert_eq!(a.text, b.text);
    assert!(a.text.ends_with(
        "| sort by u_name asc\n| serialize _rn = row_number()\n| where _rn > 5\n| project-away _rn\n| take 10"
    ));
}

#[test]
fn test_path_above_ceiling_is_rejected_with_alternative() {
    let config = TranslatorConfig {
        max_path_depth: 4,
        ..Default::default()
    };
    let err = translator_with(config)
        .translate("MATCH (a:User)-[:KNOWS*2..9]->(b:User) RETURN b")
        .unwrap_err();
    match err {
        TranslationError::UnsupportedPattern {
            kind, alternative, ..
        } => {
            assert_eq!(kind, UnsupportedKind::PathTooDeep);
            assert_eq!(alternative.as_deref(), Some("*2..4"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_multi_entity_label_lowers_confidence() {
    let result = translator()
        .translate("MATCH (p:Principal) RETURN p.name")
        .unwrap();
    assert_eq!(
        result.text,
        "union IdentityInfo, AADServicePrincipals\n| project p_name = coalesce(AccountName, DisplayName)"
    );
    assert!((result.confidence - 0.9).abs() < 1e-9);
}

#[test]
fn test_unknown_function_lists_supported_ones() {
    let err = translator()
        .translate("MATCH (u:User) RETURN soundex(u.name)")
        .unwrap_err();
    match err {
        TranslationError::UnsupportedPattern {
            kind, alternative, ..
        } => {
            assert_eq!(kind, UnsupportedKind::Function);
            assert!(alternative.unwrap().contains("toupper"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_rejected_result_serializes() {
    let result = translator().translate_to_result("MATCH (u:User RETURN u");
    assert_eq!(result.strategy, Strategy::Rejected);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["strategy"], "rejected");
    assert_eq!(json["diagnostics"][0]["severity"], "error");
    assert!(json["diagnostics"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("syntax"));
}

#[test]
fn test_path_options_default_leaves_plain_queries_alone() {
    let translator = translator();
    let text = "MATCH (u:User)-[:LOGGED_ON]->(d:Device) RETURN d.name";
    assert_eq!(
        translator.translate(text).unwrap(),
        translator
            .translate_with_options(text, &PathOptions::default())
            .unwrap()
    );
}
