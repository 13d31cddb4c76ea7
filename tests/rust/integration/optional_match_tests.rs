use kustograph::query_translator::{Strategy, UnsupportedKind};
use kustograph::TranslationError;

use super::common::translator;

#[test]
fn test_optional_match_left_joins_on_node_identity() {
    let result = translator()
        .translate(
            "MATCH (u:User) \
             OPTIONAL MATCH (u)-[l:LOGGED_ON]->(d:Device) WHERE d.os = 'Windows' \
             RETURN u.name, d.name, l.time",
        )
        .unwrap_or_else(|err| panic!("{}", err));
    assert_eq!(result.strategy, Strategy::Direct);
    let text = &result.text;
    assert!(text.contains("let G = Edges\n| make-graph SourceId --> TargetId with Nodes on NodeId;"));
    assert!(text.contains("| join kind=leftouter (\n    G\n    | graph-match (u)-[l]->(d)"));
    assert!(text.contains("and d.OSPlatform == \"Windows\"\n"));
    assert!(text.contains("project u__id = u.NodeId, d_name = d.DeviceName, l_time = l.Timestamp"));
    assert!(text.contains("    ) on u__id"));
    assert!(text.ends_with("| project u_name, d_name, l_time"));
}

#[test]
fn test_optional_match_with_aggregate() {
    let result = translator()
        .translate(
            "MATCH (u:User) OPTIONAL MATCH (u)-[:LOGGED_ON]->(d:Device) \
             RETURN u.name AS account, count(d) AS devices",
        )
        .unwrap();
    let text = &result.text;
    assert!(text.contains("project u__id = u.NodeId, d__id = d.NodeId"));
    assert!(text.ends_with(
        "| project account = u_name, _agg1 = d__id\n| summarize devices = countif(isnotempty(_agg1)) by account"
    ));
}

#[test]
fn test_reused_relationship_variable_conflicts() {
    let err = translator()
        .translate(
            "MATCH (u:User)-[k:KNOWS]->(v:User) OPTIONAL MATCH (v)-[k]->(w:User) RETURN w",
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TranslationError::UnsupportedPattern {
            kind: UnsupportedKind::ConflictingBinding,
            ..
        }
    ));
}

#[test]
fn test_variable_shared_only_between_optional_parts_is_unsupported() {
    let err = translator()
        .translate(
            "MATCH (u:User) \
             OPTIONAL MATCH (u)-[:LOGGED_ON]->(d:Device) \
             OPTIONAL MATCH (d)<-[:LOGGED_ON]-(w:User) \
             RETURN w.name",
        )
        .unwrap_err();
    match err {
        TranslationError::UnsupportedPattern { kind, detail, .. } => {
            assert_eq!(kind, UnsupportedKind::OptionalMatch);
            assert!(detail.contains("`d`"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_only_optional_match_is_unsupported() {
    let err = translator()
        .translate("OPTIONAL MATCH (u:User) RETURN u.name")
        .unwrap_err();
    assert!(matches!(
        err,
        TranslationError::UnsupportedPattern {
            kind: UnsupportedKind::OptionalMatch,
            ..
        }
    ));
}
