use kustograph::config::CyclePolicy;
use kustograph::open_cypher_parser::parse_condition;
use kustograph::query_translator::{
    EscalationReason, PathEnumerationOptions, Severity, Strategy, UnsupportedKind,
};
use kustograph::{PathOptions, TranslationError};

use super::common::translator;

const SHORTEST: &str = "MATCH p = shortestPath((a:User)-[:KNOWS*1..6]->(b:User))";

#[test]
fn test_bidirectional_hint_for_single_pair() {
    let options = PathOptions {
        bidirectional: true,
        ..Default::default()
    };
    let result = translator()
        .translate_with_options(
            &format!("{} WHERE a.name = 'Alice' AND id(b) = 'acc-7' RETURN p", SHORTEST),
            &options,
        )
        .unwrap();
    assert_eq!(result.hints.len(), 1);
    assert_eq!(result.hints[0].name, "bidirectional-search");
    assert!(result.text.contains("b.NodeId == \"acc-7\""));
}

#[test]
fn test_bidirectional_request_without_two_anchors_is_reported() {
    let options = PathOptions {
        bidirectional: true,
        ..Default::default()
    };
    let result = translator()
        .translate_with_options(
            &format!("{} WHERE a.name IN ['Alice', 'Carol'] AND b.name = 'Bob' RETURN p", SHORTEST),
            &options,
        )
        .unwrap();
    assert_eq!(result.hints[0].name, "multi-source");
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Info && d.message.contains("bidirectional")));
}

#[test]
fn test_multi_source_search_starts_at_pinned_target() {
    let result = translator()
        .translate(&format!(
            "{} WHERE b.name = 'Bob' RETURN p, length(p) AS hops",
            SHORTEST
        ))
        .unwrap();
    assert_eq!(result.hints[0].name, "multi-source");
    assert!(result
        .text
        .contains("| graph-shortest-paths output=any (b)<-[_e0*1..6]-(a)"));
    assert!(result
        .text
        .contains("project p = pack_array(a, array_reverse(_e0), b), hops = array_length(_e0)"));
}

#[test]
fn test_multi_target_search_starts_at_pinned_source() {
    let result = translator()
        .translate(&format!(
            "{} WHERE a.name = 'Alice' RETURN p, length(p) AS hops",
            SHORTEST
        ))
        .unwrap();
    assert_eq!(result.hints[0].name, "multi-target");
    assert!(result
        .text
        .contains("| graph-shortest-paths output=any (a)-[_e0*1..6]->(b)"));
    assert!(result
        .text
        .contains("project p = pack_array(a, _e0, b), hops = array_length(_e0)"));
}

#[test]
fn test_unanchored_shortest_path_warns() {
    let result = translator()
        .translate(&format!("{} RETURN a.name, b.name", SHORTEST))
        .unwrap();
    assert_eq!(result.strategy, Strategy::Direct);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("neither endpoint")));
}

#[test]
fn test_weighted_shortest_path_minimizes_total_weight() {
    let result = translator()
        .translate_with_options(
            "MATCH p = shortestPath((a:User {name: 'Alice'})-[k:KNOWS*1..4]->(b:User {name: 'Bob'})) RETURN p",
            &PathOptions::with_weight("weight"),
        )
        .unwrap();
    assert!(result.text.contains("| graph-match cycles=none (a)-[k*1..4]->(b)"));
    assert!(result
        .text
        .contains("total_weight = array_sum(map(k, Weight))"));
    assert!(result.text.ends_with(
        "| summarize arg_min(total_weight, *) by _src, _dst\n| project-away _src, _dst, total_weight"
    ));
}

#[test]
fn test_unmapped_weight_property_is_schema_error() {
    let err = translator()
        .translate_with_options(
            &format!("{} WHERE a.name = 'Alice' RETURN p", SHORTEST),
            &PathOptions::with_weight("cost"),
        )
        .unwrap_err();
    assert!(matches!(err, TranslationError::UnresolvedSchemaReference(_)));
}

#[test]
fn test_path_enumeration_with_all_options() {
    let options = PathOptions {
        enumeration: PathEnumerationOptions {
            max_results: Some(100),
            max_depth: Some(2),
            excluded_node_ids: vec!["acc-admin".to_string()],
            excluded_relationship_types: vec!["LOGGED_ON".to_string()],
            predicate: Some(parse_condition("b.department = 'Finance'").unwrap()),
            cycle_policy: Some(CyclePolicy::Forbidden),
        },
        ..Default::default()
    };
    let result = translator()
        .translate_with_options(
            "MATCH p = (a:User {name: 'Alice'})-[*1..5]->(b:User) RETURN p, length(p) AS hops",
            &options,
        )
        .unwrap();
    let text = &result.text;
    assert!(text.contains("| graph-match cycles=none (a)-[_e0*1..2]->(b)"));
    assert!(text.contains("a.NodeId !in (\"acc-admin\")"));
    assert!(text.contains("b.NodeId !in (\"acc-admin\")"));
    assert!(text.contains("all(inner_nodes(_e0), NodeId !in (\"acc-admin\"))"));
    assert!(text.contains("all(_e0, not(set_has_element(EdgeTypes, \"LOGGED_ON\")))"));
    assert!(text.contains("b.Department == \"Finance\""));
    assert!(text.ends_with(
        "project p = pack_array(a, _e0, b), hops = array_length(_e0)\n| take 100"
    ));
}

#[test]
fn test_result_cap_applies_after_aggregation() {
    let result = translator()
        .translate("MATCH p = (a:User)-[:KNOWS*1..3]->(b) RETURN count(p) AS n")
        .unwrap();
    assert!(result.text.contains("project _agg0 = pack_array(a, _e0, b)\n| summarize"));
    assert!(result
        .text
        .ends_with("| summarize n = countif(isnotempty(_agg0))\n| take 1000"));
}

#[test]
fn test_result_cap_applies_after_sort() {
    let options = PathOptions {
        enumeration: PathEnumerationOptions {
            max_results: Some(20),
            ..Default::default()
        },
        ..Default::default()
    };
    let result = translator()
        .translate_with_options(
            "MATCH p = (a:User)-[:KNOWS*1..3]->(b:User) RETURN b.name, length(p) AS hops ORDER BY hops",
            &options,
        )
        .unwrap();
    assert!(result.text.ends_with("| sort by hops asc\n| take 20"));
}

#[test]
fn test_all_shortest_paths_returns_every_tie() {
    let result = translator()
        .translate(
            "MATCH p = allShortestPaths((a:User)-[:KNOWS*1..3]-(b:User)) \
             WHERE a.name = 'Alice' RETURN p LIMIT 5",
        )
        .unwrap();
    assert!(result
        .text
        .contains("| graph-shortest-paths output=all (a)-[_e0*1..3]-(b)"));
    assert!(result.text.ends_with("| take 5\n| take 1000"));
}

#[test]
fn test_multi_type_variable_path_escalates() {
    let result = translator()
        .translate("MATCH (a:User)-[:KNOWS|LOGGED_ON*1..2]->(b) RETURN b")
        .unwrap();
    assert_eq!(result.strategy, Strategy::Escalate);
    assert_eq!(
        result.escalation.unwrap().reason,
        EscalationReason::MultiTypeVariablePath
    );
}

#[test]
fn test_depth_cap_below_minimum_is_invalid() {
    let options = PathOptions {
        enumeration: PathEnumerationOptions {
            max_depth: Some(1),
            ..Default::default()
        },
        ..Default::default()
    };
    let err = translator()
        .translate_with_options("MATCH p = (a:User)-[:KNOWS*2..3]->(b) RETURN p", &options)
        .unwrap_err();
    assert!(matches!(
        err,
        TranslationError::UnsupportedPattern {
            kind: UnsupportedKind::InvalidPathLength,
            ..
        }
    ));
}
