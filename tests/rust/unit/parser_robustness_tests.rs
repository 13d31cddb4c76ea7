//! Unit tests for query parsing edge cases and error handling
//!
//! Tests malformed queries, edge cases, and error conditions to ensure
//! robust parsing without panics.

use kustograph::open_cypher_parser::ast::{Direction, PathKind};
use kustograph::open_cypher_parser::errors::OpenCypherParsingError;
use kustograph::open_cypher_parser::{parse_condition, parse_query};
use test_case::test_case;

/// Test that malformed queries don't cause panics
#[test_case("" ; "empty")]
#[test_case("MATCH" ; "incomplete_match")]
#[test_case("MATCH (" ; "unclosed_parenthesis")]
#[test_case("MATCH )" ; "wrong_parenthesis")]
#[test_case("MATCH (n" ; "unclosed_node")]
#[test_case("MATCH (n)-[" ; "unclosed_relationship")]
#[test_case("MATCH (n)-[]-" ; "missing_end_node")]
#[test_case("RETURN" ; "incomplete_return")]
#[test_case("MATCH (n) RETURN n WHERE n.x = 1" ; "wrong_clause_order")]
#[test_case("MATCH (n) RETURN n INVALID_KEYWORD" ; "trailing_keyword")]
#[test_case("MATCH (n)-[*3..1]->(m) RETURN m" ; "inverted_range")]
#[test_case("MATCH (n) WHERE n.name = 'open RETURN n" ; "unterminated_string")]
fn test_malformed_queries_are_errors(query: &str) {
    assert!(parse_query(query).is_err());
}

#[test]
fn test_deeply_nested_condition_is_an_error_not_a_stack_overflow() {
    let condition = format!("{}n.x = 1{}", "(".repeat(500), ")".repeat(500));
    let query = format!("MATCH (n) WHERE {} RETURN n", condition);
    assert!(parse_query(&query).is_err());
}

#[test_case("toUpper(", ")" ; "function_calls")]
#[test_case("[", "]" ; "list_literals")]
#[test_case("coalesce(", ", 1)" ; "function_call_arguments")]
fn test_deeply_nested_expression_is_an_error_not_a_stack_overflow(open: &str, close: &str) {
    let expression = format!("{}u.name{}", open.repeat(50_000), close.repeat(50_000));
    let query = format!("MATCH (u:User) RETURN {}", expression);
    match parse_query(&query) {
        Err(OpenCypherParsingError::Syntax { expected, .. }) => {
            assert!(expected.contains("nesting"), "unexpected error: {}", expected);
        }
        other => panic!("expected a nesting error, got {:?}", other.map(|_| ())),
    }
}

#[test_case(" AND " ; "and_chain")]
#[test_case(" OR " ; "or_chain")]
fn test_very_long_boolean_chain_is_an_error(connective: &str) {
    let condition = vec!["n.x = 1"; 50_000].join(connective);
    let query = format!("MATCH (n) WHERE {} RETURN n", condition);
    match parse_query(&query) {
        Err(OpenCypherParsingError::Syntax { expected, .. }) => {
            assert!(expected.contains("AND/OR"), "unexpected error: {}", expected);
        }
        other => panic!("expected a chain-length error, got {:?}", other.map(|_| ())),
    }
    let short = vec!["n.x = 1"; 100].join(connective);
    assert!(parse_query(&format!("MATCH (n) WHERE {} RETURN n", short)).is_ok());
}

#[test]
fn test_moderate_expression_nesting_still_parses() {
    assert!(parse_query("MATCH (u:User) RETURN toUpper(toLower(trim(u.name)))").is_ok());
    assert!(parse_query("RETURN [[1, 2], [[3]]]").is_ok());
}

#[test]
fn test_errors_report_line_and_column() {
    let err = parse_query("MATCH (n)\nWHERE n.x = ~1\nRETURN n").unwrap_err();
    match err {
        OpenCypherParsingError::Lexical { position, .. } => {
            assert_eq!((position.line, position.column), (2, 13));
        }
        other => panic!("expected lexical error, got {:?}", other),
    }
}

#[test]
fn test_keywords_are_case_insensitive() {
    let upper = parse_query("MATCH (n:User) WHERE n.age > 3 RETURN n.name").unwrap();
    let lower = parse_query("match (n:User) where n.age > 3 return n.name").unwrap();
    assert_eq!(upper, lower);
}

#[test]
fn test_shortest_path_and_direction_parse() {
    let query =
        parse_query("MATCH p = allShortestPaths((a)<-[:KNOWS*..4]-(b)) RETURN p").unwrap();
    let clause = query.match_clause.unwrap();
    let (_, path) = clause.patterns().next().unwrap();
    assert_eq!(path.kind, PathKind::AllShortestPaths);
    let rel = &path.steps[0].relationship;
    assert_eq!(rel.direction, Direction::Incoming);
    assert_eq!(rel.length.unwrap().to_string(), "*1..4");
}

#[test]
fn test_standalone_condition() {
    assert!(parse_condition("n.enabled = true AND n.age >= 21").is_ok());
    assert!(parse_condition("n.enabled = true RETURN n").is_err());
}
