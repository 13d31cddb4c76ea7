//! Common utilities for KQL text generation

use lazy_static::lazy_static;
use regex::Regex;

use crate::open_cypher_parser::ast::Literal;

lazy_static! {
    static ref PLAIN_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref NON_IDENTIFIER_RUN: Regex = Regex::new(r"[^A-Za-z0-9_]+").unwrap();
}

/// Quote a KQL column or table name when it is not a plain identifier.
///
/// KQL uses bracket-quoting for names with spaces, dots, dashes and the like.
///
/// # Examples
/// ```
/// use kustograph::kql_query_generator::common::quote_identifier;
/// assert_eq!(quote_identifier("AccountName"), "AccountName");
/// assert_eq!(quote_identifier("Account Name"), "['Account Name']");
/// assert_eq!(quote_identifier("it's"), "['it\\'s']");
/// ```
pub fn quote_identifier(name: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("['{}']", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Member access on a graph element or dynamic value: `u.Age`, `u['Logon Time']`.
pub fn member(owner: &str, column: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(column) {
        format!("{}.{}", owner, column)
    } else {
        format!("{}{}", owner, quote_identifier(column))
    }
}

/// Turn arbitrary text into a column name: runs of other characters collapse
/// to `_`, and a leading digit gets a `_` prefix.
pub fn sanitize_column_name(text: &str) -> String {
    let replaced = NON_IDENTIFIER_RUN.replace_all(text, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        return "_col".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Column holding a property once it leaves the graph operator.
pub fn flat_column(variable: &str, key: &str) -> String {
    sanitize_column_name(&format!("{}_{}", variable, key))
}

/// Column holding a node's `NodeId` once it leaves the graph operator.
pub fn id_column(variable: &str) -> String {
    format!("{}__id", variable)
}

pub fn render_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

pub fn render_float(value: f64) -> String {
    if value.is_nan() {
        return "real(nan)".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            "real(+inf)".to_string()
        } else {
            "real(-inf)".to_string()
        };
    }
    let text = format!("{:?}", value);
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{}.0", text)
    }
}

pub fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => render_string(s),
        Literal::Integer(i) => i.to_string(),
        Literal::Float(f) => render_float(*f),
        Literal::Boolean(b) => b.to_string(),
        Literal::Null => "dynamic(null)".to_string(),
    }
}

/// Literal inside a `dynamic([...])` array, where null is spelled `null`.
pub fn render_dynamic_element(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        other => render_literal(other),
    }
}

pub fn string_array(values: &[&str]) -> String {
    let items: Vec<String> = values.iter().map(|v| render_string(v)).collect();
    format!("dynamic([{}])", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("user_id"), "user_id");
        assert_eq!(quote_identifier("_x1"), "_x1");
        assert_eq!(quote_identifier("id.orig_h"), "['id.orig_h']");
        assert_eq!(quote_identifier("user-name"), "['user-name']");
        assert_eq!(quote_identifier("1st"), "['1st']");
    }

    #[test]
    fn test_member_access() {
        assert_eq!(member("u", "Age"), "u.Age");
        assert_eq!(member("u", "Logon Time"), "u['Logon Time']");
    }

    #[test]
    fn test_sanitize_column_name() {
        assert_eq!(sanitize_column_name("u.name"), "u_name");
        assert_eq!(sanitize_column_name("count(*)"), "count");
        assert_eq!(sanitize_column_name("count(DISTINCT u.name)"), "count_DISTINCT_u_name");
        assert_eq!(sanitize_column_name("1x"), "_1x");
        assert_eq!(sanitize_column_name("***"), "_col");
        assert_eq!(flat_column("u", "Logon Time"), "u_Logon_Time");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(render_string("plain"), "\"plain\"");
        assert_eq!(render_string("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(render_string("C:\\temp"), "\"C:\\\\temp\"");
        assert_eq!(render_string("a\nb"), "\"a\\nb\"");
    }

    #[test]
    fn test_literals() {
        assert_eq!(render_literal(&Literal::Integer(-3)), "-3");
        assert_eq!(render_literal(&Literal::Float(30.0)), "30.0");
        assert_eq!(render_literal(&Literal::Float(2.5)), "2.5");
        assert_eq!(render_literal(&Literal::Float(1e100)), "1e100");
        assert_eq!(render_literal(&Literal::Float(f64::NAN)), "real(nan)");
        assert_eq!(render_literal(&Literal::Boolean(true)), "true");
        assert_eq!(render_literal(&Literal::Null), "dynamic(null)");
        assert_eq!(render_dynamic_element(&Literal::Null), "null");
        assert_eq!(string_array(&["User", "Admin"]), "dynamic([\"User\", \"Admin\"])");
    }
}
