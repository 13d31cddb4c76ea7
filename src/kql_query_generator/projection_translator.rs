//! RETURN lowering.
//!
//! A projection is emitted in two halves. The column definitions go wherever
//! the caller's first projection lives (a `| project` over a table, or the
//! `project` of a graph operator); everything after that (summarize, distinct,
//! sort, skip, take) is a list of pipe operators in a fixed order, so
//! `SKIP 5 LIMIT 10` and `LIMIT 10 SKIP 5` produce the same text.

use std::collections::HashSet;

use super::common::{flat_column, quote_identifier, sanitize_column_name};
use super::expression_translator::ExpressionTranslator;
use crate::ast_visitor::BindingKind;
use crate::open_cypher_parser::ast::{
    AggregateCall, AggregateFunction, Expression, Identifier, ReturnClause, ReturnItem, SortOrder,
};
use crate::query_translator::errors::{TranslationError, UnsupportedKind};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    /// `name = expr` definitions for the first projection.
    pub columns: Vec<String>,
    /// Pipe operators applied after the first projection.
    pub tail: Vec<String>,
    /// Names of the columns the query finally returns, in RETURN order.
    pub output: Vec<String>,
}

impl Projection {
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }
}

struct Item {
    name: String,
    expression: Expression,
}

pub fn translate_projection(
    clause: &ReturnClause,
    expressions: &ExpressionTranslator<'_, '_>,
) -> Result<Projection, TranslationError> {
    let items = expand_items(clause, expressions);
    if items.is_empty() {
        return Err(TranslationError::unsupported(
            UnsupportedKind::Projection,
            "RETURN * needs at least one named variable in scope",
        ));
    }
    let aggregating = items
        .iter()
        .any(|item| matches!(item.expression, Expression::Aggregate(_)));

    let mut projection = Projection::default();
    let mut keys = Vec::new();
    let mut aggregates = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let column = quote_identifier(&item.name);
        projection.output.push(item.name.clone());
        match &item.expression {
            Expression::Aggregate(call) => {
                let argument = format!("_agg{}", i);
                if let Some(rendered) = aggregate_argument(call, expressions)? {
                    projection.columns.push(format!("{} = {}", argument, rendered));
                }
                aggregates.push(format!("{} = {}", column, aggregate_function(call, &argument)?));
            }
            other => {
                projection.columns.push(definition(&column, &expressions.translate(other)?));
                keys.push(column);
            }
        }
    }

    let order = resolve_order_by(clause, &items, aggregating, expressions, &mut projection)?;

    if aggregating {
        let mut summarize = format!("| summarize {}", aggregates.join(", "));
        if !keys.is_empty() {
            summarize.push_str(&format!(" by {}", keys.join(", ")));
        }
        projection.tail.push(summarize);

        // summarize emits the grouping keys first
        let in_summarize_order = items
            .iter()
            .filter(|item| !matches!(item.expression, Expression::Aggregate(_)))
            .chain(
                items
                    .iter()
                    .filter(|item| matches!(item.expression, Expression::Aggregate(_))),
            )
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>();
        if in_summarize_order != projection.output.iter().map(String::as_str).collect::<Vec<_>>() {
            projection.tail.push(format!(
                "| project {}",
                projection
                    .output
                    .iter()
                    .map(|name| quote_identifier(name))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    } else if clause.distinct {
        projection.tail.push(format!(
            "| distinct {}",
            projection
                .output
                .iter()
                .map(|name| quote_identifier(name))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    if !order.sort.is_empty() {
        projection.tail.push(format!("| sort by {}", order.sort.join(", ")));
    }
    if let Some(skip) = clause.skip {
        projection.tail.push("| serialize _rn = row_number()".to_string());
        projection.tail.push(format!("| where _rn > {}", skip));
        projection.tail.push("| project-away _rn".to_string());
    }
    if let Some(limit) = clause.limit {
        projection.tail.push(format!("| take {}", limit));
    }
    if !order.hidden.is_empty() {
        projection
            .tail
            .push(format!("| project-away {}", order.hidden.join(", ")));
    }
    Ok(projection)
}

/// Items with their output names; `*` expands to every named variable.
fn expand_items(clause: &ReturnClause, expressions: &ExpressionTranslator<'_, '_>) -> Vec<Item> {
    let mut taken = HashSet::new();
    let mut items = Vec::new();
    for item in clause.items() {
        match item {
            ReturnItem::Wildcard(position) => {
                for binding in expressions.context().bindings() {
                    if binding.anonymous {
                        continue;
                    }
                    items.push(Item {
                        name: unique_name(&binding.name, &mut taken),
                        expression: Expression::Variable(Identifier::new(
                            binding.name.clone(),
                            *position,
                        )),
                    });
                }
            }
            ReturnItem::Expression { expression, alias } => {
                let base = match alias {
                    Some(alias) => alias.name.clone(),
                    None => default_name(expression),
                };
                items.push(Item {
                    name: unique_name(&base, &mut taken),
                    expression: expression.clone(),
                });
            }
        }
    }
    items
}

/// Column name for an unaliased item: `u.name` becomes `u_name`.
pub fn default_name(expression: &Expression) -> String {
    match expression {
        Expression::Variable(identifier) => identifier.name.clone(),
        Expression::Property(access) => flat_column(&access.variable.name, &access.key),
        other => sanitize_column_name(&other.to_string()),
    }
}

fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut suffix = 1;
    while taken.contains(&name) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    taken.insert(name.clone());
    name
}

fn definition(column: &str, rendered: &str) -> String {
    if column == rendered {
        column.to_string()
    } else {
        format!("{} = {}", column, rendered)
    }
}

/// Rendered argument of an aggregate, `None` for `count(*)`. Counting a node
/// counts its identity.
fn aggregate_argument(
    call: &AggregateCall,
    expressions: &ExpressionTranslator<'_, '_>,
) -> Result<Option<String>, TranslationError> {
    let Some(argument) = &call.argument else {
        return Ok(None);
    };
    if let (AggregateFunction::Count, Expression::Variable(identifier)) =
        (call.function, argument.as_ref())
    {
        let binding = expressions.context().require_binding(identifier)?;
        if binding.kind == BindingKind::Node {
            return expressions.node_id(identifier).map(Some);
        }
    }
    if argument.contains_aggregate() {
        return Err(TranslationError::unsupported(
            UnsupportedKind::Aggregate,
            format!("nested aggregate in {}", Expression::Aggregate(call.clone())),
        ));
    }
    expressions.translate(argument).map(Some)
}

/// KQL aggregation function over the staged argument column.
pub fn aggregate_function(call: &AggregateCall, argument: &str) -> Result<String, TranslationError> {
    let rendered = match (call.function, call.distinct) {
        (AggregateFunction::Count, _) if call.argument.is_none() => "count()".to_string(),
        (AggregateFunction::Count, false) => format!("countif(isnotempty({}))", argument),
        (AggregateFunction::Count, true) => format!("count_distinct({})", argument),
        (AggregateFunction::Sum | AggregateFunction::Avg, true) => {
            return Err(TranslationError::unsupported_with_alternative(
                UnsupportedKind::Aggregate,
                format!("{}(DISTINCT ...) has no KQL aggregation", call.function.name()),
                format!("{}(...) over RETURN DISTINCT rows", call.function.name()),
            ))
        }
        (AggregateFunction::Sum, false) => format!("sum({})", argument),
        (AggregateFunction::Avg, false) => format!("avg({})", argument),
        // distinct does not change an extremum
        (AggregateFunction::Min, _) => format!("min({})", argument),
        (AggregateFunction::Max, _) => format!("max({})", argument),
        (AggregateFunction::Collect, false) => format!("make_list({})", argument),
        (AggregateFunction::Collect, true) => format!("make_set({})", argument),
    };
    Ok(rendered)
}

#[derive(Default)]
struct Ordering {
    sort: Vec<String>,
    hidden: Vec<String>,
}

fn resolve_order_by(
    clause: &ReturnClause,
    items: &[Item],
    aggregating: bool,
    expressions: &ExpressionTranslator<'_, '_>,
    projection: &mut Projection,
) -> Result<Ordering, TranslationError> {
    let mut ordering = Ordering::default();
    for (i, order_item) in clause.order_by.iter().enumerate() {
        let direction = match order_item.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        let text = order_item.expression.to_string();
        let matched = items.iter().find(|item| match &order_item.expression {
            Expression::Variable(identifier) if identifier.name == item.name => true,
            _ => item.expression.to_string() == text,
        });

        let column = match matched {
            Some(item) => quote_identifier(&item.name),
            None if aggregating || clause.distinct => {
                return Err(TranslationError::unsupported(
                    UnsupportedKind::Projection,
                    format!(
                        "ORDER BY {} must name a returned column when RETURN uses DISTINCT or aggregates",
                        text
                    ),
                ))
            }
            None => {
                let hidden = format!("_sort{}", i);
                projection.columns.push(format!(
                    "{} = {}",
                    hidden,
                    expressions.translate(&order_item.expression)?
                ));
                ordering.hidden.push(hidden.clone());
                hidden
            }
        };
        ordering.sort.push(format!("{} {}", column, direction));
    }
    Ok(ordering)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::kql_query_generator::context::{tests::schema, TranslationContext};
    use crate::kql_query_generator::RenderMode;
    use crate::open_cypher_parser::parse_query;
    use crate::query_translator::options::PathOptions;
    use test_case::test_case;

    fn project(text: &str, mode: RenderMode) -> Result<Projection, TranslationError> {
        let schema = schema();
        let config = TranslatorConfig::default();
        let query = parse_query(text).unwrap();
        let ctx = TranslationContext::build(&query, &schema, &config, &PathOptions::default())?;
        let expressions = ExpressionTranslator::new(&ctx, mode);
        translate_projection(&query.return_clause, &expressions)
    }

    #[test]
    fn test_columns_and_default_names() {
        let p = project(
            "MATCH (u:Person) RETURN u.name, u.age AS years, u",
            RenderMode::Tabular,
        )
        .unwrap();
        assert_eq!(
            p.columns,
            vec!["u_name = AccountName", "years = Age", "u = pack_all()"]
        );
        assert_eq!(p.output, vec!["u_name", "years", "u"]);
        assert!(p.tail.is_empty());
    }

    #[test]
    fn test_flat_columns_are_bare() {
        let p = project("MATCH (u:Person) RETURN u.name, u", RenderMode::Flat).unwrap();
        assert_eq!(p.columns, vec!["u_name", "u"]);
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let p = project("MATCH (u:Person) RETURN u.name, u.name", RenderMode::Flat).unwrap();
        assert_eq!(p.output, vec!["u_name", "u_name_1"]);
    }

    #[test]
    fn test_skip_and_limit_order_is_canonical() {
        let a = project(
            "MATCH (u:Person) RETURN u.name ORDER BY u.name DESC SKIP 5 LIMIT 10",
            RenderMode::Tabular,
        )
        .unwrap();
        let b = project(
            "MATCH (u:Person) RETURN u.name ORDER BY u.name DESC LIMIT 10 SKIP 5",
            RenderMode::Tabular,
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.tail,
            vec![
                "| sort by u_name desc",
                "| serialize _rn = row_number()",
                "| where _rn > 5",
                "| project-away _rn",
                "| take 10",
            ]
        );
    }

    #[test]
    fn test_order_by_hidden_column() {
        let p = project(
            "MATCH (u:Person) RETURN u.name ORDER BY u.age, u.name DESC",
            RenderMode::Tabular,
        )
        .unwrap();
        assert_eq!(p.columns, vec!["u_name = AccountName", "_sort0 = Age"]);
        assert_eq!(
            p.tail,
            vec!["| sort by _sort0 asc, u_name desc", "| project-away _sort0"]
        );
    }

    #[test]
    fn test_order_by_alias() {
        let p = project(
            "MATCH (u:Person) RETURN u.age AS years ORDER BY years",
            RenderMode::Tabular,
        )
        .unwrap();
        assert_eq!(p.tail, vec!["| sort by years asc"]);
    }

    #[test]
    fn test_distinct_rejects_hidden_sort() {
        let p = project("MATCH (u:Person) RETURN DISTINCT u.name", RenderMode::Tabular).unwrap();
        assert_eq!(p.tail, vec!["| distinct u_name"]);
        let err = project(
            "MATCH (u:Person) RETURN DISTINCT u.name ORDER BY u.age",
            RenderMode::Tabular,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TranslationError::UnsupportedPattern { kind: UnsupportedKind::Projection, .. }
        ));
    }

    #[test]
    fn test_aggregation_pipeline() {
        let p = project(
            "MATCH (u:Person) RETURN count(*) AS n, u.name ORDER BY n DESC",
            RenderMode::Tabular,
        )
        .unwrap();
        assert_eq!(p.columns, vec!["u_name = AccountName"]);
        assert_eq!(
            p.tail,
            vec![
                "| summarize n = count() by u_name",
                "| project n, u_name",
                "| sort by n desc",
            ]
        );
    }

    #[test]
    fn test_count_of_node_uses_identity() {
        let p = project("MATCH (d:Device) RETURN count(d) AS devices", RenderMode::Graph).unwrap();
        assert_eq!(p.columns, vec!["_agg0 = d.NodeId"]);
        assert_eq!(p.tail, vec!["| summarize devices = countif(isnotempty(_agg0))"]);
    }

    #[test_case("count(u.name)", "countif(isnotempty(_agg0))" ; "count")]
    #[test_case("count(DISTINCT u.name)", "count_distinct(_agg0)" ; "count_distinct")]
    #[test_case("sum(u.age)", "sum(_agg0)" ; "sum")]
    #[test_case("avg(u.age)", "avg(_agg0)" ; "avg")]
    #[test_case("min(u.age)", "min(_agg0)" ; "min")]
    #[test_case("max(DISTINCT u.age)", "max(_agg0)" ; "max_distinct")]
    #[test_case("collect(u.name)", "make_list(_agg0)" ; "collect")]
    #[test_case("collect(DISTINCT u.name)", "make_set(_agg0)" ; "collect_distinct")]
    fn test_aggregate_table(item: &str, expected: &str) {
        let p = project(
            &format!("MATCH (u:Person) RETURN {} AS v", item),
            RenderMode::Tabular,
        )
        .unwrap();
        assert_eq!(p.tail[0], format!("| summarize v = {}", expected));
    }

    #[test]
    fn test_distinct_sum_is_unsupported() {
        let err = project("MATCH (u:Person) RETURN sum(DISTINCT u.age)", RenderMode::Tabular)
            .unwrap_err();
        assert!(matches!(
            err,
            TranslationError::UnsupportedPattern { kind: UnsupportedKind::Aggregate, .. }
        ));
    }

    #[test]
    fn test_wildcard_skips_anonymous_elements() {
        let p = project("MATCH (u:Person)-[:KNOWS]->(f) RETURN *", RenderMode::Graph).unwrap();
        assert_eq!(p.output, vec!["u", "f"]);
    }
}
