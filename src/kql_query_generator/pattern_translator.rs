//! MATCH lowering: graph-match patterns, the constraints they imply, and the
//! table source of single-node queries.

use super::common::{quote_identifier, render_literal, render_string};
use super::context::{Binding, TranslationContext};
use super::expression_translator::ExpressionTranslator;
use crate::config::MultiEntityPolicy;
use crate::graph_catalog::EntityKeys;
use crate::open_cypher_parser::ast::{
    Direction, NodePattern, PathExpression, PathLength, PropertyConstraint,
};
use crate::query_translator::errors::TranslationError;

/// `*min..max` as written by the graph operators; `*n` is spelled `*n..n`.
pub fn render_length(min: u32, max: u32) -> String {
    format!("*{}..{}", min, max)
}

/// Hop bounds of a relationship, with an upper bound supplied for open ranges.
pub fn bounds(length: &PathLength, open_cap: u32) -> (u32, u32) {
    (length.min(), length.max().unwrap_or(open_cap))
}

pub fn render_relationship(direction: Direction, inner: &str) -> String {
    match direction {
        Direction::Outgoing => format!("-[{}]->", inner),
        Direction::Incoming => format!("<-[{}]-", inner),
        Direction::Either => format!("-[{}]-", inner),
    }
}

/// `(a)-[e*1..3]->(b)`; every element is named so constraints and
/// projections can refer to it. Open ranges get `open_cap` as upper bound.
pub fn render_pattern(path: &PathExpression, ctx: &TranslationContext<'_>, open_cap: u32) -> String {
    let mut out = format!("({})", ctx.node_name(&path.start));
    for step in &path.steps {
        let rel = &step.relationship;
        let mut inner = ctx.relationship_name(rel);
        if let Some(length) = &rel.length {
            let (min, max) = bounds(length, open_cap);
            inner.push_str(&render_length(min, max));
        }
        out.push_str(&render_relationship(rel.direction, &inner));
        out.push_str(&format!("({})", ctx.node_name(&step.node)));
    }
    out
}

/// `set_has_element(v.NodeLabels, "L")` style filters plus inline property
/// equalities for every element of `path`, in Graph mode.
pub fn pattern_constraints(
    path: &PathExpression,
    expressions: &ExpressionTranslator<'_, '_>,
) -> Result<Vec<String>, TranslationError> {
    let ctx = expressions.context();
    let mut out = Vec::new();
    for node in path.nodes() {
        node_constraints(node, expressions, &mut out)?;
    }
    for rel in path.relationships() {
        let name = ctx.relationship_name(rel);
        let binding = require(ctx, &name)?;
        let quantified = rel.length.is_some();

        if !binding.names.is_empty() {
            let owner = if quantified { None } else { Some(name.as_str()) };
            let alternatives: Vec<String> = binding
                .names
                .iter()
                .map(|t| has_element(owner, "EdgeTypes", t))
                .collect();
            let test = if alternatives.len() == 1 {
                alternatives[0].clone()
            } else if quantified {
                alternatives.join(" or ")
            } else {
                format!("({})", alternatives.join(" or "))
            };
            push_unique(&mut out, quantify(&name, quantified, test));
        }
        for constraint in &rel.properties {
            let test = if quantified {
                format!(
                    "{} == {}",
                    expressions.element_property(&name, &constraint.key)?,
                    render_literal(&constraint.value)
                )
            } else {
                equality(&name, constraint, expressions)?
            };
            push_unique(&mut out, quantify(&name, quantified, test));
        }
    }
    Ok(out)
}

fn node_constraints(
    node: &NodePattern,
    expressions: &ExpressionTranslator<'_, '_>,
    out: &mut Vec<String>,
) -> Result<(), TranslationError> {
    let ctx = expressions.context();
    let name = ctx.node_name(node);
    let binding = require(ctx, &name)?;
    for label in &binding.names {
        push_unique(out, has_element(Some(&name), "NodeLabels", label));
    }
    for constraint in &node.properties {
        push_unique(out, equality(&name, constraint, expressions)?);
    }
    Ok(())
}

fn has_element(owner: Option<&str>, column: &str, value: &str) -> String {
    match owner {
        Some(owner) => format!("set_has_element({}.{}, {})", owner, column, render_string(value)),
        None => format!("set_has_element({}, {})", column, render_string(value)),
    }
}

fn quantify(name: &str, quantified: bool, test: String) -> String {
    if quantified {
        format!("all({}, {})", name, test)
    } else {
        test
    }
}

fn equality(
    variable: &str,
    constraint: &PropertyConstraint,
    expressions: &ExpressionTranslator<'_, '_>,
) -> Result<String, TranslationError> {
    Ok(format!(
        "{} == {}",
        expressions.property(variable, &constraint.key)?,
        render_literal(&constraint.value)
    ))
}

fn push_unique(out: &mut Vec<String>, item: String) {
    if !out.contains(&item) {
        out.push(item);
    }
}

fn require<'c>(ctx: &'c TranslationContext<'_>, name: &str) -> Result<&'c Binding, TranslationError> {
    ctx.binding(name).ok_or_else(|| {
        TranslationError::TranslationAssembly(format!("pattern element `{}` has no binding", name))
    })
}

/// One graph operator (`graph-match` or `graph-shortest-paths`) with its
/// patterns, filters and projected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOperator {
    /// Operator name with its options, e.g. `graph-match cycles=none`.
    pub operator: String,
    pub patterns: Vec<String>,
    pub filters: Vec<String>,
    pub columns: Vec<String>,
}

impl GraphOperator {
    pub fn new(operator: impl Into<String>) -> Self {
        GraphOperator {
            operator: operator.into(),
            patterns: Vec::new(),
            filters: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn filter(&mut self, filter: impl Into<String>) {
        push_unique(&mut self.filters, filter.into());
    }

    /// Pipe operator text; continuation lines are indented under `indent`.
    pub fn render(&self, indent: &str) -> String {
        let mut out = format!("| {} {}", self.operator, self.patterns.join(", "));
        if !self.filters.is_empty() {
            out.push_str(&format!("\n{}    where {}", indent, self.filters.join(" and ")));
        }
        // count(*) alone projects nothing from the match
        let columns = if self.columns.is_empty() {
            "_row = 1".to_string()
        } else {
            self.columns.join(", ")
        };
        out.push_str(&format!("\n{}    project {}", indent, columns));
        out
    }
}

/// Table expression behind a lone node variable.
///
/// One entity is its table. Several entities are a `union` under the union
/// policy, or an inner join on the key columns under the join policy.
pub fn tabular_source(
    binding: &Binding,
    ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    let entities = ctx.entities_of(binding);
    let first = entities.first().ok_or_else(|| {
        TranslationError::TranslationAssembly(format!("`{}` has no backing entity", binding.name))
    })?;
    if entities.len() == 1 {
        return Ok(quote_identifier(&first.table));
    }

    match ctx.config().multi_entity_policy {
        MultiEntityPolicy::Union => Ok(format!(
            "union {}",
            entities
                .iter()
                .map(|e| quote_identifier(&e.table))
                .collect::<Vec<_>>()
                .join(", ")
        )),
        MultiEntityPolicy::Join => {
            let left_key = node_key(first)?;
            let mut out = quote_identifier(&first.table);
            for entity in &entities[1..] {
                out.push_str(&format!(
                    "\n| join kind=inner ({}) on $left.{} == $right.{}",
                    quote_identifier(&entity.table),
                    quote_identifier(left_key),
                    quote_identifier(node_key(entity)?)
                ));
            }
            Ok(out)
        }
    }
}

pub(crate) fn node_key(entity: &crate::graph_catalog::Entity) -> Result<&str, TranslationError> {
    match &entity.keys {
        EntityKeys::Node { key_column } => Ok(key_column),
        EntityKeys::Edge { .. } => Err(TranslationError::TranslationAssembly(format!(
            "entity `{}` is an edge where a node was expected",
            entity.id
        ))),
    }
}

/// Inline `{key: value}` equalities of a lone node, over its table columns.
pub fn tabular_constraints(
    node: &NodePattern,
    expressions: &ExpressionTranslator<'_, '_>,
) -> Result<Vec<String>, TranslationError> {
    let name = expressions.context().node_name(node);
    node.properties
        .iter()
        .map(|constraint| equality(&name, constraint, expressions))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::kql_query_generator::context::tests::schema;
    use crate::kql_query_generator::RenderMode;
    use crate::open_cypher_parser::parse_query;
    use crate::query_translator::options::PathOptions;

    fn with_pattern<F: FnOnce(&PathExpression, &ExpressionTranslator<'_, '_>)>(
        text: &str,
        config: TranslatorConfig,
        check: F,
    ) {
        let schema = schema();
        let query = parse_query(text).unwrap();
        let ctx =
            TranslationContext::build(&query, &schema, &config, &PathOptions::default()).unwrap();
        let expressions = ExpressionTranslator::new(&ctx, RenderMode::Graph);
        let path = query.match_clause.as_ref().unwrap().parts()[0].patterns[0].clone();
        check(&path, &expressions);
    }

    #[test]
    fn test_pattern_shapes() {
        with_pattern(
            "MATCH (a:User)-[k:KNOWS*1..3]->(b)<-[:LOGGED_ON]-(c)-[r*2]-(d) RETURN a",
            TranslatorConfig::default(),
            |path, expressions| {
                assert_eq!(
                    render_pattern(path, expressions.context(), 10),
                    "(a)-[k*1..3]->(b)<-[_e0]-(c)-[r*2..2]-(d)"
                );
            },
        );
    }

    #[test]
    fn test_open_range_uses_cap() {
        with_pattern(
            "MATCH (a)-[:KNOWS*2..]->(b) RETURN b",
            TranslatorConfig::default(),
            |path, expressions| {
                assert_eq!(render_pattern(path, expressions.context(), 7), "(a)-[_e0*2..7]->(b)");
            },
        );
    }

    #[test]
    fn test_label_type_and_inline_constraints() {
        with_pattern(
            "MATCH (u:User {name: 'alice'})-[l:LOGGED_ON {type: 3}]->(d:Device) RETURN u",
            TranslatorConfig::default(),
            |path, expressions| {
                assert_eq!(
                    pattern_constraints(path, expressions).unwrap(),
                    vec![
                        "set_has_element(u.NodeLabels, \"User\")",
                        "coalesce(u.AccountName, u.DisplayName) == \"alice\"",
                        "set_has_element(d.NodeLabels, \"Device\")",
                        "set_has_element(l.EdgeTypes, \"LOGGED_ON\")",
                        "l.LogonType == 3",
                    ]
                );
            },
        );
    }

    #[test]
    fn test_variable_length_constraints_are_quantified() {
        with_pattern(
            "MATCH (a)-[k:KNOWS*1..3 {since: 2020}]->(b) RETURN b",
            TranslatorConfig::default(),
            |path, expressions| {
                assert_eq!(
                    pattern_constraints(path, expressions).unwrap(),
                    vec![
                        "all(k, set_has_element(EdgeTypes, \"KNOWS\"))",
                        "all(k, Since == 2020)",
                    ]
                );
            },
        );
    }

    #[test]
    fn test_multiple_types_are_alternatives() {
        with_pattern(
            "MATCH (a)-[r:KNOWS|MANAGES]->(b) RETURN b",
            TranslatorConfig::default(),
            |path, expressions| {
                assert_eq!(
                    pattern_constraints(path, expressions).unwrap(),
                    vec!["(set_has_element(r.EdgeTypes, \"KNOWS\") or set_has_element(r.EdgeTypes, \"MANAGES\"))"]
                );
            },
        );
    }

    #[test]
    fn test_graph_operator_layout() {
        let mut op = GraphOperator::new("graph-match");
        op.patterns.push("(a)-[_e0]->(b)".to_string());
        op.filter("a.Age > 30");
        op.filter("a.Age > 30");
        op.columns.push("b".to_string());
        assert_eq!(
            op.render(""),
            "| graph-match (a)-[_e0]->(b)\n    where a.Age > 30\n    project b"
        );
    }

    #[test]
    fn test_tabular_sources() {
        let schema = schema();
        let query = parse_query("MATCH (u:User) RETURN u").unwrap();
        let union = TranslatorConfig::default();
        let ctx =
            TranslationContext::build(&query, &schema, &union, &PathOptions::default()).unwrap();
        assert_eq!(
            tabular_source(ctx.binding("u").unwrap(), &ctx).unwrap(),
            "union IdentityInfo, AADUsers"
        );

        let join = TranslatorConfig {
            multi_entity_policy: MultiEntityPolicy::Join,
            ..Default::default()
        };
        let ctx =
            TranslationContext::build(&query, &schema, &join, &PathOptions::default()).unwrap();
        assert_eq!(
            tabular_source(ctx.binding("u").unwrap(), &ctx).unwrap(),
            "IdentityInfo\n| join kind=inner (AADUsers) on $left.AccountObjectId == $right.ObjectId"
        );
    }
}
