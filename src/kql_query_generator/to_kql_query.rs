//! Chooses a lowering for a validated query and assembles the KQL text.
//!
//! | query shape                                  | lowering                     |
//! |----------------------------------------------|------------------------------|
//! | no MATCH                                     | `print`                      |
//! | `shortestPath` / `allShortestPaths`          | `graph-shortest-paths`       |
//! | one named variable-length path               | bounded `graph-match` + take |
//! | OPTIONAL MATCH                               | `graph-match` + left joins   |
//! | one lone node                                | table pipeline               |
//! | anything else                                | `graph-match`                |

use std::collections::{BTreeMap, BTreeSet};

use super::common::{flat_column, id_column, member, quote_identifier};
use super::condition_translator::{referenced_variables, ConditionTranslator};
use super::context::TranslationContext;
use super::expression_translator::{labels_column, length_column, ExpressionTranslator};
use super::graph_source::{GraphSource, EDGES, MAKE_GRAPH};
use super::path_translator::{translate_path_enumeration, translate_shortest_path};
use super::pattern_translator::{
    pattern_constraints, render_pattern, tabular_constraints, tabular_source, GraphOperator,
};
use super::projection_translator::translate_projection;
use super::RenderMode;
use crate::ast_visitor::{walk_aggregate_call, walk_function_call, AstVisitor, BindingKind};
use crate::open_cypher_parser::ast::{
    AggregateCall, AggregateFunction, Condition, Expression, FunctionCall, Identifier,
    MatchClause, MatchPart, PathExpression, PathKind, PropertyAccess, Query, ReturnItem,
};
use crate::query_translator::errors::{TranslationError, UnsupportedKind};
use crate::query_translator::options::PathOptions;
use crate::query_translator::result::{Diagnostic, ExecutionHint};

/// Graph binding shared by the main and optional graph operators.
const GRAPH: &str = "G";

pub fn generate_kql(
    query: &Query,
    ctx: &TranslationContext<'_>,
    options: &PathOptions,
    diagnostics: &mut Vec<Diagnostic>,
    hints: &mut Vec<ExecutionHint>,
) -> Result<String, TranslationError> {
    let Some(clause) = &query.match_clause else {
        log::debug!("No MATCH clause, lowering to print");
        return translate_print(query, ctx);
    };
    let patterns: Vec<(bool, &PathExpression)> = clause.patterns().collect();

    if let Some((_, path)) = patterns.iter().find(|(_, p)| p.kind != PathKind::Pattern) {
        if patterns.len() != 1 || patterns[0].0 {
            return Err(TranslationError::unsupported_with_alternative(
                UnsupportedKind::ShortestPath,
                format!(
                    "shortest path at {} must be the only pattern of a required MATCH",
                    path.position
                ),
                "a separate query for the shortest path",
            ));
        }
        log::debug!("Lowering to graph-shortest-paths");
        return translate_shortest_path(query, path, ctx, options, diagnostics, hints);
    }

    if clause.has_optional() {
        log::debug!("Lowering OPTIONAL MATCH to left outer joins");
        return translate_optional(query, clause, ctx, diagnostics);
    }

    if let [(false, path)] = patterns.as_slice() {
        if path.variable.is_some() && path.has_variable_length() {
            log::debug!("Lowering named variable-length path to enumeration");
            return translate_path_enumeration(query, path, ctx, options, diagnostics);
        }
        if path.steps.is_empty() && path.variable.is_none() {
            log::debug!("Lowering lone node to a table pipeline");
            return translate_tabular(query, path, ctx, diagnostics);
        }
    }

    log::debug!("Lowering {} pattern(s) to graph-match", patterns.len());
    translate_graph(query, &patterns, ctx, diagnostics)
}

fn translate_print(query: &Query, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    if query.return_clause.has_aggregates() {
        return Err(TranslationError::unsupported(
            UnsupportedKind::Aggregate,
            "aggregation needs a MATCH clause to aggregate over",
        ));
    }
    let expressions = ExpressionTranslator::new(ctx, RenderMode::Tabular);
    let projection = translate_projection(&query.return_clause, &expressions)?;
    let mut lines = vec![format!("print {}", projection.column_list())];
    lines.extend(projection.tail);
    Ok(lines.join("\n"))
}

fn translate_tabular(
    query: &Query,
    path: &PathExpression,
    ctx: &TranslationContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, TranslationError> {
    let name = ctx.node_name(&path.start);
    let binding = ctx.binding(&name).ok_or_else(|| {
        TranslationError::TranslationAssembly(format!("node `{}` has no binding", name))
    })?;
    let expressions = ExpressionTranslator::new(ctx, RenderMode::Tabular);

    let mut filters = tabular_constraints(&path.start, &expressions)?;
    if let Some(clause) = &query.where_clause {
        if let Some(filter) = ConditionTranslator::new(&expressions)
            .translate_all(&clause.condition.conjuncts(), diagnostics)?
        {
            filters.push(filter);
        }
    }
    let projection = translate_projection(&query.return_clause, &expressions)?;

    let mut lines = vec![tabular_source(binding, ctx)?];
    if !filters.is_empty() {
        lines.push(format!("| where {}", filters.join(" and ")));
    }
    if !projection.columns.is_empty() {
        lines.push(format!("| project {}", projection.column_list()));
    }
    lines.extend(projection.tail);
    Ok(lines.join("\n"))
}

fn translate_graph(
    query: &Query,
    patterns: &[(bool, &PathExpression)],
    ctx: &TranslationContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, TranslationError> {
    let expressions = ExpressionTranslator::new(ctx, RenderMode::Graph);
    let ceiling = ctx.config().max_path_depth;

    let mut op = GraphOperator::new("graph-match");
    for (_, path) in patterns {
        op.patterns.push(render_pattern(path, ctx, ceiling));
        for constraint in pattern_constraints(path, &expressions)? {
            op.filter(constraint);
        }
    }
    if let Some(clause) = &query.where_clause {
        if let Some(filter) = ConditionTranslator::new(&expressions)
            .translate_all(&clause.condition.conjuncts(), diagnostics)?
        {
            op.filter(filter);
        }
    }
    let projection = translate_projection(&query.return_clause, &expressions)?;
    op.columns = projection.columns;

    let mut lines = vec![GraphSource::build(ctx)?.prelude(), op.render("")];
    lines.extend(projection.tail);
    Ok(lines.join("\n"))
}

/// A value the final, flat projection reads from a graph operator's output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Need {
    // join keys sort first
    Id(String),
    Property(String, String),
    Whole(String),
    Labels(String),
    Length(String),
}

impl Need {
    fn variable(&self) -> &str {
        match self {
            Need::Id(v)
            | Need::Property(v, _)
            | Need::Whole(v)
            | Need::Labels(v)
            | Need::Length(v) => v,
        }
    }

    /// `flat_name = graph_expression`
    fn column(&self, expressions: &ExpressionTranslator<'_, '_>) -> Result<String, TranslationError> {
        let position = Default::default();
        Ok(match self {
            Need::Property(v, k) => format!("{} = {}", flat_column(v, k), expressions.property(v, k)?),
            Need::Whole(v) => {
                let rendered = expressions.variable(&Identifier::new(v.clone(), position))?;
                if rendered == *v {
                    quote_identifier(v)
                } else {
                    format!("{} = {}", quote_identifier(v), rendered)
                }
            }
            Need::Labels(v) => format!("{} = {}", labels_column(v), member(v, "NodeLabels")),
            Need::Length(v) => {
                let call = Expression::FunctionCall(FunctionCall {
                    name: "length".to_string(),
                    args: vec![Expression::Variable(Identifier::new(v.clone(), position))],
                    position,
                });
                format!("{} = {}", length_column(v), expressions.translate(&call)?)
            }
            Need::Id(v) => format!("{} = {}", id_column(v), member(v, "NodeId")),
        })
    }
}

/// Records what the flat stage reads for each variable.
struct ColumnNeeds<'c, 'a> {
    ctx: &'c TranslationContext<'a>,
    needs: BTreeSet<Need>,
}

impl<'c, 'a> ColumnNeeds<'c, 'a> {
    fn kind(&self, name: &str) -> Option<BindingKind> {
        self.ctx.binding(name).map(|b| b.kind)
    }
}

impl AstVisitor for ColumnNeeds<'_, '_> {
    fn visit_variable(&mut self, variable: &Identifier) {
        self.needs.insert(Need::Whole(variable.name.clone()));
    }

    fn visit_property_access(&mut self, property: &PropertyAccess) {
        self.needs.insert(Need::Property(
            property.variable.name.clone(),
            property.key.clone(),
        ));
    }

    fn visit_function_call(&mut self, call: &FunctionCall) {
        if let [Expression::Variable(v)] = call.args.as_slice() {
            let kind = self.kind(&v.name);
            let need = match (call.name.to_ascii_lowercase().as_str(), kind) {
                ("id", _) => Some(Need::Id(v.name.clone())),
                ("labels", _) => Some(Need::Labels(v.name.clone())),
                ("length" | "size", Some(BindingKind::Path)) => Some(Need::Length(v.name.clone())),
                _ => None,
            };
            if let Some(need) = need {
                self.needs.insert(need);
                return;
            }
        }
        walk_function_call(self, call)
    }

    fn visit_aggregate_call(&mut self, call: &AggregateCall) {
        if let (AggregateFunction::Count, Some(Expression::Variable(v))) =
            (call.function, call.argument.as_deref())
        {
            if self.kind(&v.name) == Some(BindingKind::Node) {
                self.needs.insert(Need::Id(v.name.clone()));
                return;
            }
        }
        walk_aggregate_call(self, call)
    }

    fn visit_return_item(&mut self, item: &ReturnItem) {
        match item {
            ReturnItem::Wildcard(_) => {
                for binding in self.ctx.bindings().iter().filter(|b| !b.anonymous) {
                    self.needs.insert(Need::Whole(binding.name.clone()));
                }
            }
            ReturnItem::Expression { expression, .. } => self.visit_expression(expression),
        }
    }
}

/// Element and path names bound by one MATCH part.
fn part_variables(part: &MatchPart, ctx: &TranslationContext<'_>) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for path in &part.patterns {
        if let Some(variable) = &path.variable {
            names.insert(variable.name.clone());
        }
        for node in path.nodes() {
            names.insert(ctx.node_name(node));
        }
        for rel in path.relationships() {
            names.insert(ctx.relationship_name(rel));
        }
    }
    names
}

fn node_names<'n>(names: impl Iterator<Item = &'n String>, ctx: &TranslationContext<'_>) -> Vec<String> {
    names
        .filter(|name| matches!(ctx.binding(name), Some(b) if b.kind == BindingKind::Node))
        .cloned()
        .collect()
}

/// `graph-match` for the required parts, then one left outer join per
/// OPTIONAL MATCH part on the node variables it shares with them.
fn translate_optional(
    query: &Query,
    clause: &MatchClause,
    ctx: &TranslationContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, TranslationError> {
    let graph_expressions = ExpressionTranslator::new(ctx, RenderMode::Graph);
    let flat_expressions = ExpressionTranslator::new(ctx, RenderMode::Flat);
    let conditions = ConditionTranslator::new(&graph_expressions);
    let ceiling = ctx.config().max_path_depth;
    let parts = clause.parts();

    let mut required_vars = BTreeSet::new();
    for part in parts.iter().filter(|p| !p.optional) {
        required_vars.extend(part_variables(part, ctx));
    }
    if required_vars.is_empty() {
        return Err(TranslationError::unsupported_with_alternative(
            UnsupportedKind::OptionalMatch,
            "OPTIONAL MATCH needs a required MATCH to attach to",
            "MATCH instead of OPTIONAL MATCH",
        ));
    }

    let optional_vars: Vec<(usize, BTreeSet<String>)> = parts
        .iter()
        .enumerate()
        .filter(|(_, p)| p.optional)
        .map(|(i, p)| (i, part_variables(p, ctx)))
        .collect();

    // WHERE belongs to the last MATCH part
    let last = parts.len() - 1;
    let conjuncts: Vec<&Condition> = query
        .where_clause
        .as_ref()
        .map(|w| w.condition.conjuncts())
        .unwrap_or_default();
    let mut main_filters = Vec::new();
    let mut deferred = Vec::new();
    let mut last_part_filters = Vec::new();
    if parts[last].optional {
        let own = &optional_vars[optional_vars.len() - 1].1;
        for conjunct in &conjuncts {
            let outside: Vec<String> = referenced_variables(conjunct)
                .into_iter()
                .filter(|v| !own.contains(v))
                .collect();
            if !outside.is_empty() {
                return Err(TranslationError::unsupported(
                    UnsupportedKind::OptionalMatch,
                    format!(
                        "WHERE of an OPTIONAL MATCH reads `{}`, which that OPTIONAL MATCH does not bind",
                        outside.join("`, `")
                    ),
                ));
            }
            last_part_filters.push(*conjunct);
        }
    } else {
        for conjunct in &conjuncts {
            if referenced_variables(conjunct).is_subset(&required_vars) {
                main_filters.push(*conjunct);
            } else {
                deferred.push(*conjunct);
            }
        }
    }

    let mut visitor = ColumnNeeds {
        ctx,
        needs: BTreeSet::new(),
    };
    visitor.visit_return_clause(&query.return_clause);
    for conjunct in &deferred {
        visitor.visit_condition(conjunct);
    }
    let needs = visitor.needs;
    let owned_by = |vars: &BTreeSet<String>| -> Vec<&Need> {
        needs.iter().filter(|n| vars.contains(n.variable())).collect()
    };

    // required parts
    let mut main = GraphOperator::new("graph-match");
    for part in parts.iter().filter(|p| !p.optional) {
        for path in &part.patterns {
            main.patterns.push(render_pattern(path, ctx, ceiling));
            for constraint in pattern_constraints(path, &graph_expressions)? {
                main.filter(constraint);
            }
        }
    }
    if let Some(filter) = conditions.translate_all(&main_filters, diagnostics)? {
        main.filter(filter);
    }
    let mut main_columns = BTreeMap::new();
    for name in node_names(required_vars.iter(), ctx) {
        let need = Need::Id(name);
        main_columns.insert(need.clone(), need.column(&graph_expressions)?);
    }
    for need in owned_by(&required_vars) {
        main_columns.insert(need.clone(), need.column(&graph_expressions)?);
    }
    main.columns = main_columns.into_values().collect();

    let mut lines = vec![
        GraphSource::build(ctx)?.statements(),
        format!("let {} = {}\n{};", GRAPH, EDGES, MAKE_GRAPH),
        GRAPH.to_string(),
        main.render(""),
    ];

    for (index, own) in &optional_vars {
        let part = &parts[*index];
        for (other, other_vars) in &optional_vars {
            if other == index {
                continue;
            }
            if let Some(name) = own
                .intersection(other_vars)
                .find(|name| !required_vars.contains(*name))
            {
                return Err(TranslationError::unsupported(
                    UnsupportedKind::OptionalMatch,
                    format!(
                        "`{}` is bound only by OPTIONAL MATCH parts and shared between them",
                        name
                    ),
                ));
            }
        }

        let shared: Vec<&String> = own.intersection(&required_vars).collect();
        if let Some(name) = shared
            .iter()
            .find(|name| !matches!(ctx.binding(name), Some(b) if b.kind == BindingKind::Node))
        {
            return Err(TranslationError::unsupported(
                UnsupportedKind::OptionalMatch,
                format!(
                    "OPTIONAL MATCH at {} shares `{}`, which is not a node; only nodes join",
                    part.position, name
                ),
            ));
        }
        if shared.is_empty() {
            return Err(TranslationError::unsupported(
                UnsupportedKind::OptionalMatch,
                format!(
                    "OPTIONAL MATCH at {} shares no variable with the required MATCH",
                    part.position
                ),
            ));
        }

        let mut op = GraphOperator::new("graph-match");
        for path in &part.patterns {
            op.patterns.push(render_pattern(path, ctx, ceiling));
            for constraint in pattern_constraints(path, &graph_expressions)? {
                op.filter(constraint);
            }
        }
        if *index == last {
            if let Some(filter) = conditions.translate_all(&last_part_filters, diagnostics)? {
                op.filter(filter);
            }
        }
        let keys: Vec<String> = shared.iter().map(|name| id_column(name)).collect();
        let mut columns = BTreeMap::new();
        for name in &shared {
            let need = Need::Id((*name).clone());
            columns.insert(need.clone(), need.column(&graph_expressions)?);
        }
        let exclusive: BTreeSet<String> = own.difference(&required_vars).cloned().collect();
        for need in owned_by(&exclusive) {
            columns.insert(need.clone(), need.column(&graph_expressions)?);
        }
        op.columns = columns.into_values().collect();

        lines.push(format!(
            "| join kind=leftouter (\n    {}\n    {}\n    ) on {}",
            GRAPH,
            op.render("    "),
            keys.join(", ")
        ));
    }

    if let Some(filter) = ConditionTranslator::new(&flat_expressions).translate_all(&deferred, diagnostics)? {
        lines.push(format!("| where {}", filter));
    }
    let projection = translate_projection(&query.return_clause, &flat_expressions)?;
    if !projection.columns.is_empty() {
        lines.push(format!("| project {}", projection.column_list()));
    }
    lines.extend(projection.tail);
    Ok(lines.join("\n"))
}
