//! Variable-length relationships, shortest paths and path enumeration.
//!
//! Bounded repetition maps onto the graph operators' own `*min..max` syntax
//! and is never unrolled. Open-ended repetition has no native lowering: it is
//! escalated or rejected before any clause is translated, except inside
//! `shortestPath`, where the search is capped at the configured depth.

use super::common::{member, render_string};
use super::condition_translator::ConditionTranslator;
use super::context::TranslationContext;
use super::expression_translator::ExpressionTranslator;
use super::graph_source::GraphSource;
use super::pattern_translator::{
    bounds, pattern_constraints, render_length, render_relationship, GraphOperator,
};
use super::projection_translator::{translate_projection, Projection};
use super::RenderMode;
use crate::config::{CyclePolicy, TranslatorConfig, UnboundedPathPolicy};
use crate::graph_catalog::NameMatching;
use crate::open_cypher_parser::ast::{
    ComparisonOperator, Condition, Expression, NodePattern, PathExpression, PathKind, Query,
    RelationshipPattern,
};
use crate::query_translator::errors::{TranslationError, UnsupportedKind};
use crate::query_translator::escalation::EscalationReason;
use crate::query_translator::options::{PathEnumerationOptions, PathOptions};
use crate::query_translator::result::{Diagnostic, ExecutionHint};

/// How tightly a shortest-path endpoint is pinned by equality filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// One value: inline map, `=` or a one-item `IN`.
    Single,
    /// `IN` with several values.
    Multiple,
    Unanchored,
}

/// `[k:KNOWS*1..3]` for messages.
pub fn describe_relationship(rel: &RelationshipPattern) -> String {
    let mut out = String::from("[");
    if let Some(variable) = &rel.variable {
        out.push_str(&variable.name);
    }
    if !rel.types.is_empty() {
        out.push(':');
        out.push_str(&rel.types.join("|"));
    }
    if let Some(length) = &rel.length {
        out.push_str(&length.to_string());
    }
    out.push(']');
    out
}

/// Checks every variable-length relationship against the depth ceiling and
/// the unbounded-path policy.
///
/// Returns the first reason to escalate, if any. Violations that can never be
/// translated are errors and win over escalation.
pub fn check_path_lengths(
    query: &Query,
    config: &TranslatorConfig,
) -> Result<Option<(EscalationReason, String)>, TranslationError> {
    let ceiling = config.max_path_depth;
    let mut escalation = None;
    let Some(clause) = &query.match_clause else {
        return Ok(None);
    };

    for (_, path) in clause.patterns() {
        let shortest = path.kind != PathKind::Pattern;
        for rel in path.relationships() {
            let Some(length) = &rel.length else {
                continue;
            };
            let described = describe_relationship(rel);
            if length.min() > ceiling {
                return Err(TranslationError::unsupported(
                    UnsupportedKind::PathTooDeep,
                    format!(
                        "{} at {} needs at least {} hops; the ceiling is {}",
                        described,
                        rel.position,
                        length.min(),
                        ceiling
                    ),
                ));
            }
            match length.max() {
                Some(max) if max > ceiling => {
                    return Err(TranslationError::unsupported_with_alternative(
                        UnsupportedKind::PathTooDeep,
                        format!(
                            "{} at {} allows {} hops; the ceiling is {}",
                            described, rel.position, max, ceiling
                        ),
                        format!("*{}..{}", length.min(), ceiling),
                    ));
                }
                None if !shortest => match config.unbounded_path_policy {
                    UnboundedPathPolicy::Reject => {
                        return Err(TranslationError::unsupported_with_alternative(
                            UnsupportedKind::UnboundedPath,
                            format!("{} at {} has no upper bound", described, rel.position),
                            format!("*{}..{}", length.min(), ceiling),
                        ));
                    }
                    UnboundedPathPolicy::Escalate => {
                        escalation.get_or_insert((
                            EscalationReason::UnboundedPath,
                            format!("{} at {} has no upper bound", described, rel.position),
                        ));
                    }
                },
                _ => {}
            }
            if rel.types.len() > 1 {
                escalation.get_or_insert((
                    EscalationReason::MultiTypeVariablePath,
                    format!(
                        "{} at {} repeats over several relationship types",
                        described, rel.position
                    ),
                ));
            }
        }
    }
    Ok(escalation)
}

/// Anchor of `node` given the WHERE conjuncts.
pub fn classify_anchor(node: &NodePattern, name: &str, conjuncts: &[&Condition]) -> Anchor {
    if !node.properties.is_empty() {
        return Anchor::Single;
    }
    let mut anchor = Anchor::Unanchored;
    for conjunct in conjuncts {
        let Condition::Comparison(comparison) = conjunct else {
            continue;
        };
        match comparison.operator {
            ComparisonOperator::Equal => {
                let pinned = (refers_to(&comparison.left, name)
                    && matches!(comparison.right, Expression::Literal(_)))
                    || (refers_to(&comparison.right, name)
                        && matches!(comparison.left, Expression::Literal(_)));
                if pinned {
                    return Anchor::Single;
                }
            }
            ComparisonOperator::In if refers_to(&comparison.left, name) => {
                if let Expression::List(items) = &comparison.right {
                    if items.len() == 1 {
                        return Anchor::Single;
                    }
                    if items.len() > 1 {
                        anchor = Anchor::Multiple;
                    }
                }
            }
            _ => {}
        }
    }
    anchor
}

/// `v.key` or `id(v)`.
fn refers_to(expression: &Expression, name: &str) -> bool {
    match expression {
        Expression::Property(access) => access.variable.name == name,
        Expression::FunctionCall(call) if call.name.eq_ignore_ascii_case("id") => {
            matches!(call.args.as_slice(), [Expression::Variable(v)] if v.name == name)
        }
        _ => false,
    }
}

/// Endpoint a shortest-path pattern is written from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lead {
    Source,
    /// Pattern written from the target. Its edge list comes out last hop
    /// first and is flipped back wherever the path is projected.
    Target,
}

/// Everything a shortest-path lowering needs, resolved once.
struct ShortestPathPlan<'q, 'c, 'a> {
    query: &'q Query,
    path: &'q PathExpression,
    expressions: ExpressionTranslator<'c, 'a>,
    source: String,
    target: String,
    min: u32,
    max: u32,
}

impl<'q, 'c, 'a> ShortestPathPlan<'q, 'c, 'a> {
    fn relationship(&self) -> &'q RelationshipPattern {
        &self.path.steps[0].relationship
    }

    fn relationship_name(&self) -> String {
        self.expressions.context().relationship_name(self.relationship())
    }

    fn pattern(&self, lead: Lead) -> String {
        let ctx = self.expressions.context();
        let rel = self.relationship();
        let inner = format!("{}{}", ctx.relationship_name(rel), render_length(self.min, self.max));
        let (first, direction, last) = match lead {
            Lead::Source => (&self.source, rel.direction, &self.target),
            Lead::Target => (&self.target, rel.direction.reversed(), &self.source),
        };
        format!("({}){}({})", first, render_relationship(direction, &inner), last)
    }

    /// Operator with pattern, constraints and WHERE filters, plus the RETURN
    /// projection whose columns it already carries.
    fn operator(
        &self,
        operator: impl Into<String>,
        lead: Lead,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(GraphOperator, Projection), TranslationError> {
        let reversed;
        let expressions = match lead {
            Lead::Source => &self.expressions,
            Lead::Target => {
                reversed = ExpressionTranslator::new(self.expressions.context(), RenderMode::Graph)
                    .with_reversed_edges(self.relationship_name());
                &reversed
            }
        };
        let mut op = GraphOperator::new(operator);
        op.patterns.push(self.pattern(lead));
        for constraint in pattern_constraints(self.path, expressions)? {
            op.filter(constraint);
        }
        if let Some(clause) = &self.query.where_clause {
            let conjuncts = clause.condition.conjuncts();
            if let Some(filter) =
                ConditionTranslator::new(expressions).translate_all(&conjuncts, diagnostics)?
            {
                op.filter(filter);
            }
        }
        let projection = translate_projection(&self.query.return_clause, expressions)?;
        op.columns = projection.columns.clone();
        Ok((op, projection))
    }

    fn assemble(&self, body: Vec<String>) -> Result<String, TranslationError> {
        let source = GraphSource::build(self.expressions.context())?;
        let mut lines = vec![source.prelude()];
        lines.extend(body);
        Ok(lines.join("\n"))
    }
}

/// Lowers a `shortestPath` or `allShortestPaths` query. The path must be the
/// only pattern of the query.
pub fn translate_shortest_path(
    query: &Query,
    path: &PathExpression,
    ctx: &TranslationContext<'_>,
    options: &PathOptions,
    diagnostics: &mut Vec<Diagnostic>,
    hints: &mut Vec<ExecutionHint>,
) -> Result<String, TranslationError> {
    let rel = path.steps.first().map(|s| &s.relationship).ok_or_else(|| {
        TranslationError::unsupported(
            UnsupportedKind::ShortestPath,
            "shortestPath needs exactly one relationship",
        )
    })?;
    let ceiling = ctx.config().max_path_depth;
    let (min, max) = match &rel.length {
        Some(length) => bounds(length, ceiling),
        None => (1, 1),
    };
    if matches!(&rel.length, Some(length) if !length.is_bounded()) {
        diagnostics.push(Diagnostic::info(format!(
            "{} has no upper bound; the search is capped at {} hops",
            describe_relationship(rel),
            ceiling
        )));
    }

    let conjuncts = query
        .where_clause
        .as_ref()
        .map(|w| w.condition.conjuncts())
        .unwrap_or_default();
    let source = ctx.node_name(&path.start);
    let target = ctx.node_name(path.end());
    let source_anchor = classify_anchor(&path.start, &source, &conjuncts);
    let target_anchor = classify_anchor(path.end(), &target, &conjuncts);
    log::debug!(
        "Shortest path {} -> {}: anchors {:?} / {:?}",
        source,
        target,
        source_anchor,
        target_anchor
    );

    let plan = ShortestPathPlan {
        query,
        path,
        expressions: ExpressionTranslator::new(ctx, RenderMode::Graph),
        source,
        target,
        min,
        max,
    };

    if path.kind == PathKind::AllShortestPaths {
        if options.weight_property.is_some() {
            return Err(TranslationError::unsupported_with_alternative(
                UnsupportedKind::ShortestPath,
                "a weight property applies to shortestPath only",
                "shortestPath(...) with the weight property",
            ));
        }
        return translate_all_shortest(&plan, &options.enumeration, diagnostics);
    }
    if let Some(weight) = &options.weight_property {
        return translate_weighted(&plan, weight, diagnostics);
    }

    let single_pair = source_anchor == Anchor::Single && target_anchor == Anchor::Single;
    if options.bidirectional && !single_pair {
        diagnostics.push(Diagnostic::info(
            "bidirectional search needs both endpoints pinned to one value; hint not emitted",
        ));
    }
    match (source_anchor, target_anchor) {
        (Anchor::Single, Anchor::Single) => {
            translate_single_pair(&plan, options.bidirectional, diagnostics, hints)
        }
        (Anchor::Single, _) => translate_multi_target(&plan, diagnostics, hints),
        (_, Anchor::Single) => translate_multi_source(&plan, diagnostics, hints),
        (_, _) => {
            diagnostics.push(Diagnostic::warning(
                format!(
                    "neither endpoint of the shortest path between `{}` and `{}` is pinned; every matching pair is searched",
                    plan.source, plan.target
                ),
                Some(path.position),
            ));
            translate_multi_target(&plan, diagnostics, hints)
        }
    }
}

/// Both endpoints pinned: one search per pair, optionally run from both
/// ends at once.
fn translate_single_pair(
    plan: &ShortestPathPlan<'_, '_, '_>,
    bidirectional: bool,
    diagnostics: &mut Vec<Diagnostic>,
    hints: &mut Vec<ExecutionHint>,
) -> Result<String, TranslationError> {
    let (op, projection) =
        plan.operator("graph-shortest-paths output=any", Lead::Source, diagnostics)?;
    if bidirectional {
        hints.push(ExecutionHint {
            name: "bidirectional-search".to_string(),
            detail: format!(
                "expand from `{}` and `{}` alternately and stop where the frontiers meet",
                plan.source, plan.target
            ),
        });
    }
    let mut body = vec![op.render("")];
    body.extend(projection.tail);
    plan.assemble(body)
}

/// Target pinned, many sources: the pattern starts at the target so a
/// single search from it reaches every source.
fn translate_multi_source(
    plan: &ShortestPathPlan<'_, '_, '_>,
    diagnostics: &mut Vec<Diagnostic>,
    hints: &mut Vec<ExecutionHint>,
) -> Result<String, TranslationError> {
    let (op, projection) =
        plan.operator("graph-shortest-paths output=any", Lead::Target, diagnostics)?;
    hints.push(ExecutionHint {
        name: "multi-source".to_string(),
        detail: format!(
            "one shortest path per matching `{}`; searched backwards from `{}`",
            plan.source, plan.target
        ),
    });
    let mut body = vec![op.render("")];
    body.extend(projection.tail);
    plan.assemble(body)
}

/// Source pinned (or neither endpoint): the pattern starts at the source.
fn translate_multi_target(
    plan: &ShortestPathPlan<'_, '_, '_>,
    diagnostics: &mut Vec<Diagnostic>,
    hints: &mut Vec<ExecutionHint>,
) -> Result<String, TranslationError> {
    let (op, projection) =
        plan.operator("graph-shortest-paths output=any", Lead::Source, diagnostics)?;
    hints.push(ExecutionHint {
        name: "multi-target".to_string(),
        detail: format!(
            "one shortest path per matching `{}`; searched forwards from `{}`",
            plan.target, plan.source
        ),
    });
    let mut body = vec![op.render("")];
    body.extend(projection.tail);
    plan.assemble(body)
}

/// Minimum total weight instead of minimum hop count: enumerate the bounded
/// paths without repeated nodes, sum the weights along each, and keep the
/// lightest path per endpoint pair.
fn translate_weighted(
    plan: &ShortestPathPlan<'_, '_, '_>,
    weight: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, TranslationError> {
    let (mut op, projection) =
        plan.operator("graph-match cycles=none", Lead::Source, diagnostics)?;
    let rel = plan.relationship_name();
    let total = if plan.relationship().length.is_some() {
        format!(
            "array_sum(map({}, {}))",
            rel,
            plan.expressions.element_property(&rel, weight)?
        )
    } else {
        format!("todouble({})", plan.expressions.property(&rel, weight)?)
    };
    op.columns.push(format!("_src = {}", member(&plan.source, "NodeId")));
    op.columns.push(format!("_dst = {}", member(&plan.target, "NodeId")));
    op.columns.push(format!("total_weight = {}", total));

    let mut body = vec![
        op.render(""),
        "| summarize arg_min(total_weight, *) by _src, _dst".to_string(),
        "| project-away _src, _dst, total_weight".to_string(),
    ];
    body.extend(projection.tail);
    plan.assemble(body)
}

fn translate_all_shortest(
    plan: &ShortestPathPlan<'_, '_, '_>,
    enumeration: &PathEnumerationOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, TranslationError> {
    let ctx = plan.expressions.context();
    let max = depth_cap(plan.min, plan.max, enumeration)?;
    let capped = ShortestPathPlan {
        query: plan.query,
        path: plan.path,
        expressions: ExpressionTranslator::new(ctx, RenderMode::Graph),
        source: plan.source.clone(),
        target: plan.target.clone(),
        min: plan.min,
        max,
    };
    let (mut op, projection) =
        capped.operator("graph-shortest-paths output=all", Lead::Source, diagnostics)?;
    for filter in exclusion_filters(plan.path, &plan.expressions, enumeration)? {
        op.filter(filter);
    }
    if let Some(predicate) = &enumeration.predicate {
        if let Some(filter) = ConditionTranslator::new(&plan.expressions)
            .translate_all(&predicate.conjuncts(), diagnostics)?
        {
            op.filter(filter);
        }
    }
    let mut body = vec![op.render("")];
    body.extend(projection.tail);
    body.push(result_cap(ctx, enumeration));
    capped.assemble(body)
}

/// Cap on returned rows. It follows the RETURN tail so aggregates, DISTINCT
/// and ORDER BY see every enumerated path.
fn result_cap(ctx: &TranslationContext<'_>, enumeration: &PathEnumerationOptions) -> String {
    let limit = enumeration.max_results.unwrap_or(ctx.config().max_path_results);
    format!("| take {}", limit)
}

/// Upper bound after the enumeration depth cap.
fn depth_cap(
    min: u32,
    max: u32,
    enumeration: &PathEnumerationOptions,
) -> Result<u32, TranslationError> {
    let Some(cap) = enumeration.max_depth else {
        return Ok(max);
    };
    if cap < min {
        return Err(TranslationError::unsupported(
            UnsupportedKind::InvalidPathLength,
            format!("depth cap {} is below the minimum of {} hops", cap, min),
        ));
    }
    Ok(max.min(cap))
}

/// Filters for excluded node ids and relationship types along `path`.
fn exclusion_filters(
    path: &PathExpression,
    expressions: &ExpressionTranslator<'_, '_>,
    enumeration: &PathEnumerationOptions,
) -> Result<Vec<String>, TranslationError> {
    let ctx = expressions.context();
    let mut filters = Vec::new();

    if !enumeration.excluded_node_ids.is_empty() {
        let ids = enumeration
            .excluded_node_ids
            .iter()
            .map(|id| render_string(id))
            .collect::<Vec<_>>()
            .join(", ");
        for node in path.nodes() {
            let filter = format!("{} !in ({})", member(&ctx.node_name(node), "NodeId"), ids);
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }
        for rel in path.relationships().filter(|r| r.length.is_some()) {
            filters.push(format!(
                "all(inner_nodes({}), NodeId !in ({}))",
                ctx.relationship_name(rel),
                ids
            ));
        }
    }

    let matching = if ctx.config().case_insensitive_schema_fallback {
        NameMatching::CaseInsensitiveFallback
    } else {
        NameMatching::Exact
    };
    for excluded in &enumeration.excluded_relationship_types {
        ctx.schema().resolve_relationship_type_with(excluded, matching)?;
        let canonical = ctx
            .schema()
            .relationship_types()
            .find(|t| t.eq_ignore_ascii_case(excluded))
            .unwrap_or(excluded.as_str());
        for rel in path.relationships() {
            let name = ctx.relationship_name(rel);
            filters.push(if rel.length.is_some() {
                format!(
                    "all({}, not(set_has_element(EdgeTypes, {})))",
                    name,
                    render_string(canonical)
                )
            } else {
                format!(
                    "not(set_has_element({}.EdgeTypes, {}))",
                    name,
                    render_string(canonical)
                )
            });
        }
    }
    Ok(filters)
}

/// Lowers a named variable-length path, enumerating every matching path up
/// to the result cap.
pub fn translate_path_enumeration(
    query: &Query,
    path: &PathExpression,
    ctx: &TranslationContext<'_>,
    options: &PathOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, TranslationError> {
    let enumeration = &options.enumeration;
    let expressions = ExpressionTranslator::new(ctx, RenderMode::Graph);
    let cycles = match enumeration.cycle_policy.unwrap_or(ctx.config().cycle_policy) {
        CyclePolicy::Forbidden => "none",
        CyclePolicy::Bounded => "unique_edges",
    };

    let mut pattern = format!("({})", ctx.node_name(&path.start));
    for step in &path.steps {
        let rel = &step.relationship;
        let mut inner = ctx.relationship_name(rel);
        if let Some(length) = &rel.length {
            let (min, max) = bounds(length, ctx.config().max_path_depth);
            inner.push_str(&render_length(min, depth_cap(min, max, enumeration)?));
        }
        pattern.push_str(&render_relationship(rel.direction, &inner));
        pattern.push_str(&format!("({})", ctx.node_name(&step.node)));
    }

    let mut op = GraphOperator::new(format!("graph-match cycles={}", cycles));
    op.patterns.push(pattern);
    for constraint in pattern_constraints(path, &expressions)? {
        op.filter(constraint);
    }
    for filter in exclusion_filters(path, &expressions, enumeration)? {
        op.filter(filter);
    }
    let conditions = ConditionTranslator::new(&expressions);
    if let Some(clause) = &query.where_clause {
        if let Some(filter) = conditions.translate_all(&clause.condition.conjuncts(), diagnostics)? {
            op.filter(filter);
        }
    }
    if let Some(predicate) = &enumeration.predicate {
        if let Some(filter) = conditions.translate_all(&predicate.conjuncts(), diagnostics)? {
            op.filter(filter);
        }
    }

    let projection = translate_projection(&query.return_clause, &expressions)?;
    op.columns = projection.columns.clone();

    let mut lines = vec![GraphSource::build(ctx)?.prelude(), op.render("")];
    lines.extend(projection.tail);
    lines.push(result_cap(ctx, enumeration));
    Ok(lines.join("\n"))
}
