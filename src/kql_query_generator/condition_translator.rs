use std::collections::BTreeSet;

use super::expression_translator::ExpressionTranslator;
use crate::ast_visitor::AstVisitor;
use crate::open_cypher_parser::ast::{
    Comparison, ComparisonOperator, Condition, Expression, Identifier, Literal,
};
use crate::query_translator::errors::TranslationError;
use crate::query_translator::result::Diagnostic;

/// Fixed Cypher to KQL operator table.
pub fn kql_operator(operator: ComparisonOperator) -> &'static str {
    match operator {
        ComparisonOperator::Equal => "==",
        ComparisonOperator::NotEqual => "!=",
        ComparisonOperator::LessThan => "<",
        ComparisonOperator::GreaterThan => ">",
        ComparisonOperator::LessThanEqual => "<=",
        ComparisonOperator::GreaterThanEqual => ">=",
        ComparisonOperator::In => "in",
        ComparisonOperator::StartsWith => "startswith_cs",
        ComparisonOperator::EndsWith => "endswith_cs",
        ComparisonOperator::Contains => "contains_cs",
    }
}

// Binding strength, loosest first
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_ATOM: u8 = 3;

pub struct ConditionTranslator<'t, 'c, 'a> {
    expressions: &'t ExpressionTranslator<'c, 'a>,
}

impl<'t, 'c, 'a> ConditionTranslator<'t, 'c, 'a> {
    pub fn new(expressions: &'t ExpressionTranslator<'c, 'a>) -> Self {
        ConditionTranslator { expressions }
    }

    /// Several conditions joined with `and`.
    pub fn translate_all(
        &self,
        conditions: &[&Condition],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<String>, TranslationError> {
        let mut parts = Vec::with_capacity(conditions.len());
        for condition in conditions {
            let (text, prec) = self.render(condition, diagnostics)?;
            parts.push(wrap(text, prec, PREC_AND));
        }
        Ok(if parts.is_empty() {
            None
        } else {
            Some(parts.join(" and "))
        })
    }

    fn render(
        &self,
        condition: &Condition,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(String, u8), TranslationError> {
        match condition {
            Condition::And(left, right) => {
                let (l, lp) = self.render(left, diagnostics)?;
                let (r, rp) = self.render(right, diagnostics)?;
                Ok((
                    format!("{} and {}", wrap(l, lp, PREC_AND), wrap(r, rp, PREC_AND)),
                    PREC_AND,
                ))
            }
            Condition::Or(left, right) => {
                let (l, lp) = self.render(left, diagnostics)?;
                let (r, rp) = self.render(right, diagnostics)?;
                Ok((
                    format!("{} or {}", wrap(l, lp, PREC_OR), wrap(r, rp, PREC_OR)),
                    PREC_OR,
                ))
            }
            Condition::Not(inner) => {
                let (text, _) = self.render(inner, diagnostics)?;
                Ok((format!("not({})", text), PREC_ATOM))
            }
            Condition::IsNull {
                expression,
                negated,
            } => {
                let function = if *negated { "isnotnull" } else { "isnull" };
                Ok((
                    format!("{}({})", function, self.expressions.translate(expression)?),
                    PREC_ATOM,
                ))
            }
            Condition::Predicate(expression) => {
                Ok((self.expressions.translate(expression)?, PREC_ATOM))
            }
            Condition::Comparison(comparison) => {
                Ok((self.comparison(comparison, diagnostics)?, PREC_ATOM))
            }
        }
    }

    fn comparison(
        &self,
        comparison: &Comparison,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<String, TranslationError> {
        let left = self.expressions.translate(&comparison.left)?;
        let operator = kql_operator(comparison.operator);

        if comparison.operator == ComparisonOperator::In {
            return match &comparison.right {
                Expression::List(items) if items.is_empty() => Ok("false".to_string()),
                Expression::List(items) => {
                    let rendered = items
                        .iter()
                        .map(|item| self.expressions.translate(item))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(format!("{} in ({})", left, rendered.join(", ")))
                }
                other => Ok(format!("{} in ({})", left, self.expressions.translate(other)?)),
            };
        }

        if matches!(
            comparison.operator,
            ComparisonOperator::Equal | ComparisonOperator::NotEqual
        ) && (is_null(&comparison.left) || is_null(&comparison.right))
        {
            diagnostics.push(Diagnostic::warning(
                format!(
                    "comparison with null using `{}` never matches; use IS NULL or IS NOT NULL",
                    comparison.operator
                ),
                Some(comparison.position),
            ));
        }

        let right = self.expressions.translate(&comparison.right)?;
        Ok(format!("{} {} {}", left, operator, right))
    }
}

fn wrap(text: String, prec: u8, parent: u8) -> String {
    if prec < parent {
        format!("({})", text)
    } else {
        text
    }
}

fn is_null(expression: &Expression) -> bool {
    matches!(expression, Expression::Literal(Literal::Null))
}

#[derive(Default)]
struct VariableCollector {
    names: BTreeSet<String>,
}

impl AstVisitor for VariableCollector {
    fn visit_variable(&mut self, variable: &Identifier) {
        self.names.insert(variable.name.clone());
    }
}

/// Variables a condition reads, used to decide which graph operator a
/// conjunct can be attached to.
pub fn referenced_variables(condition: &Condition) -> BTreeSet<String> {
    let mut collector = VariableCollector::default();
    collector.visit_condition(condition);
    collector.names
}
