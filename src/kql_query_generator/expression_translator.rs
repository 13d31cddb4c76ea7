use super::common::{
    flat_column, id_column, member, quote_identifier, render_dynamic_element, render_literal,
    string_array,
};
use super::context::{Binding, TranslationContext};
use super::function_registry::{get_function_mapping, supported_functions};
use super::RenderMode;
use crate::ast_visitor::BindingKind;
use crate::graph_catalog::EntityKeys;
use crate::open_cypher_parser::ast::{Expression, FunctionCall, Identifier, Literal};
use crate::query_translator::errors::{TranslationError, UnsupportedKind};

/// Column carrying `labels(var)` out of a graph operator.
pub fn labels_column(variable: &str) -> String {
    format!("{}__labels", variable)
}

/// Column carrying `length(path)` out of a graph operator.
pub fn length_column(variable: &str) -> String {
    format!("{}__length", variable)
}

/// Lowers operand expressions to KQL scalar expressions.
pub struct ExpressionTranslator<'c, 'a> {
    ctx: &'c TranslationContext<'a>,
    mode: RenderMode,
    /// Edge list matched from its far end, so its elements arrive last hop first.
    reversed_edges: Option<String>,
}

impl<'c, 'a> ExpressionTranslator<'c, 'a> {
    pub fn new(ctx: &'c TranslationContext<'a>, mode: RenderMode) -> Self {
        ExpressionTranslator {
            ctx,
            mode,
            reversed_edges: None,
        }
    }

    /// Restores path order for `relationship`, whose pattern was written
    /// target first.
    pub fn with_reversed_edges(mut self, relationship: impl Into<String>) -> Self {
        self.reversed_edges = Some(relationship.into());
        self
    }

    pub fn context(&self) -> &'c TranslationContext<'a> {
        self.ctx
    }

    pub fn translate(&self, expression: &Expression) -> Result<String, TranslationError> {
        match expression {
            Expression::Literal(literal) => Ok(render_literal(literal)),
            Expression::Variable(identifier) => self.variable(identifier),
            Expression::Property(access) => {
                self.ctx.require_binding(&access.variable)?;
                self.property(&access.variable.name, &access.key)
            }
            Expression::FunctionCall(call) => self.function_call(call),
            Expression::Aggregate(aggregate) => Err(TranslationError::unsupported(
                UnsupportedKind::Aggregate,
                format!(
                    "{} at {} must be a top-level RETURN item",
                    expression, aggregate.position
                ),
            )),
            Expression::List(items) => self.list(items),
        }
    }

    /// `var.key` in the current mode, coalescing over the columns of every
    /// candidate entity.
    pub fn property(&self, variable: &str, key: &str) -> Result<String, TranslationError> {
        if self.mode == RenderMode::Flat {
            return Ok(flat_column(variable, key));
        }
        let resolved = self.ctx.property(variable, key)?;
        let rendered: Vec<String> = resolved
            .columns
            .iter()
            .map(|column| match self.mode {
                RenderMode::Graph => member(variable, column),
                _ => quote_identifier(column),
            })
            .collect();
        Ok(coalesce(rendered))
    }

    /// Physical column reference without an owner, as used inside
    /// `all(e, ...)` quantifiers over variable-length edges.
    pub fn element_property(&self, variable: &str, key: &str) -> Result<String, TranslationError> {
        let resolved = self.ctx.property(variable, key)?;
        Ok(coalesce(
            resolved.columns.iter().map(|c| quote_identifier(c)).collect(),
        ))
    }

    pub fn variable(&self, identifier: &Identifier) -> Result<String, TranslationError> {
        let binding = self.ctx.require_binding(identifier)?;
        match (self.mode, binding.kind) {
            (RenderMode::Flat, _) => Ok(quote_identifier(&binding.name)),
            (RenderMode::Graph, BindingKind::Path) => Ok(format!(
                "pack_array({})",
                binding
                    .path_elements
                    .iter()
                    .map(|element| self.in_path_order(element))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            (RenderMode::Graph, _) => Ok(self.in_path_order(&binding.name)),
            (RenderMode::Tabular, BindingKind::Node) => Ok("pack_all()".to_string()),
            (RenderMode::Tabular, kind) => Err(TranslationError::TranslationAssembly(format!(
                "{:?} variable `{}` in a single-table query",
                kind, binding.name
            ))),
        }
    }

    fn in_path_order(&self, name: &str) -> String {
        match &self.reversed_edges {
            Some(reversed) if reversed == name => format!("array_reverse({})", name),
            _ => name.to_string(),
        }
    }

    /// Stable identity of a node variable: `NodeId` in graph operators, the
    /// key column over a table.
    pub fn node_id(&self, identifier: &Identifier) -> Result<String, TranslationError> {
        let binding = self.ctx.require_binding(identifier)?;
        if binding.kind != BindingKind::Node {
            return Err(TranslationError::unsupported(
                UnsupportedKind::Function,
                format!("id() of {:?} variable `{}`", binding.kind, binding.name),
            ));
        }
        match self.mode {
            RenderMode::Graph => Ok(member(&binding.name, "NodeId")),
            RenderMode::Flat => Ok(id_column(&binding.name)),
            RenderMode::Tabular => Ok(self.key_expression(binding)),
        }
    }

    fn key_expression(&self, binding: &Binding) -> String {
        let keys: Vec<String> = self
            .ctx
            .entities_of(binding)
            .into_iter()
            .filter_map(|entity| match &entity.keys {
                EntityKeys::Node { key_column } => {
                    Some(format!("tostring({})", quote_identifier(key_column)))
                }
                EntityKeys::Edge { .. } => None,
            })
            .collect();
        coalesce(keys)
    }

    fn function_call(&self, call: &FunctionCall) -> Result<String, TranslationError> {
        let lowered = call.name.to_ascii_lowercase();
        match (lowered.as_str(), call.args.as_slice()) {
            ("id", [Expression::Variable(identifier)]) => return self.node_id(identifier),
            ("labels", [Expression::Variable(identifier)]) => return self.labels(identifier),
            ("length" | "size", [Expression::Variable(identifier)]) => {
                if let Some(length) = self.element_length(identifier)? {
                    return Ok(length);
                }
            }
            ("size", [Expression::List(items)]) => {
                return Ok(format!("array_length({})", self.list(items)?));
            }
            ("id" | "labels", _) => {
                return Err(TranslationError::unsupported(
                    UnsupportedKind::Function,
                    format!("{}() expects a single node variable, got {}", call.name, call_text(call)),
                ))
            }
            _ => {}
        }

        let mapping = get_function_mapping(&call.name).ok_or_else(|| {
            TranslationError::unsupported_with_alternative(
                UnsupportedKind::Function,
                format!("function `{}` at {} has no KQL mapping", call.name, call.position),
                format!("one of: {}", supported_functions().join(", ")),
            )
        })?;
        if !mapping.accepts(call.args.len()) {
            let (min, max) = mapping.arity;
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(TranslationError::unsupported(
                UnsupportedKind::Function,
                format!(
                    "`{}` takes {} argument(s), got {}",
                    mapping.cypher_name,
                    expected,
                    call.args.len()
                ),
            ));
        }

        let args = call
            .args
            .iter()
            .map(|arg| self.translate(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(mapping.render(&args))
    }

    fn labels(&self, identifier: &Identifier) -> Result<String, TranslationError> {
        let binding = self.ctx.require_binding(identifier)?;
        if binding.kind != BindingKind::Node {
            return Err(TranslationError::unsupported(
                UnsupportedKind::Function,
                format!("labels() of {:?} variable `{}`", binding.kind, binding.name),
            ));
        }
        match self.mode {
            RenderMode::Graph => Ok(member(&binding.name, "NodeLabels")),
            RenderMode::Flat => Ok(labels_column(&binding.name)),
            RenderMode::Tabular => {
                let mut labels: Vec<&str> = self
                    .ctx
                    .entities_of(binding)
                    .iter()
                    .flat_map(|entity| self.ctx.schema().labels_of(&entity.id))
                    .collect();
                labels.sort_unstable();
                labels.dedup();
                Ok(string_array(&labels))
            }
        }
    }

    /// Hop count of a path variable or a variable-length relationship;
    /// `None` for anything else, which falls through to string length.
    fn element_length(&self, identifier: &Identifier) -> Result<Option<String>, TranslationError> {
        let binding = self.ctx.require_binding(identifier)?;
        match (binding.kind, self.mode) {
            (BindingKind::Path, RenderMode::Flat) => Ok(Some(length_column(&binding.name))),
            (BindingKind::Path, _) => {
                let mut fixed = 0usize;
                let mut terms = Vec::new();
                for element in &binding.path_elements {
                    match self.ctx.binding(element) {
                        Some(b) if b.kind == BindingKind::Relationship && b.variable_length => {
                            terms.push(format!("array_length({})", element))
                        }
                        Some(b) if b.kind == BindingKind::Relationship => fixed += 1,
                        _ => {}
                    }
                }
                if terms.is_empty() {
                    return Ok(Some(fixed.to_string()));
                }
                if fixed > 0 {
                    terms.insert(0, fixed.to_string());
                }
                Ok(Some(terms.join(" + ")))
            }
            (BindingKind::Relationship, RenderMode::Graph) if binding.variable_length => {
                Ok(Some(format!("array_length({})", binding.name)))
            }
            _ => Ok(None),
        }
    }

    /// `dynamic([...])` for literal lists, `pack_array(...)` otherwise.
    pub fn list(&self, items: &[Expression]) -> Result<String, TranslationError> {
        let literals: Option<Vec<&Literal>> = items
            .iter()
            .map(|item| match item {
                Expression::Literal(literal) => Some(literal),
                _ => None,
            })
            .collect();
        match literals {
            Some(literals) => Ok(format!(
                "dynamic([{}])",
                literals
                    .into_iter()
                    .map(render_dynamic_element)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            None => {
                let rendered = items
                    .iter()
                    .map(|item| self.translate(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("pack_array({})", rendered.join(", ")))
            }
        }
    }
}

fn coalesce(mut rendered: Vec<String>) -> String {
    if rendered.len() == 1 {
        rendered.remove(0)
    } else {
        format!("coalesce({})", rendered.join(", "))
    }
}

fn call_text(call: &FunctionCall) -> String {
    Expression::FunctionCall(call.clone()).to_string()
}
