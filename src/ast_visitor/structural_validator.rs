use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::identifier_collector::BindingKind;
use super::AstVisitor;
use crate::open_cypher_parser::ast::{
    AggregateCall, Identifier, MatchPart, NodePattern, OrderByItem, PathExpression, PathKind,
    Position, Query, RelationshipPattern, ReturnItem, WhereClause,
};

/// A structural problem found in an otherwise well-formed AST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Violation {
    UnboundIdentifier {
        name: String,
        position: Position,
    },
    ConflictingBinding {
        name: String,
        first: BindingKind,
        second: BindingKind,
        position: Position,
    },
    InvalidPathLength {
        detail: String,
        position: Position,
    },
    InvalidShortestPath {
        detail: String,
        position: Position,
    },
    AggregateInWhere {
        function: String,
        position: Position,
    },
}

impl Violation {
    pub fn position(&self) -> Position {
        match self {
            Violation::UnboundIdentifier { position, .. }
            | Violation::ConflictingBinding { position, .. }
            | Violation::InvalidPathLength { position, .. }
            | Violation::InvalidShortestPath { position, .. }
            | Violation::AggregateInWhere { position, .. } => *position,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnboundIdentifier { name, position } => {
                write!(f, "variable '{}' is not defined ({})", name, position)
            }
            Violation::ConflictingBinding {
                name,
                first,
                second,
                position,
            } => write!(
                f,
                "variable '{}' is bound as {:?} and again as {:?} ({})",
                name, first, second, position
            ),
            Violation::InvalidPathLength { detail, position }
            | Violation::InvalidShortestPath { detail, position } => {
                write!(f, "{} ({})", detail, position)
            }
            Violation::AggregateInWhere { function, position } => write!(
                f,
                "aggregate {}() is not allowed in WHERE ({})",
                function, position
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Match,
    Where,
    Return,
    OrderBy,
}

/// Checks binding and shape rules that the grammar cannot express.
pub struct StructuralValidator {
    bound: HashMap<String, BindingKind>,
    aliases: Vec<String>,
    scope: Scope,
    violations: Vec<Violation>,
}

impl Default for StructuralValidator {
    fn default() -> Self {
        StructuralValidator {
            bound: HashMap::new(),
            aliases: Vec::new(),
            scope: Scope::Match,
            violations: Vec::new(),
        }
    }
}

impl StructuralValidator {
    /// Run every check over `query`, returning the violations in source order.
    pub fn validate(query: &Query) -> Vec<Violation> {
        let mut validator = StructuralValidator::default();
        validator.visit_query(query);
        validator.violations
    }

    fn define(&mut self, identifier: &Identifier, kind: BindingKind) {
        match self.bound.get(&identifier.name) {
            // re-using a node variable joins on it
            Some(BindingKind::Node) if kind == BindingKind::Node => {}
            Some(&first) => self.violations.push(Violation::ConflictingBinding {
                name: identifier.name.clone(),
                first,
                second: kind,
                position: identifier.position,
            }),
            None => {
                self.bound.insert(identifier.name.clone(), kind);
            }
        }
    }
}

impl AstVisitor for StructuralValidator {
    fn visit_match_part(&mut self, part: &MatchPart) {
        self.scope = Scope::Match;
        super::walk_match_part(self, part);
    }

    fn visit_path_expression(&mut self, path: &PathExpression) {
        if path.kind != PathKind::Pattern {
            let name = match path.kind {
                PathKind::ShortestPath => "shortestPath",
                _ => "allShortestPaths",
            };
            if path.steps.len() != 1 {
                self.violations.push(Violation::InvalidShortestPath {
                    detail: format!(
                        "{} requires exactly one relationship, found {}",
                        name,
                        path.steps.len()
                    ),
                    position: path.position,
                });
            }
        }
        if let Some(variable) = &path.variable {
            self.define(variable, BindingKind::Path);
        }
        super::walk_path_expression(self, path);
    }

    fn visit_node_pattern(&mut self, node: &NodePattern) {
        if let Some(variable) = &node.variable {
            self.define(variable, BindingKind::Node);
        }
    }

    fn visit_relationship_pattern(&mut self, relationship: &RelationshipPattern) {
        if let Some(variable) = &relationship.variable {
            self.define(variable, BindingKind::Relationship);
        }
        if let Some(length) = relationship.length {
            if length.max() == Some(0) {
                self.violations.push(Violation::InvalidPathLength {
                    detail: format!("relationship length {} spans no hops", length),
                    position: relationship.position,
                });
            }
        }
    }

    fn visit_where_clause(&mut self, clause: &WhereClause) {
        self.scope = Scope::Where;
        super::walk_where_clause(self, clause);
    }

    fn visit_return_item(&mut self, item: &ReturnItem) {
        self.scope = Scope::Return;
        if let ReturnItem::Expression {
            alias: Some(alias), ..
        } = item
        {
            self.aliases.push(alias.name.clone());
        }
        super::walk_return_item(self, item);
    }

    fn visit_order_by_item(&mut self, item: &OrderByItem) {
        self.scope = Scope::OrderBy;
        self.visit_expression(&item.expression);
    }

    fn visit_variable(&mut self, variable: &Identifier) {
        if self.bound.contains_key(&variable.name) {
            return;
        }
        if self.scope == Scope::OrderBy && self.aliases.contains(&variable.name) {
            return;
        }
        self.violations.push(Violation::UnboundIdentifier {
            name: variable.name.clone(),
            position: variable.position,
        });
    }

    fn visit_aggregate_call(&mut self, call: &AggregateCall) {
        if self.scope == Scope::Where {
            self.violations.push(Violation::AggregateInWhere {
                function: call.function.name().to_string(),
                position: call.position,
            });
        }
        super::walk_aggregate_call(self, call);
    }
}
