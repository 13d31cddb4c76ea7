use std::collections::BTreeMap;

use serde::Serialize;

use super::{walk_node_pattern, walk_path_expression, walk_relationship_pattern, AstVisitor};
use crate::open_cypher_parser::ast::{
    Identifier, Literal, NodePattern, PathExpression, Position, RelationshipPattern, ReturnItem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindingKind {
    Node,
    Relationship,
    Path,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub name: String,
    pub kind: BindingKind,
    pub position: Position,
    /// Defined inside an OPTIONAL MATCH part.
    pub optional: bool,
}

/// Gathers variable definitions (from MATCH), variable usages (from WHERE,
/// RETURN and ORDER BY), return aliases and literal values.
#[derive(Debug, Default)]
pub struct IdentifierCollector {
    pub definitions: Vec<Definition>,
    pub usages: Vec<Identifier>,
    pub aliases: Vec<Identifier>,
    pub literals: Vec<Literal>,
    in_optional: bool,
}

impl IdentifierCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// First definition of every name, keyed by name.
    pub fn bindings(&self) -> BTreeMap<&str, &Definition> {
        let mut map = BTreeMap::new();
        for def in &self.definitions {
            map.entry(def.name.as_str()).or_insert(def);
        }
        map
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| a.name == name)
    }

    fn define(&mut self, identifier: &Identifier, kind: BindingKind) {
        self.definitions.push(Definition {
            name: identifier.name.clone(),
            kind,
            position: identifier.position,
            optional: self.in_optional,
        });
    }
}

impl AstVisitor for IdentifierCollector {
    fn visit_match_part(&mut self, part: &crate::open_cypher_parser::ast::MatchPart) {
        self.in_optional = part.optional;
        super::walk_match_part(self, part);
        self.in_optional = false;
    }

    fn visit_path_expression(&mut self, path: &PathExpression) {
        if let Some(variable) = &path.variable {
            self.define(variable, BindingKind::Path);
        }
        walk_path_expression(self, path);
    }

    fn visit_node_pattern(&mut self, node: &NodePattern) {
        if let Some(variable) = &node.variable {
            self.define(variable, BindingKind::Node);
        }
        walk_node_pattern(self, node);
    }

    fn visit_relationship_pattern(&mut self, relationship: &RelationshipPattern) {
        if let Some(variable) = &relationship.variable {
            self.define(variable, BindingKind::Relationship);
        }
        walk_relationship_pattern(self, relationship);
    }

    fn visit_variable(&mut self, variable: &Identifier) {
        self.usages.push(variable.clone());
    }

    fn visit_literal(&mut self, literal: &Literal) {
        self.literals.push(literal.clone());
    }

    fn visit_return_item(&mut self, item: &ReturnItem) {
        if let ReturnItem::Expression {
            alias: Some(alias), ..
        } = item
        {
            self.aliases.push(alias.clone());
        }
        super::walk_return_item(self, item);
    }
}
