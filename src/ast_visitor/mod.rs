//! AST Visitor Pattern
//!
//! [`AstVisitor`] has one method per node type. Every method defaults to the
//! matching `walk_*` function, which recurses into the children, so a concrete
//! visitor overrides only the nodes it cares about and calls `walk_*` itself
//! when it still wants the descent.
//!
//! Visitors receive shared references; transforming a query means building a
//! new tree.
//!
//! # Example
//!
//! ```
//! use kustograph::ast_visitor::{walk_node_pattern, AstVisitor};
//! use kustograph::open_cypher_parser::{ast::NodePattern, parse_query};
//!
//! #[derive(Default)]
//! struct LabelCounter(usize);
//!
//! impl AstVisitor for LabelCounter {
//!     fn visit_node_pattern(&mut self, node: &NodePattern) {
//!         self.0 += node.labels.len();
//!         walk_node_pattern(self, node);
//!     }
//! }
//!
//! let query = parse_query("MATCH (a:User)-[:KNOWS]->(b:User:Admin) RETURN a").unwrap();
//! let mut counter = LabelCounter::default();
//! counter.visit_query(&query);
//! assert_eq!(counter.0, 3);
//! ```

use crate::open_cypher_parser::ast::{
    AggregateCall, Condition, Expression, FunctionCall, Identifier, Literal, MatchClause,
    MatchPart, NodePattern, OrderByItem, PathExpression, PropertyAccess, Query,
    RelationshipPattern, ReturnClause, ReturnItem, WhereClause,
};

pub mod graph_exporter;
pub mod identifier_collector;
pub mod structural_validator;

pub use graph_exporter::GraphExporter;
pub use identifier_collector::{BindingKind, IdentifierCollector};
pub use structural_validator::{StructuralValidator, Violation};

pub trait AstVisitor {
    fn visit_query(&mut self, query: &Query) {
        walk_query(self, query)
    }

    fn visit_match_clause(&mut self, clause: &MatchClause) {
        walk_match_clause(self, clause)
    }

    fn visit_match_part(&mut self, part: &MatchPart) {
        walk_match_part(self, part)
    }

    fn visit_path_expression(&mut self, path: &PathExpression) {
        walk_path_expression(self, path)
    }

    fn visit_node_pattern(&mut self, node: &NodePattern) {
        walk_node_pattern(self, node)
    }

    fn visit_relationship_pattern(&mut self, relationship: &RelationshipPattern) {
        walk_relationship_pattern(self, relationship)
    }

    fn visit_where_clause(&mut self, clause: &WhereClause) {
        walk_where_clause(self, clause)
    }

    fn visit_condition(&mut self, condition: &Condition) {
        walk_condition(self, condition)
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression)
    }

    /// A variable referenced from WHERE, RETURN or ORDER BY.
    fn visit_variable(&mut self, _variable: &Identifier) {}

    fn visit_property_access(&mut self, property: &PropertyAccess) {
        self.visit_variable(&property.variable)
    }

    fn visit_function_call(&mut self, call: &FunctionCall) {
        walk_function_call(self, call)
    }

    fn visit_aggregate_call(&mut self, call: &AggregateCall) {
        walk_aggregate_call(self, call)
    }

    fn visit_literal(&mut self, _literal: &Literal) {}

    fn visit_return_clause(&mut self, clause: &ReturnClause) {
        walk_return_clause(self, clause)
    }

    fn visit_return_item(&mut self, item: &ReturnItem) {
        walk_return_item(self, item)
    }

    fn visit_order_by_item(&mut self, item: &OrderByItem) {
        self.visit_expression(&item.expression)
    }
}

pub fn walk_query<V: AstVisitor + ?Sized>(visitor: &mut V, query: &Query) {
    if let Some(clause) = &query.match_clause {
        visitor.visit_match_clause(clause);
    }
    if let Some(clause) = &query.where_clause {
        visitor.visit_where_clause(clause);
    }
    visitor.visit_return_clause(&query.return_clause);
}

pub fn walk_match_clause<V: AstVisitor + ?Sized>(visitor: &mut V, clause: &MatchClause) {
    for part in clause.parts() {
        visitor.visit_match_part(part);
    }
}

pub fn walk_match_part<V: AstVisitor + ?Sized>(visitor: &mut V, part: &MatchPart) {
    for path in &part.patterns {
        visitor.visit_path_expression(path);
    }
}

pub fn walk_path_expression<V: AstVisitor + ?Sized>(visitor: &mut V, path: &PathExpression) {
    visitor.visit_node_pattern(&path.start);
    for step in &path.steps {
        visitor.visit_relationship_pattern(&step.relationship);
        visitor.visit_node_pattern(&step.node);
    }
}

pub fn walk_node_pattern<V: AstVisitor + ?Sized>(visitor: &mut V, node: &NodePattern) {
    for constraint in &node.properties {
        visitor.visit_literal(&constraint.value);
    }
}

pub fn walk_relationship_pattern<V: AstVisitor + ?Sized>(
    visitor: &mut V,
    relationship: &RelationshipPattern,
) {
    for constraint in &relationship.properties {
        visitor.visit_literal(&constraint.value);
    }
}

pub fn walk_where_clause<V: AstVisitor + ?Sized>(visitor: &mut V, clause: &WhereClause) {
    visitor.visit_condition(&clause.condition);
}

pub fn walk_condition<V: AstVisitor + ?Sized>(visitor: &mut V, condition: &Condition) {
    match condition {
        Condition::Comparison(comparison) => {
            visitor.visit_expression(&comparison.left);
            visitor.visit_expression(&comparison.right);
        }
        Condition::And(left, right) | Condition::Or(left, right) => {
            visitor.visit_condition(left);
            visitor.visit_condition(right);
        }
        Condition::Not(inner) => visitor.visit_condition(inner),
        Condition::IsNull { expression, .. } | Condition::Predicate(expression) => {
            visitor.visit_expression(expression)
        }
    }
}

pub fn walk_expression<V: AstVisitor + ?Sized>(visitor: &mut V, expression: &Expression) {
    match expression {
        Expression::Literal(literal) => visitor.visit_literal(literal),
        Expression::Variable(identifier) => visitor.visit_variable(identifier),
        Expression::Property(property) => visitor.visit_property_access(property),
        Expression::FunctionCall(call) => visitor.visit_function_call(call),
        Expression::Aggregate(call) => visitor.visit_aggregate_call(call),
        Expression::List(items) => {
            for item in items {
                visitor.visit_expression(item);
            }
        }
    }
}

pub fn walk_function_call<V: AstVisitor + ?Sized>(visitor: &mut V, call: &FunctionCall) {
    for arg in &call.args {
        visitor.visit_expression(arg);
    }
}

pub fn walk_aggregate_call<V: AstVisitor + ?Sized>(visitor: &mut V, call: &AggregateCall) {
    if let Some(arg) = &call.argument {
        visitor.visit_expression(arg);
    }
}

pub fn walk_return_clause<V: AstVisitor + ?Sized>(visitor: &mut V, clause: &ReturnClause) {
    for item in clause.items() {
        visitor.visit_return_item(item);
    }
    for item in &clause.order_by {
        visitor.visit_order_by_item(item);
    }
}

pub fn walk_return_item<V: AstVisitor + ?Sized>(visitor: &mut V, item: &ReturnItem) {
    if let ReturnItem::Expression { expression, .. } = item {
        visitor.visit_expression(expression);
    }
}
