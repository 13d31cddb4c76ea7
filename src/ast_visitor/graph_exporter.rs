use std::fmt::Write;

use super::AstVisitor;
use crate::open_cypher_parser::ast::{
    Condition, Expression, MatchClause, MatchPart, NodePattern, OrderByItem, PathExpression,
    Query, RelationshipPattern, ReturnClause, ReturnItem, WhereClause,
};

/// Renders a query AST as a Graphviz DOT digraph, one vertex per AST node.
///
/// Useful when debugging the parser: `dot -Tsvg` on the output shows the
/// tree shape directly.
#[derive(Default)]
pub struct GraphExporter {
    out: String,
    next_id: usize,
    parents: Vec<usize>,
}

impl GraphExporter {
    pub fn export(query: &Query) -> String {
        let mut exporter = GraphExporter::default();
        exporter.out.push_str("digraph query {\n  node [shape=box];\n");
        exporter.visit_query(query);
        exporter.out.push_str("}\n");
        exporter.out
    }

    /// Emit a vertex linked to the current parent and return its id.
    fn vertex(&mut self, label: &str) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        let escaped = label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n");
        // writing into a String cannot fail
        let _ = writeln!(self.out, "  n{} [label=\"{}\"];", id, escaped);
        if let Some(parent) = self.parents.last() {
            let _ = writeln!(self.out, "  n{} -> n{};", parent, id);
        }
        id
    }

    fn with_children(&mut self, label: &str, children: impl FnOnce(&mut Self)) {
        let id = self.vertex(label);
        self.parents.push(id);
        children(self);
        self.parents.pop();
    }
}

fn condition_label(condition: &Condition) -> String {
    match condition {
        Condition::Comparison(c) => format!("{}", c.operator),
        Condition::And(_, _) => "AND".to_string(),
        Condition::Or(_, _) => "OR".to_string(),
        Condition::Not(_) => "NOT".to_string(),
        Condition::IsNull { negated: false, .. } => "IS NULL".to_string(),
        Condition::IsNull { negated: true, .. } => "IS NOT NULL".to_string(),
        Condition::Predicate(_) => "predicate".to_string(),
    }
}

impl AstVisitor for GraphExporter {
    fn visit_query(&mut self, query: &Query) {
        self.with_children("Query", |this| super::walk_query(this, query));
    }

    fn visit_match_clause(&mut self, clause: &MatchClause) {
        self.with_children("MATCH", |this| super::walk_match_clause(this, clause));
    }

    fn visit_match_part(&mut self, part: &MatchPart) {
        let label = if part.optional { "OPTIONAL part" } else { "part" };
        self.with_children(label, |this| super::walk_match_part(this, part));
    }

    fn visit_path_expression(&mut self, path: &PathExpression) {
        let mut label = format!("{:?}", path.kind);
        if let Some(variable) = &path.variable {
            label = format!("{} = {}", variable.name, label);
        }
        self.with_children(&label, |this| super::walk_path_expression(this, path));
    }

    fn visit_node_pattern(&mut self, node: &NodePattern) {
        let mut label = String::from("(");
        if let Some(variable) = &node.variable {
            label.push_str(&variable.name);
        }
        for l in &node.labels {
            label.push(':');
            label.push_str(l);
        }
        label.push(')');
        for constraint in &node.properties {
            label.push_str(&format!("\n{} = {}", constraint.key, constraint.value));
        }
        self.vertex(&label);
    }

    fn visit_relationship_pattern(&mut self, relationship: &RelationshipPattern) {
        let mut label = format!("[{:?}", relationship.direction);
        if let Some(variable) = &relationship.variable {
            label.push(' ');
            label.push_str(&variable.name);
        }
        if !relationship.types.is_empty() {
            label.push(':');
            label.push_str(&relationship.types.join("|"));
        }
        if let Some(length) = relationship.length {
            label.push_str(&length.to_string());
        }
        label.push(']');
        self.vertex(&label);
    }

    fn visit_where_clause(&mut self, clause: &WhereClause) {
        self.with_children("WHERE", |this| super::walk_where_clause(this, clause));
    }

    fn visit_condition(&mut self, condition: &Condition) {
        let label = condition_label(condition);
        self.with_children(&label, |this| super::walk_condition(this, condition));
    }

    fn visit_expression(&mut self, expression: &Expression) {
        self.vertex(&expression.to_string());
    }

    fn visit_return_clause(&mut self, clause: &ReturnClause) {
        let mut label = String::from("RETURN");
        if clause.distinct {
            label.push_str(" DISTINCT");
        }
        if let Some(skip) = clause.skip {
            label.push_str(&format!("\nSKIP {}", skip));
        }
        if let Some(limit) = clause.limit {
            label.push_str(&format!("\nLIMIT {}", limit));
        }
        self.with_children(&label, |this| super::walk_return_clause(this, clause));
    }

    fn visit_return_item(&mut self, item: &ReturnItem) {
        match item {
            ReturnItem::Wildcard(_) => {
                self.vertex("*");
            }
            ReturnItem::Expression {
                expression,
                alias: Some(alias),
            } => {
                self.vertex(&format!("{} AS {}", expression, alias.name));
            }
            ReturnItem::Expression { expression, .. } => self.visit_expression(expression),
        }
    }

    fn visit_order_by_item(&mut self, item: &OrderByItem) {
        self.vertex(&format!("ORDER BY {} {:?}", item.expression, item.order));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_cypher_parser::parse_query;

    #[test]
    fn test_export_contains_every_clause() {
        let query = parse_query(
            "MATCH (a:User)-[r:KNOWS*1..2]->(b) WHERE a.name = \"x\" RETURN b.name AS n ORDER BY n DESC LIMIT 5",
        )
        .unwrap();
        let dot = GraphExporter::export(&query);
        assert!(dot.starts_with("digraph query {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("label=\"(a:User)\""));
        assert!(dot.contains("label=\"[Outgoing r:KNOWS*1..2]\""));
        assert!(dot.contains("label=\"=\""));
        assert!(dot.contains("label=\"a.name\""));
        assert!(dot.contains("label=\"b.name AS n\""));
        assert!(dot.contains("label=\"ORDER BY n Desc\""));
        assert!(dot.contains("n0 -> n1;"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let query = parse_query("MATCH (a) WHERE a.name = 'say \"hi\"' RETURN a").unwrap();
        let dot = GraphExporter::export(&query);
        assert!(dot.contains("\\\"hi\\\""));
    }
}
