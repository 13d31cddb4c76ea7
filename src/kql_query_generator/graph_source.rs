//! `let` bindings that turn the backing tables into a graph.
//!
//! Every node entity a query can touch is projected onto the shared shape
//! `NodeId: string, NodeLabels: dynamic` (plus its own columns), every edge
//! entity onto `SourceId, TargetId, EdgeTypes`. `make-graph` then joins the
//! two on `NodeId`.

use super::common::{quote_identifier, string_array};
use super::context::TranslationContext;
use super::pattern_translator::node_key;
use crate::ast_visitor::BindingKind;
use crate::config::MultiEntityPolicy;
use crate::graph_catalog::{Entity, EntityKeys};
use crate::query_translator::errors::TranslationError;

pub const NODES: &str = "Nodes";
pub const EDGES: &str = "Edges";

/// Builds the graph from the `Edges` and `Nodes` bindings.
pub const MAKE_GRAPH: &str = "| make-graph SourceId --> TargetId with Nodes on NodeId";

#[derive(Debug, Clone, PartialEq)]
enum NodeSource<'a> {
    Table(&'a Entity),
    /// Entities behind one label under the join policy.
    Joined(Vec<&'a Entity>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphSource {
    pub nodes: String,
    pub edges: String,
}

impl GraphSource {
    pub fn build(ctx: &TranslationContext<'_>) -> Result<Self, TranslationError> {
        let sources = node_sources(ctx);
        let nodes = match sources.len() {
            0 => "datatable(NodeId: string, NodeLabels: dynamic)[]".to_string(),
            1 => render_node_source(&sources[0], ctx)?,
            _ => union(
                sources
                    .iter()
                    .map(|source| render_node_source(source, ctx))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let mut edge_entities: Vec<&Entity> = Vec::new();
        for binding in ctx.bindings() {
            if binding.kind != BindingKind::Relationship {
                continue;
            }
            for entity in ctx.entities_of(binding) {
                if !edge_entities.iter().any(|e| e.id == entity.id) {
                    edge_entities.push(entity);
                }
            }
        }
        let edges = match edge_entities.len() {
            0 => "datatable(SourceId: string, TargetId: string, EdgeTypes: dynamic)[]".to_string(),
            1 => render_edge(edge_entities[0], ctx)?,
            _ => union(
                edge_entities
                    .iter()
                    .map(|entity| render_edge(entity, ctx))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        log::debug!(
            "Graph source: {} node sources, {} edge entities",
            sources.len(),
            edge_entities.len()
        );
        Ok(GraphSource { nodes, edges })
    }

    /// `let` bindings followed by the `make-graph` pipeline head.
    pub fn prelude(&self) -> String {
        format!("{}\n{}\n{}", self.statements(), EDGES, MAKE_GRAPH)
    }

    /// The two `let` statements, each on its own line.
    pub fn statements(&self) -> String {
        format!(
            "let {} = {};\nlet {} = {};",
            NODES, self.nodes, EDGES, self.edges
        )
    }
}

fn node_sources<'a>(ctx: &TranslationContext<'a>) -> Vec<NodeSource<'a>> {
    let join = ctx.config().multi_entity_policy == MultiEntityPolicy::Join;
    let mut sources: Vec<NodeSource<'a>> = Vec::new();
    let mut grouped: Vec<&str> = Vec::new();

    let node_bindings = ctx
        .bindings()
        .iter()
        .filter(|b| b.kind == BindingKind::Node);

    if join {
        for binding in node_bindings.clone() {
            let entities = ctx.entities_of(binding);
            if binding.names.is_empty() || entities.len() < 2 {
                continue;
            }
            let group = NodeSource::Joined(entities.clone());
            if !sources.contains(&group) {
                grouped.extend(entities.iter().map(|e| e.id.as_str()));
                sources.push(group);
            }
        }
    }

    for binding in node_bindings {
        for entity in ctx.entities_of(binding) {
            if grouped.contains(&entity.id.as_str()) {
                continue;
            }
            let source = NodeSource::Table(entity);
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
    }
    sources
}

fn node_id(entity: &Entity) -> Result<String, TranslationError> {
    Ok(format!(
        "{} | extend NodeId = tostring({})",
        quote_identifier(&entity.table),
        quote_identifier(node_key(entity)?)
    ))
}

fn render_node_source(source: &NodeSource<'_>, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    let schema = ctx.schema();
    match source {
        NodeSource::Table(entity) => Ok(format!(
            "{}, NodeLabels = {}",
            node_id(entity)?,
            string_array(&schema.labels_of(&entity.id))
        )),
        NodeSource::Joined(entities) => {
            let mut out = node_id(entities[0])?;
            for entity in &entities[1..] {
                out.push_str(&format!(" | join kind=inner ({}) on NodeId", node_id(entity)?));
            }
            // labels every member carries
            let common: Vec<&str> = schema
                .labels_of(&entities[0].id)
                .into_iter()
                .filter(|label| {
                    entities[1..]
                        .iter()
                        .all(|e| schema.labels_of(&e.id).contains(label))
                })
                .collect();
            out.push_str(&format!(" | extend NodeLabels = {}", string_array(&common)));
            Ok(out)
        }
    }
}

fn render_edge(entity: &Entity, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    let EntityKeys::Edge {
        source_column,
        target_column,
    } = &entity.keys
    else {
        return Err(TranslationError::TranslationAssembly(format!(
            "entity `{}` is a node where an edge was expected",
            entity.id
        )));
    };
    Ok(format!(
        "{} | extend SourceId = tostring({}), TargetId = tostring({}), EdgeTypes = {}",
        quote_identifier(&entity.table),
        quote_identifier(source_column),
        quote_identifier(target_column),
        string_array(&ctx.schema().relationship_types_of(&entity.id))
    ))
}

fn union(parts: Vec<String>) -> String {
    let body = parts
        .iter()
        .map(|part| format!("    ({})", part))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("union\n{}", body)
}
