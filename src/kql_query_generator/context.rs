//! Read-only facts shared by the clause translators.
//!
//! [`TranslationContext::build`] runs once per query, right after parsing and
//! validation. It resolves every label, relationship type and property the
//! query mentions against the schema mapping, so the clause translators below
//! never touch the schema with a fallible lookup of their own.

use std::collections::{BTreeSet, HashMap};

use crate::ast_visitor::{AstVisitor, BindingKind};
use crate::config::{MultiEntityPolicy, TranslatorConfig};
use crate::graph_catalog::{Entity, EntityKind, GraphSchemaError, NameMatching, SchemaMapping};
use crate::open_cypher_parser::ast::{
    Identifier, NodePattern, PathExpression, PathKind, Position, PropertyAccess, Query,
    RelationshipPattern,
};
use crate::query_translator::errors::{TranslationError, UnsupportedKind};
use crate::query_translator::options::PathOptions;

/// A variable bound by MATCH, named or generated.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// Candidate backing entities, in document order.
    pub entities: Vec<String>,
    /// Labels or relationship types as written in the pattern.
    pub names: Vec<String>,
    /// Bound only inside OPTIONAL MATCH parts.
    pub optional: bool,
    pub anonymous: bool,
    /// Relationship with a `*` length.
    pub variable_length: bool,
    /// Element names along the path, for path variables.
    pub path_elements: Vec<String>,
    pub position: Position,
}

/// Physical columns backing `var.key` over the variable's candidate entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    pub columns: Vec<String>,
    /// False if any column was found through the case-insensitive fallback.
    pub exact: bool,
}

#[derive(Debug)]
pub struct TranslationContext<'a> {
    schema: &'a SchemaMapping,
    config: &'a TranslatorConfig,
    bindings: Vec<Binding>,
    index: HashMap<String, usize>,
    /// Generated names of anonymous elements, keyed by source offset.
    generated: HashMap<usize, String>,
    properties: HashMap<(String, String), ResolvedProperty>,
    approximate_names: BTreeSet<String>,
    fallbacks: usize,
    capped_searches: usize,
}

impl<'a> TranslationContext<'a> {
    pub fn build(
        query: &Query,
        schema: &'a SchemaMapping,
        config: &'a TranslatorConfig,
        options: &PathOptions,
    ) -> Result<Self, TranslationError> {
        let mut ctx = TranslationContext {
            schema,
            config,
            bindings: Vec::new(),
            index: HashMap::new(),
            generated: HashMap::new(),
            properties: HashMap::new(),
            approximate_names: BTreeSet::new(),
            fallbacks: 0,
            capped_searches: 0,
        };

        if let Some(clause) = &query.match_clause {
            let (mut nodes, mut edges) = (0usize, 0usize);
            for (optional, path) in clause.patterns() {
                ctx.bind_path(path, optional, &mut nodes, &mut edges)?;
            }
        }

        let mut collector = PropertyCollector::default();
        if let Some(clause) = &query.where_clause {
            collector.visit_where_clause(clause);
        }
        collector.visit_return_clause(&query.return_clause);
        if let Some(predicate) = &options.enumeration.predicate {
            collector.visit_condition(predicate);
        }
        if let Some(clause) = &query.match_clause {
            for (_, path) in clause.patterns() {
                for node in path.nodes() {
                    let name = ctx.node_name(node);
                    for constraint in &node.properties {
                        collector.add(&name, &constraint.key, node.position);
                    }
                }
                for rel in path.relationships() {
                    let name = ctx.relationship_name(rel);
                    if path.kind != PathKind::Pattern
                        && rel.length.as_ref().is_some_and(|length| !length.is_bounded())
                    {
                        ctx.capped_searches += 1;
                    }
                    for constraint in &rel.properties {
                        collector.add(&name, &constraint.key, rel.position);
                    }
                    if path.kind == PathKind::ShortestPath {
                        if let Some(weight) = &options.weight_property {
                            collector.add(&name, weight, rel.position);
                        }
                    }
                }
            }
        }

        for (variable, key, position) in collector.references {
            ctx.resolve_reference(&variable, &key, position)?;
        }

        log::debug!(
            "Translation context: {} bindings, {} properties, {} approximations, {} fallbacks",
            ctx.bindings.len(),
            ctx.properties.len(),
            ctx.approximations(),
            ctx.fallbacks
        );
        Ok(ctx)
    }

    pub fn schema(&self) -> &'a SchemaMapping {
        self.schema
    }

    pub fn config(&self) -> &'a TranslatorConfig {
        self.config
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.index.get(name).map(|&i| &self.bindings[i])
    }

    pub fn require_binding(&self, identifier: &Identifier) -> Result<&Binding, TranslationError> {
        self.binding(&identifier.name)
            .ok_or_else(|| TranslationError::UnboundIdentifier {
                name: identifier.name.clone(),
                position: identifier.position,
            })
    }

    /// Name used for a node pattern in the emitted query.
    pub fn node_name(&self, node: &NodePattern) -> String {
        self.element_name(&node.variable, node.position, "_n")
    }

    pub fn relationship_name(&self, rel: &RelationshipPattern) -> String {
        self.element_name(&rel.variable, rel.position, "_e")
    }

    fn element_name(&self, variable: &Option<Identifier>, position: Position, prefix: &str) -> String {
        match variable {
            Some(id) => id.name.clone(),
            None => self
                .generated
                .get(&position.offset)
                .cloned()
                .unwrap_or_else(|| format!("{}{}", prefix, position.offset)),
        }
    }

    pub fn property(&self, variable: &str, key: &str) -> Result<&ResolvedProperty, TranslationError> {
        self.properties
            .get(&(variable.to_string(), key.to_string()))
            .ok_or_else(|| {
                TranslationError::TranslationAssembly(format!(
                    "property {}.{} was not resolved before clause translation",
                    variable, key
                ))
            })
    }

    pub fn entities_of(&self, binding: &Binding) -> Vec<&'a Entity> {
        binding
            .entities
            .iter()
            .filter_map(|id| self.schema.entity(id).ok())
            .collect()
    }

    /// Labels or types that resolved to several entities under the union policy.
    pub fn approximations(&self) -> usize {
        self.approximate_names.len()
    }

    /// Open-ended shortest-path relationships searched only up to `max_path_depth`.
    pub fn capped_searches(&self) -> usize {
        self.capped_searches
    }

    /// Names and properties that only resolved through the case-insensitive fallback.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    fn matching(&self) -> NameMatching {
        if self.config.case_insensitive_schema_fallback {
            NameMatching::CaseInsensitiveFallback
        } else {
            NameMatching::Exact
        }
    }

    fn bind_path(
        &mut self,
        path: &PathExpression,
        optional: bool,
        nodes: &mut usize,
        edges: &mut usize,
    ) -> Result<(), TranslationError> {
        let mut elements = Vec::new();

        elements.push(self.bind_node(&path.start, optional, nodes)?);
        for step in &path.steps {
            elements.push(self.bind_relationship(&step.relationship, optional, edges)?);
            elements.push(self.bind_node(&step.node, optional, nodes)?);
        }

        if let Some(variable) = &path.variable {
            self.insert(Binding {
                name: variable.name.clone(),
                kind: BindingKind::Path,
                entities: Vec::new(),
                names: Vec::new(),
                optional,
                anonymous: false,
                variable_length: path.has_variable_length(),
                path_elements: elements,
                position: variable.position,
            });
        }
        Ok(())
    }

    fn bind_node(
        &mut self,
        node: &NodePattern,
        optional: bool,
        counter: &mut usize,
    ) -> Result<String, TranslationError> {
        let candidates = self.node_candidates(&node.labels)?;
        let names = canonical_names(&node.labels, self.schema.labels());
        let name = self.name_element(&node.variable, node.position, "_n", counter);
        self.merge_or_insert(Binding {
            name: name.clone(),
            kind: BindingKind::Node,
            entities: candidates,
            names,
            optional,
            anonymous: node.variable.is_none(),
            variable_length: false,
            path_elements: Vec::new(),
            position: node.position,
        })?;
        Ok(name)
    }

    fn bind_relationship(
        &mut self,
        rel: &RelationshipPattern,
        optional: bool,
        counter: &mut usize,
    ) -> Result<String, TranslationError> {
        let candidates = self.relationship_candidates(&rel.types)?;
        let names = canonical_names(&rel.types, self.schema.relationship_types());
        let name = self.name_element(&rel.variable, rel.position, "_e", counter);
        self.merge_or_insert(Binding {
            name: name.clone(),
            kind: BindingKind::Relationship,
            entities: candidates,
            names,
            optional,
            anonymous: rel.variable.is_none(),
            variable_length: rel.length.is_some(),
            path_elements: Vec::new(),
            position: rel.position,
        })?;
        Ok(name)
    }

    fn name_element(
        &mut self,
        variable: &Option<Identifier>,
        position: Position,
        prefix: &str,
        counter: &mut usize,
    ) -> String {
        match variable {
            Some(id) => id.name.clone(),
            None => {
                let name = format!("{}{}", prefix, counter);
                *counter += 1;
                self.generated.insert(position.offset, name.clone());
                name
            }
        }
    }

    fn node_candidates(&mut self, labels: &[String]) -> Result<Vec<String>, TranslationError> {
        if labels.is_empty() {
            return Ok(self
                .schema
                .entities_of_kind(EntityKind::Node)
                .map(|e| e.id.clone())
                .collect());
        }

        let mut candidates: Option<Vec<String>> = None;
        for label in labels {
            let resolution = self.schema.resolve_label_with(label, self.matching())?;
            self.note_resolution(label, resolution.entities.len(), resolution.exact);
            candidates = Some(match candidates {
                None => resolution.entities,
                Some(previous) => previous
                    .into_iter()
                    .filter(|id| resolution.entities.contains(id))
                    .collect(),
            });
        }

        let candidates = candidates.unwrap_or_default();
        if candidates.is_empty() {
            return Err(TranslationError::unsupported(
                UnsupportedKind::Pattern,
                format!("no backing entity carries all of the labels {}", labels.join(", ")),
            ));
        }
        Ok(candidates)
    }

    fn relationship_candidates(&mut self, types: &[String]) -> Result<Vec<String>, TranslationError> {
        if types.is_empty() {
            return Ok(self
                .schema
                .entities_of_kind(EntityKind::Edge)
                .map(|e| e.id.clone())
                .collect());
        }

        let mut candidates: Vec<String> = Vec::new();
        for rel_type in types {
            let resolution = self
                .schema
                .resolve_relationship_type_with(rel_type, self.matching())?;
            self.note_resolution(rel_type, resolution.entities.len(), resolution.exact);
            for id in resolution.entities {
                if !candidates.contains(&id) {
                    candidates.push(id);
                }
            }
        }
        Ok(candidates)
    }

    fn note_resolution(&mut self, name: &str, entity_count: usize, exact: bool) {
        if entity_count > 1 && self.config.multi_entity_policy == MultiEntityPolicy::Union {
            self.approximate_names.insert(name.to_string());
        }
        if !exact {
            self.fallbacks += 1;
        }
    }

    fn insert(&mut self, binding: Binding) {
        self.index.insert(binding.name.clone(), self.bindings.len());
        self.bindings.push(binding);
    }

    /// A variable repeated across patterns narrows to the entities both
    /// occurrences allow. It is required if any occurrence is required.
    fn merge_or_insert(&mut self, binding: Binding) -> Result<(), TranslationError> {
        let Some(i) = self.index.get(&binding.name).copied() else {
            self.insert(binding);
            return Ok(());
        };
        let existing = &mut self.bindings[i];
        if existing.kind != binding.kind {
            return Err(TranslationError::unsupported(
                UnsupportedKind::ConflictingBinding,
                format!(
                    "`{}` is bound as both a {:?} and a {:?}",
                    binding.name, existing.kind, binding.kind
                ),
            ));
        }
        existing.entities.retain(|id| binding.entities.contains(id));
        if existing.entities.is_empty() {
            return Err(TranslationError::unsupported(
                UnsupportedKind::Pattern,
                format!("no backing entity satisfies every pattern that binds `{}`", binding.name),
            ));
        }
        for name in binding.names {
            if !existing.names.contains(&name) {
                existing.names.push(name);
            }
        }
        existing.optional &= binding.optional;
        existing.variable_length |= binding.variable_length;
        Ok(())
    }

    fn resolve_reference(
        &mut self,
        variable: &str,
        key: &str,
        position: Position,
    ) -> Result<(), TranslationError> {
        let cache_key = (variable.to_string(), key.to_string());
        if self.properties.contains_key(&cache_key) {
            return Ok(());
        }
        let binding = self
            .binding(variable)
            .ok_or_else(|| TranslationError::UnboundIdentifier {
                name: variable.to_string(),
                position,
            })?;
        if binding.kind == BindingKind::Path {
            return Err(TranslationError::unsupported(
                UnsupportedKind::Pattern,
                format!("property access `{}.{}` on a path variable", variable, key),
            ));
        }

        let matching = self.matching();
        let join = self.config.multi_entity_policy == MultiEntityPolicy::Join;
        let mut resolved = ResolvedProperty {
            columns: Vec::new(),
            exact: true,
        };
        let mut available = BTreeSet::new();
        for entity_id in &binding.entities {
            match self.schema.resolve_property_with(entity_id, key, matching) {
                Ok(found) => {
                    resolved.exact &= found.exact;
                    if !resolved.columns.contains(&found.physical) {
                        resolved.columns.push(found.physical);
                    }
                    if join {
                        break;
                    }
                }
                Err(GraphSchemaError::UnresolvedProperty { available: names, .. }) => {
                    available.extend(names);
                }
                Err(other) => return Err(other.into()),
            }
        }

        if resolved.columns.is_empty() {
            return Err(GraphSchemaError::UnresolvedProperty {
                entity: binding.entities.join("|"),
                property: key.to_string(),
                available: available.into_iter().collect(),
            }
            .into());
        }
        if !resolved.exact {
            self.fallbacks += 1;
        }
        self.properties.insert(cache_key, resolved);
        Ok(())
    }
}

/// Mapped spelling of each written name; they differ only under the
/// case-insensitive fallback.
fn canonical_names<'s>(written: &[String], mapped: impl Iterator<Item = &'s str>) -> Vec<String> {
    let mapped: Vec<&str> = mapped.collect();
    written
        .iter()
        .map(|name| {
            mapped
                .iter()
                .find(|m| **m == name.as_str())
                .or_else(|| mapped.iter().find(|m| m.eq_ignore_ascii_case(name)))
                .map(|m| m.to_string())
                .unwrap_or_else(|| name.clone())
        })
        .collect()
}

/// Collects every `var.key` reference in conditions and projections.
#[derive(Default)]
struct PropertyCollector {
    references: Vec<(String, String, Position)>,
}

impl PropertyCollector {
    fn add(&mut self, variable: &str, key: &str, position: Position) {
        self.references
            .push((variable.to_string(), key.to_string(), position));
    }
}

impl AstVisitor for PropertyCollector {
    fn visit_property_access(&mut self, property: &PropertyAccess) {
        self.add(&property.variable.name, &property.key, property.variable.position);
    }
}
