use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::config::{EntityDefinition, EntityKind, SchemaMappingConfig};
use super::errors::GraphSchemaError;

/// How a graph name is compared against the mapped names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatching {
    #[default]
    Exact,
    /// Exact first, then a unique case-insensitive match.
    CaseInsensitiveFallback,
}

/// Identity columns of an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EntityKeys {
    Node { key_column: String },
    Edge {
        source_column: String,
        target_column: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: String,
    pub table: String,
    pub keys: EntityKeys,
    pub properties: BTreeMap<String, String>,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self.keys {
            EntityKeys::Node { .. } => EntityKind::Node,
            EntityKeys::Edge { .. } => EntityKind::Edge,
        }
    }

    pub fn is_node(&self) -> bool {
        self.kind() == EntityKind::Node
    }

    fn from_definition(def: &EntityDefinition) -> Result<Self, GraphSchemaError> {
        let missing = |column: &str| {
            GraphSchemaError::invalid(format!("Entity '{}' is missing {}", def.id, column))
        };
        let keys = match def.kind {
            EntityKind::Node => EntityKeys::Node {
                key_column: def.key_column.clone().ok_or_else(|| missing("key_column"))?,
            },
            EntityKind::Edge => EntityKeys::Edge {
                source_column: def
                    .source_column
                    .clone()
                    .ok_or_else(|| missing("source_column"))?,
                target_column: def
                    .target_column
                    .clone()
                    .ok_or_else(|| missing("target_column"))?,
            },
        };
        Ok(Entity {
            id: def.id.clone(),
            table: def.table.clone(),
            keys,
            properties: def.properties.clone(),
        })
    }
}

/// Outcome of resolving a label or relationship type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Entity ids in document order.
    pub entities: Vec<String>,
    /// False when the name only matched through the case-insensitive fallback.
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyResolution {
    pub physical: String,
    pub exact: bool,
}

/// Read-only view of a validated [`SchemaMappingConfig`].
///
/// Built once at startup and shared through `Arc`; every lookup is a pure
/// read, so the mapping is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    name: Option<String>,
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    labels: BTreeMap<String, Vec<String>>,
    relationship_types: BTreeMap<String, Vec<String>>,
    fingerprint: String,
}

impl SchemaMapping {
    pub fn from_config(config: SchemaMappingConfig) -> Result<Self, GraphSchemaError> {
        config.validate()?;

        // serde_json with BTreeMaps gives a stable byte representation
        let canonical = serde_json::to_vec(&config)
            .map_err(|e| GraphSchemaError::invalid(format!("cannot serialize schema: {}", e)))?;
        let fingerprint = hex::encode(Sha256::digest(&canonical));

        let entities = config
            .entities
            .iter()
            .map(Entity::from_definition)
            .collect::<Result<Vec<_>, _>>()?;
        let index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        log::info!(
            "Loaded schema mapping {:?}: {} entities, {} labels, {} relationship types",
            config.name,
            entities.len(),
            config.labels.len(),
            config.relationship_types.len()
        );

        Ok(SchemaMapping {
            name: config.name,
            entities,
            index,
            labels: config.labels,
            relationship_types: config.relationship_types,
            fingerprint,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphSchemaError> {
        Self::from_config(SchemaMappingConfig::from_file(path)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, GraphSchemaError> {
        Self::from_config(SchemaMappingConfig::from_yaml_str(yaml)?)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// SHA-256 of the canonical document, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: &str) -> Result<&Entity, GraphSchemaError> {
        self.index
            .get(id)
            .map(|&i| &self.entities[i])
            .ok_or_else(|| GraphSchemaError::UnknownEntity {
                entity: id.to_string(),
            })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn relationship_types(&self) -> impl Iterator<Item = &str> {
        self.relationship_types.keys().map(String::as_str)
    }

    /// Labels whose mapping includes `entity_id`, sorted.
    pub fn labels_of(&self, entity_id: &str) -> Vec<&str> {
        names_containing(&self.labels, entity_id)
    }

    /// Relationship types whose mapping includes `entity_id`, sorted.
    pub fn relationship_types_of(&self, entity_id: &str) -> Vec<&str> {
        names_containing(&self.relationship_types, entity_id)
    }

    pub fn resolve_label(&self, label: &str) -> Result<Resolution, GraphSchemaError> {
        self.resolve_label_with(label, NameMatching::Exact)
    }

    pub fn resolve_label_with(
        &self,
        label: &str,
        matching: NameMatching,
    ) -> Result<Resolution, GraphSchemaError> {
        lookup(&self.labels, label, matching).ok_or_else(|| GraphSchemaError::UnresolvedLabel {
            label: label.to_string(),
            available: self.labels.keys().cloned().collect(),
        })
    }

    pub fn resolve_relationship_type(&self, rel_type: &str) -> Result<Resolution, GraphSchemaError> {
        self.resolve_relationship_type_with(rel_type, NameMatching::Exact)
    }

    pub fn resolve_relationship_type_with(
        &self,
        rel_type: &str,
        matching: NameMatching,
    ) -> Result<Resolution, GraphSchemaError> {
        lookup(&self.relationship_types, rel_type, matching).ok_or_else(|| {
            GraphSchemaError::UnresolvedRelationshipType {
                rel_type: rel_type.to_string(),
                available: self.relationship_types.keys().cloned().collect(),
            }
        })
    }

    /// Resolve a name that may be either a label or a relationship type;
    /// labels win when both exist.
    pub fn resolve(&self, name: &str) -> Result<Resolution, GraphSchemaError> {
        self.resolve_label(name)
            .or_else(|_| self.resolve_relationship_type(name))
            .map_err(|_| GraphSchemaError::UnresolvedName {
                name: name.to_string(),
                available: self
                    .labels
                    .keys()
                    .chain(self.relationship_types.keys())
                    .cloned()
                    .collect(),
            })
    }

    pub fn resolve_property(
        &self,
        entity_id: &str,
        logical: &str,
    ) -> Result<String, GraphSchemaError> {
        self.resolve_property_with(entity_id, logical, NameMatching::Exact)
            .map(|r| r.physical)
    }

    pub fn resolve_property_with(
        &self,
        entity_id: &str,
        logical: &str,
        matching: NameMatching,
    ) -> Result<PropertyResolution, GraphSchemaError> {
        let entity = self.entity(entity_id)?;
        if let Some(physical) = entity.properties.get(logical) {
            return Ok(PropertyResolution {
                physical: physical.clone(),
                exact: true,
            });
        }
        if matching == NameMatching::CaseInsensitiveFallback {
            let mut candidates = entity
                .properties
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(logical));
            if let (Some((_, physical)), None) = (candidates.next(), candidates.next()) {
                log::debug!(
                    "Property '{}' on '{}' resolved case-insensitively",
                    logical,
                    entity_id
                );
                return Ok(PropertyResolution {
                    physical: physical.clone(),
                    exact: false,
                });
            }
        }
        Err(GraphSchemaError::UnresolvedProperty {
            entity: entity_id.to_string(),
            property: logical.to_string(),
            available: entity.properties.keys().cloned().collect(),
        })
    }

    /// Entities of `kind` that map the logical property, in document order.
    /// Used for variables that carry no label.
    pub fn entities_with_property(&self, kind: EntityKind, logical: &str) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| e.kind() == kind && e.properties.contains_key(logical))
            .collect()
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind() == kind)
    }
}

fn lookup(
    names: &BTreeMap<String, Vec<String>>,
    name: &str,
    matching: NameMatching,
) -> Option<Resolution> {
    if let Some(ids) = names.get(name) {
        return Some(Resolution {
            entities: ids.clone(),
            exact: true,
        });
    }
    if matching == NameMatching::Exact {
        return None;
    }
    let mut candidates = names.iter().filter(|(k, _)| k.eq_ignore_ascii_case(name));
    match (candidates.next(), candidates.next()) {
        (Some((matched, ids)), None) => {
            log::debug!("'{}' resolved case-insensitively to '{}'", name, matched);
            Some(Resolution {
                entities: ids.clone(),
                exact: false,
            })
        }
        // ambiguous or absent
        _ => None,
    }
}

fn names_containing<'a>(names: &'a BTreeMap<String, Vec<String>>, entity_id: &str) -> Vec<&'a str> {
    names
        .iter()
        .filter(|(_, ids)| ids.iter().any(|id| id == entity_id))
        .map(|(name, _)| name.as_str())
        .collect()
}
