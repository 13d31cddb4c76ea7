//! Schema mapping document.
//!
//! Maps the graph vocabulary used in queries onto backing tables. Documents
//! are YAML or JSON with the following structure:
//!
//! ```yaml
//! name: security_graph
//! entities:
//!   - id: users
//!     table: IdentityInfo
//!     kind: node
//!     key_column: AccountObjectId
//!     properties:
//!       name: AccountName
//!       age: Age
//!   - id: logons
//!     table: DeviceLogonEvents
//!     kind: edge
//!     source_column: AccountObjectId
//!     target_column: DeviceId
//!     properties:
//!       time: Timestamp
//! labels:
//!   User: [users]
//! relationship_types:
//!   LOGGED_ON: [logons]
//! ```
//!
//! A label or relationship type may list several entities; resolution returns
//! them in the listed order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use super::errors::GraphSchemaError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaMappingConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub entities: Vec<EntityDefinition>,
    #[serde(default)]
    pub labels: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub relationship_types: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Edge,
}

/// One backing table viewed either as a set of nodes or a set of edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDefinition {
    pub id: String,
    pub table: String,
    pub kind: EntityKind,
    /// Node identity column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
    /// Logical property name -> physical column.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl SchemaMappingConfig {
    /// Load a document, choosing the format from the file extension
    /// (`.json` is JSON, anything else YAML).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphSchemaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| GraphSchemaError::ConfigReadError {
            error: format!("{}: {}", path.display(), e),
        })?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, GraphSchemaError> {
        serde_yaml::from_str(yaml).map_err(|e| GraphSchemaError::ConfigParseError {
            error: e.to_string(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, GraphSchemaError> {
        serde_json::from_str(json).map_err(|e| GraphSchemaError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Structural validation: unique entity ids, identity columns present,
    /// and every label / relationship type pointing at existing entities of
    /// the right kind.
    pub fn validate(&self) -> Result<(), GraphSchemaError> {
        if self.entities.is_empty() {
            return Err(GraphSchemaError::invalid(
                "Schema must contain at least one entity definition",
            ));
        }

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.id.as_str()) {
                return Err(GraphSchemaError::invalid(format!(
                    "Duplicate entity id: {}",
                    entity.id
                )));
            }
            if entity.table.trim().is_empty() {
                return Err(GraphSchemaError::invalid(format!(
                    "Entity '{}' has an empty table name",
                    entity.id
                )));
            }
            match entity.kind {
                EntityKind::Node if entity.key_column.is_none() => {
                    return Err(GraphSchemaError::invalid(format!(
                        "Node entity '{}' must declare key_column",
                        entity.id
                    )));
                }
                EntityKind::Edge
                    if entity.source_column.is_none() || entity.target_column.is_none() =>
                {
                    return Err(GraphSchemaError::invalid(format!(
                        "Edge entity '{}' must declare source_column and target_column",
                        entity.id
                    )));
                }
                _ => {}
            }
        }

        self.validate_references(&self.labels, EntityKind::Node, "Label")?;
        self.validate_references(&self.relationship_types, EntityKind::Edge, "Relationship type")?;
        Ok(())
    }

    fn validate_references(
        &self,
        names: &BTreeMap<String, Vec<String>>,
        expected: EntityKind,
        what: &str,
    ) -> Result<(), GraphSchemaError> {
        for (name, ids) in names {
            if ids.is_empty() {
                return Err(GraphSchemaError::invalid(format!(
                    "{} '{}' maps to no entities",
                    what, name
                )));
            }
            for id in ids {
                match self.entities.iter().find(|e| &e.id == id) {
                    None => {
                        return Err(GraphSchemaError::invalid(format!(
                            "{} '{}' references unknown entity '{}'",
                            what, name, id
                        )))
                    }
                    Some(entity) if entity.kind != expected => {
                        return Err(GraphSchemaError::invalid(format!(
                            "{} '{}' references entity '{}' of the wrong kind",
                            what, name, id
                        )))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}
