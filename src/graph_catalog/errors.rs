//! # Graph Schema Error Types
//!
//! Errors raised while loading a schema mapping document and while resolving
//! graph names (labels, relationship types, properties) against it.
//!
//! Resolution errors always list the names that *are* mapped so the caller can
//! report an actionable message instead of a bare "not found".

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphSchemaError {
    #[error("No schema mapping for label `{label}`; mapped labels: {}", .available.join(", "))]
    UnresolvedLabel {
        label: String,
        available: Vec<String>,
    },
    #[error("No schema mapping for relationship type `{rel_type}`; mapped types: {}", .available.join(", "))]
    UnresolvedRelationshipType {
        rel_type: String,
        available: Vec<String>,
    },
    #[error("No label or relationship type named `{name}`; mapped names: {}", .available.join(", "))]
    UnresolvedName {
        name: String,
        available: Vec<String>,
    },
    #[error("Property `{property}` is not mapped on entity `{entity}`; mapped properties: {}", .available.join(", "))]
    UnresolvedProperty {
        entity: String,
        property: String,
        available: Vec<String>,
    },
    #[error("Unknown entity `{entity}`")]
    UnknownEntity { entity: String },
    #[error("Failed to read configuration file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse configuration: {error}")]
    ConfigParseError { error: String },
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl GraphSchemaError {
    /// Mapped alternatives carried by a resolution error, empty otherwise.
    pub fn alternatives(&self) -> &[String] {
        match self {
            GraphSchemaError::UnresolvedLabel { available, .. }
            | GraphSchemaError::UnresolvedRelationshipType { available, .. }
            | GraphSchemaError::UnresolvedName { available, .. }
            | GraphSchemaError::UnresolvedProperty { available, .. } => available,
            _ => &[],
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GraphSchemaError::InvalidConfig {
            message: message.into(),
        }
    }
}
