pub mod config;
pub mod errors;
pub mod schema_mapping;

pub use config::{EntityDefinition, EntityKind, SchemaMappingConfig};
pub use errors::GraphSchemaError;
pub use schema_mapping::{
    Entity, EntityKeys, NameMatching, PropertyResolution, Resolution, SchemaMapping,
};
