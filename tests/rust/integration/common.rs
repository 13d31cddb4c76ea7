use std::sync::Arc;

use kustograph::{SchemaMapping, Translator, TranslatorConfig};

pub const SECURITY_SCHEMA: &str = r#"
name: security_graph
entities:
  - id: accounts
    table: IdentityInfo
    kind: node
    key_column: AccountObjectId
    properties:
      name: AccountName
      age: Age
      department: Department
  - id: devices
    table: DeviceInfo
    kind: node
    key_column: DeviceId
    properties:
      name: DeviceName
      os: OSPlatform
  - id: service_principals
    table: AADServicePrincipals
    kind: node
    key_column: ServicePrincipalId
    properties:
      name: DisplayName
  - id: logons
    table: DeviceLogonEvents
    kind: edge
    source_column: AccountObjectId
    target_column: DeviceId
    properties:
      time: Timestamp
      type: LogonType
  - id: knows
    table: IdentityGraph
    kind: edge
    source_column: SourceId
    target_column: TargetId
    properties:
      since: Since
      weight: Weight
labels:
  User: [accounts]
  Device: [devices]
  Principal: [accounts, service_principals]
relationship_types:
  LOGGED_ON: [logons]
  KNOWS: [knows]
"#;

pub fn security_schema() -> SchemaMapping {
    SchemaMapping::from_yaml_str(SECURITY_SCHEMA).expect("fixture schema is valid")
}

pub fn translator() -> Translator {
    translator_with(TranslatorConfig::default())
}

pub fn translator_with(config: TranslatorConfig) -> Translator {
    Translator::new(Arc::new(security_schema()), config)
}
