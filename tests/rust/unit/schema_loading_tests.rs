use std::io::Write;

use kustograph::graph_catalog::{EntityKind, GraphSchemaError, NameMatching, SchemaMapping};
use tempfile::NamedTempFile;

const YAML: &str = r#"
name: signins
entities:
  - id: users
    table: IdentityInfo
    kind: node
    key_column: AccountObjectId
    properties:
      name: AccountName
  - id: signins
    table: SigninLogs
    kind: edge
    source_column: UserId
    target_column: AppId
labels:
  User: [users]
relationship_types:
  SIGNED_IN: [signins]
"#;

fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_yaml_schema_file() {
    let file = write_temp(".yaml", YAML);
    let schema = SchemaMapping::from_file(file.path()).unwrap();
    assert_eq!(schema.name(), Some("signins"));
    assert_eq!(schema.labels().collect::<Vec<_>>(), vec!["User"]);
    assert_eq!(schema.entities_of_kind(EntityKind::Edge).count(), 1);
    assert_eq!(schema.fingerprint().len(), 64);
}

#[test]
fn test_json_and_yaml_documents_share_a_fingerprint() {
    let yaml = write_temp(".yml", YAML);
    let json = write_temp(
        ".json",
        r#"{
          "name": "signins",
          "entities": [
            {"id": "users", "table": "IdentityInfo", "kind": "node",
             "key_column": "AccountObjectId", "properties": {"name": "AccountName"}},
            {"id": "signins", "table": "SigninLogs", "kind": "edge",
             "source_column": "UserId", "target_column": "AppId"}
          ],
          "labels": {"User": ["users"]},
          "relationship_types": {"SIGNED_IN": ["signins"]}
        }"#,
    );
    let from_yaml = SchemaMapping::from_file(yaml.path()).unwrap();
    let from_json = SchemaMapping::from_file(json.path()).unwrap();
    assert_eq!(from_yaml.fingerprint(), from_json.fingerprint());
}

#[test]
fn test_dangling_label_reference_is_rejected() {
    let file = write_temp(".yaml", &YAML.replace("User: [users]", "User: [people]"));
    let err = SchemaMapping::from_file(file.path()).unwrap_err();
    assert!(matches!(err, GraphSchemaError::InvalidConfig { .. }));
    assert!(err.to_string().contains("people"));
}

#[test]
fn test_missing_file_is_read_error() {
    let err = SchemaMapping::from_file("/nonexistent/schema.yaml").unwrap_err();
    assert!(matches!(err, GraphSchemaError::ConfigReadError { .. }));
}

#[test]
fn test_case_insensitive_resolution_is_opt_in() {
    let schema = SchemaMapping::from_yaml_str(YAML).unwrap();
    assert!(schema.resolve_label("user").is_err());
    let resolution = schema
        .resolve_label_with("user", NameMatching::CaseInsensitiveFallback)
        .unwrap();
    assert!(!resolution.exact);
}
