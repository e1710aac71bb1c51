use pretty_assertions::assert_eq;
use wattgrid_core_types::Role;
use wattgrid_permission_catalog::{
    load_catalog_from_path, parse_catalog_str, ConfigError, Permission, PermissionCatalog,
};

const YAML_CATALOG: &str = r#"
version: 3
roles:
  prosumer:
    - action: buy
      resource: energy
    - action: sell
      resource: energy
  viewer:
    - action: view
      resource: market
    - action: buy
      resource: energy
      allowed: false
"#;

#[test]
fn yaml_catalog_is_parsed_with_default_allowed() {
    let file = parse_catalog_str(YAML_CATALOG).unwrap();
    let catalog = PermissionCatalog::from_file(&file).unwrap();

    assert_eq!(catalog.revision(), 3);
    assert_eq!(
        catalog.permissions_for(Role::Prosumer),
        vec![
            Permission::allow("buy", "energy"),
            Permission::allow("sell", "energy"),
        ]
    );
    assert_eq!(
        catalog.permissions_for(Role::Viewer),
        vec![
            Permission::allow("view", "market"),
            Permission::deny("buy", "energy"),
        ]
    );
}

#[test]
fn json_catalog_is_accepted() {
    let raw = r#"{
        "version": 2,
        "roles": {
            "prosumer": [{"action": "create", "resource": "listing"}],
            "viewer": []
        }
    }"#;
    let catalog = PermissionCatalog::from_file(&parse_catalog_str(raw).unwrap()).unwrap();
    assert_eq!(catalog.grants(Role::Prosumer).len(), 1);
    assert!(catalog.grants(Role::Viewer).is_empty());
}

#[test]
fn catalog_missing_a_role_fails_to_parse() {
    let raw = r#"
version: 1
roles:
  prosumer: []
"#;
    assert!(matches!(
        parse_catalog_str(raw),
        Err(ConfigError::Deserialize(_))
    ));
}

#[test]
fn duplicate_entries_are_rejected() {
    let raw = r#"
version: 1
roles:
  prosumer:
    - { action: buy, resource: energy }
    - { action: buy, resource: energy, allowed: false }
  viewer: []
"#;
    let file = parse_catalog_str(raw).unwrap();
    assert!(matches!(
        PermissionCatalog::from_file(&file),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn empty_action_is_rejected() {
    let raw = r#"
version: 1
roles:
  prosumer: []
  viewer:
    - { action: "", resource: market }
"#;
    let file = parse_catalog_str(raw).unwrap();
    assert!(matches!(
        PermissionCatalog::from_file(&file),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn catalog_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    std::fs::write(&path, YAML_CATALOG).unwrap();

    let file = load_catalog_from_path(&path).unwrap();
    assert_eq!(file.version, 3);
}

#[test]
fn missing_file_surfaces_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_catalog_from_path(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
