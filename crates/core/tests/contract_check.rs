//! Static contract check over a scratch repository

use std::path::Path;

use flowcheck_core::config::LayoutConfig;
use flowcheck_core::{run_contract, ActionTable, Error, FlowcheckConfig, Workspace};

const OPENAPI: &str = r#"
openapi: 3.0.3
info:
  title: Todo API
  version: 1.0.0
paths:
  /health:
    get:
      responses:
        "200": {description: ok}
  /todos:
    get:
      responses:
        "200": {description: list}
    post:
      responses:
        "201": {description: created}
        "422": {description: invalid}
  /todos/{id}:
    get:
      responses:
        "200": {description: found}
        "404": {description: missing}
"#;

fn write_repo(root: &Path, flows: &[(&str, &str)]) {
    std::fs::create_dir_all(root.join("api")).unwrap();
    std::fs::write(root.join("api/openapi.yaml"), OPENAPI).unwrap();
    std::fs::create_dir_all(root.join("spec/starter-spec-v0.3.0/flows")).unwrap();
    std::fs::write(root.join("spec/VERSION"), "0.3.0\n").unwrap();
    for (name, body) in flows {
        std::fs::write(root.join("spec/starter-spec-v0.3.0/flows").join(name), body).unwrap();
    }
}

#[test]
fn consistent_flows_pass() {
    let root = tempfile::tempdir().unwrap();
    write_repo(
        root.path(),
        &[
            (
                "create_then_get.yaml",
                r#"
name: create_then_get
steps:
  - action: create_todo
    request: {title: Buy milk}
    expect_status: 201
  - action: get_todo
    params: {id_from_previous: id}
    expect_status: 200
"#,
            ),
            ("list.yaml", "steps:\n  - action: list_todos\n    expect_status: 200\n"),
        ],
    );

    let workspace = Workspace::new(root.path(), LayoutConfig::default());
    let result = run_contract(&workspace, &ActionTable::canonical()).unwrap();
    assert!(result.passed(), "unexpected failures: {:?}", result.errors);
    assert_eq!(result.flow_files, 2);
    assert_eq!(result.total_steps, 3);
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn drift_is_reported_per_step() {
    let root = tempfile::tempdir().unwrap();
    write_repo(
        root.path(),
        &[(
            "drift.yaml",
            r#"
steps:
  - action: create_todo
    expect_status: 400
  - action: delete_todo
  - action: health_check
    expect_status: 200
"#,
        )],
    );

    let workspace = Workspace::new(root.path(), LayoutConfig::default());
    let result = run_contract(&workspace, &ActionTable::canonical()).unwrap();
    assert_eq!(result.failed_steps, 2);
    assert_eq!(
        result.errors,
        vec![
            "drift.yaml:step#1 expects status 400 but POST /todos does not declare it".to_string(),
            "drift.yaml:step#2 unknown action 'delete_todo'".to_string(),
        ]
    );
}

#[test]
fn configured_action_must_exist_in_schema() {
    let root = tempfile::tempdir().unwrap();
    write_repo(
        root.path(),
        &[("delete.yaml", "steps:\n  - action: delete_todo\n    params: {id: 1}\n")],
    );

    let config = FlowcheckConfig::from_toml(
        "[actions.delete_todo]\nmethod = \"DELETE\"\npath = \"/todos/{id}\"\n",
    )
    .unwrap();
    let workspace = Workspace::new(root.path(), config.layout.clone());
    let result = run_contract(&workspace, &config.action_table()).unwrap();
    assert_eq!(
        result.errors,
        vec!["delete.yaml:step#1 missing operation DELETE /todos/{id} in api/openapi.yaml".to_string()]
    );
}

#[test]
fn missing_flows_are_fatal() {
    let root = tempfile::tempdir().unwrap();
    write_repo(root.path(), &[]);

    let workspace = Workspace::new(root.path(), LayoutConfig::default());
    let err = run_contract(&workspace, &ActionTable::canonical()).unwrap_err();
    assert!(matches!(err, Error::NoFlowFilesFound { .. }));
    assert!(err.to_string().starts_with("no flow files found for pinned version 0.3.0"));
}

#[test]
fn missing_schema_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    write_repo(root.path(), &[("a.yaml", "steps: []\n")]);
    std::fs::remove_file(root.path().join("api/openapi.yaml")).unwrap();

    let workspace = Workspace::new(root.path(), LayoutConfig::default());
    let err = run_contract(&workspace, &ActionTable::canonical()).unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
}
