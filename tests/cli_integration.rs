//! CLI integration tests for bpmn-panel
//!
//! These tests drive the binary against a project initialized in a
//! temporary directory and check both the printed panel and the diagram
//! file written back to disk.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command instance for the bpmn-panel binary
fn panel_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("bpmn-panel"));
    cmd.env_remove("BPMN_PANEL_CONFIG")
        .env_remove("BPMN_PANEL_DIAGRAM")
        .env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory and initialize a bpmn-panel project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    panel_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

fn read_diagram(dir: &TempDir) -> serde_json::Value {
    let content = fs::read_to_string(dir.path().join("diagram.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn business_object<'a>(diagram: &'a serde_json::Value, id: &str) -> &'a serde_json::Value {
    diagram["elements"]
        .as_array()
        .unwrap()
        .iter()
        .find(|element| element["id"] == id)
        .map(|element| &element["businessObject"])
        .unwrap()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_project_files() {
    let dir = TempDir::new().unwrap();

    panel_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized bpmn-panel project"));

    assert!(dir.path().join("bpmn-panel.toml").is_file());
    assert!(dir.path().join("panel.json").is_file());
    assert!(dir.path().join("diagram.json").is_file());
}

#[test]
fn test_init_twice_fails() {
    let dir = setup_project();

    panel_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// =============================================================================
// Show / Get Tests
// =============================================================================

#[test]
fn test_show_renders_groups() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["show", "serviceTask"])
        .assert()
        .success()
        .stdout(predicate::str::contains("serviceTask (bpmn:ServiceTask)"))
        .stdout(predicate::str::contains("Basic Properties"))
        .stdout(predicate::str::contains("Id: serviceTask (readonly)"))
        .stdout(predicate::str::contains("Type: http [http, ai, java]"))
        .stdout(predicate::str::contains("Request Url: localhost:8080"));
}

#[test]
fn test_show_json() {
    let dir = setup_project();

    let output = panel_cmd()
        .current_dir(dir.path())
        .args(["--format", "json", "show", "userTask"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["element"], "userTask");
    assert_eq!(view["elementType"], "bpmn:UserTask");
    assert_eq!(view["sections"][0]["kind"], "fields");
    assert_eq!(view["sections"][0]["title"], "Basic Properties");
}

#[test]
fn test_show_unknown_element_fails() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Element not found: missing"));
}

#[test]
fn test_get_joins_multiple_leaves() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["get", "userTask", "documentation"])
        .assert()
        .success()
        .stdout("Documentation 1\nDocumentation 2\n");
}

#[test]
fn test_get_integer_field() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["get", "userTask", "flowable:priority"])
        .assert()
        .success()
        .stdout("75\n");
}

#[test]
fn test_get_field_of_other_subtype_fails() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["get", "serviceTask", "systemPrompt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not shown"));
}

// =============================================================================
// Set Tests
// =============================================================================

#[test]
fn test_set_updates_existing_field() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["set", "serviceTask", "requestUrl=https://api.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Properties saved successfully"));

    panel_cmd()
        .current_dir(dir.path())
        .args(["get", "serviceTask", "requestUrl"])
        .assert()
        .success()
        .stdout("https://api.example.com\n");

    // The existing field entry is reused, not duplicated
    let diagram = read_diagram(&dir);
    let values = business_object(&diagram, "serviceTask")["extensionElements"]["values"]
        .as_array()
        .unwrap();
    assert_eq!(values.len(), 2);
}

#[test]
fn test_set_creates_nested_structure() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["set", "serviceTask", "requestTimeout=30", "requestHeaders=Accept: text/plain"])
        .assert()
        .success();

    let diagram = read_diagram(&dir);
    let values = business_object(&diagram, "serviceTask")["extensionElements"]["values"]
        .as_array()
        .unwrap();
    assert_eq!(values.len(), 4);

    let headers = values
        .iter()
        .find(|field| field["name"] == "requestHeaders")
        .unwrap();
    assert_eq!(headers["value"]["$type"], "flowable:String");
    assert_eq!(headers["value"]["$body"], "Accept: text/plain");
}

#[test]
fn test_set_empty_value_clears_attribute() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["set", "userTask", "flowable:assignee="])
        .assert()
        .success();

    let diagram = read_diagram(&dir);
    assert!(business_object(&diagram, "userTask")
        .get("flowable:assignee")
        .is_none());
}

#[test]
fn test_set_unchanged_value_does_not_write() {
    let dir = setup_project();
    let before = fs::read_to_string(dir.path().join("diagram.json")).unwrap();

    panel_cmd()
        .current_dir(dir.path())
        .args(["set", "userTask", "name=Review Request"])
        .assert()
        .success();

    let after = fs::read_to_string(dir.path().join("diagram.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_set_rejects_invalid_integer() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["set", "userTask", "flowable:priority=high"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an integer"));
}

#[test]
fn test_set_rejects_readonly_field() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["set", "userTask", "id=other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read-only"));
}

#[test]
fn test_set_requires_assignment_syntax() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["set", "userTask", "name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FIELD=VALUE"));
}

#[test]
fn test_set_json_output() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["-f", "json", "set", "scriptTask", "script=return 1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\":true"));
}

// =============================================================================
// Subtype Tests
// =============================================================================

#[test]
fn test_type_shows_detected_subtype() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["type", "serviceTask"])
        .assert()
        .success()
        .stdout("http\n");
}

#[test]
fn test_type_switch_rewrites_criteria() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["type", "serviceTask", "ai"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched serviceTask to ai"));

    let diagram = read_diagram(&dir);
    let task = business_object(&diagram, "serviceTask");
    assert!(task.get("flowable:type").is_none());
    assert_eq!(task["flowable:delegateExpression"], "${aiDelegate}");

    panel_cmd()
        .current_dir(dir.path())
        .args(["type", "serviceTask"])
        .assert()
        .success()
        .stdout("ai\n");
}

#[test]
fn test_type_unknown_subtype_fails() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["type", "serviceTask", "soap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown subtype 'soap'"));
}

#[test]
fn test_type_on_element_without_subtypes() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .args(["type", "userTask"])
        .assert()
        .success()
        .stdout("-\n");

    panel_cmd()
        .current_dir(dir.path())
        .args(["type", "userTask", "http"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no subtypes"));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_locations_lists_compiled_paths() {
    let dir = setup_project();

    panel_cmd()
        .current_dir(dir.path())
        .arg("locations")
        .assert()
        .success()
        .stdout(predicate::str::contains("flowable:field"))
        .stdout(predicate::str::contains("documentation"));
}

#[test]
fn test_explicit_paths_outside_project() {
    let dir = TempDir::new().unwrap();
    let diagram = dir.path().join("process.json");
    let config = dir.path().join("panel.yaml");

    fs::write(
        &diagram,
        r#"{"types": [], "elements": [{"id": "t1", "type": "bpmn:Task", "businessObject": {"$type": "bpmn:Task", "id": "t1", "label": "Old"}}]}"#,
    )
    .unwrap();
    fs::write(
        &config,
        "locations:\n  attribute:\n    - property: $id\nelements:\n  common:\n    label:\n      location: attribute\n",
    )
    .unwrap();

    panel_cmd()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--diagram")
        .arg(&diagram)
        .args(["set", "t1", "label=New"])
        .assert()
        .success();

    panel_cmd()
        .current_dir(dir.path())
        .env("BPMN_PANEL_CONFIG", &config)
        .env("BPMN_PANEL_DIAGRAM", &diagram)
        .args(["get", "t1", "label"])
        .assert()
        .success()
        .stdout("New\n");
}

#[test]
fn test_missing_diagram_outside_project_fails() {
    let dir = TempDir::new().unwrap();

    panel_cmd()
        .current_dir(dir.path())
        .args(["show", "t1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No diagram given"));
}
