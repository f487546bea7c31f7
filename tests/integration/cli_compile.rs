#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const CATALOG: &str = r#"
[namespaces]
hr = "http://example.org/hr"

[[classes]]
name = "hr:record"
parent = "cm:content"

[[classes]]
name = "hr:flagged"
kind = "aspect"

[[properties]]
name = "hr:grade"
container = "hr:record"
type = "d:int"

[[properties]]
name = "hr:skills"
container = "hr:flagged"
type = "d:text"
multiple = true

[[nodes]]
ref = "workspace://SpacesStore/people"
id = 9
"#;

const QUERY: &str = r#"{
  "selectors": ["P"],
  "predicates": [
    {"fn": "child_of", "parent": "workspace://SpacesStore/people"},
    {"fn": "in", "property": {"name": "cmis:objectTypeId"}, "values": ["hr:record"]},
    {"fn": "compare", "property": {"name": "hr:grade"}, "op": ">=", "value": 3},
    {"fn": "in", "property": {"name": "hr:skills"}, "values": ["rust", "sql"]},
    {"fn": "like", "property": {"name": "cmis:contentStreamMimeType"}, "pattern": "text/%"}
  ]
}"#;

fn setup(query: &str) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let catalog = dir.path().join("catalog.toml");
    let query_path = dir.path().join("query.json");
    fs::write(&catalog, CATALOG).expect("write catalog");
    fs::write(&query_path, query).expect("write query");
    (dir, catalog, query_path)
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn compile_emits_json_plan() {
    let (_dir, catalog, query) = setup(QUERY);
    let stdout = cargo_bin_cmd!("quarry")
        .args([
            "--preset",
            "default",
            "--format",
            "json",
            "compile",
            "--catalog",
            path_arg(&catalog),
            "--query",
            path_arg(&query),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let plan: Value = serde_json::from_slice(&stdout).expect("json output");
    assert_eq!(plan["fragments"].as_array().map(Vec::len), Some(5));
    assert_eq!(plan["single_joins"].as_array().map(Vec::len), Some(2));
    assert_eq!(plan["multi_joins"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        plan["strategies"],
        serde_json::json!([
            "parent_membership",
            "type_identity_membership",
            "property_comparison",
            "property_comparison",
            "property_comparison"
        ])
    );
    assert!(plan["plan_hash"].is_u64());
}

#[test]
fn compile_is_deterministic_across_runs() {
    let (_dir, catalog, query) = setup(QUERY);
    let run = || {
        cargo_bin_cmd!("quarry")
            .args([
                "--preset",
                "default",
                "compile",
                "--catalog",
                path_arg(&catalog),
                "--query",
                path_arg(&query),
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    let first = String::from_utf8(run()).expect("utf-8");
    assert_eq!(first, String::from_utf8(run()).expect("utf-8"));
    assert!(first.starts_with("Plan\n"));
    assert!(first.contains("plan_hash: "));
    assert!(first.contains("P.parent_node_id = 9"));
}

#[test]
fn invalid_query_exits_with_code_two() {
    let (_dir, catalog, query) = setup(
        r#"{"selectors": ["P"], "predicates": [
            {"fn": "in", "property": {"name": "hr:salary"}, "values": [1]}
        ]}"#,
    );
    let output = cargo_bin_cmd!("quarry")
        .args([
            "--preset",
            "default",
            "compile",
            "--catalog",
            path_arg(&catalog),
            "--query",
            path_arg(&query),
        ])
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf-8");
    assert!(stderr.contains("[UnknownProperty]"), "stderr: {stderr}");
}

#[test]
fn missing_catalog_is_a_general_error() {
    let (dir, _catalog, query) = setup(QUERY);
    let missing = dir.path().join("absent.toml");
    cargo_bin_cmd!("quarry")
        .args([
            "--preset",
            "default",
            "compile",
            "--catalog",
            path_arg(&missing),
            "--query",
            path_arg(&query),
        ])
        .assert()
        .code(1);
}

#[test]
fn explain_redacts_literals() {
    let (_dir, catalog, query) = setup(QUERY);
    let stdout = cargo_bin_cmd!("quarry")
        .args([
            "--preset",
            "default",
            "explain",
            "--catalog",
            path_arg(&catalog),
            "--query",
            path_arg(&query),
            "--redact",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(stdout).expect("utf-8");
    assert!(text.contains("Join(property)"));
    assert!(text.contains("Join(mimetype)"));
    assert!(text.contains("condition=<redacted>"));
    assert!(!text.contains("rust"));
}

#[test]
fn init_config_writes_the_selected_preset() {
    let dir = TempDir::new().expect("tempdir");
    let target = dir.path().join("conf").join("compiler.toml");
    cargo_bin_cmd!("quarry")
        .args(["--preset", "strict", "init-config", "--path", path_arg(&target)])
        .assert()
        .success();
    let written = fs::read_to_string(&target).expect("config written");
    assert!(written.contains("type_expansion = \"exact\""));

    let (_qdir, catalog, query) = setup(QUERY);
    cargo_bin_cmd!("quarry")
        .args([
            "--config",
            path_arg(&target),
            "compile",
            "--catalog",
            path_arg(&catalog),
            "--query",
            path_arg(&query),
        ])
        .assert()
        .success();
}
