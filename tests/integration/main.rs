//! Integration tests for refdelta
//!
//! These tests write `*.cst.json` snapshots to disk and drive the built CLI.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const BEFORE: &str = r#"{
    "namespace": "shop",
    "declarations": [
        {"kind": "Type", "name": "Base"},
        {"kind": "Type", "name": "Order", "supertypes": ["shop.Base"]},
        {"kind": "Field", "name": "id", "container": 1},
        {"kind": "Method", "name": "total", "container": 1, "params": ["int"],
         "body": ["sum", "+=", "price", "*", "qty"]},
        {"kind": "Method", "name": "process", "container": 1, "params": [],
         "body": ["validate", "lock", "charge", "ship", "notify", "unlock"]}
    ]
}"#;

const AFTER: &str = r#"{
    "namespace": "shop",
    "declarations": [
        {"kind": "Type", "name": "Base"},
        {"kind": "Field", "name": "id", "container": 0},
        {"kind": "Type", "name": "Order", "supertypes": ["shop.Base"]},
        {"kind": "Method", "name": "amount", "container": 2, "params": ["int"],
         "body": ["sum", "+=", "price", "*", "qty"]},
        {"kind": "Method", "name": "process", "container": 2, "params": [],
         "body": ["validate", "lock", "call(fulfil)", "unlock"]},
        {"kind": "Method", "name": "fulfil", "container": 2, "params": [],
         "body": ["charge", "ship", "notify"]}
    ]
}"#;

fn refdelta(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_refdelta"))
        .args(args)
        .output()
        .expect("Failed to execute refdelta")
}

fn write_snapshot(root: &Path, name: &str, content: &str) -> String {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("Order.cst.json"), content).unwrap();
    dir.to_string_lossy().into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = refdelta(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Structural diff and refactoring detection"));

    let output = refdelta(&["version"]);
    assert!(stdout(&output).starts_with("refdelta v"));
}

#[test]
fn test_diff_prints_descriptions() {
    let dir = TempDir::new().unwrap();
    let before = write_snapshot(dir.path(), "before", BEFORE);
    let after = write_snapshot(dir.path(), "after", AFTER);

    let output = refdelta(&["diff", &before, &after]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout(&output),
        "Rename shop.Order.total(int) shop.Order.amount(int)\n\
         ExtractOperation shop.Order.process() shop.Order.fulfil()\n\
         PullUpAttribute shop.Order.id shop.Base.id\n"
    );
}

#[test]
fn test_diff_json_output_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let before = write_snapshot(dir.path(), "before", BEFORE);
    let after = write_snapshot(dir.path(), "after", AFTER);

    let first = stdout(&refdelta(&["diff", &before, &after, "--json"]));
    let second = stdout(&refdelta(&["diff", &before, &after, "--json"]));
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(value["relationships"].as_array().unwrap().len(), 3);
    assert_eq!(value["unmatched_after"].as_array().unwrap().len(), 1);
}

#[test]
fn test_config_changes_priority() {
    let dir = TempDir::new().unwrap();
    let before = write_snapshot(dir.path(), "before", BEFORE);
    let after = write_snapshot(dir.path(), "after", AFTER);
    let config = dir.path().join("refdelta.toml");
    fs::write(
        &config,
        "[inference]\npriority = [\"Plain\", \"ExtractInline\", \"Hierarchy\", \"Supertype\"]\n",
    )
    .unwrap();

    let output = refdelta(&["--config", &config.to_string_lossy(), "diff", &before, &after]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Move shop.Order.id shop.Base.id"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let before = write_snapshot(dir.path(), "before", BEFORE);
    let config = dir.path().join("refdelta.toml");
    fs::write(&config, "[matching]\nmove_threshold = 0.2\n").unwrap();

    let output = refdelta(&["--config", &config.to_string_lossy(), "diff", &before, &before]);
    assert!(!output.status.success());
}

#[test]
fn test_unparsable_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let before = write_snapshot(dir.path(), "before", BEFORE);
    let after = write_snapshot(dir.path(), "after", BEFORE);
    fs::write(Path::new(&after).join("Broken.cst.json"), "{ nope").unwrap();

    let output = refdelta(&["diff", &before, &after]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Broken.cst.json"));
}

#[test]
fn test_missing_snapshot_fails() {
    let dir = TempDir::new().unwrap();
    let before = write_snapshot(dir.path(), "before", BEFORE);
    let missing = dir.path().join("missing");

    let output = refdelta(&["diff", &before, &missing.to_string_lossy()]);
    assert!(!output.status.success());
}

#[test]
fn test_batch_over_manifest() {
    let dir = TempDir::new().unwrap();
    write_snapshot(dir.path(), "c1/before", BEFORE);
    write_snapshot(dir.path(), "c1/after", AFTER);
    write_snapshot(dir.path(), "c2/before", AFTER);
    write_snapshot(dir.path(), "c2/after", AFTER);
    let manifest = dir.path().join("commits.json");
    fs::write(
        &manifest,
        r#"{"commits": [
            {"commit": "c1", "before": "c1/before", "after": "c1/after"},
            {"commit": "c2", "before": "c2/before", "after": "c2/after"}
        ]}"#,
    )
    .unwrap();

    let output = refdelta(&["batch", &manifest.to_string_lossy()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.starts_with("commit c1\n  Rename shop.Order.total(int) shop.Order.amount(int)\n"));
    assert!(text.ends_with("commit c2\n"));

    let output = refdelta(&["batch", &manifest.to_string_lossy(), "--json"]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value[0]["commit"], "c1");
    assert!(value[1]["result"]["relationships"].as_array().unwrap().is_empty());
}

#[test]
fn test_inspect_prints_nested_tree() {
    let dir = TempDir::new().unwrap();
    let before = write_snapshot(dir.path(), "before", BEFORE);

    let output = refdelta(&["inspect", &before]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Type shop.Order : shop.Base\n"));
    assert!(text.contains("  Method shop.Order.total(int)\n"));
}
