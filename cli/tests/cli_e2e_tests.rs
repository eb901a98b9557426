//! End-to-end scenarios pinned against the concrete producer/consumer pairs
//! and expected verdicts, run through the built binary.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("schema-subsume").expect("binary should exist")
}

fn check(producer: &Value, consumer: &Value) -> (i32, Value) {
    let dir = TempDir::new().unwrap();
    let producer_path = dir.path().join("producer.json");
    let consumer_path = dir.path().join("consumer.json");
    fs::write(&producer_path, producer.to_string()).unwrap();
    fs::write(&consumer_path, consumer.to_string()).unwrap();

    let output = cmd()
        .args([
            producer_path.to_str().unwrap(),
            consumer_path.to_str().unwrap(),
        ])
        .args(["--output-format", "json"])
        .output()
        .unwrap();

    let code = output.status.code().unwrap();
    let parsed: Value = serde_json::from_slice(&output.stdout).unwrap();
    (code, parsed)
}

/// Scenario #1: an integer producer is always a number.
#[test]
fn scenario_1_integer_subsumed_by_number() {
    let (code, result) = check(&serde_json::json!({"type": "integer"}), &serde_json::json!({"type": "number"}));
    assert_eq!(code, 0);
    assert_eq!(result["compatible"], true);
}

/// Scenario #2: a number producer is not always an integer; `3.14` witnesses.
#[test]
fn scenario_2_number_not_subsumed_by_integer() {
    let (code, result) = check(&serde_json::json!({"type": "number"}), &serde_json::json!({"type": "integer"}));
    assert_eq!(code, 1);
    assert_eq!(result["compatible"], false);
    let witness = result["counterexample"].as_f64().expect("witness is numeric");
    assert!(witness.fract().abs() > 1e-9, "witness {witness} should be non-integral");
}

/// Scenario #3: a narrower string producer is subsumed by the unconstrained string schema.
#[test]
fn scenario_3_min_length_subsumed_by_plain_string() {
    let (code, result) = check(
        &serde_json::json!({"type": "string", "minLength": 5}),
        &serde_json::json!({"type": "string"}),
    );
    assert_eq!(code, 0);
    assert_eq!(result["compatible"], true);
}

/// Scenario #4: a union producer is not subsumed by a single-type consumer; `0` witnesses.
#[test]
fn scenario_4_union_type_not_subsumed_by_single_type() {
    let (code, result) = check(
        &serde_json::json!({"type": ["string", "number"]}),
        &serde_json::json!({"type": "string"}),
    );
    assert_eq!(code, 1);
    assert!(result["counterexample"].is_number());
}

/// Scenario #5: a looser pattern producer is not subsumed by a stricter one.
#[test]
fn scenario_5_looser_pattern_not_subsumed_by_stricter_pattern() {
    let (code, result) = check(
        &serde_json::json!({
            "type": "object",
            "required": ["contact"],
            "properties": {"contact": {"type": "string", "pattern": ".*@.*"}}
        }),
        &serde_json::json!({
            "type": "object",
            "required": ["contact"],
            "properties": {"contact": {"type": "string", "pattern": "^https?://.*"}}
        }),
    );
    assert_eq!(code, 1);
    let contact = result["counterexample"]["contact"]
        .as_str()
        .expect("witness has a contact string");
    assert!(contact.contains('@'));
}

/// Scenario #6: requiring more properties is a narrower producer, subsumed by
/// requiring fewer.
#[test]
fn scenario_6_wider_required_set_subsumed_by_narrower() {
    let (code, result) = check(
        &serde_json::json!({"type": "object", "required": ["a", "b"]}),
        &serde_json::json!({"type": "object", "required": ["a"]}),
    );
    assert_eq!(code, 0);
    assert_eq!(result["compatible"], true);
}

// ── Boundary cases (spec §8) ─────────────────────────────────────────────────

#[test]
fn type_disjointness_is_incompatible() {
    let (code, result) = check(&serde_json::json!({"type": "string"}), &serde_json::json!({"type": "number"}));
    assert_eq!(code, 1);
    assert!(result["counterexample"].is_string());
}

#[test]
fn array_element_typing_is_not_subsumed() {
    let (code, result) = check(
        &serde_json::json!({"type": "array", "items": {"type": "string"}}),
        &serde_json::json!({"type": "array", "items": {"type": "number"}}),
    );
    assert_eq!(code, 1);
    let arr = result["counterexample"].as_array().expect("witness is an array");
    assert_eq!(arr.len(), 1);
    assert!(arr[0].is_string());
}

#[test]
fn additional_properties_false_rejects_undeclared_key() {
    let (code, result) = check(
        &serde_json::json!({"type": "object", "properties": {"a": {}}}),
        &serde_json::json!({"type": "object", "properties": {"a": {}}, "additionalProperties": false}),
    );
    assert_eq!(code, 1);
    assert!(result["counterexample"].is_object());
}

#[test]
fn const_is_subsumed_by_matching_enum() {
    let (code, result) = check(
        &serde_json::json!({"const": "x"}),
        &serde_json::json!({"enum": ["x", "y"]}),
    );
    assert_eq!(code, 0);
    assert_eq!(result["compatible"], true);
}

#[test]
fn reflexivity_holds_for_a_nontrivial_schema() {
    let schema = serde_json::json!({
        "type": "object",
        "required": ["id"],
        "properties": {
            "id": {"type": "string", "pattern": "^[a-z]+$"},
            "count": {"type": "integer", "minimum": 0, "maximum": 100}
        },
        "additionalProperties": false
    });
    let (code, result) = check(&schema, &schema);
    assert_eq!(code, 0);
    assert_eq!(result["compatible"], true);
}
