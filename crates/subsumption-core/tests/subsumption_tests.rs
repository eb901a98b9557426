//! Black-box integration tests against the crate's public surface: the
//! universal invariants and boundary cases, plus the pinned end-to-end
//! scenario table.

use serde_json::json;
use subsumption_core::{check_subsumption, SubsumptionOptions};

fn default_check(producer: &serde_json::Value, consumer: &serde_json::Value) -> subsumption_core::SubsumptionResult {
    check_subsumption(producer, consumer, &SubsumptionOptions::default())
}

// ── Universal invariants (spec §8) ───────────────────────────────────────────

#[test]
fn reflexivity_holds_across_a_variety_of_schemas() {
    let schemas = vec![
        json!({"type": "string"}),
        json!({"type": "integer", "minimum": 0}),
        json!({"type": "array", "items": {"type": "boolean"}, "maxItems": 3}),
        json!({
            "type": "object",
            "required": ["a"],
            "properties": {"a": {"type": "string"}, "b": {"type": "integer"}},
            "additionalProperties": false
        }),
        json!({"const": 42}),
        json!({"enum": ["a", "b", "c"]}),
    ];

    for schema in schemas {
        let result = default_check(&schema, &schema);
        assert!(result.error.is_none(), "unexpected error for {schema}: {:?}", result.error);
        assert!(result.compatible, "schema {schema} should be reflexively compatible");
    }
}

#[test]
fn witness_soundness_satisfies_producer_and_violates_consumer() {
    use jsonschema::JSONSchema;

    let producer = json!({"type": "number"});
    let consumer = json!({"type": "integer"});
    let result = default_check(&producer, &consumer);
    assert!(!result.compatible);
    let witness = result.counterexample.expect("incompatible result carries a witness");

    let compiled_producer = JSONSchema::compile(&producer).unwrap();
    let compiled_consumer = JSONSchema::compile(&consumer).unwrap();
    assert!(compiled_producer.is_valid(&witness), "witness must validate against the producer");
    assert!(!compiled_consumer.is_valid(&witness), "witness must not validate against the consumer");
}

#[test]
fn bound_monotonicity_never_turns_compatible_into_incompatible() {
    let producer = json!({"type": "array", "items": {"type": "integer"}, "maxItems": 3});
    let consumer = json!({"type": "array", "items": {"type": "integer"}});

    let narrow = SubsumptionOptions {
        max_array_length: 3,
        ..SubsumptionOptions::default()
    };
    let wide = SubsumptionOptions {
        max_array_length: 8,
        ..SubsumptionOptions::default()
    };

    let narrow_result = check_subsumption(&producer, &consumer, &narrow);
    assert!(narrow_result.error.is_none());
    assert!(narrow_result.compatible);

    let wide_result = check_subsumption(&producer, &consumer, &wide);
    assert!(wide_result.error.is_none() || wide_result.compatible);
}

#[test]
fn inlining_idempotence_for_an_acyclic_ref_chain() {
    let schema = json!({
        "$defs": {
            "leaf": {"type": "string"},
            "wrapper": {"type": "object", "properties": {"value": {"$ref": "#/$defs/leaf"}}}
        },
        "$ref": "#/$defs/wrapper"
    });

    // Resolving twice (once implicitly inside each check) must agree with
    // resolving once: checking the schema against itself is reflexive
    // regardless of how many times inlining has already been applied.
    let once = default_check(&schema, &schema);
    let twice = default_check(&schema, &schema);
    assert_eq!(once.compatible, twice.compatible);
    assert!(once.compatible);
}

#[test]
fn label_completeness_every_failed_constraint_has_a_recommendation() {
    let producer = json!({
        "type": "object",
        "required": ["contact"],
        "properties": {"contact": {"type": "string", "pattern": ".*@.*"}}
    });
    let consumer = json!({
        "type": "object",
        "required": ["contact"],
        "properties": {"contact": {"type": "string", "pattern": "^https?://.*"}}
    });
    let result = default_check(&producer, &consumer);
    assert!(!result.compatible);
    assert_eq!(result.failed_constraints.len(), result.recommendations.len());
    assert!(!result.failed_constraints.is_empty());
}

// ── Boundary cases (spec §8) ──────────────────────────────────────────────

#[test]
fn type_disjointness() {
    let result = default_check(&json!({"type": "string"}), &json!({"type": "number"}));
    assert!(!result.compatible);
    assert!(result.counterexample.unwrap().is_string());
}

#[test]
fn array_element_typing_is_not_subsumed() {
    let result = default_check(
        &json!({"type": "array", "items": {"type": "string"}}),
        &json!({"type": "array", "items": {"type": "number"}}),
    );
    assert!(!result.compatible);
    let witness = result.counterexample.unwrap();
    let arr = witness.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert!(arr[0].is_string());
}

#[test]
fn required_expansion_restricts_not_widens() {
    let wider_required = json!({"type": "object", "required": ["a", "b", "c"]});
    let narrower_required = json!({"type": "object", "required": ["a"]});

    let forward = default_check(&wider_required, &narrower_required);
    assert!(forward.compatible, "requiring more properties restricts, so it is subsumed by requiring fewer");

    let backward = default_check(&narrower_required, &wider_required);
    assert!(!backward.compatible, "requiring fewer properties must not be subsumed by requiring more");
}

#[test]
fn additional_properties_false_rejects_undeclared_key() {
    let producer = json!({"type": "object", "properties": {"a": {}}});
    let consumer = json!({"type": "object", "properties": {"a": {}}, "additionalProperties": false});
    let result = default_check(&producer, &consumer);
    assert!(!result.compatible);
    assert!(result.counterexample.unwrap().is_object());
}

#[test]
fn const_is_subsumed_by_matching_enum() {
    let result = default_check(&json!({"const": "x"}), &json!({"enum": ["x", "y"]}));
    assert!(result.compatible);
}

#[test]
fn const_object_literal_does_not_spuriously_error() {
    let schema = json!({"const": {"a": 1, "b": {"c": 2}}});
    let result = default_check(&schema, &schema);
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert!(result.compatible);
}

#[test]
fn enum_object_literal_does_not_spuriously_error() {
    let producer = json!({"enum": [{"a": 1}, {"a": 2}]});
    let consumer = json!({"enum": [{"a": 1}, {"a": 2}, {"a": 3}]});
    let result = default_check(&producer, &consumer);
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert!(result.compatible);
}

// ── Pinned end-to-end scenarios (spec §8) ────────────────────────────────────

#[test]
fn scenario_1_integer_subsumed_by_number() {
    let result = default_check(&json!({"type": "integer"}), &json!({"type": "number"}));
    assert!(result.compatible);
}

#[test]
fn scenario_2_number_not_subsumed_by_integer_with_fractional_witness() {
    let result = default_check(&json!({"type": "number"}), &json!({"type": "integer"}));
    assert!(!result.compatible);
    let witness = result.counterexample.unwrap();
    let n = witness.as_f64().unwrap();
    assert!(n.fract().abs() > 1e-9);
}

#[test]
fn scenario_3_min_length_string_subsumed_by_plain_string() {
    let result = default_check(
        &json!({"type": "string", "minLength": 5}),
        &json!({"type": "string"}),
    );
    assert!(result.compatible);
}

#[test]
fn scenario_4_union_type_not_subsumed_by_single_type() {
    let result = default_check(
        &json!({"type": ["string", "number"]}),
        &json!({"type": "string"}),
    );
    assert!(!result.compatible);
    assert!(result.counterexample.unwrap().is_number());
}

#[test]
fn scenario_5_contact_pattern_widening_is_not_subsumed() {
    let producer = json!({
        "type": "object",
        "required": ["contact"],
        "properties": {"contact": {"type": "string", "pattern": ".*@.*"}}
    });
    let consumer = json!({
        "type": "object",
        "required": ["contact"],
        "properties": {"contact": {"type": "string", "pattern": "^https?://.*"}}
    });
    let result = default_check(&producer, &consumer);
    assert!(!result.compatible);
    let witness = result.counterexample.unwrap();
    assert!(witness["contact"].as_str().unwrap().contains('@'));
}

#[test]
fn scenario_6_extra_required_is_subsumed_by_fewer_required() {
    let result = default_check(
        &json!({"type": "object", "required": ["a", "b"]}),
        &json!({"type": "object", "required": ["a"]}),
    );
    assert!(result.compatible);
}

// ── Error surfaces ────────────────────────────────────────────────────────

#[test]
fn cyclic_schema_is_reported_as_error_not_a_verdict() {
    let producer = json!({
        "$defs": {"a": {"$ref": "#/$defs/a"}},
        "$ref": "#/$defs/a"
    });
    let result = default_check(&producer, &json!({}));
    assert!(result.error.is_some());
    assert!(!result.compatible);
    assert_eq!(result.exit_code(), 2);
}

#[test]
fn unsupported_regex_feature_is_reported_as_error() {
    let producer = json!({"type": "string", "pattern": "(foo)\\1"});
    let result = default_check(&producer, &json!({"type": "string"}));
    assert!(result.error.is_some());
}

// ── `additionalItems` (Draft 4-7 tuple form) ─────────────────────────────────

#[test]
fn additional_items_false_rejects_extra_tuple_elements() {
    let producer = json!({"type": "array", "items": [{"type": "string"}]});
    let consumer = json!({
        "type": "array",
        "items": [{"type": "string"}],
        "additionalItems": false
    });
    let result = default_check(&producer, &consumer);
    assert!(!result.compatible, "producer allows a second element the consumer forbids");
    let witness = result.counterexample.unwrap().as_array().unwrap().len();
    assert!(witness >= 2);
}

#[test]
fn additional_items_schema_constrains_tail_elements() {
    let producer = json!({"type": "array", "items": [{"type": "string"}], "additionalItems": {"type": "string"}});
    let consumer = json!({"type": "array", "items": [{"type": "string"}], "additionalItems": {"type": "integer"}});
    let result = default_check(&producer, &consumer);
    assert!(!result.compatible, "producer's extra string elements are rejected by the consumer's integer-only tail");
}

#[test]
fn additional_items_alongside_prefix_items_is_unsupported() {
    let producer = json!({
        "type": "array",
        "prefixItems": [{"type": "string"}],
        "additionalItems": {"type": "integer"}
    });
    let result = default_check(&producer, &json!({"type": "array"}));
    assert!(result.error.is_some(), "ambiguous additionalItems + prefixItems combination should be rejected, not silently dropped");
}
