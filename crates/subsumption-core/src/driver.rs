//! Solver Driver & Witness Extractor (spec §4.4).
//!
//! Asserts `P(x) ∧ ¬C(x)` over the shared [`crate::json_encoder::JsonSort`]
//! variable `x`, decides it under a time budget, and — on `sat` — reads a
//! concrete JSON counterexample back out of the model and evaluates both
//! sides' label tables to produce a diagnosis. Everything here is
//! reentrant: a fresh [`z3::Context`] and [`crate::json_encoder::JsonSort`]
//! are built per call (spec §5), so concurrent checks never share state.

use std::time::Instant;

use serde_json::{Map, Value};
use z3::ast::{Ast, Bool, Dynamic, Int};
use z3::{Config, Context, Model, Optimize, Params, SatResult, Solver};

use crate::compiler::{compile_side, CompiledSide, Side};
use crate::config::SubsumptionOptions;
use crate::error::SubsumptionError;
use crate::json_encoder::{JsonSort, JsonUniverse};

/// Bound on witness readback recursion — a safety net against the
/// recursive `Json` datatype letting model completion assign an
/// arbitrarily deep `Arr`/`Obj` chain to a position no compiled predicate
/// actually constrains. Schemas this project supports have a finite
/// keyword-nesting depth well under this, so the cap is never exercised by
/// a genuine witness.
const MAX_READBACK_DEPTH: usize = 64;

/// Bound on how many levels of the JSON structure the minimization pass
/// (spec §4.4 "Minimization") builds soft objectives for. Going two levels
/// deep (the root plus its direct array elements / object values) already
/// shrinks witnesses for every scenario in spec §8; deeper objectives would
/// multiply combinatorially with `MAX_ARRAY_LEN × |Keys|` per level for
/// diminishing return, so this is capped rather than made exhaustive.
const MINIMIZE_DEPTH: usize = 2;

/// What the driver hands back to `lib.rs` for assembly into a
/// [`crate::SubsumptionResult`].
pub(crate) struct RawCheckOutcome {
    pub compatible: bool,
    pub counterexample: Option<Value>,
    pub explanation: Option<String>,
    pub failed_constraints: Vec<String>,
    pub recommendations: Vec<String>,
    pub solver_time_seconds: f64,
}

/// Run one subsumption check against two already-inlined schemas (spec
/// §4.4's contract: given `P(x)`, `C(x)`, decide `P(x) ∧ ¬C(x)` under
/// `options.timeout_seconds`).
pub(crate) fn run(
    producer: &Value,
    consumer: &Value,
    options: &SubsumptionOptions,
) -> Result<RawCheckOutcome, SubsumptionError> {
    let start = Instant::now();

    let universe = JsonUniverse::seal(producer, consumer, options.max_array_length)?;
    let cfg = Config::new();
    let ctx = Context::new(&cfg);
    let json = JsonSort::new(&ctx, universe);
    let x = json.fresh_const("x");

    let producer_side = compile_side(&ctx, &json, Side::Producer, producer, &x)?;
    let consumer_side = compile_side(&ctx, &json, Side::Consumer, consumer, &x)?;

    let solver = Solver::new(&ctx);
    apply_timeout(&ctx, &solver, options.timeout_seconds);

    solver.assert(&producer_side.predicate);
    solver.assert(&consumer_side.predicate.not());
    for assertion in producer_side
        .side_assertions
        .iter()
        .chain(consumer_side.side_assertions.iter())
    {
        solver.assert(assertion);
    }

    tracing::debug!(
        producer_labels = producer_side.labels.len(),
        consumer_labels = consumer_side.labels.len(),
        "asserted P(x) ∧ ¬C(x)"
    );

    match solver.check() {
        SatResult::Unsat => {
            tracing::info!("unsat within budget — compatible");
            Ok(RawCheckOutcome {
                compatible: true,
                counterexample: None,
                explanation: None,
                failed_constraints: Vec::new(),
                recommendations: Vec::new(),
                solver_time_seconds: start.elapsed().as_secs_f64(),
            })
        }
        SatResult::Unknown => Err(SubsumptionError::SolverTimeout {
            elapsed_seconds: start.elapsed().as_secs_f64(),
            budget_seconds: options.timeout_seconds,
        }),
        SatResult::Sat => {
            tracing::info!("sat — incompatible, extracting witness");
            let model = if options.explanations {
                minimized_model(&ctx, &json, &x, &producer_side, &consumer_side, options)
                    .unwrap_or_else(|| solver.get_model().expect("sat implies a model"))
            } else {
                solver.get_model().expect("sat implies a model")
            };

            let counterexample = extract_witness(&json, &model, &x);

            let (explanation, failed_constraints, recommendations) = if options.explanations {
                diagnose(&model, &producer_side, &consumer_side)
            } else {
                (None, Vec::new(), Vec::new())
            };

            Ok(RawCheckOutcome {
                compatible: false,
                counterexample: Some(counterexample),
                explanation,
                failed_constraints,
                recommendations,
                solver_time_seconds: start.elapsed().as_secs_f64(),
            })
        }
    }
}

fn apply_timeout(ctx: &Context, solver: &Solver, timeout_seconds: u64) {
    let mut params = Params::new(ctx);
    let millis = timeout_seconds.saturating_mul(1000).min(u32::MAX as u64) as u32;
    params.set_u32("timeout", millis);
    solver.set_params(&params);
}

// ---------------------------------------------------------------------------
// Witness extraction (spec §4.4 "Witness extraction")
// ---------------------------------------------------------------------------

fn eval_bool(model: &Model, b: &Bool) -> bool {
    model
        .eval(b, true)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Read a concrete JSON value back out of the model, strictly model-driven:
/// the root's recognizer decides the variant, arrays read `len(x)` before
/// iterating `[0, len)`, and objects emit a key only when `has(x,k)`
/// evaluates true. No key or value is ever invented (spec §4.4 step 4).
fn extract_witness<'ctx>(json: &JsonSort<'ctx>, model: &Model<'ctx>, x: &Dynamic<'ctx>) -> Value {
    read_value(json, model, x, 0)
}

fn read_value<'ctx>(
    json: &JsonSort<'ctx>,
    model: &Model<'ctx>,
    val: &Dynamic<'ctx>,
    depth: usize,
) -> Value {
    if depth > MAX_READBACK_DEPTH {
        return Value::Null;
    }

    if eval_bool(model, &json.is_null(val)) {
        return Value::Null;
    }
    if eval_bool(model, &json.is_bool(val)) {
        let b = model
            .eval(&json.bool_val(val), true)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        return Value::Bool(b);
    }
    if eval_bool(model, &json.is_int(val)) {
        let n = model
            .eval(&json.int_val(val), true)
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        return Value::Number(n.into());
    }
    if eval_bool(model, &json.is_real(val)) {
        let (num, den) = model
            .eval(&json.real_val(val), true)
            .and_then(|v| v.as_real())
            .unwrap_or((0, 1));
        let f = if den != 0 { num as f64 / den as f64 } else { 0.0 };
        return serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::Number(0.into()));
    }
    if eval_bool(model, &json.is_str(val)) {
        let s = model
            .eval(&json.str_val(val), true)
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        return Value::String(s);
    }
    if eval_bool(model, &json.is_arr(val)) {
        let max_len = json.universe().max_array_len() as i64;
        let raw_len = model
            .eval(&json.arr_len(val), true)
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let len = raw_len.clamp(0, max_len) as usize;

        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            let elem = json.arr_elem(val, i);
            items.push(read_value(json, model, &elem, depth + 1));
        }
        return Value::Array(items);
    }
    if eval_bool(model, &json.is_obj(val)) {
        let mut map = Map::new();
        for key in json.universe().keys() {
            if eval_bool(model, &json.obj_has(val, key)) {
                let field = json.obj_val(val, key);
                map.insert(key.clone(), read_value(json, model, &field, depth + 1));
            }
        }
        return Value::Object(map);
    }

    // Every recognizer is false — impossible under the sort's invariant
    // that exactly one holds, but model completion defaults are conservative.
    Value::Null
}

// ---------------------------------------------------------------------------
// Diagnosis: label evaluation and recommendations (spec §4.4)
// ---------------------------------------------------------------------------

fn diagnose<'ctx>(
    model: &Model<'ctx>,
    producer: &CompiledSide<'ctx>,
    consumer: &CompiledSide<'ctx>,
) -> (Option<String>, Vec<String>, Vec<String>) {
    let p_true: Vec<&crate::compiler::Label> = producer
        .labels
        .iter()
        .filter(|l| eval_bool(model, &l.handle))
        .collect();
    let c_false: Vec<&crate::compiler::Label> = consumer
        .labels
        .iter()
        .filter(|l| !eval_bool(model, &l.handle))
        .collect();

    let failed_constraints: Vec<String> = c_false.iter().map(|l| l.name.clone()).collect();
    let recommendations: Vec<String> = c_false
        .iter()
        .map(|l| recommend(&l.path, &l.keyword))
        .collect();

    let explanation = if c_false.is_empty() {
        Some(
            "The witness violates no single labeled consumer constraint; incompatibility \
             follows from how the consumer schema's constraints combine overall."
                .to_string(),
        )
    } else {
        let names: Vec<&str> = c_false.iter().map(|l| l.name.as_str()).collect();
        Some(format!(
            "The witness satisfies {} producer constraint(s) and violates {} consumer \
             constraint(s): {}.",
            p_true.len(),
            c_false.len(),
            names.join(", "),
        ))
    };

    (explanation, failed_constraints, recommendations)
}

/// Map a failed consumer constraint's keyword to a human-readable fix
/// suggestion (spec §4.4: "a static map from keyword to fix suggestion").
fn recommend(path: &str, keyword: &str) -> String {
    let base = keyword.split(':').next().unwrap_or(keyword);
    let advice = match base {
        "type" => "widen the consumer's `type` to also accept the producer's shape",
        "const" => "replace `const` with a broader `enum` (or drop it)",
        "enum" => "add the producer's value to the consumer's `enum`",
        "minimum" | "exclusiveMinimum" => "lower the consumer's minimum bound",
        "maximum" | "exclusiveMaximum" => "raise the consumer's maximum bound",
        "multipleOf" => "drop or relax the consumer's `multipleOf` divisor",
        "minLength" => "lower the consumer's `minLength`",
        "maxLength" => "raise the consumer's `maxLength`",
        "pattern" => "broaden the consumer's `pattern` to also match the producer's strings",
        "format" => "drop or relax the consumer's `format` constraint",
        "minItems" => "lower the consumer's `minItems`",
        "maxItems" => "raise the consumer's `maxItems`",
        "contains" => "broaden the consumer's `contains` subschema",
        "uniqueItems" => "drop the consumer's `uniqueItems: true` constraint",
        "required" => "drop the named property from the consumer's `required` list",
        "additionalProperties" => {
            "set the consumer's `additionalProperties` to `true` or a broader subschema"
        }
        "dependentRequired" => "relax the consumer's `dependentRequired` entry",
        "dependentSchemas" => "broaden the consumer's `dependentSchemas` entry",
        "minProperties" => "lower the consumer's `minProperties`",
        "maxProperties" => "raise the consumer's `maxProperties`",
        "items:false" | "prefixItems(no" => "allow further array items on the consumer side",
        _ => "relax this consumer constraint to admit the producer's witness",
    };
    format!("{path}: {advice} ({keyword})")
}

// ---------------------------------------------------------------------------
// Minimization (spec §4.4 "Minimization (optional but specified)")
// ---------------------------------------------------------------------------

/// Rerun the same hard constraints through [`Optimize`] with soft
/// preferences for a smaller witness — shorter arrays and strings, fewer
/// present object keys — and return the resulting model. Best-effort: any
/// failure (including the optimizer itself timing out) falls back to the
/// caller using the plain `Solver`'s model, since a minimized witness is
/// strictly a nicer version of an already-valid one, never a prerequisite
/// for correctness.
fn minimized_model<'ctx>(
    ctx: &'ctx Context,
    json: &JsonSort<'ctx>,
    x: &Dynamic<'ctx>,
    producer: &CompiledSide<'ctx>,
    consumer: &CompiledSide<'ctx>,
    options: &SubsumptionOptions,
) -> Option<Model<'ctx>> {
    let optimize = Optimize::new(ctx);
    let mut params = Params::new(ctx);
    let millis = options
        .timeout_seconds
        .saturating_mul(1000)
        .min(u32::MAX as u64) as u32;
    params.set_u32("timeout", millis);
    optimize.set_params(&params);

    optimize.assert(&producer.predicate);
    optimize.assert(&consumer.predicate.not());
    for assertion in producer
        .side_assertions
        .iter()
        .chain(consumer.side_assertions.iter())
    {
        optimize.assert(assertion);
    }

    let mut soft_terms = Vec::new();
    collect_soft_terms(json, x, 0, &mut soft_terms);
    for term in &soft_terms {
        optimize.minimize(term);
    }

    match optimize.check(&[]) {
        SatResult::Sat => optimize.get_model(),
        _ => None,
    }
}

/// Collect soft-minimization objectives for one reachable position in the
/// JSON structure: its array length, string length (if it turns out to be
/// a string — the accessor is a total datatype function so applying it
/// to a non-`Str` value is harmless), and count of present object keys.
/// Recurses up to [`MINIMIZE_DEPTH`] into array elements and object values.
fn collect_soft_terms<'ctx>(
    json: &JsonSort<'ctx>,
    val: &Dynamic<'ctx>,
    depth: usize,
    out: &mut Vec<Int<'ctx>>,
) {
    out.push(json.arr_len(val));
    out.push(json.str_val(val).length());
    out.push(presence_count(json, val));

    if depth + 1 >= MINIMIZE_DEPTH {
        return;
    }

    for i in 0..json.universe().max_array_len() {
        let elem = json.arr_elem(val, i);
        collect_soft_terms(json, &elem, depth + 1, out);
    }
    for key in json.universe().keys().to_vec() {
        let field = json.obj_val(val, &key);
        collect_soft_terms(json, &field, depth + 1, out);
    }
}

fn presence_count<'ctx>(json: &JsonSort<'ctx>, val: &Dynamic<'ctx>) -> Int<'ctx> {
    let ctx = json.ctx();
    let one = Int::from_i64(ctx, 1);
    let zero = Int::from_i64(ctx, 0);
    let keys = json.universe().keys();
    if keys.is_empty() {
        return zero;
    }
    let indicators: Vec<Int> = keys
        .iter()
        .map(|k| json.obj_has(val, k).ite(&one, &zero))
        .collect();
    let refs: Vec<&Int> = indicators.iter().collect();
    Int::add(ctx, &refs)
}
