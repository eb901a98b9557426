//! Compositional translation of each supported JSON Schema keyword into a
//! predicate over a [`crate::json_encoder::JsonSort`] value (spec §4.3).

use serde_json::{Map, Value};
use z3::ast::{Ast, Bool, Int, Real};

use super::{format::compile_format, pattern::compile_pattern, CompileCtx};
use crate::error::SubsumptionError;
use crate::json_encoder::JsonSort;

/// Annotation-only keywords (SPEC_FULL §2): recognized explicitly so they
/// never trip the unsupported-keyword rejection, per spec §6 ("unknown
/// keywords are ignored if annotation-only").
const ANNOTATION_KEYWORDS: &[&str] = &[
    "$comment",
    "title",
    "description",
    "default",
    "examples",
    "readOnly",
    "writeOnly",
    "deprecated",
    "$schema",
    "$id",
    "$anchor",
];

/// Keywords handled elsewhere in the pipeline (resolver) that may still be
/// physically present on an inlined schema node and must not be rejected.
const STRUCTURAL_KEYWORDS: &[&str] = &["$defs", "definitions"];

type Dyn<'ctx> = z3::ast::Dynamic<'ctx>;

/// Compile one (sub)schema — `true`/`false` boolean schemas or a schema
/// object — into a predicate over `x`.
pub(crate) fn compile_schema<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    schema: &Value,
    x: &Dyn<'ctx>,
    path: &str,
) -> Result<Bool<'ctx>, SubsumptionError> {
    match schema {
        Value::Bool(true) => Ok(Bool::from_bool(cc.ctx, true)),
        Value::Bool(false) => Ok(Bool::from_bool(cc.ctx, false)),
        Value::Object(obj) => compile_object(cc, obj, x, path),
        other => Err(SubsumptionError::InternalInvariant(format!(
            "schema at {path} is neither a boolean nor an object after inlining: {other}"
        ))),
    }
}

fn compile_object<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    obj: &Map<String, Value>,
    x: &Dyn<'ctx>,
    path: &str,
) -> Result<Bool<'ctx>, SubsumptionError> {
    let mut parts: Vec<Bool<'ctx>> = Vec::new();

    if let Some(t) = obj.get("type") {
        parts.push(compile_type(cc, t, x, path)?);
    }
    if let Some(v) = obj.get("const") {
        let lifted = cc.json.lift(v)?;
        let leaf = x._eq(&lifted);
        parts.push(cc.label(path, "const", leaf));
    }
    if let Some(Value::Array(variants)) = obj.get("enum") {
        let mut eqs = Vec::with_capacity(variants.len());
        for v in variants {
            eqs.push(x._eq(&cc.json.lift(v)?));
        }
        let refs: Vec<&Bool> = eqs.iter().collect();
        let leaf = Bool::or(cc.ctx, &refs);
        parts.push(cc.label(path, "enum", leaf));
    }

    compile_composition(cc, obj, x, path, &mut parts)?;
    compile_numeric(cc, obj, x, path, &mut parts)?;
    compile_string(cc, obj, x, path, &mut parts)?;
    compile_array(cc, obj, x, path, &mut parts)?;
    compile_object_keywords(cc, obj, x, path, &mut parts)?;

    for key in obj.keys() {
        if is_recognized_keyword(key) {
            continue;
        }
        return Err(SubsumptionError::UnsupportedKeyword {
            path: path.to_string(),
            keyword: key.clone(),
        });
    }

    if parts.is_empty() {
        Ok(Bool::from_bool(cc.ctx, true))
    } else {
        let refs: Vec<&Bool> = parts.iter().collect();
        Ok(Bool::and(cc.ctx, &refs))
    }
}

fn is_recognized_keyword(key: &str) -> bool {
    const HANDLED: &[&str] = &[
        "type",
        "const",
        "enum",
        "allOf",
        "anyOf",
        "oneOf",
        "not",
        "if",
        "then",
        "else",
        "minimum",
        "maximum",
        "exclusiveMinimum",
        "exclusiveMaximum",
        "multipleOf",
        "minLength",
        "maxLength",
        "pattern",
        "format",
        "minItems",
        "maxItems",
        "items",
        "prefixItems",
        "additionalItems",
        "contains",
        "uniqueItems",
        "required",
        "properties",
        "additionalProperties",
        "patternProperties",
        "propertyNames",
        "dependentRequired",
        "dependentSchemas",
        "minProperties",
        "maxProperties",
    ];
    HANDLED.contains(&key) || ANNOTATION_KEYWORDS.contains(&key) || STRUCTURAL_KEYWORDS.contains(&key)
}

// ---------------------------------------------------------------------------
// type
// ---------------------------------------------------------------------------

fn compile_type<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    type_val: &Value,
    x: &Dyn<'ctx>,
    path: &str,
) -> Result<Bool<'ctx>, SubsumptionError> {
    let names: Vec<&str> = match type_val {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().ok_or_else(|| SubsumptionError::UnsupportedKeyword {
                path: path.to_string(),
                keyword: "type (non-string element)".to_string(),
            }))
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(SubsumptionError::UnsupportedKeyword {
                path: path.to_string(),
                keyword: "type (malformed)".to_string(),
            })
        }
    };

    let mut recognizers = Vec::with_capacity(names.len());
    for name in names {
        recognizers.push(type_recognizer(cc.ctx, cc.json, name, x, path)?);
    }
    let refs: Vec<&Bool> = recognizers.iter().collect();
    let leaf = Bool::or(cc.ctx, &refs);
    Ok(cc.label(path, "type", leaf))
}

fn type_recognizer<'ctx>(
    ctx: &'ctx z3::Context,
    json: &JsonSort<'ctx>,
    name: &str,
    x: &Dyn<'ctx>,
    path: &str,
) -> Result<Bool<'ctx>, SubsumptionError> {
    match name {
        "null" => Ok(json.is_null(x)),
        "boolean" => Ok(json.is_bool(x)),
        "integer" => Ok(json.is_int(x)),
        "number" => Ok(Bool::or(ctx, &[&json.is_int(x), &json.is_real(x)])),
        "string" => Ok(json.is_str(x)),
        "array" => Ok(json.is_arr(x)),
        "object" => Ok(json.is_obj(x)),
        other => Err(SubsumptionError::UnsupportedKeyword {
            path: path.to_string(),
            keyword: format!("type:{other}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Composition: allOf / anyOf / oneOf / not / if-then-else
// ---------------------------------------------------------------------------

fn compile_composition<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    obj: &Map<String, Value>,
    x: &Dyn<'ctx>,
    path: &str,
    parts: &mut Vec<Bool<'ctx>>,
) -> Result<(), SubsumptionError> {
    if let Some(Value::Array(variants)) = obj.get("allOf") {
        for (i, v) in variants.iter().enumerate() {
            let child_path = crate::schema_utils::build_path(path, &["allOf", &i.to_string()]);
            parts.push(compile_schema(cc, v, x, &child_path)?);
        }
    }
    if let Some(Value::Array(variants)) = obj.get("anyOf") {
        let mut compiled = Vec::with_capacity(variants.len());
        for (i, v) in variants.iter().enumerate() {
            let child_path = crate::schema_utils::build_path(path, &["anyOf", &i.to_string()]);
            compiled.push(compile_schema(cc, v, x, &child_path)?);
        }
        let refs: Vec<&Bool> = compiled.iter().collect();
        parts.push(Bool::or(cc.ctx, &refs));
    }
    if let Some(Value::Array(variants)) = obj.get("oneOf") {
        let mut compiled = Vec::with_capacity(variants.len());
        for (i, v) in variants.iter().enumerate() {
            let child_path = crate::schema_utils::build_path(path, &["oneOf", &i.to_string()]);
            compiled.push(compile_schema(cc, v, x, &child_path)?);
        }
        let refs: Vec<&Bool> = compiled.iter().collect();
        let at_least_one = Bool::or(cc.ctx, &refs);

        let mut pairwise = Vec::new();
        for i in 0..compiled.len() {
            for j in (i + 1)..compiled.len() {
                pairwise.push(Bool::or(cc.ctx, &[&compiled[i].not(), &compiled[j].not()]));
            }
        }
        let pairwise_refs: Vec<&Bool> = pairwise.iter().collect();
        let at_most_one = Bool::and(cc.ctx, &pairwise_refs);

        parts.push(Bool::and(cc.ctx, &[&at_least_one, &at_most_one]));
    }
    if let Some(not_schema) = obj.get("not") {
        let child_path = crate::schema_utils::build_path(path, &["not"]);
        let inner = compile_schema(cc, not_schema, x, &child_path)?;
        parts.push(inner.not());
    }
    if let Some(if_schema) = obj.get("if") {
        let if_path = crate::schema_utils::build_path(path, &["if"]);
        let cond = compile_schema(cc, if_schema, x, &if_path)?;

        let then_pred = match obj.get("then") {
            Some(s) => compile_schema(cc, s, x, &crate::schema_utils::build_path(path, &["then"]))?,
            None => Bool::from_bool(cc.ctx, true),
        };
        let else_pred = match obj.get("else") {
            Some(s) => compile_schema(cc, s, x, &crate::schema_utils::build_path(path, &["else"]))?,
            None => Bool::from_bool(cc.ctx, true),
        };

        let forward = Bool::or(cc.ctx, &[&cond.not(), &then_pred]);
        let backward = Bool::or(cc.ctx, &[&cond, &else_pred]);
        parts.push(Bool::and(cc.ctx, &[&forward, &backward]));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Numeric keywords
// ---------------------------------------------------------------------------

/// All numeric comparisons are done in the `Real` domain: an integer value
/// is lifted via `to_real()` before comparing against a bound, so `minimum`
/// etc. need only one comparison, not a separate `Int`/`Real` case each
/// (spec §4.3: JSON's `number` type spans both representations).
fn compile_numeric<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    obj: &Map<String, Value>,
    x: &Dyn<'ctx>,
    path: &str,
    parts: &mut Vec<Bool<'ctx>>,
) -> Result<(), SubsumptionError> {
    let json = cc.json;
    let is_int = json.is_int(x);
    let is_real = json.is_real(x);
    let is_numeric = Bool::or(cc.ctx, &[&is_int, &is_real]);
    let as_real = is_int.ite(&json.int_val(x).to_real(), &json.real_val(x));

    if let Some(m) = obj.get("minimum") {
        push_numeric_bound(cc, path, "minimum", m, &as_real, &is_numeric, false, true, parts)?;
    }
    if let Some(m) = obj.get("maximum") {
        push_numeric_bound(cc, path, "maximum", m, &as_real, &is_numeric, false, false, parts)?;
    }
    if let Some(m) = obj.get("exclusiveMinimum") {
        push_numeric_bound(cc, path, "exclusiveMinimum", m, &as_real, &is_numeric, true, true, parts)?;
    }
    if let Some(m) = obj.get("exclusiveMaximum") {
        push_numeric_bound(cc, path, "exclusiveMaximum", m, &as_real, &is_numeric, true, false, parts)?;
    }
    if let Some(k) = obj.get("multipleOf") {
        let Some(k_int) = k.as_i64() else {
            // Real-valued multipleOf is rejected rather than unsoundly
            // approximated (spec §4.3, §9 (i)).
            return Err(SubsumptionError::UnsupportedKeyword {
                path: path.to_string(),
                keyword: "multipleOf (non-integer divisor)".to_string(),
            });
        };
        let divisor = Int::from_i64(cc.ctx, k_int);
        let zero = Int::from_i64(cc.ctx, 0);
        let remainder = json.int_val(x).modulo(&divisor);
        let divides = remainder._eq(&zero);
        let leaf = Bool::or(cc.ctx, &[&is_int.not(), &divides]);
        parts.push(cc.label(path, "multipleOf", leaf));
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn push_numeric_bound<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    path: &str,
    keyword: &str,
    bound: &Value,
    as_real: &Real<'ctx>,
    is_numeric: &Bool<'ctx>,
    strict: bool,
    is_min: bool,
    parts: &mut Vec<Bool<'ctx>>,
) -> Result<(), SubsumptionError> {
    let (num, den) = numeric_bound_rational(bound, path, keyword)?;
    let bound_real = Real::from_real(cc.ctx, num, den);

    let cmp = if is_min {
        if strict { as_real.gt(&bound_real) } else { as_real.ge(&bound_real) }
    } else if strict {
        as_real.lt(&bound_real)
    } else {
        as_real.le(&bound_real)
    };

    let leaf = Bool::or(cc.ctx, &[&is_numeric.not(), &cmp]);
    parts.push(cc.label(path, keyword, leaf));
    Ok(())
}

/// Decompose a `minimum`/`maximum`/`exclusiveMinimum`/`exclusiveMaximum`
/// literal into an exact `num/den` rational, rejecting anything that isn't
/// a plain JSON number (mirrors [`crate::json_encoder::decompose_decimal`]'s
/// exactness guarantee for `const`/`enum` literals).
fn numeric_bound_rational(value: &Value, path: &str, keyword: &str) -> Result<(i32, i32), SubsumptionError> {
    let Value::Number(n) = value else {
        return Err(SubsumptionError::UnsupportedKeyword {
            path: path.to_string(),
            keyword: keyword.to_string(),
        });
    };
    if let Some(i) = n.as_i64() {
        let num = i32::try_from(i).map_err(|_| SubsumptionError::BoundExceeded {
            detail: format!("{keyword} bound {i} exceeds supported i32 precision"),
            limit: i32::MAX as usize,
        })?;
        Ok((num, 1))
    } else {
        crate::json_encoder::decompose_decimal(n)
    }
}

// ---------------------------------------------------------------------------
// String keywords
// ---------------------------------------------------------------------------

fn compile_string<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    obj: &Map<String, Value>,
    x: &Dyn<'ctx>,
    path: &str,
    parts: &mut Vec<Bool<'ctx>>,
) -> Result<(), SubsumptionError> {
    let json = cc.json;
    let is_str = json.is_str(x);
    let str_len = json.str_val(x).length();

    if let Some(m) = obj.get("minLength").and_then(Value::as_u64) {
        let bound = Int::from_i64(cc.ctx, m as i64);
        let leaf = Bool::or(cc.ctx, &[&is_str.not(), &str_len.ge(&bound)]);
        parts.push(cc.label(path, "minLength", leaf));
    }
    if let Some(m) = obj.get("maxLength").and_then(Value::as_u64) {
        let bound = Int::from_i64(cc.ctx, m as i64);
        let leaf = Bool::or(cc.ctx, &[&is_str.not(), &str_len.le(&bound)]);
        parts.push(cc.label(path, "maxLength", leaf));
    }
    if let Some(Value::String(p)) = obj.get("pattern") {
        let re = compile_pattern(cc.ctx, p, path)?;
        let matches = json.str_val(x).regex_match(&re);
        let leaf = Bool::or(cc.ctx, &[&is_str.not(), &matches]);
        parts.push(cc.label(path, &format!("pattern:{p}"), leaf));
    }
    if let Some(Value::String(f)) = obj.get("format") {
        if let Some((re, max_len)) = compile_format(cc.ctx, f, path)? {
            let matches = json.str_val(x).regex_match(&re);
            let len_bound = Int::from_i64(cc.ctx, max_len as i64);
            let leaf = Bool::or(cc.ctx, &[&is_str.not(), &Bool::and(cc.ctx, &[&matches, &str_len.le(&len_bound)])]);
            parts.push(cc.label(path, &format!("format:{f}"), leaf));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Array keywords
// ---------------------------------------------------------------------------

fn compile_array<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    obj: &Map<String, Value>,
    x: &Dyn<'ctx>,
    path: &str,
    parts: &mut Vec<Bool<'ctx>>,
) -> Result<(), SubsumptionError> {
    let json = cc.json;
    let is_arr = json.is_arr(x);
    let len = json.arr_len(x);
    let max_len = json.universe().max_array_len();

    if let Some(m) = obj.get("minItems").and_then(Value::as_u64) {
        let bound = Int::from_i64(cc.ctx, m as i64);
        let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &len.ge(&bound)]);
        parts.push(cc.label(path, "minItems", leaf));
    }
    if let Some(m) = obj.get("maxItems").and_then(Value::as_u64) {
        let bound = Int::from_i64(cc.ctx, m as i64);
        let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &len.le(&bound)]);
        parts.push(cc.label(path, "maxItems", leaf));
    }

    let prefix = obj.get("prefixItems").and_then(Value::as_array);
    let tail_items = obj.get("items");

    // `additionalItems` only has defined meaning paired with the legacy
    // Draft 4-7 tuple form of `items` (handled below, in the `else` branch).
    // Any other combination (alongside `prefixItems`, or with `items` as a
    // single schema) has no translation here; rejecting rather than
    // silently dropping the keyword keeps the encoding sound.
    if obj.get("additionalItems").is_some()
        && !(prefix.is_none() && matches!(tail_items, Some(Value::Array(_))))
    {
        return Err(SubsumptionError::UnsupportedKeyword {
            path: path.to_string(),
            keyword: "additionalItems (only supported alongside a tuple-form `items`)".to_string(),
        });
    }

    if let Some(prefix) = prefix {
        for (i, sub) in prefix.iter().enumerate() {
            if i >= max_len {
                break;
            }
            let child_path = crate::schema_utils::build_path(path, &["prefixItems", &i.to_string()]);
            let elem = json.arr_elem(x, i);
            let idx_bound = Int::from_i64(cc.ctx, i as i64);
            let in_range = len.gt(&idx_bound);
            let sub_pred = compile_schema(cc, sub, &elem, &child_path)?;
            let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &in_range.not(), &sub_pred]);
            parts.push(leaf);
        }
        match tail_items {
            Some(tail) if tail.as_bool() != Some(false) => {
                let child_path = crate::schema_utils::build_path(path, &["items"]);
                for i in prefix.len()..max_len {
                    let elem = json.arr_elem(x, i);
                    let idx_bound = Int::from_i64(cc.ctx, i as i64);
                    let in_range = len.gt(&idx_bound);
                    let sub_pred = compile_schema(cc, tail, &elem, &child_path)?;
                    let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &in_range.not(), &sub_pred]);
                    parts.push(leaf);
                }
            }
            Some(_) => {
                // `items: false` after prefixItems — no further elements allowed.
                let bound = Int::from_i64(cc.ctx, prefix.len() as i64);
                let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &len.le(&bound)]);
                parts.push(cc.label(path, "items:false", leaf));
            }
            None => {
                let bound = Int::from_i64(cc.ctx, prefix.len() as i64);
                let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &len.le(&bound)]);
                parts.push(cc.label(path, "prefixItems(no tail)", leaf));
            }
        }
    } else if let Some(items) = tail_items {
        match items {
            Value::Array(tuple) => {
                // Draft 4-7 tuple form without prefixItems present.
                for (i, sub) in tuple.iter().enumerate() {
                    if i >= max_len {
                        break;
                    }
                    let child_path = crate::schema_utils::build_path(path, &["items", &i.to_string()]);
                    let elem = json.arr_elem(x, i);
                    let idx_bound = Int::from_i64(cc.ctx, i as i64);
                    let in_range = len.gt(&idx_bound);
                    let sub_pred = compile_schema(cc, sub, &elem, &child_path)?;
                    let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &in_range.not(), &sub_pred]);
                    parts.push(leaf);
                }
                // `additionalItems` (Draft 4-7) constrains elements beyond the
                // tuple — the same role `items` plays after `prefixItems` in
                // Draft 2020-12. Left unhandled, those positions would be
                // silently unconstrained, which is the over-approximation
                // spec §4.3 forbids.
                match obj.get("additionalItems") {
                    None | Some(Value::Bool(true)) => {}
                    Some(Value::Bool(false)) => {
                        let bound = Int::from_i64(cc.ctx, tuple.len() as i64);
                        let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &len.le(&bound)]);
                        parts.push(cc.label(path, "additionalItems:false", leaf));
                    }
                    Some(additional) => {
                        let child_path = crate::schema_utils::build_path(path, &["additionalItems"]);
                        for i in tuple.len()..max_len {
                            let elem = json.arr_elem(x, i);
                            let idx_bound = Int::from_i64(cc.ctx, i as i64);
                            let in_range = len.gt(&idx_bound);
                            let sub_pred = compile_schema(cc, additional, &elem, &child_path)?;
                            let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &in_range.not(), &sub_pred]);
                            parts.push(leaf);
                        }
                    }
                }
            }
            _ => {
                let child_path = crate::schema_utils::build_path(path, &["items"]);
                for i in 0..max_len {
                    let elem = json.arr_elem(x, i);
                    let idx_bound = Int::from_i64(cc.ctx, i as i64);
                    let in_range = len.gt(&idx_bound);
                    let sub_pred = compile_schema(cc, items, &elem, &child_path)?;
                    let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &in_range.not(), &sub_pred]);
                    parts.push(leaf);
                }
            }
        }
    }

    if let Some(contains_schema) = obj.get("contains") {
        let child_path = crate::schema_utils::build_path(path, &["contains"]);
        let mut disjuncts = Vec::with_capacity(max_len);
        for i in 0..max_len {
            let elem = json.arr_elem(x, i);
            let idx_bound = Int::from_i64(cc.ctx, i as i64);
            let in_range = len.gt(&idx_bound);
            let sub_pred = compile_schema(cc, contains_schema, &elem, &child_path)?;
            disjuncts.push(Bool::and(cc.ctx, &[&in_range, &sub_pred]));
        }
        let refs: Vec<&Bool> = disjuncts.iter().collect();
        let exists = Bool::or(cc.ctx, &refs);
        let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &exists]);
        parts.push(cc.label(path, "contains", leaf));
    }

    if obj.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
        let mut pairwise = Vec::new();
        for i in 0..max_len {
            for j in (i + 1)..max_len {
                let ei = json.arr_elem(x, i);
                let ej = json.arr_elem(x, j);
                let i_bound = Int::from_i64(cc.ctx, i as i64);
                let j_bound = Int::from_i64(cc.ctx, j as i64);
                let both_in_range = Bool::and(cc.ctx, &[&len.gt(&i_bound), &len.gt(&j_bound)]);
                let distinct = ei._eq(&ej).not();
                pairwise.push(Bool::or(cc.ctx, &[&both_in_range.not(), &distinct]));
            }
        }
        let refs: Vec<&Bool> = pairwise.iter().collect();
        let leaf = Bool::or(cc.ctx, &[&is_arr.not(), &Bool::and(cc.ctx, &refs)]);
        parts.push(cc.label(path, "uniqueItems", leaf));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Object keywords
// ---------------------------------------------------------------------------

fn compile_object_keywords<'ctx, 'a>(
    cc: &mut CompileCtx<'ctx, 'a>,
    obj: &Map<String, Value>,
    x: &Dyn<'ctx>,
    path: &str,
    parts: &mut Vec<Bool<'ctx>>,
) -> Result<(), SubsumptionError> {
    let is_obj = cc.json.is_obj(x);

    if let Some(Value::Array(required)) = obj.get("required") {
        for k in required {
            let Some(k) = k.as_str() else { continue };
            let has = cc.json.obj_has(x, k);
            let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has]);
            parts.push(cc.label(path, &format!("required:{k}"), leaf));
        }
    }

    let mut declared_keys: Vec<String> = Vec::new();
    if let Some(Value::Object(props)) = obj.get("properties") {
        for (k, sub) in props {
            declared_keys.push(k.clone());
            let child_path = crate::schema_utils::build_path(path, &["properties", k]);
            let val = cc.json.obj_val(x, k);
            let has = cc.json.obj_has(x, k);
            let sub_pred = compile_schema(cc, sub, &val, &child_path)?;
            let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has.not(), &sub_pred]);
            parts.push(leaf);
        }
    }

    if let Some(Value::Object(pattern_props)) = obj.get("patternProperties") {
        for (pattern, sub) in pattern_props {
            let matcher = static_pattern_matcher(pattern)?;
            let child_path = crate::schema_utils::build_path(path, &["patternProperties", pattern]);
            for key in cc.json.universe().keys().to_vec() {
                if !matcher.is_match(&key) {
                    continue;
                }
                let val = cc.json.obj_val(x, &key);
                let has = cc.json.obj_has(x, &key);
                let sub_pred = compile_schema(cc, sub, &val, &child_path)?;
                let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has.not(), &sub_pred]);
                parts.push(leaf);
            }
        }
    }

    if let Some(propname_schema) = obj.get("propertyNames") {
        let child_path = crate::schema_utils::build_path(path, &["propertyNames"]);
        for key in cc.json.universe().keys().to_vec() {
            let has = cc.json.obj_has(x, &key);
            let lifted_key = cc.json.mk_str(&key);
            let sub_pred = compile_schema(cc, propname_schema, &lifted_key, &child_path)?;
            let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has.not(), &sub_pred]);
            parts.push(leaf);
        }
    }

    if let Some(additional) = obj.get("additionalProperties") {
        let pattern_keys: Vec<String> = match obj.get("patternProperties") {
            Some(Value::Object(m)) => m.keys().cloned().collect(),
            _ => Vec::new(),
        };
        let mut matchers = Vec::with_capacity(pattern_keys.len());
        for p in &pattern_keys {
            matchers.push(static_pattern_matcher(p)?);
        }

        let child_path = crate::schema_utils::build_path(path, &["additionalProperties"]);
        for key in cc.json.universe().keys().to_vec() {
            if declared_keys.contains(&key) || matchers.iter().any(|m| m.is_match(&key)) {
                continue;
            }
            let has = cc.json.obj_has(x, &key);
            match additional {
                Value::Bool(false) => {
                    let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has.not()]);
                    parts.push(cc.label(path, &format!("additionalProperties:false:{key}"), leaf));
                }
                _ => {
                    let val = cc.json.obj_val(x, &key);
                    let sub_pred = compile_schema(cc, additional, &val, &child_path)?;
                    let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has.not(), &sub_pred]);
                    parts.push(leaf);
                }
            }
        }
    }

    if let Some(Value::Object(dep_req)) = obj.get("dependentRequired") {
        for (k, deps) in dep_req {
            let Value::Array(deps) = deps else { continue };
            let has_k = cc.json.obj_has(x, k);
            let mut has_deps = Vec::with_capacity(deps.len());
            for d in deps {
                if let Some(d) = d.as_str() {
                    has_deps.push(cc.json.obj_has(x, d));
                }
            }
            let has_deps_refs: Vec<&Bool> = has_deps.iter().collect();
            let all_deps = Bool::and(cc.ctx, &has_deps_refs);
            let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has_k.not(), &all_deps]);
            parts.push(cc.label(path, &format!("dependentRequired:{k}"), leaf));
        }
    }

    if let Some(Value::Object(dep_schemas)) = obj.get("dependentSchemas") {
        for (k, sub) in dep_schemas {
            let child_path = crate::schema_utils::build_path(path, &["dependentSchemas", k]);
            let has_k = cc.json.obj_has(x, k);
            let sub_pred = compile_schema(cc, sub, x, &child_path)?;
            let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &has_k.not(), &sub_pred]);
            parts.push(leaf);
        }
    }

    // minProperties / maxProperties (SPEC_FULL §2, spec §9 (iii)): encoded
    // as a sum over Keys of indicator integers, never as an existential
    // over strings.
    if obj.get("minProperties").is_some() || obj.get("maxProperties").is_some() {
        let one = Int::from_i64(cc.ctx, 1);
        let zero = Int::from_i64(cc.ctx, 0);
        let mut indicators = Vec::with_capacity(cc.json.universe().keys().len());
        for key in cc.json.universe().keys().to_vec() {
            let has = cc.json.obj_has(x, &key);
            indicators.push(has.ite(&one, &zero));
        }
        let refs: Vec<&Int> = indicators.iter().collect();
        let count = Int::add(cc.ctx, &refs);

        if let Some(m) = obj.get("minProperties").and_then(Value::as_u64) {
            let bound = Int::from_i64(cc.ctx, m as i64);
            let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &count.ge(&bound)]);
            parts.push(cc.label(path, "minProperties", leaf));
        }
        if let Some(m) = obj.get("maxProperties").and_then(Value::as_u64) {
            let bound = Int::from_i64(cc.ctx, m as i64);
            let leaf = Bool::or(cc.ctx, &[&is_obj.not(), &count.le(&bound)]);
            parts.push(cc.label(path, "maxProperties", leaf));
        }
    }

    Ok(())
}

/// Build a statically-evaluable matcher for a `patternProperties` key
/// against the sealed (finite, literal) `Keys` universe. Since every key in
/// the universe is a concrete, compile-time-known string, whether it
/// matches a pattern is decidable in plain Rust — no SMT `InRe` assertion
/// is needed for this gating (spec §4.3: "evaluated statically against the
/// fixed universe when possible").
fn static_pattern_matcher(pattern: &str) -> Result<regex::Regex, SubsumptionError> {
    regex::Regex::new(pattern).map_err(|e| SubsumptionError::UnsupportedRegex {
        path: "#/patternProperties".to_string(),
        detail: e.to_string(),
    })
}
