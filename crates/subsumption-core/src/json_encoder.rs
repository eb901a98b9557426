//! The tagged JSON value sort (spec §4.2) and the finite universes it is
//! parameterized by.
//!
//! A [`JsonSort`] wraps a Z3 recursive datatype with exactly seven variants —
//! `Null`, `Bool`, `Int`, `Real`, `Str`, `Arr`, `Obj` — mirroring the JSON
//! value model. Arrays are encoded as `(len, elem_0..elem_{N-1})` rather than
//! Z3's `Array` theory, and objects as `(has_k, val_k)` pairs over a closed,
//! run-sealed key universe, so that every quantifier the compiler would
//! otherwise need is instead a finite, bounded unrolling. This is what keeps
//! the whole translation in a decidable, quantifier-free fragment.
//!
//! [`JsonUniverse::seal`] computes `Keys` and `MAX_ARRAY_LEN` once per check,
//! by scanning both (already-inlined) schemas; [`JsonSort::new`] then builds
//! the datatype against that sealed universe.

use std::collections::BTreeSet;

use serde_json::Value;
use z3::ast::{Ast, Bool, Dynamic, Int, Real, String as Z3String};
use z3::{Context, DatatypeAccessor, DatatypeBuilder, DatatypeSort, Sort};

use crate::error::SubsumptionError;

/// Index of each variant within [`JsonSort`]'s underlying `DatatypeSort`.
/// Order matters only insofar as it must match the order `JsonSort::new`
/// registers variants in.
const VARIANT_NULL: usize = 0;
const VARIANT_BOOL: usize = 1;
const VARIANT_INT: usize = 2;
const VARIANT_REAL: usize = 3;
const VARIANT_STR: usize = 4;
const VARIANT_ARR: usize = 5;
const VARIANT_OBJ: usize = 6;

// ---------------------------------------------------------------------------
// Finite universes
// ---------------------------------------------------------------------------

/// The two run-scoped constants spec §3 requires be sealed once per check:
/// the closed key universe `Keys` and the array-length bound `MAX_ARRAY_LEN`.
#[derive(Debug, Clone)]
pub(crate) struct JsonUniverse {
    keys: Vec<String>,
    max_array_len: usize,
}

impl JsonUniverse {
    /// Seal the universe for one subsumption check: every property name
    /// reachable in either (already-inlined) schema, plus literal
    /// `patternProperties` probes where the pattern is effectively a literal
    /// string, plus every key appearing in a `const`/`enum` literal object
    /// (those need representable keys too, or equality against them could
    /// never be checked).
    pub fn seal(
        producer: &Value,
        consumer: &Value,
        max_array_length: usize,
    ) -> Result<Self, SubsumptionError> {
        let mut keys = BTreeSet::new();
        collect_keys(producer, &mut keys);
        collect_keys(consumer, &mut keys);

        Ok(Self {
            keys: keys.into_iter().collect(),
            max_array_len: max_array_length,
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn max_array_len(&self) -> usize {
        self.max_array_len
    }

    pub fn key_index(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }
}

/// Generic recursive key collector. Deliberately schema-shape-agnostic
/// (rather than keyword-aware like [`crate::schema_utils::recurse_into_children`])
/// because keys can occur inside `const`/`enum` literal objects as well as
/// in schema keywords like `properties`, and both need representation in
/// the sealed universe.
fn collect_keys(node: &Value, out: &mut BTreeSet<String>) {
    match node {
        Value::Object(obj) => {
            if let Some(Value::Object(props)) = obj.get("properties") {
                for key in props.keys() {
                    out.insert(key.clone());
                }
            }
            if let Some(Value::Array(req)) = obj.get("required") {
                for item in req {
                    if let Some(s) = item.as_str() {
                        out.insert(s.to_string());
                    }
                }
            }
            if let Some(Value::Object(dep_req)) = obj.get("dependentRequired") {
                for (key, deps) in dep_req {
                    out.insert(key.clone());
                    if let Value::Array(deps) = deps {
                        for d in deps {
                            if let Some(s) = d.as_str() {
                                out.insert(s.to_string());
                            }
                        }
                    }
                }
            }
            if let Some(Value::Object(dep_schemas)) = obj.get("dependentSchemas") {
                for key in dep_schemas.keys() {
                    out.insert(key.clone());
                }
            }
            if let Some(Value::Object(pattern_props)) = obj.get("patternProperties") {
                for pattern in pattern_props.keys() {
                    if let Some(probe) = literal_probe(pattern) {
                        out.insert(probe);
                    }
                }
            }
            if let Some(const_val) = obj.get("const") {
                collect_literal_keys(const_val, out);
            }
            if let Some(Value::Array(variants)) = obj.get("enum") {
                for variant in variants {
                    collect_literal_keys(variant, out);
                }
            }
            for val in obj.values() {
                collect_keys(val, out);
            }
        }
        Value::Array(arr) => {
            for item in arr {
                collect_keys(item, out);
            }
        }
        _ => {}
    }
}

/// Walk a `const`/`enum` literal by raw JSON structure rather than schema
/// keywords, inserting every object key found at any depth. Literals have no
/// keyword semantics of their own — an object appearing inside one is data,
/// not a sub-schema — so every key it carries still needs a slot in the
/// sealed universe or equality against it (via [`crate::JsonSort::lift`])
/// could never be checked.
fn collect_literal_keys(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(obj) => {
            for (key, val) in obj {
                out.insert(key.clone());
                collect_literal_keys(val, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_literal_keys(item, out);
            }
        }
        _ => {}
    }
}

/// If a `patternProperties` regex is, once its anchors are stripped, a plain
/// literal with no remaining regex metacharacters, synthesize that literal
/// as a probe key so at least one concrete key in the universe can exercise
/// the pattern. Patterns that are genuinely open (character classes,
/// alternation, repetition) get no probe — spec §9 (iv) requires only that
/// whatever extension is chosen stays consistent between producer and
/// consumer, which holds here since both sides share one [`JsonUniverse`].
fn literal_probe(pattern: &str) -> Option<String> {
    let stripped = pattern
        .strip_prefix('^')
        .unwrap_or(pattern)
        .strip_suffix('$')
        .unwrap_or_else(|| pattern.strip_prefix('^').unwrap_or(pattern));
    const METACHARS: &[char] = &[
        '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '\\', '^', '$',
    ];
    if stripped.is_empty() || stripped.chars().any(|c| METACHARS.contains(&c)) {
        None
    } else {
        Some(stripped.to_string())
    }
}

// ---------------------------------------------------------------------------
// JsonSort
// ---------------------------------------------------------------------------

/// The tagged JSON datatype, built fresh for one check against a sealed
/// [`JsonUniverse`]. Owns no solver state; purely a `Sort` plus the `FuncDecl`
/// handles needed to construct and destructure values of that sort.
pub(crate) struct JsonSort<'ctx> {
    ctx: &'ctx Context,
    datatype: DatatypeSort<'ctx>,
    universe: JsonUniverse,
}

impl<'ctx> JsonSort<'ctx> {
    /// Build the `Json` datatype: `Null | Bool(b) | Int(n) | Real(r) |
    /// Str(s) | Arr(len, elem_0..elem_{N-1}) | Obj(has_k1, val_k1, ...)`.
    ///
    /// Array and object arities depend on the sealed universe, so the
    /// datatype must be constructed dynamically per check rather than fixed
    /// at compile time.
    pub fn new(ctx: &'ctx Context, universe: JsonUniverse) -> Self {
        let self_ref = || DatatypeAccessor::Datatype("Json".into());

        let mut builder = DatatypeBuilder::new(ctx, "Json");
        builder = builder.variant("Null", vec![]);
        builder = builder.variant(
            "Bool",
            vec![("bool_val", DatatypeAccessor::Sort(Sort::bool(ctx)))],
        );
        builder = builder.variant(
            "Int",
            vec![("int_val", DatatypeAccessor::Sort(Sort::int(ctx)))],
        );
        builder = builder.variant(
            "Real",
            vec![("real_val", DatatypeAccessor::Sort(Sort::real(ctx)))],
        );
        builder = builder.variant(
            "Str",
            vec![("str_val", DatatypeAccessor::Sort(Sort::string(ctx)))],
        );

        let elem_names: Vec<String> = (0..universe.max_array_len())
            .map(|i| format!("elem_{i}"))
            .collect();
        let mut arr_fields = vec![("len", DatatypeAccessor::Sort(Sort::int(ctx)))];
        for name in &elem_names {
            arr_fields.push((name.as_str(), self_ref()));
        }
        builder = builder.variant("Arr", arr_fields);

        let mut key_field_names: Vec<(String, String)> = Vec::new();
        for key in universe.keys() {
            key_field_names.push((format!("has_{key}"), format!("val_{key}")));
        }
        let mut obj_fields = Vec::new();
        for (has_name, val_name) in &key_field_names {
            obj_fields.push((has_name.as_str(), DatatypeAccessor::Sort(Sort::bool(ctx))));
            obj_fields.push((val_name.as_str(), self_ref()));
        }
        builder = builder.variant("Obj", obj_fields);

        let datatype = builder.finish();

        Self {
            ctx,
            datatype,
            universe,
        }
    }

    pub fn universe(&self) -> &JsonUniverse {
        &self.universe
    }

    pub fn sort(&self) -> &Sort<'ctx> {
        &self.datatype.sort
    }

    /// The solver context this sort was built against. Exposed so later
    /// pipeline stages (the Solver Driver, spec §4.4) can build further
    /// terms — e.g. minimization objectives — without needing a second
    /// handle on the context passed into [`JsonSort::new`].
    pub(crate) fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    /// Declare a fresh free variable `x` of the `Json` sort.
    pub fn fresh_const(&self, prefix: &str) -> Dynamic<'ctx> {
        Dynamic::fresh_const(self.ctx, prefix, self.sort())
    }

    // --- Recognizers -------------------------------------------------------

    pub fn is_null(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.tester(VARIANT_NULL, x)
    }
    pub fn is_bool(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.tester(VARIANT_BOOL, x)
    }
    pub fn is_int(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.tester(VARIANT_INT, x)
    }
    pub fn is_real(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.tester(VARIANT_REAL, x)
    }
    pub fn is_str(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.tester(VARIANT_STR, x)
    }
    pub fn is_arr(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.tester(VARIANT_ARR, x)
    }
    pub fn is_obj(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.tester(VARIANT_OBJ, x)
    }

    fn tester(&self, variant: usize, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.datatype.variants[variant]
            .tester
            .apply(&[x])
            .as_bool()
            .expect("tester always returns Bool")
    }

    // --- Scalar accessors ----------------------------------------------------

    pub fn bool_val(&self, x: &Dynamic<'ctx>) -> Bool<'ctx> {
        self.datatype.variants[VARIANT_BOOL].accessors[0]
            .apply(&[x])
            .as_bool()
            .expect("bool_val always returns Bool")
    }

    pub fn int_val(&self, x: &Dynamic<'ctx>) -> Int<'ctx> {
        self.datatype.variants[VARIANT_INT].accessors[0]
            .apply(&[x])
            .as_int()
            .expect("int_val always returns Int")
    }

    pub fn real_val(&self, x: &Dynamic<'ctx>) -> Real<'ctx> {
        self.datatype.variants[VARIANT_REAL].accessors[0]
            .apply(&[x])
            .as_real()
            .expect("real_val always returns Real")
    }

    pub fn str_val(&self, x: &Dynamic<'ctx>) -> Z3String<'ctx> {
        self.datatype.variants[VARIANT_STR].accessors[0]
            .apply(&[x])
            .as_string()
            .expect("str_val always returns String")
    }

    // --- Array accessors -----------------------------------------------------

    pub fn arr_len(&self, x: &Dynamic<'ctx>) -> Int<'ctx> {
        self.datatype.variants[VARIANT_ARR].accessors[0]
            .apply(&[x])
            .as_int()
            .expect("len always returns Int")
    }

    /// `elems(x, i)` for a statically known index `i < MAX_ARRAY_LEN`.
    pub fn arr_elem(&self, x: &Dynamic<'ctx>, i: usize) -> Dynamic<'ctx> {
        assert!(i < self.universe.max_array_len(), "array index out of bound");
        self.datatype.variants[VARIANT_ARR].accessors[1 + i].apply(&[x])
    }

    // --- Object accessors ----------------------------------------------------

    /// `has(x, k)` for a key in the sealed universe.
    pub fn obj_has(&self, x: &Dynamic<'ctx>, key: &str) -> Bool<'ctx> {
        let idx = self.key_accessor_index(key);
        self.datatype.variants[VARIANT_OBJ].accessors[idx]
            .apply(&[x])
            .as_bool()
            .expect("has always returns Bool")
    }

    /// `val(x, k)` for a key in the sealed universe.
    pub fn obj_val(&self, x: &Dynamic<'ctx>, key: &str) -> Dynamic<'ctx> {
        let idx = self.key_accessor_index(key) + 1;
        self.datatype.variants[VARIANT_OBJ].accessors[idx].apply(&[x])
    }

    fn key_accessor_index(&self, key: &str) -> usize {
        let pos = self
            .universe
            .key_index(key)
            .unwrap_or_else(|| panic!("key '{key}' outside the sealed universe"));
        2 * pos
    }

    // --- Constructors --------------------------------------------------------

    pub fn mk_null(&self) -> Dynamic<'ctx> {
        self.datatype.variants[VARIANT_NULL].constructor.apply(&[])
    }

    pub fn mk_bool(&self, b: bool) -> Dynamic<'ctx> {
        let lit = Bool::from_bool(self.ctx, b);
        self.datatype.variants[VARIANT_BOOL]
            .constructor
            .apply(&[&lit])
    }

    pub fn mk_int(&self, n: i64) -> Dynamic<'ctx> {
        let lit = Int::from_i64(self.ctx, n);
        self.datatype.variants[VARIANT_INT]
            .constructor
            .apply(&[&lit])
    }

    /// Construct a `Real` value from an exact rational `num/den`.
    pub fn mk_real(&self, num: i32, den: i32) -> Dynamic<'ctx> {
        let lit = Real::from_real(self.ctx, num, den);
        self.datatype.variants[VARIANT_REAL]
            .constructor
            .apply(&[&lit])
    }

    pub fn mk_str(&self, s: &str) -> Dynamic<'ctx> {
        let lit = Z3String::from_str(self.ctx, s).expect("string literal has no interior NUL");
        self.datatype.variants[VARIANT_STR]
            .constructor
            .apply(&[&lit])
    }

    /// Construct an `Arr` value. `elems` must have length `<= MAX_ARRAY_LEN`;
    /// slots beyond `elems.len()` are padded with `Null` (unconstrained by
    /// any predicate that respects `len`, per spec §4.2's invariant that
    /// indices `>= len` are unconstrained — the padding value is never
    /// observed by a sound compiled predicate).
    pub fn mk_arr(&self, elems: &[Dynamic<'ctx>]) -> Dynamic<'ctx> {
        let max_len = self.universe.max_array_len();
        assert!(elems.len() <= max_len, "array literal exceeds MAX_ARRAY_LEN");

        let len_lit = Int::from_i64(self.ctx, elems.len() as i64);
        let mut args: Vec<&dyn Ast<'ctx>> = vec![&len_lit];
        let null = self.mk_null();
        let mut padded: Vec<Dynamic<'ctx>> = elems.to_vec();
        padded.resize_with(max_len, || null.clone());
        for e in &padded {
            args.push(e);
        }
        self.datatype.variants[VARIANT_ARR].constructor.apply(&args)
    }

    /// Construct an `Obj` value from the subset of keys that are present.
    /// Every key in the universe gets a `has`/`val` slot; keys not in
    /// `present` get `has = false`, `val = Null`.
    pub fn mk_obj(&self, present: &std::collections::HashMap<String, Dynamic<'ctx>>) -> Dynamic<'ctx> {
        let true_lit = Bool::from_bool(self.ctx, true);
        let false_lit = Bool::from_bool(self.ctx, false);
        let null = self.mk_null();

        let mut has_lits: Vec<Bool<'ctx>> = Vec::new();
        let mut val_dyns: Vec<Dynamic<'ctx>> = Vec::new();
        for key in self.universe.keys() {
            match present.get(key) {
                Some(v) => {
                    has_lits.push(true_lit.clone());
                    val_dyns.push(v.clone());
                }
                None => {
                    has_lits.push(false_lit.clone());
                    val_dyns.push(null.clone());
                }
            }
        }

        let mut args: Vec<&dyn Ast<'ctx>> = Vec::new();
        for (has, val) in has_lits.iter().zip(val_dyns.iter()) {
            args.push(has);
            args.push(val);
        }
        self.datatype.variants[VARIANT_OBJ].constructor.apply(&args)
    }

    // --- Literal lifting -------------------------------------------------------

    /// Lift a JSON literal into a value of the `Json` sort, producing a value
    /// suitable for an equality predicate (`const`, `enum`). Rejects literals
    /// whose arrays exceed `MAX_ARRAY_LEN` or whose object keys fall outside
    /// the sealed `Keys` universe — per spec §4.2, the caller must reseal the
    /// universe and retry rather than have the lifter silently drop content.
    pub fn lift(&self, value: &Value) -> Result<Dynamic<'ctx>, SubsumptionError> {
        match value {
            Value::Null => Ok(self.mk_null()),
            Value::Bool(b) => Ok(self.mk_bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(self.mk_int(i))
                } else {
                    let (num, den) = decompose_decimal(n)?;
                    Ok(self.mk_real(num, den))
                }
            }
            Value::String(s) => Ok(self.mk_str(s)),
            Value::Array(items) => {
                if items.len() > self.universe.max_array_len() {
                    return Err(SubsumptionError::BoundExceeded {
                        detail: format!(
                            "literal array of length {} exceeds MAX_ARRAY_LEN",
                            items.len()
                        ),
                        limit: self.universe.max_array_len(),
                    });
                }
                let lifted: Result<Vec<_>, _> = items.iter().map(|v| self.lift(v)).collect();
                Ok(self.mk_arr(&lifted?))
            }
            Value::Object(obj) => {
                let mut present = std::collections::HashMap::new();
                for (key, val) in obj {
                    if self.universe.key_index(key).is_none() {
                        return Err(SubsumptionError::BoundExceeded {
                            detail: format!(
                                "literal object key '{key}' falls outside the sealed Keys universe"
                            ),
                            limit: self.universe.keys().len(),
                        });
                    }
                    present.insert(key.clone(), self.lift(val)?);
                }
                Ok(self.mk_obj(&present))
            }
        }
    }
}

/// Decompose a non-integral JSON number into an exact `num/den` rational by
/// reading its textual representation (decimal digits after the point),
/// rather than round-tripping through `f64` and losing precision.
pub(crate) fn decompose_decimal(n: &serde_json::Number) -> Result<(i32, i32), SubsumptionError> {
    let text = n.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1i32, rest),
        None => (1i32, text.as_str()),
    };
    let Some((int_part, frac_part)) = digits.split_once('.') else {
        let i: i32 = digits.parse().map_err(|_| SubsumptionError::InternalInvariant(
            format!("number literal '{text}' is neither integral nor decomposable"),
        ))?;
        return Ok((sign * i, 1));
    };
    // Reject exponent notation and anything not plain decimal — real
    // multipleOf and exotic literal magnitudes are out of scope (spec §9 (i)).
    if frac_part.contains(['e', 'E']) {
        return Err(SubsumptionError::UnsupportedKeyword {
            path: "#".to_string(),
            keyword: "const/enum (scientific-notation real literal)".to_string(),
        });
    }
    let den = 10i32.checked_pow(frac_part.len() as u32).ok_or_else(|| {
        SubsumptionError::BoundExceeded {
            detail: format!("real literal '{text}' has too many decimal digits"),
            limit: 9,
        }
    })?;
    let combined = format!("{int_part}{frac_part}");
    let num: i32 = combined
        .parse()
        .map_err(|_| SubsumptionError::BoundExceeded {
            detail: format!("real literal '{text}' exceeds supported precision"),
            limit: 9,
        })?;
    Ok((sign * num, den))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seal_collects_property_and_required_keys() {
        let producer = json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": { "a": {"type": "string"}, "c": {"type": "integer"} }
        });
        let consumer = json!({ "properties": { "d": {} } });
        let universe = JsonUniverse::seal(&producer, &consumer, 10).unwrap();
        for k in ["a", "b", "c", "d"] {
            assert!(universe.key_index(k).is_some(), "missing key {k}");
        }
    }

    #[test]
    fn seal_adds_literal_pattern_property_probe() {
        let producer = json!({
            "patternProperties": { "status": { "type": "string" } }
        });
        let universe = JsonUniverse::seal(&producer, &json!({}), 10).unwrap();
        assert_eq!(universe.key_index("status"), Some(0));
    }

    #[test]
    fn seal_skips_probe_for_non_literal_pattern() {
        let producer = json!({
            "patternProperties": { "^x-.*$": { "type": "string" } }
        });
        let universe = JsonUniverse::seal(&producer, &json!({}), 10).unwrap();
        assert!(universe.keys().is_empty());
    }

    #[test]
    fn seal_collects_keys_from_const_object_literal() {
        let producer = json!({ "const": { "a": 1, "nested": { "b": 2 } } });
        let universe = JsonUniverse::seal(&producer, &json!({}), 10).unwrap();
        for k in ["a", "nested", "b"] {
            assert!(universe.key_index(k).is_some(), "missing key {k}");
        }
    }

    #[test]
    fn seal_collects_keys_from_enum_object_literals() {
        let producer = json!({
            "enum": [{ "a": 1 }, { "c": [{ "d": 2 }] }]
        });
        let universe = JsonUniverse::seal(&producer, &json!({}), 10).unwrap();
        for k in ["a", "c", "d"] {
            assert!(universe.key_index(k).is_some(), "missing key {k}");
        }
    }

    #[test]
    fn decompose_decimal_preserves_exact_fraction() {
        let n = serde_json::Number::from_f64(3.14).unwrap();
        let (num, den) = decompose_decimal(&n).unwrap();
        assert!((num as f64 / den as f64 - 3.14).abs() < 1e-9);
    }

    #[test]
    fn lift_rejects_array_over_bound() {
        let cfg = z3::Config::new();
        let ctx = Context::new(&cfg);
        let universe = JsonUniverse::seal(&json!({}), &json!({}), 2).unwrap();
        let sort = JsonSort::new(&ctx, universe);
        let err = sort.lift(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.error_code(), crate::error::ErrorCode::BoundExceeded);
    }

    #[test]
    fn lift_rejects_key_outside_universe() {
        let cfg = z3::Config::new();
        let ctx = Context::new(&cfg);
        let universe = JsonUniverse::seal(&json!({"properties": {"a": {}}}), &json!({}), 10).unwrap();
        let sort = JsonSort::new(&ctx, universe);
        let err = sort.lift(&json!({"unknown_key": 1})).unwrap_err();
        assert_eq!(err.error_code(), crate::error::ErrorCode::BoundExceeded);
    }

    #[test]
    fn lift_and_recognize_round_trip_for_each_variant() {
        let cfg = z3::Config::new();
        let ctx = Context::new(&cfg);
        let universe = JsonUniverse::seal(&json!({"properties": {"k": {}}}), &json!({}), 4).unwrap();
        let sort = JsonSort::new(&ctx, universe);
        let solver = z3::Solver::new(&ctx);

        let cases = vec![
            (json!(null), "is_null"),
            (json!(true), "is_bool"),
            (json!(7), "is_int"),
            (json!(2.5), "is_real"),
            (json!("hi"), "is_str"),
            (json!([1, 2]), "is_arr"),
            (json!({"k": 1}), "is_obj"),
        ];

        for (literal, expected) in cases {
            let lifted = sort.lift(&literal).unwrap();
            let recognized = match expected {
                "is_null" => sort.is_null(&lifted),
                "is_bool" => sort.is_bool(&lifted),
                "is_int" => sort.is_int(&lifted),
                "is_real" => sort.is_real(&lifted),
                "is_str" => sort.is_str(&lifted),
                "is_arr" => sort.is_arr(&lifted),
                "is_obj" => sort.is_obj(&lifted),
                _ => unreachable!(),
            };
            solver.push();
            solver.assert(&recognized.not());
            assert_eq!(solver.check(), z3::SatResult::Unsat, "{expected} failed for {literal}");
            solver.pop(1);
        }
    }
}
