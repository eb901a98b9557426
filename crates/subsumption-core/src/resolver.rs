//! Reference Resolver (spec §4.1).
//!
//! Builds a definition registry for a raw schema document, detects cycles in
//! the `$ref` graph via Tarjan's strongly-connected-components algorithm, and
//! either rejects the schema with a named-cycle diagnostic or produces a
//! fully inlined schema with no `$ref` remaining.
//!
//! [`ResolverEngine`] is the single point of truth for resolving an
//! individual `$ref` string (JSON Pointer, `$anchor`, or external URL) into a
//! canonical JSON Pointer or an `Unresolvable` verdict. It encapsulates:
//! - The anchor map (`$anchor` → JSON Pointer)
//! - The root `$id` base URI
//! - The root schema document (for pointer lookups)

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::SubsumptionError;
use crate::schema_utils::{build_path, recurse_into_children};

// Re-export types that consumers need
pub(crate) use crate::anchor_utils::ResolvedRef;

// ---------------------------------------------------------------------------
// ResolverEngine
// ---------------------------------------------------------------------------

/// Centralized reference resolution engine for a JSON Schema document.
///
/// Create one per schema document, then call [`resolve`] to resolve `$ref`
/// strings into JSON Pointer paths.
pub(crate) struct ResolverEngine {
    anchor_map: HashMap<String, String>,
    base_uri: Url,
}

impl ResolverEngine {
    /// Build a resolver for the given schema document.
    ///
    /// * Scans for `$anchor` declarations (respecting `$id` base URI scoping)
    /// * Extracts the root `$id` as the base URI (falls back to default)
    pub fn new(schema: &Value) -> Result<Self, SubsumptionError> {
        let default_base = crate::anchor_utils::default_base_uri();
        let base_uri = if let Some(id_val) = schema.get("$id").and_then(Value::as_str) {
            default_base.join(id_val).unwrap_or(default_base)
        } else {
            default_base
        };
        let default_anchor_base = crate::anchor_utils::default_base_uri();
        let anchor_map = crate::anchor_utils::build_anchor_map(schema, Some(&default_anchor_base))?;
        Ok(Self {
            anchor_map,
            base_uri,
        })
    }

    /// Resolve a `$ref` string against the current base URI.
    ///
    /// - JSON Pointer refs (`#/...`, `#`) pass through as `Pointer`.
    /// - Anchor-style refs (`#anchor`) are looked up in the anchor map.
    /// - Unresolvable refs (external URLs, unknown anchors) → `Unresolvable`.
    pub fn resolve(&self, ref_str: &str, current_base: &Url) -> ResolvedRef {
        crate::anchor_utils::resolve_ref(ref_str, current_base, &self.anchor_map)
    }

    /// Compute the lexical base URI for the PARENT of a JSON Pointer by walking
    /// from the root down to the parent, accumulating `$id` scopes.
    pub fn parent_base_uri_for_pointer(&self, root_schema: &Value, pointer: &str) -> Url {
        let mut current_base = crate::anchor_utils::default_base_uri();

        let stripped = pointer.strip_prefix('#').unwrap_or(pointer);
        if stripped.is_empty() || stripped == "/" {
            return current_base;
        }

        let mut current_node = root_schema;
        if let Some(id_val) = current_node.get("$id").and_then(Value::as_str) {
            if let Ok(new_base) = current_base.join(id_val) {
                current_base = new_base;
            }
        }

        let segments: Vec<&str> = stripped.split('/').filter(|s| !s.is_empty()).collect();
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            let unescaped = segment.replace("~1", "/").replace("~0", "~");
            current_node = match current_node {
                Value::Object(obj) => match obj.get(&unescaped) {
                    Some(child) => child,
                    None => break,
                },
                Value::Array(arr) => match unescaped.parse::<usize>().ok().and_then(|i| arr.get(i))
                {
                    Some(child) => child,
                    None => break,
                },
                _ => break,
            };

            if let Some(id_val) = current_node.get("$id").and_then(Value::as_str) {
                if let Ok(new_base) = current_base.join(id_val) {
                    current_base = new_base;
                }
            }
        }

        current_base
    }

    /// The root base URI for this schema document.
    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }
}

// ---------------------------------------------------------------------------
// Schema registry
// ---------------------------------------------------------------------------

/// A mapping from JSON Pointer (`#/$defs/X`, `#/definitions/Y`, or the
/// document root `#`) to the raw, not-yet-inlined schema body at that
/// location, plus the `$ref` edges collected between them.
///
/// The root is registered under `#` so that a `$ref` to the whole document
/// participates in cycle detection like any other reference.
pub(crate) struct SchemaRegistry {
    definitions: HashMap<String, Value>,
    edges: HashMap<String, HashSet<String>>,
}

const ROOT_POINTER: &str = "#";

/// Recursively collect every `$defs`/`definitions` entry, keyed by its JSON
/// Pointer. `$defs` may themselves nest further `$defs`, so the scan
/// continues into registered bodies too.
fn collect_definitions(node: &Value, path: &str, out: &mut HashMap<String, Value>) {
    match node {
        Value::Object(obj) => {
            for keyword in ["$defs", "definitions"] {
                if let Some(Value::Object(defs)) = obj.get(keyword) {
                    for (name, body) in defs {
                        let pointer = build_path(path, &[keyword, name]);
                        out.insert(pointer.clone(), body.clone());
                        collect_definitions(body, &pointer, out);
                    }
                }
            }
            for (key, val) in obj {
                if key == "$defs" || key == "definitions" {
                    continue;
                }
                collect_definitions(val, &build_path(path, &[key]), out);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                collect_definitions(item, &build_path(path, &[&i.to_string()]), out);
            }
        }
        _ => {}
    }
}

/// Resolve a `$ref` string to a canonical JSON Pointer, or a structured
/// [`SubsumptionError::UnresolvedReference`] if it names an external URL,
/// an unknown anchor, or a pointer the registry does not contain.
fn resolve_ref_pointer(
    ref_str: &str,
    at_path: &str,
    base: &Url,
    resolver: &ResolverEngine,
) -> Result<String, SubsumptionError> {
    match resolver.resolve(ref_str, base) {
        ResolvedRef::Pointer(p) => Ok(p),
        ResolvedRef::Unresolvable(reference) => Err(SubsumptionError::UnresolvedReference {
            path: at_path.to_string(),
            reference,
        }),
    }
}

/// Walk the whole document collecting `$ref` edges. `owner` is the nearest
/// enclosing definition pointer (or `#` at the root) — the node the edge is
/// drawn *from*, per spec §4.1 step (2).
#[allow(clippy::too_many_arguments)]
fn collect_edges(
    node: &Value,
    path: &str,
    owner: &str,
    base: &Url,
    resolver: &ResolverEngine,
    registry: &HashMap<String, Value>,
    edges: &mut HashMap<String, HashSet<String>>,
) -> Result<(), SubsumptionError> {
    let obj = match node {
        Value::Object(obj) => obj,
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                collect_edges(
                    item,
                    &build_path(path, &[&i.to_string()]),
                    owner,
                    base,
                    resolver,
                    registry,
                    edges,
                )?;
            }
            return Ok(());
        }
        _ => return Ok(()),
    };

    let scoped_base = match obj.get("$id").and_then(Value::as_str) {
        Some(id) => base.join(id).unwrap_or_else(|_| base.clone()),
        None => base.clone(),
    };

    if let Some(Value::String(reference)) = obj.get("$ref") {
        let pointer = resolve_ref_pointer(reference, path, &scoped_base, resolver)?;
        if !registry.contains_key(&pointer) {
            return Err(SubsumptionError::UnresolvedReference {
                path: path.to_string(),
                reference: reference.clone(),
            });
        }
        edges.entry(owner.to_string()).or_default().insert(pointer);
    }

    for keyword in ["$defs", "definitions"] {
        if let Some(Value::Object(defs)) = obj.get(keyword) {
            for (name, body) in defs {
                let pointer = build_path(path, &[keyword, name]);
                edges.entry(pointer.clone()).or_default();
                collect_edges(
                    body,
                    &pointer,
                    &pointer,
                    &scoped_base,
                    resolver,
                    registry,
                    edges,
                )?;
            }
        }
    }

    for (key, val) in obj {
        if key == "$defs" || key == "definitions" || key == "$ref" {
            continue;
        }
        collect_edges(
            val,
            &build_path(path, &[key]),
            owner,
            &scoped_base,
            resolver,
            registry,
            edges,
        )?;
    }

    Ok(())
}

impl SchemaRegistry {
    /// Build the registry and edge graph for a raw schema document
    /// (spec §4.1 steps 1–2).
    pub fn build(
        raw: &Value,
        resolver: &ResolverEngine,
    ) -> Result<Self, SubsumptionError> {
        let mut definitions = HashMap::new();
        definitions.insert(ROOT_POINTER.to_string(), raw.clone());
        collect_definitions(raw, ROOT_POINTER, &mut definitions);

        let mut edges: HashMap<String, HashSet<String>> = HashMap::new();
        edges.entry(ROOT_POINTER.to_string()).or_default();
        collect_edges(
            raw,
            ROOT_POINTER,
            ROOT_POINTER,
            resolver.base_uri(),
            resolver,
            &definitions,
            &mut edges,
        )?;

        Ok(Self { definitions, edges })
    }
}

// ---------------------------------------------------------------------------
// Cycle detection — Tarjan's strongly-connected-components
// ---------------------------------------------------------------------------

struct Tarjan<'a> {
    edges: &'a HashMap<String, HashSet<String>>,
    index_counter: usize,
    stack: Vec<String>,
    on_stack: HashSet<String>,
    indices: HashMap<String, usize>,
    lowlink: HashMap<String, usize>,
    sccs: Vec<Vec<String>>,
}

impl<'a> Tarjan<'a> {
    fn new(edges: &'a HashMap<String, HashSet<String>>) -> Self {
        Self {
            edges,
            index_counter: 0,
            stack: Vec::new(),
            on_stack: HashSet::new(),
            indices: HashMap::new(),
            lowlink: HashMap::new(),
            sccs: Vec::new(),
        }
    }

    fn run(mut self, vertices: &[String]) -> Vec<Vec<String>> {
        for v in vertices {
            if !self.indices.contains_key(v) {
                self.strongconnect(v.clone());
            }
        }
        self.sccs
    }

    fn strongconnect(&mut self, v: String) {
        self.indices.insert(v.clone(), self.index_counter);
        self.lowlink.insert(v.clone(), self.index_counter);
        self.index_counter += 1;
        self.stack.push(v.clone());
        self.on_stack.insert(v.clone());

        if let Some(successors) = self.edges.get(&v).cloned() {
            for w in successors {
                if !self.indices.contains_key(&w) {
                    self.strongconnect(w.clone());
                    let wl = self.lowlink[&w];
                    let vl = self.lowlink[&v];
                    self.lowlink.insert(v.clone(), vl.min(wl));
                } else if self.on_stack.contains(&w) {
                    let wi = self.indices[&w];
                    let vl = self.lowlink[&v];
                    self.lowlink.insert(v.clone(), vl.min(wi));
                }
            }
        }

        if self.lowlink[&v] == self.indices[&v] {
            let mut component = Vec::new();
            loop {
                let w = self.stack.pop().expect("strongconnect: stack underflow");
                self.on_stack.remove(&w);
                let done = w == v;
                component.push(w);
                if done {
                    break;
                }
            }
            self.sccs.push(component);
        }
    }
}

/// Order a strongly-connected component as a cycle path starting from its
/// first node: `A -> B -> C -> A`, by greedily following edges that stay
/// inside the component.
fn order_cycle(component: &[String], edges: &HashMap<String, HashSet<String>>) -> Vec<String> {
    if component.len() == 1 {
        return vec![component[0].clone(), component[0].clone()];
    }
    let in_component: HashSet<&String> = component.iter().collect();
    let mut path = vec![component[0].clone()];
    let mut current = &component[0];
    loop {
        let next = edges
            .get(current)
            .and_then(|succs| succs.iter().find(|s| in_component.contains(s) && (*s != current || path.len() == component.len())));
        match next {
            Some(n) if n == &component[0] => {
                path.push(n.clone());
                break;
            }
            Some(n) if !path.contains(n) => {
                path.push(n.clone());
                current = n;
            }
            _ => {
                path.push(component[0].clone());
                break;
            }
        }
        if path.len() > component.len() + 1 {
            break;
        }
    }
    path
}

/// Find every cycle in the `$ref` graph: any SCC of size > 1, or any node
/// with a self-loop (spec §4.1 step 3).
fn find_cycles(registry: &SchemaRegistry) -> Vec<Vec<String>> {
    let vertices: Vec<String> = registry.definitions.keys().cloned().collect();
    let sccs = Tarjan::new(&registry.edges).run(&vertices);

    sccs.into_iter()
        .filter_map(|component| {
            let is_cycle = component.len() > 1
                || registry
                    .edges
                    .get(&component[0])
                    .is_some_and(|succs| succs.contains(&component[0]));
            is_cycle.then(|| order_cycle(&component, &registry.edges))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Inlining
// ---------------------------------------------------------------------------

/// Inline one definition, memoizing fully-inlined bodies so that each
/// definition is substituted at most once regardless of fan-in (spec §4.1
/// step 5: "reverse topological order with memoization"). Recursion order
/// naturally visits a definition's dependencies before the definition
/// itself, which is exactly reverse-topological.
fn inline_definition(
    pointer: &str,
    registry: &SchemaRegistry,
    resolver: &ResolverEngine,
    root_schema: &Value,
    memo: &mut HashMap<String, Value>,
) -> Result<Value, SubsumptionError> {
    if let Some(cached) = memo.get(pointer) {
        return Ok(cached.clone());
    }

    let body = registry.definitions.get(pointer).cloned().ok_or_else(|| {
        SubsumptionError::InternalInvariant(format!(
            "inline_definition: {pointer} missing from registry after cycle check"
        ))
    })?;

    let base = resolver.parent_base_uri_for_pointer(root_schema, pointer);
    let inlined = substitute(body, registry, resolver, root_schema, &base, memo)?;
    memo.insert(pointer.to_string(), inlined.clone());
    Ok(inlined)
}

/// Replace every `$ref` occurrence in `value` with a deep copy of its
/// (already-inlined) target.
///
/// Draft 2019-09 permits keywords alongside `$ref` in the same schema
/// object (unlike Draft 7, where `$ref` was exclusive). To avoid silently
/// dropping sibling constraints — forbidden by spec §4.3's "no silent
/// over-approximation" rule — a `$ref` with siblings becomes
/// `allOf: [<inlined $ref target>, <siblings>]`, which preserves the
/// conjunctive semantics without guessing at a merge spec.md leaves open.
fn substitute(
    value: Value,
    registry: &SchemaRegistry,
    resolver: &ResolverEngine,
    root_schema: &Value,
    base: &Url,
    memo: &mut HashMap<String, Value>,
) -> Result<Value, SubsumptionError> {
    let Value::Object(mut obj) = value else {
        return Ok(value);
    };

    if let Some(Value::String(reference)) = obj.get("$ref").cloned() {
        let pointer = resolve_ref_pointer(&reference, "#", base, resolver)?;
        let inlined_target = inline_definition(&pointer, registry, resolver, root_schema, memo)?;

        obj.remove("$ref");
        obj.remove("$defs");
        obj.remove("definitions");

        if obj.is_empty() {
            return Ok(inlined_target);
        }

        substitute_children(&mut obj, registry, resolver, root_schema, base, memo)?;
        return Ok(serde_json::json!({ "allOf": [inlined_target, Value::Object(obj)] }));
    }

    obj.remove("$defs");
    obj.remove("definitions");
    substitute_children(&mut obj, registry, resolver, root_schema, base, memo)?;
    Ok(Value::Object(obj))
}

fn substitute_children(
    obj: &mut Map<String, Value>,
    registry: &SchemaRegistry,
    resolver: &ResolverEngine,
    root_schema: &Value,
    base: &Url,
    memo: &mut HashMap<String, Value>,
) -> Result<(), SubsumptionError> {
    // `recurse_into_children` wants a `FnMut(&Value, &str, usize) -> Result<Value, _>`;
    // it owns the path-building, we own the substitution.
    let scoped_base = match obj.get("$id").and_then(Value::as_str) {
        Some(id) => base.join(id).unwrap_or_else(|_| base.clone()),
        None => base.clone(),
    };
    recurse_into_children(obj, "#", 0, &mut |child, _path, _depth| {
        substitute(child.clone(), registry, resolver, root_schema, &scoped_base, memo)
    })
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Resolve a raw schema document: build the registry, detect cycles, and
/// either reject with a [`SubsumptionError::CyclicSchema`] or return the
/// fully inlined schema (spec §4.1).
pub(crate) fn resolve_schema(raw: &Value) -> Result<Value, SubsumptionError> {
    let resolver = ResolverEngine::new(raw)?;
    let registry = SchemaRegistry::build(raw, &resolver)?;

    let cycles = find_cycles(&registry);
    if !cycles.is_empty() {
        debug!(cycle_count = cycles.len(), "cyclic schema rejected");
        return Err(SubsumptionError::CyclicSchema { cycles });
    }

    let mut memo = HashMap::new();
    inline_definition(ROOT_POINTER, &registry, &resolver, raw, &mut memo)
}

// ===========================================================================
// Tests
// ===========================================================================
