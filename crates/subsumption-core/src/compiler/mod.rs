//! Schema Compiler (spec §4.3): translates an already-inlined schema into a
//! predicate over a [`crate::json_encoder::JsonSort`] value, with a label
//! table tying every leaf constraint to a fresh boolean handle for later
//! diagnosis (spec §4.4).

mod format;
mod keywords;
mod pattern;

pub(crate) use keywords::compile_schema;

use std::collections::HashMap;

use z3::ast::Bool;
use z3::Context;

/// Which side of the subsumption check a compilation belongs to — prefixes
/// every label name (`P:...` / `C:...`, spec §3's constraint-label format).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Producer,
    Consumer,
}

impl Side {
    fn prefix(self) -> &'static str {
        match self {
            Side::Producer => "P",
            Side::Consumer => "C",
        }
    }
}

/// One allocated label: its disambiguated name, the schema path and keyword
/// it was allocated for (kept separately so diagnosis can map a failed label
/// back to a recommendation without re-parsing `name`), and the boolean
/// handle biconditionally tied to the leaf constraint it names.
#[derive(Debug, Clone)]
pub(crate) struct Label<'ctx> {
    pub name: String,
    pub path: String,
    pub keyword: String,
    pub handle: Bool<'ctx>,
}

/// Append-only label table for one side's compilation (spec §5: "the
/// compiler's label table is append-only within a check").
pub(crate) struct LabelTable<'ctx> {
    side: Side,
    entries: Vec<Label<'ctx>>,
    seen: HashMap<String, usize>,
}

impl<'ctx> LabelTable<'ctx> {
    fn new(side: Side) -> Self {
        Self {
            side,
            entries: Vec::new(),
            seen: HashMap::new(),
        }
    }

    pub fn entries(&self) -> &[Label<'ctx>] {
        &self.entries
    }

    /// Allocate a fresh label for a leaf constraint, disambiguating repeated
    /// `(path, keyword)` pairs with a `#2`, `#3`, ... suffix (spec §3: "label
    /// collisions are disambiguated by appending a disambiguator"; the exact
    /// scheme is this project's choice, recorded in `DESIGN.md`).
    fn allocate(&mut self, ctx: &'ctx Context, path: &str, keyword: &str) -> Bool<'ctx> {
        let stripped_path = path.strip_prefix('#').unwrap_or(path);
        let base = format!("{}:{}:{}", self.side.prefix(), stripped_path, keyword);
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        let name = if *count == 1 {
            base
        } else {
            format!("{base}#{count}")
        };
        let handle = Bool::fresh_const(ctx, &name);
        self.entries.push(Label {
            name: name.clone(),
            path: stripped_path.to_string(),
            keyword: keyword.to_string(),
            handle: handle.clone(),
        });
        handle
    }
}

/// Threaded through one recursive compilation pass: the solver context, the
/// shared [`crate::json_encoder::JsonSort`], which side is being compiled,
/// the label table being appended to, and the biconditional side-assertions
/// (`label_handle <-> leaf`) that must be conjoined with the final predicate
/// for the labels to be meaningful under the model (spec §4.3 "Labeling").
pub(crate) struct CompileCtx<'ctx, 'a> {
    pub ctx: &'ctx Context,
    pub json: &'a crate::json_encoder::JsonSort<'ctx>,
    pub labels: LabelTable<'ctx>,
    pub side_assertions: Vec<Bool<'ctx>>,
}

impl<'ctx, 'a> CompileCtx<'ctx, 'a> {
    pub fn new(ctx: &'ctx Context, json: &'a crate::json_encoder::JsonSort<'ctx>, side: Side) -> Self {
        Self {
            ctx,
            json,
            labels: LabelTable::new(side),
            side_assertions: Vec::new(),
        }
    }

    /// Label a leaf constraint: allocate a fresh handle, record `handle <->
    /// leaf` as a side-assertion, and return the handle in place of the raw
    /// leaf for use in the surrounding conjunction.
    pub fn label(&mut self, path: &str, keyword: &str, leaf: Bool<'ctx>) -> Bool<'ctx> {
        let handle = self.labels.allocate(self.ctx, path, keyword);
        self.side_assertions.push(handle.iff(&leaf));
        handle
    }
}

/// One side's (producer's or consumer's) fully compiled predicate, plus the
/// side-assertions and label table needed by the Solver Driver (spec §4.4)
/// to assert `label <-> leaf` for every leaf and to evaluate labels after a
/// `sat` verdict.
pub(crate) struct CompiledSide<'ctx> {
    pub predicate: Bool<'ctx>,
    pub side_assertions: Vec<Bool<'ctx>>,
    pub labels: Vec<Label<'ctx>>,
}

/// Compile one already-inlined schema against the shared variable `x` for
/// one side of the check, bundling the predicate, its side-assertions, and
/// its label table for the driver.
pub(crate) fn compile_side<'ctx>(
    ctx: &'ctx Context,
    json: &crate::json_encoder::JsonSort<'ctx>,
    side: Side,
    schema: &serde_json::Value,
    x: &z3::ast::Dynamic<'ctx>,
) -> Result<CompiledSide<'ctx>, crate::error::SubsumptionError> {
    let mut cc = CompileCtx::new(ctx, json, side);
    let predicate = compile_schema(&mut cc, schema, x, "#")?;
    Ok(CompiledSide {
        predicate,
        side_assertions: cc.side_assertions,
        labels: cc.labels.entries().to_vec(),
    })
}
